#![forbid(unsafe_code)]

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use miette::{IntoDiagnostic, NamedSource};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use fnexpr_core::{
    ExpressionError, ResourceCollector, SymbolTable, expression_to_multi_function, expression_to_network,
    infer_expression_type,
};
use fnexpr_network::{DataType, GenericArray, MultiFunction, dump};

mod config;

use config::{ConfigError, ResolvedConfig};

#[derive(Parser, Debug)]
#[command(name = "fnexpr", version, about = "Compile expressions into multi-function networks")]
struct Cli {
    /// Configuration file. Defaults to the nearest `fnexpr.toml` above the working directory.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Bind a variable as `name:type=v1,v2,...` (repeatable). Overrides `fnexpr.toml`.
    #[arg(long = "var", global = true)]
    vars: Vec<String>,

    /// Result type (`int`, `float`, `bool`, `string`, `float3`, or a list like `float[]`).
    /// Defaults to the expression's own type.
    #[arg(long, global = true)]
    output: Option<String>,

    /// Number of elements to evaluate when no variable is bound.
    #[arg(long, global = true)]
    batch: Option<usize>,

    /// Log lowering decisions to stderr. `FNEXPR_LOG` takes precedence.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    cmd: Cmd,
}

#[derive(Subcommand, Debug)]
enum Cmd {
    /// Compile and evaluate an expression, one result per line
    Eval { expr: String },
    /// Print the lowered network
    Graph { expr: String },
    /// Type-check an expression without evaluating it
    Check { expr: String },
    /// List the functions, members, conversions and constants in scope
    Symbols,
}

fn main() -> miette::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = resolve_config(&cli)?;
    let mut resources = ResourceCollector::new();
    let symbols = build_symbols(&config, &mut resources)?;

    match &cli.cmd {
        Cmd::Eval { expr } => eval(expr, &config, &mut resources, &symbols),
        Cmd::Graph { expr } => graph(expr, &config, &mut resources, &symbols),
        Cmd::Check { expr } => check(expr, &config, &mut resources, &symbols),
        Cmd::Symbols => {
            print!("{}", list_symbols(&symbols));
            Ok(())
        }
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_env("FNEXPR_LOG").unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .without_time()
        .init();
}

fn resolve_config(cli: &Cli) -> miette::Result<ResolvedConfig> {
    let cwd = std::env::current_dir().into_diagnostic()?;
    let mut resolved = config::load_config(cli.config.as_deref(), &cwd)?;
    if let Some(path) = &resolved.config_path {
        info!(path = %path.display(), "loaded config");
    }
    for flag in &cli.vars {
        resolved.bind(config::parse_var_flag(flag)?);
    }
    if let Some(output) = &cli.output {
        resolved.output = Some(config::parse_data_type(output)?);
    }
    if cli.batch.is_some() {
        resolved.batch = cli.batch;
    }
    Ok(resolved)
}

fn build_symbols(config: &ResolvedConfig, resources: &mut ResourceCollector) -> miette::Result<SymbolTable> {
    let mut symbols = SymbolTable::with_builtins(resources)?;
    for constant in &config.constants {
        let DataType::Single(base) = constant.value.data_type() else {
            continue;
        };
        let value = constant.value.as_any().ok_or_else(|| ConfigError {
            message: format!("constant `{}` has no value", constant.name),
        })?;
        symbols.add_single_constant(constant.name.clone(), base, value)?;
        debug!(name = %constant.name, value = %constant.value, "registered constant");
    }
    Ok(symbols)
}

fn variable_types(config: &ResolvedConfig) -> Vec<(&str, DataType)> {
    config
        .variables
        .iter()
        .map(|v| (v.name.as_str(), v.data_type))
        .collect()
}

fn with_source(text: &str) -> impl Fn(ExpressionError) -> miette::Report + '_ {
    move |err| miette::Report::new(err).with_source_code(NamedSource::new("<expression>", text.to_string()))
}

fn output_type(text: &str, config: &ResolvedConfig, symbols: &SymbolTable) -> miette::Result<DataType> {
    match config.output {
        Some(ty) => Ok(ty),
        None => infer_expression_type(text, &variable_types(config), symbols).map_err(with_source(text)),
    }
}

fn eval(
    text: &str,
    config: &ResolvedConfig,
    resources: &mut ResourceCollector,
    symbols: &SymbolTable,
) -> miette::Result<()> {
    let output = output_type(text, config, symbols)?;
    let size = config.batch_size()?;
    let function = expression_to_multi_function(text, output, &variable_types(config), resources, symbols)
        .map_err(with_source(text))?;
    debug!(signature = %function.signature(), size, "evaluating");

    let inputs: Vec<GenericArray> = config.variables.iter().map(|v| v.values.clone()).collect();
    let results = function.evaluate(size, &inputs)?;
    if let Some(result) = results.first() {
        for index in 0..result.len() {
            println!("{}", result.format_element(index));
        }
    }
    Ok(())
}

fn graph(
    text: &str,
    config: &ResolvedConfig,
    resources: &mut ResourceCollector,
    symbols: &SymbolTable,
) -> miette::Result<()> {
    let output = output_type(text, config, symbols)?;
    let lowered = expression_to_network(text, output, &variable_types(config), resources, symbols)
        .map_err(with_source(text))?;
    print!("{}", dump(&lowered.network));
    Ok(())
}

fn check(
    text: &str,
    config: &ResolvedConfig,
    resources: &mut ResourceCollector,
    symbols: &SymbolTable,
) -> miette::Result<()> {
    let variables = variable_types(config);
    let natural = infer_expression_type(text, &variables, symbols).map_err(with_source(text))?;
    let output = config.output.unwrap_or(natural);
    let lowered = expression_to_network(text, output, &variables, resources, symbols).map_err(with_source(text))?;
    let expr = fnexpr_parse::parse(text).into_diagnostic()?;

    println!("{}", fnexpr_parse::format_expr(&expr));
    if natural == output {
        println!("type: {output}");
    } else {
        println!("type: {natural} -> {output}");
    }
    let stats = lowered.stats;
    println!(
        "nodes: {} ({} functions), links: {}, conversions: {}",
        stats.nodes, stats.function_nodes, stats.links, stats.conversions
    );
    Ok(())
}

fn list_symbols(symbols: &SymbolTable) -> String {
    let mut out = String::new();
    out.push_str("functions:\n");
    for name in symbols.function_names() {
        for function in symbols.lookup_function_candidates(name) {
            out.push_str(&format!("  {name}: {}\n", function.signature()));
        }
    }
    out.push_str("attributes:\n");
    for (ty, name, function) in symbols.attributes() {
        out.push_str(&format!("  {ty}.{name}: {}\n", function.signature()));
    }
    out.push_str("methods:\n");
    for (ty, name, function) in symbols.methods() {
        out.push_str(&format!("  {ty}.{name}(): {}\n", function.signature()));
    }
    out.push_str("conversions:\n");
    for (from, to) in symbols.conversions() {
        out.push_str(&format!("  {from} -> {to}\n"));
    }
    out.push_str("constants:\n");
    for (name, value) in symbols.constants() {
        out.push_str(&format!("  {name}: {} = {value}\n", value.data_type()));
    }
    out.push_str("not implemented:\n");
    for name in symbols.unsupported_names() {
        out.push_str(&format!("  {name}\n"));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_definition_is_valid() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn symbol_listing_covers_every_table() {
        let mut resources = ResourceCollector::new();
        let symbols = SymbolTable::with_builtins(&mut resources).unwrap();
        let text = list_symbols(&symbols);
        assert!(text.contains("  a+b: a+b(in In1: int, in In2: int, out Out1: int)"), "{text}");
        assert!(text.contains("  float3.x: "));
        assert!(text.contains("  float[].sum(): "));
        assert!(text.contains("  int -> float\n"));
        assert!(text.contains("  pi: float = "));
        assert!(text.contains("  pingpong\n"));
    }

    #[test]
    fn config_constants_join_the_builtins() {
        let config = config::parse_config("[[constants]]\nname = \"g\"\ntype = \"float\"\nvalue = 9.5\n").unwrap();
        let mut resources = ResourceCollector::new();
        let symbols = build_symbols(&config, &mut resources).unwrap();
        assert_eq!(symbols.try_lookup_single_constant("g").and_then(|v| v.get::<f32>()), Some(&9.5));

        let clash = config::parse_config("[[constants]]\nname = \"pi\"\ntype = \"float\"\nvalue = 3\n").unwrap();
        assert!(build_symbols(&clash, &mut resources).is_err());
    }
}
