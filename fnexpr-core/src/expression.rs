#![forbid(unsafe_code)]

use std::sync::Arc;

use fnexpr_network::{DataType, InputSocketId, Network, NetworkEvaluator, OutputSocketId};
use tracing::debug;

use crate::builder::{AstToNetworkBuilder, LoweringStats};
use crate::error::ExpressionError;
use crate::resources::ResourceCollector;
use crate::symbol_table::SymbolTable;

/// Name of the sink and output nodes holding the expression's value.
pub const RESULT_NAME: &str = "Result";

/// A lowered expression before it is wrapped into an evaluator.
#[derive(Debug)]
pub struct ExpressionNetwork {
    pub network: Network,
    /// One input node socket per declared variable, in declaration order.
    pub inputs: Vec<OutputSocketId>,
    /// Input socket of the output node.
    pub output: InputSocketId,
    pub stats: LoweringStats,
}

/// Parses `text` and lowers it into a network whose single output node has
/// type `output_type`.
pub fn expression_to_network(
    text: &str,
    output_type: DataType,
    variables: &[(&str, DataType)],
    resources: &mut ResourceCollector,
    symbols: &SymbolTable,
) -> Result<ExpressionNetwork, ExpressionError> {
    let mut builder = AstToNetworkBuilder::new(symbols, resources);
    let inputs = variables
        .iter()
        .map(|&(name, data_type)| builder.declare_variable(name, data_type))
        .collect::<Result<Vec<_>, _>>()?;

    let expr = fnexpr_parse::parse(text)?;
    let value = builder.build(&expr)?;
    let value = builder.insert_conversion(value, output_type, expr.span)?;

    let network = builder.network_mut();
    let sink = network.add_dummy(RESULT_NAME, &[(String::from("Value"), output_type)], &[]);
    if let Some(sink_input) = network.node_input(sink, 0) {
        network.add_link(value, sink_input)?;
    }
    let output = network.add_output(RESULT_NAME, output_type);
    network.add_link(value, output)?;

    let stats = builder.stats();
    debug!(
        expression = text,
        nodes = stats.nodes,
        links = stats.links,
        conversions = stats.conversions,
        "lowered expression"
    );
    Ok(ExpressionNetwork {
        network: builder.into_network(),
        inputs,
        output,
        stats,
    })
}

/// The type `text` evaluates to before any conversion to a requested output.
pub fn infer_expression_type(
    text: &str,
    variables: &[(&str, DataType)],
    symbols: &SymbolTable,
) -> Result<DataType, ExpressionError> {
    let mut scratch = ResourceCollector::new();
    let mut builder = AstToNetworkBuilder::new(symbols, &mut scratch);
    for &(name, data_type) in variables {
        builder.declare_variable(name, data_type)?;
    }
    let expr = fnexpr_parse::parse(text)?;
    let value = builder.build(&expr)?;
    Ok(builder.socket_type(value))
}

/// Compiles `text` into one multi-function taking the `variables` as inputs
/// and producing a single `output_type` output. The evaluator is owned by
/// `resources`.
pub fn expression_to_multi_function(
    text: &str,
    output_type: DataType,
    variables: &[(&str, DataType)],
    resources: &mut ResourceCollector,
    symbols: &SymbolTable,
) -> Result<Arc<NetworkEvaluator>, ExpressionError> {
    let lowered = expression_to_network(text, output_type, variables, resources, symbols)?;
    let evaluator = NetworkEvaluator::new(lowered.network, lowered.inputs, vec![lowered.output])?;
    Ok(resources.construct(format!("expression `{text}`"), evaluator))
}
