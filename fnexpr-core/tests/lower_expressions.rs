use std::sync::Arc;

use fnexpr_core::{
    AstToNetworkBuilder, ExpressionError, ResourceCollector, SymbolError, SymbolTable, expression_to_multi_function,
    expression_to_network, infer_expression_type,
};
use fnexpr_network::{
    BaseType, CustomMfSiSo, CustomMfSm, DataType, EvalError, Float3, GenericArray, MfParams, MfSignature,
    MultiFunction, NetworkEvaluator, NodeKind, topology,
};

fn builtins() -> (SymbolTable, ResourceCollector) {
    let mut resources = ResourceCollector::new();
    let symbols = SymbolTable::with_builtins(&mut resources).expect("builtins");
    (symbols, resources)
}

fn compile(
    text: &str,
    output: DataType,
    variables: &[(&str, DataType)],
) -> Result<Arc<NetworkEvaluator>, ExpressionError> {
    let (symbols, mut resources) = builtins();
    expression_to_multi_function(text, output, variables, &mut resources, &symbols)
}

fn eval_single<T: fnexpr_network::MfValue>(text: &str, inputs: &[(&str, GenericArray)]) -> Vec<T> {
    let variables: Vec<(&str, DataType)> = inputs.iter().map(|(n, a)| (*n, a.data_type())).collect();
    let f = compile(text, DataType::single::<T>(), &variables).expect("compile");
    let size = inputs.first().map_or(1, |(_, a)| a.len());
    let arrays: Vec<GenericArray> = inputs.iter().map(|(_, a)| a.clone()).collect();
    let out = f.evaluate(size, &arrays).expect("evaluate");
    out.into_iter().next().and_then(|a| a.into_vec::<T>()).expect("typed output")
}

fn int() -> DataType {
    DataType::single::<i32>()
}

fn float() -> DataType {
    DataType::single::<f32>()
}

#[test]
fn constant_arithmetic() {
    assert_eq!(eval_single::<i32>("3 + 4", &[]), vec![7]);
    assert_eq!(eval_single::<i32>("2 ** 3 ** 2", &[]), vec![512]);
    assert_eq!(eval_single::<i32>("7 / 2 - -1", &[]), vec![4]);
    assert_eq!(eval_single::<f32>("7 / 2.0", &[]), vec![3.5]);
    assert_eq!(eval_single::<i32>("-2147483648", &[]), vec![i32::MIN]);
    assert_eq!(eval_single::<i32>("-2147483648 + 1", &[]), vec![i32::MIN + 1]);
}

#[test]
fn variable_times_constant() {
    let x = GenericArray::from_vec(vec![5]);
    assert_eq!(eval_single::<i32>("x * 2", &[("x", x)]), vec![10]);
}

#[test]
fn batches_evaluate_elementwise() {
    let a = GenericArray::from_vec(vec![1.0f32, 2.0, 3.0]);
    let b = GenericArray::from_vec(vec![2, 4, 6]);
    assert_eq!(
        eval_single::<f32>("a * b - 1.5", &[("a", a), ("b", b)]),
        vec![0.5, 6.5, 16.5]
    );
}

#[test]
fn exact_overload_beats_converting_one() {
    let mut resources = ResourceCollector::new();
    let mut symbols = SymbolTable::new();
    let string = DataType::single::<String>();
    symbols
        .add_conversion(
            string,
            int(),
            Arc::new(CustomMfSiSo::new("parse", |s: &String| s.parse::<i32>().unwrap_or(0))),
        )
        .unwrap();
    symbols
        .add_conversion(int(), string, Arc::new(CustomMfSiSo::new("format", |v: &i32| v.to_string())))
        .unwrap();
    symbols.add_function("f", Arc::new(CustomMfSiSo::new("f(int)", |v: &i32| v + 100)));
    symbols.add_function("f", Arc::new(CustomMfSiSo::new("f(string)", |s: &String| s.len() as i32)));

    let f = expression_to_multi_function("f(\"1234\")", int(), &[], &mut resources, &symbols).unwrap();
    let out = f.evaluate(1, &[]).unwrap();
    assert_eq!(out[0].as_slice::<i32>(), Some(&[4][..]));

    // Both overloads accept an int argument; the one needing no conversion wins.
    let lowered = expression_to_network("f(7)", int(), &[], &mut resources, &symbols).unwrap();
    assert_eq!(lowered.stats.conversions, 0);
    let f = expression_to_multi_function("f(7)", int(), &[], &mut resources, &symbols).unwrap();
    assert_eq!(f.evaluate(1, &[]).unwrap()[0].as_slice::<i32>(), Some(&[107][..]));
}

/// `(out r: int, in a: int)`: the output is declared before the input.
struct OutputFirst {
    signature: MfSignature,
}

impl OutputFirst {
    fn new() -> Self {
        let signature = MfSignature::build("triple")
            .single_output::<i32>("r")
            .single_input::<i32>("a")
            .finish();
        Self { signature }
    }
}

impl MultiFunction for OutputFirst {
    fn signature(&self) -> &MfSignature {
        &self.signature
    }

    fn call(&self, _size: usize, params: &mut MfParams<'_>) -> Result<(), EvalError> {
        let a = params.readonly_single_input::<i32>(1, "a")?;
        let r = a.iter().map(|v| v * 3).collect();
        params.set_single_output(0, r)
    }
}

#[test]
fn outputs_take_no_argument_slot_and_mutables_do() {
    let (mut symbols, mut resources) = builtins();
    symbols.add_function("triple", Arc::new(OutputFirst::new()));
    symbols.add_function("inc", Arc::new(CustomMfSm::new("inc", |v: &mut f32| *v += 1.0)));
    let x = GenericArray::from_vec(vec![2, 5]);

    let f = expression_to_multi_function("triple(x) + 1", int(), &[("x", int())], &mut resources, &symbols)
        .unwrap();
    let out = f.evaluate(2, std::slice::from_ref(&x)).unwrap();
    assert_eq!(out[0].as_slice::<i32>(), Some(&[7, 16][..]));

    // The int argument is converted into the float mutable slot.
    let f = expression_to_multi_function("inc(x) + x", float(), &[("x", int())], &mut resources, &symbols)
        .unwrap();
    let out = f.evaluate(2, std::slice::from_ref(&x)).unwrap();
    assert_eq!(out[0].as_slice::<f32>(), Some(&[5.0, 11.0][..]));
    assert_eq!(x.as_slice::<i32>(), Some(&[2, 5][..]));

    assert!(matches!(
        expression_to_network("triple()", int(), &[], &mut resources, &symbols),
        Err(ExpressionError::NoMatchingOverload { .. })
    ));
}

#[test]
fn ties_go_to_the_first_registration() {
    let mut resources = ResourceCollector::new();
    let mut symbols = SymbolTable::new();
    symbols.add_function("g", Arc::new(CustomMfSiSo::new("first", |v: &i32| v + 1)));
    symbols.add_function("g", Arc::new(CustomMfSiSo::new("second", |v: &i32| v + 2)));
    let f = expression_to_multi_function("g(x)", int(), &[("x", int())], &mut resources, &symbols).unwrap();
    let out = f.evaluate(1, &[GenericArray::from_vec(vec![0])]).unwrap();
    assert_eq!(out[0].as_slice::<i32>(), Some(&[1][..]));
}

#[test]
fn conversions_only_where_types_differ() {
    let (symbols, mut resources) = builtins();
    let same = expression_to_network("x + 1", int(), &[("x", int())], &mut resources, &symbols).unwrap();
    assert_eq!(same.stats.conversions, 0);

    let widened = expression_to_network("x + 1", float(), &[("x", int())], &mut resources, &symbols).unwrap();
    assert_eq!(widened.stats.conversions, 1);
    let converters = widened
        .network
        .nodes()
        .filter(|n| n.name() == "int to float")
        .count();
    assert_eq!(converters, 1);
    assert_eq!(widened.stats.function_nodes, same.stats.function_nodes + 1);
}

#[test]
fn unknown_identifier() {
    let err = compile("y + 1", int(), &[]).unwrap_err();
    match &err {
        ExpressionError::UnresolvedIdentifier { name, span } => {
            assert_eq!(name, "y");
            assert_eq!((span.offset(), span.len()), (0, 1));
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(!err.is_invariant_violation());
}

#[test]
fn attributes_must_exist() {
    let v = DataType::single::<Float3>();
    let err = compile("v.w", float(), &[("v", v)]).unwrap_err();
    assert!(matches!(err, ExpressionError::MissingAttribute { ref name, .. } if name == "w"));
    assert!(err.is_invariant_violation());

    let err = compile("x.len", int(), &[("x", float())]).unwrap_err();
    assert!(matches!(err, ExpressionError::MissingAttribute { ty, .. } if ty == float()));
}

#[test]
fn methods_check_existence_and_arity() {
    let v = DataType::single::<Float3>();
    let err = compile("v.cross(v)", v, &[("v", v)]).unwrap_err();
    assert!(matches!(err, ExpressionError::MissingMethod { .. }));

    let err = compile("v.dot()", float(), &[("v", v)]).unwrap_err();
    assert!(matches!(
        err,
        ExpressionError::ArityMismatch {
            expected: 1,
            actual: 0,
            ..
        }
    ));
}

#[test]
fn float3_helpers() {
    assert_eq!(eval_single::<f32>("float3(1, 2, 2).length()", &[]), vec![3.0]);
    let v = GenericArray::from_vec(vec![Float3::new(1.0, 2.0, 3.0)]);
    assert_eq!(
        eval_single::<f32>("(v + v).scale(0.5).dot(v) + v.z", &[("v", v.clone())]),
        vec![17.0]
    );
    assert_eq!(
        eval_single::<Float3>("v * 2 - v", &[("v", v)]),
        vec![Float3::new(1.0, 2.0, 3.0)]
    );
}

#[test]
fn strings_and_lists() {
    let n = GenericArray::from_vec(vec![5, 6]);
    assert_eq!(
        eval_single::<String>("\"ab\".repeat(3) + n", &[("n", n)]),
        vec!["ababab5".to_string(), "ababab6".to_string()]
    );
    assert_eq!(eval_single::<i32>("\"héllo\".len", &[]), vec![5]);

    let xs = GenericArray::from_vector_vec(vec![vec![1.0f32, 2.0, 6.0], vec![]]);
    assert_eq!(eval_single::<f32>("xs.sum() / xs.len", &[("xs", xs)]), vec![3.0, 0.0]);
}

#[test]
fn constants_and_comparisons() {
    assert_eq!(eval_single::<bool>("pi * 2.0 == tau", &[]), vec![true]);
    assert_eq!(eval_single::<bool>("true == (1 < 2)", &[]), vec![true]);
    assert_eq!(eval_single::<i32>("true + true", &[]), vec![2]);
}

#[test]
fn unsupported_functions_are_reported() {
    let err = compile("wrap(1.0, 0.0, 2.0)", float(), &[]).unwrap_err();
    assert!(matches!(err, ExpressionError::NotImplemented { ref name, .. } if name == "wrap"));
    assert!(err.is_invariant_violation());
}

#[test]
fn no_matching_overload_lists_candidates() {
    let err = compile("sin(\"a\")", float(), &[]).unwrap_err();
    let ExpressionError::NoMatchingOverload { name, arg_types, candidates, .. } = &err else {
        panic!("unexpected error: {err:?}");
    };
    assert_eq!(name, "sin");
    assert_eq!(arg_types, &[DataType::single::<String>()]);
    assert_eq!(candidates.len(), 1);
    assert!(err.is_invariant_violation());

    let err = compile("nope(1)", float(), &[]).unwrap_err();
    assert!(matches!(err, ExpressionError::NoMatchingOverload { ref candidates, .. } if candidates.is_empty()));
}

#[test]
fn output_type_without_conversion_fails() {
    let err = compile("1", DataType::single::<Float3>(), &[]).unwrap_err();
    assert!(matches!(err, ExpressionError::MissingConversion { from, .. } if from == int()));
}

#[test]
fn duplicate_variables_and_parse_errors() {
    let err = compile("x", int(), &[("x", int()), ("x", float())]).unwrap_err();
    assert!(matches!(err, ExpressionError::DuplicateVariable { ref name } if name == "x"));

    let err = compile("1 +", int(), &[]).unwrap_err();
    assert!(matches!(err, ExpressionError::Parse(_)));
    assert!(!err.is_invariant_violation());
}

#[test]
fn error_nodes_abort_lowering() {
    let (symbols, mut resources) = builtins();
    let (expr, errors) = fnexpr_parse::parse_expression_with_recovery("1 + ").unwrap();
    assert_eq!(errors.len(), 1);
    let mut builder = AstToNetworkBuilder::new(&symbols, &mut resources);
    let err = builder.build(&expr).unwrap_err();
    assert!(matches!(err, ExpressionError::ErrorNode { .. }));
    assert!(err.is_invariant_violation());
}

#[test]
fn duplicate_constant_keeps_first_value() {
    let (mut symbols, _resources) = builtins();
    let err = symbols.add_single_constant_value("pi", 3.0f32).unwrap_err();
    assert_eq!(
        err,
        SymbolError::DuplicateConstant {
            name: "pi".to_string()
        }
    );
    let pi = symbols.try_lookup_single_constant("pi").unwrap();
    assert_eq!(pi.get::<f32>(), Some(&std::f32::consts::PI));

    let err = symbols
        .add_single_constant("answer", BaseType::Int32, &42.0f32)
        .unwrap_err();
    assert!(matches!(err, SymbolError::ConstantType { .. }));
    assert!(symbols.try_lookup_single_constant("answer").is_none());
}

#[test]
fn duplicate_keyed_entries_are_rejected() {
    let (mut symbols, mut resources) = builtins();
    let v = DataType::single::<Float3>();
    let err = symbols
        .add_attribute(v, "x", Arc::new(CustomMfSiSo::new("x2", |v: &Float3| v.x * 2.0)))
        .unwrap_err();
    assert!(matches!(err, SymbolError::DuplicateAttribute { .. }));
    let err = symbols.add_conversion_fn::<i32, f32>(&mut resources).unwrap_err();
    assert_eq!(err, SymbolError::DuplicateConversion { from: int(), to: float() });
    assert_eq!(symbols.try_lookup_attribute(v, "x").unwrap().name(), "float3.x");
}

#[test]
fn same_text_builds_equal_independent_networks() {
    let (symbols, mut resources) = builtins();
    let text = "max(x, 2.5) * float3(x, 1, 0).length() >= 3";
    let vars = [("x", float())];
    let a = expression_to_network(text, DataType::single::<bool>(), &vars, &mut resources, &symbols).unwrap();
    let b = expression_to_network(text, DataType::single::<bool>(), &vars, &mut resources, &symbols).unwrap();
    assert_eq!(topology(&a.network), topology(&b.network));
    assert_eq!(a.stats, b.stats);

    let fa = NetworkEvaluator::new(a.network, a.inputs, vec![a.output]).unwrap();
    drop(b);
    let out = fa.evaluate(2, &[GenericArray::from_vec(vec![0.0f32, 4.0])]).unwrap();
    assert_eq!(out[0].as_slice::<bool>(), Some(&[false, true][..]));
}

#[test]
fn result_nodes_are_linked() {
    let (symbols, mut resources) = builtins();
    let lowered = expression_to_network("1.5", float(), &[], &mut resources, &symbols).unwrap();
    let network = &lowered.network;
    let sink = network
        .nodes()
        .find(|n| matches!(&n.kind, NodeKind::Dummy { name } if name == "Result"))
        .expect("dummy sink");
    assert!(network.input_socket(sink.inputs[0]).origin.is_some());
    assert!(network.input_socket(lowered.output).origin.is_some());
    assert_eq!(network.check_linked(&[lowered.output]), Ok(()));
}

#[test]
fn evaluator_is_kept_by_the_collector() {
    let (symbols, mut resources) = builtins();
    let before = resources.len();
    let f = expression_to_multi_function("x", int(), &[("x", int())], &mut resources, &symbols).unwrap();
    assert!(resources.len() > before);
    assert!(resources.names().any(|n| n == "expression `x`"));
    assert_eq!(f.signature().params.len(), 2);
    assert_eq!(f.signature().function_name, "Expression");
}

#[test]
fn natural_type_follows_overloads() {
    let (symbols, _resources) = builtins();
    assert_eq!(infer_expression_type("1 + 2", &[], &symbols).unwrap(), int());
    assert_eq!(infer_expression_type("x * 2", &[("x", float())], &symbols).unwrap(), float());
    assert_eq!(infer_expression_type("1 < 2", &[], &symbols).unwrap(), DataType::single::<bool>());
    assert!(matches!(
        infer_expression_type("y", &[], &symbols),
        Err(ExpressionError::UnresolvedIdentifier { .. })
    ));
}
