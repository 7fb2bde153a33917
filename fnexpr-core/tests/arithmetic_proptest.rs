use fnexpr_core::{ResourceCollector, SymbolTable, expression_to_multi_function};
use fnexpr_network::{DataType, GenericArray};
use proptest::{
    prelude::{any, prop},
    test_runner::{Config, TestCaseError, TestRunner},
};

#[test]
fn integer_network_matches_wrapping_arithmetic() {
    let mut resources = ResourceCollector::new();
    let symbols = SymbolTable::with_builtins(&mut resources).expect("builtins");
    let int = DataType::single::<i32>();
    let function = expression_to_multi_function(
        "a + b * c",
        int,
        &[("a", int), ("b", int), ("c", int)],
        &mut resources,
        &symbols,
    )
    .expect("compile");

    let mut runner = TestRunner::new(Config {
        cases: 64,
        ..Config::default()
    });
    let strat = prop::collection::vec((any::<i32>(), any::<i32>(), any::<i32>()), 1..16);

    runner
        .run(&strat, |rows| {
            let a: Vec<i32> = rows.iter().map(|r| r.0).collect();
            let b: Vec<i32> = rows.iter().map(|r| r.1).collect();
            let c: Vec<i32> = rows.iter().map(|r| r.2).collect();
            let expected: Vec<i32> = rows
                .iter()
                .map(|&(a, b, c)| a.wrapping_add(b.wrapping_mul(c)))
                .collect();

            let out = function
                .evaluate(
                    rows.len(),
                    &[
                        GenericArray::from_vec(a),
                        GenericArray::from_vec(b),
                        GenericArray::from_vec(c),
                    ],
                )
                .map_err(|e| TestCaseError::fail(format!("{e:?}")))?;
            let actual = out[0]
                .as_slice::<i32>()
                .ok_or_else(|| TestCaseError::fail("output is not int"))?;
            if actual != expected.as_slice() {
                return Err(TestCaseError::fail(format!("{actual:?} != {expected:?}")));
            }
            Ok(())
        })
        .expect("property holds");
}
