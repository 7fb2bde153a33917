use fnexpr_ast::{BinOp, Expr, ExprKind, UnaryOp};
use fnexpr_parse::{format_expr, parse, parse_expression_with_recovery, SyntaxError};
use miette::Diagnostic;

fn parsed(src: &str) -> Expr {
    parse(src).expect("parse")
}

fn as_binary(expr: &Expr) -> (&Expr, BinOp, &Expr) {
    match &expr.kind {
        ExprKind::Binary { left, op, right } => (left, *op, right),
        other => panic!("expected binary, got {other:?}"),
    }
}

#[test]
fn multiplication_binds_tighter_than_addition() {
    let expr = parsed("1 + 2 * 3");
    let (left, op, right) = as_binary(&expr);
    assert_eq!(op, BinOp::Add);
    assert!(matches!(left.kind, ExprKind::IntLit(1)));
    let (_, inner, _) = as_binary(right);
    assert_eq!(inner, BinOp::Mul);
}

#[test]
fn subtraction_is_left_associative() {
    let expr = parsed("10 - 4 - 3");
    let (left, op, right) = as_binary(&expr);
    assert_eq!(op, BinOp::Sub);
    assert!(matches!(right.kind, ExprKind::IntLit(3)));
    assert_eq!(as_binary(left).1, BinOp::Sub);
}

#[test]
fn power_is_right_associative_and_binds_tighter_than_negation() {
    let expr = parsed("-2 ** 3 ** 2");
    let ExprKind::Unary { op: UnaryOp::Neg, expr: inner } = &expr.kind else {
        panic!("expected negation at the root, got {:?}", expr.kind);
    };
    let (base, op, exponent) = as_binary(inner);
    assert_eq!(op, BinOp::Pow);
    assert!(matches!(base.kind, ExprKind::IntLit(2)));
    assert_eq!(as_binary(exponent).1, BinOp::Pow);

    let expr = parsed("2 ** -1");
    let (_, op, exponent) = as_binary(&expr);
    assert_eq!(op, BinOp::Pow);
    assert!(matches!(exponent.kind, ExprKind::Unary { .. }));
}

#[test]
fn comparison_has_lowest_precedence() {
    let expr = parsed("x + 1 <= y * 2");
    let (_, op, _) = as_binary(&expr);
    assert_eq!(op, BinOp::Le);
}

#[test]
fn chained_comparisons_are_rejected() {
    let err = parse("a < b < c").unwrap_err();
    assert!(err.message().contains("chained comparisons"));
}

#[test]
fn calls_attributes_and_methods() {
    let expr = parsed("max(a, 2).x");
    let ExprKind::Attribute { base, name } = &expr.kind else {
        panic!("expected attribute, got {:?}", expr.kind);
    };
    assert_eq!(name.node, "x");
    let ExprKind::Call { name, args } = &base.kind else {
        panic!("expected call");
    };
    assert_eq!(name.node, "max");
    assert_eq!(args.len(), 2);

    let expr = parsed("v.scale(2).length()");
    let ExprKind::MethodCall { receiver, name, args } = &expr.kind else {
        panic!("expected method call");
    };
    assert_eq!(name.node, "length");
    assert!(args.is_empty());
    assert!(matches!(receiver.kind, ExprKind::MethodCall { .. }));
    assert_eq!(expr.children().len(), 1);
}

#[test]
fn zero_argument_call() {
    let expr = parsed("rand()");
    assert!(matches!(&expr.kind, ExprKind::Call { args, .. } if args.is_empty()));
}

#[test]
fn literals() {
    assert!(matches!(parsed("42").kind, ExprKind::IntLit(42)));
    assert!(matches!(parsed("4.5").kind, ExprKind::FloatLit(f) if f == 4.5));
    assert!(matches!(parsed("\"hi\"").kind, ExprKind::StringLit(ref s) if s == "hi"));
}

#[test]
fn spans_cover_the_whole_operator_expression() {
    let expr = parsed("ab + cd");
    assert_eq!(expr.span.offset(), 0);
    assert_eq!(expr.span.len(), 7);
}

#[test]
fn trailing_tokens_are_an_error() {
    let err = parse("1 2").unwrap_err();
    assert!(matches!(err, SyntaxError::Parse(_)));
    assert!(err.message().contains("expected end of input"));
}

#[test]
fn lex_errors_surface_as_syntax_errors() {
    let err = parse("1 + @").unwrap_err();
    assert!(matches!(err, SyntaxError::Lex(_)));
}

#[test]
fn missing_closing_paren() {
    let err = parse("(1 + 2").unwrap_err();
    assert!(err.message().contains("expected ')'"));
}

#[test]
fn recovery_inserts_error_nodes() {
    let (expr, errors) = parse_expression_with_recovery("f(1, , 3) + *").expect("lex");
    assert_eq!(errors.len(), 2);
    assert!(expr.contains_error());

    let (_, op, right) = as_binary(&expr);
    assert_eq!(op, BinOp::Add);
    assert!(matches!(right.kind, ExprKind::Error));
}

#[test]
fn recovery_keeps_lex_error_labels() {
    let report = parse_expression_with_recovery("1 + $").unwrap_err();
    assert_eq!(report.code().map(|c| c.to_string()).as_deref(), Some("fnexpr::lex"));
    let label = report.labels().and_then(|mut labels| labels.next()).expect("labelled span");
    assert_eq!(label.offset(), 4);
}

#[test]
fn recovery_without_errors_matches_strict_parse() {
    let (expr, errors) = parse_expression_with_recovery("a * (b + 1)").expect("lex");
    assert!(errors.is_empty());
    assert_eq!(expr, parsed("a * (b + 1)"));
}

#[test]
fn formatter_reparses_to_the_same_tree() {
    for src in [
        "1 + 2 * 3",
        "(1 + 2) * 3",
        "a - (b - c)",
        "-(a + b)",
        "(-2) ** 2",
        "2 ** 3 ** 2",
        "(2 ** 3) ** 2",
        "x.length() * 0.5 >= min(a, \"s\\n\")",
        "(a + b).x",
        "(-2147483648) ** 2",
        "1 - -2147483648",
    ] {
        let expr = parsed(src);
        let printed = format_expr(&expr);
        let reparsed = parsed(&printed);
        assert_eq!(format_expr(&reparsed), printed, "source: {src}");
    }
    assert_eq!(format_expr(&parsed("(1 + 2) * 3")), "(1 + 2) * 3");
    assert_eq!(format_expr(&parsed("1 + (2 * 3)")), "1 + 2 * 3");
}

#[test]
fn most_negative_int_literal() {
    let expr = parsed("-2147483648");
    assert!(matches!(expr.kind, ExprKind::IntLit(i32::MIN)));
    assert_eq!(expr.span.len(), "-2147483648".len());

    let expr = parsed("1 - -2147483648");
    let (_, op, right) = as_binary(&expr);
    assert_eq!(op, BinOp::Sub);
    assert!(matches!(right.kind, ExprKind::IntLit(i32::MIN)));

    // Without the minus, or when `**` binds the digits first, it does not fit.
    for src in ["2147483648", "-2147483648 ** 2"] {
        let err = parse(src).unwrap_err();
        assert!(matches!(err, SyntaxError::Parse(_)), "{src}");
        assert!(err.message().contains("out of range"), "{src}");
    }
}
