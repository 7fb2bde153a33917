#![forbid(unsafe_code)]

use fnexpr_ast::{BinOp, Expr, ExprKind, UnaryOp};

// Binding strength, loosest first. Matches the parser's precedence ladder.
const PREC_CMP: u8 = 1;
const PREC_ADD: u8 = 2;
const PREC_MUL: u8 = 3;
const PREC_UNARY: u8 = 4;
const PREC_POW: u8 = 5;
const PREC_POSTFIX: u8 = 6;

fn binop_prec(op: BinOp) -> u8 {
    match op {
        BinOp::Lt | BinOp::Gt | BinOp::Eq | BinOp::Le | BinOp::Ge => PREC_CMP,
        BinOp::Add | BinOp::Sub => PREC_ADD,
        BinOp::Mul | BinOp::Div => PREC_MUL,
        BinOp::Pow => PREC_POW,
    }
}

fn expr_prec(expr: &Expr) -> u8 {
    match &expr.kind {
        ExprKind::Binary { op, .. } => binop_prec(*op),
        ExprKind::Unary { .. } => PREC_UNARY,
        // Only `i32::MIN` is negative; it prints with a leading minus.
        ExprKind::IntLit(n) if *n < 0 => PREC_UNARY,
        _ => PREC_POSTFIX,
    }
}

/// Render an expression back to source text with the minimal parentheses
/// needed for it to parse into the same tree.
pub fn format_expr(expr: &Expr) -> String {
    let mut out = String::new();
    write_expr(&mut out, expr);
    out
}

fn write_expr(out: &mut String, expr: &Expr) {
    match &expr.kind {
        ExprKind::Error => out.push_str("<error>"),
        ExprKind::IntLit(n) => out.push_str(&n.to_string()),
        ExprKind::FloatLit(f) => out.push_str(&format!("{f:?}")),
        ExprKind::StringLit(s) => write_string(out, s),
        ExprKind::Ident(id) => out.push_str(&id.node),
        ExprKind::Call { name, args } => {
            out.push_str(&name.node);
            write_args(out, args);
        }
        ExprKind::Attribute { base, name } => {
            write_operand(out, base, PREC_POSTFIX);
            out.push('.');
            out.push_str(&name.node);
        }
        ExprKind::MethodCall {
            receiver,
            name,
            args,
        } => {
            write_operand(out, receiver, PREC_POSTFIX);
            out.push('.');
            out.push_str(&name.node);
            write_args(out, args);
        }
        ExprKind::Unary {
            op: UnaryOp::Neg,
            expr: inner,
        } => {
            out.push('-');
            write_operand(out, inner, PREC_UNARY);
        }
        ExprKind::Binary { left, op, right } => {
            let prec = binop_prec(*op);
            // Left-associative except `**`; comparisons do not chain at all.
            let (left_min, right_min) = match op {
                BinOp::Pow => (PREC_POSTFIX, PREC_UNARY),
                _ if op.is_comparison() => (prec + 1, prec + 1),
                _ => (prec, prec + 1),
            };
            write_operand(out, left, left_min);
            out.push(' ');
            out.push_str(op.symbol());
            out.push(' ');
            write_operand(out, right, right_min);
        }
    }
}

fn write_operand(out: &mut String, expr: &Expr, min_prec: u8) {
    if expr_prec(expr) < min_prec {
        out.push('(');
        write_expr(out, expr);
        out.push(')');
    } else {
        write_expr(out, expr);
    }
}

fn write_args(out: &mut String, args: &[Expr]) {
    out.push('(');
    for (i, arg) in args.iter().enumerate() {
        if i > 0 {
            out.push_str(", ");
        }
        write_expr(out, arg);
    }
    out.push(')');
}

fn write_string(out: &mut String, s: &str) {
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\r' => out.push_str("\\r"),
            c => out.push(c),
        }
    }
    out.push('"');
}
