#![forbid(unsafe_code)]

mod error;
mod fmt;
mod parser;

use fnexpr_lex::Lexer;

pub use error::{ParseError, SyntaxError};
pub use fmt::format_expr;
pub use parser::Parser;

/// Lex and parse one complete expression.
pub fn parse(src: &str) -> Result<fnexpr_ast::Expr, SyntaxError> {
    let tokens = Lexer::new(src).lex()?;
    let mut parser = Parser::new(&tokens);
    Ok(parser.parse_expr_eof()?)
}

/// Like [`parse`], with the error rendered as a `miette` report (labels kept).
pub fn parse_expression(src: &str) -> miette::Result<fnexpr_ast::Expr> {
    parse(src).map_err(miette::Report::new)
}

/// Parse an expression while attempting to recover from errors.
///
/// Returns a best-effort AST (with `ExprKind::Error` placeholders) and the
/// list of encountered `ParseError`s. Lexing errors are not recoverable.
pub fn parse_expression_with_recovery(
    src: &str,
) -> miette::Result<(fnexpr_ast::Expr, Vec<ParseError>)> {
    let tokens = Lexer::new(src).lex().map_err(miette::Report::new)?;
    let mut parser = Parser::new(&tokens);
    Ok(parser.parse_expr_with_recovery())
}
