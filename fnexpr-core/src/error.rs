#![forbid(unsafe_code)]
#![allow(unused_assignments)]

use fnexpr_ast::Span;
use fnexpr_network::{DataType, NetworkError};
use fnexpr_parse::SyntaxError;
use miette::Diagnostic;
use thiserror::Error;

/// Registration failures; the table is left unchanged.
#[derive(Debug, Error, Diagnostic, PartialEq, Eq)]
pub enum SymbolError {
    #[error("attribute `{name}` is already registered for {ty}")]
    #[diagnostic(code(fnexpr::symbols::duplicate_attribute))]
    DuplicateAttribute { ty: DataType, name: String },

    #[error("method `{name}` is already registered for {ty}")]
    #[diagnostic(code(fnexpr::symbols::duplicate_method))]
    DuplicateMethod { ty: DataType, name: String },

    #[error("a conversion from {from} to {to} is already registered")]
    #[diagnostic(code(fnexpr::symbols::duplicate_conversion))]
    DuplicateConversion { from: DataType, to: DataType },

    #[error("constant `{name}` is already registered")]
    #[diagnostic(code(fnexpr::symbols::duplicate_constant))]
    DuplicateConstant { name: String },

    #[error("constant `{name}` does not hold a {expected} value")]
    #[diagnostic(code(fnexpr::symbols::constant_type))]
    ConstantType { name: String, expected: DataType },
}

/// Failure lowering one expression. See [`ExpressionError::is_invariant_violation`].
#[derive(Debug, Error, Diagnostic)]
#[allow(unused_assignments)]
pub enum ExpressionError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Parse(#[from] SyntaxError),

    #[error("unknown identifier `{name}`")]
    #[diagnostic(
        code(fnexpr::unresolved_identifier),
        help("declare it as a variable or register a constant with that name")
    )]
    UnresolvedIdentifier {
        name: String,
        #[label("not a variable or constant")]
        span: Span,
    },

    #[error("variable `{name}` is declared more than once")]
    #[diagnostic(code(fnexpr::duplicate_variable))]
    DuplicateVariable { name: String },

    #[error("expression contains an error node")]
    #[diagnostic(code(fnexpr::error_node))]
    ErrorNode {
        #[label("unparsed here")]
        span: Span,
    },

    #[error("no overload of `{name}` accepts ({})", display_types(.arg_types))]
    #[diagnostic(code(fnexpr::no_matching_overload))]
    NoMatchingOverload {
        name: String,
        arg_types: Vec<DataType>,
        candidates: Vec<String>,
        #[help]
        hint: String,
        #[label]
        span: Span,
    },

    #[error("`{name}` is not implemented")]
    #[diagnostic(code(fnexpr::not_implemented))]
    NotImplemented {
        name: String,
        #[label]
        span: Span,
    },

    #[error("{ty} has no attribute `{name}`")]
    #[diagnostic(code(fnexpr::missing_attribute))]
    MissingAttribute {
        ty: DataType,
        name: String,
        #[label]
        span: Span,
    },

    #[error("{ty} has no method `{name}`")]
    #[diagnostic(code(fnexpr::missing_method))]
    MissingMethod {
        ty: DataType,
        name: String,
        #[label]
        span: Span,
    },

    #[error("`{name}` takes {expected} arguments, {actual} given")]
    #[diagnostic(code(fnexpr::arity_mismatch))]
    ArityMismatch {
        name: String,
        expected: usize,
        actual: usize,
        #[label]
        span: Span,
    },

    #[error("no conversion from {from} to {to}")]
    #[diagnostic(code(fnexpr::missing_conversion))]
    MissingConversion {
        from: DataType,
        to: DataType,
        #[label("converted from here")]
        span: Span,
    },

    #[error(transparent)]
    #[diagnostic(transparent)]
    Network(#[from] NetworkError),
}

impl ExpressionError {
    /// `true` for failures a well-formed expression against a complete
    /// symbol table should never hit; `false` for ordinary user mistakes.
    pub fn is_invariant_violation(&self) -> bool {
        match self {
            ExpressionError::Parse(_)
            | ExpressionError::UnresolvedIdentifier { .. }
            | ExpressionError::DuplicateVariable { .. } => false,
            ExpressionError::ErrorNode { .. }
            | ExpressionError::NoMatchingOverload { .. }
            | ExpressionError::NotImplemented { .. }
            | ExpressionError::MissingAttribute { .. }
            | ExpressionError::MissingMethod { .. }
            | ExpressionError::ArityMismatch { .. }
            | ExpressionError::MissingConversion { .. }
            | ExpressionError::Network(_) => true,
        }
    }

    pub fn span(&self) -> Option<Span> {
        match self {
            ExpressionError::Parse(e) => Some(e.span()),
            ExpressionError::UnresolvedIdentifier { span, .. }
            | ExpressionError::ErrorNode { span }
            | ExpressionError::NoMatchingOverload { span, .. }
            | ExpressionError::NotImplemented { span, .. }
            | ExpressionError::MissingAttribute { span, .. }
            | ExpressionError::MissingMethod { span, .. }
            | ExpressionError::ArityMismatch { span, .. }
            | ExpressionError::MissingConversion { span, .. } => Some(*span),
            ExpressionError::DuplicateVariable { .. } | ExpressionError::Network(_) => None,
        }
    }
}

fn display_types(types: &[DataType]) -> String {
    types
        .iter()
        .map(DataType::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

pub(crate) fn candidates_help(candidates: &[String]) -> String {
    if candidates.is_empty() {
        "no function with this name is registered".to_string()
    } else {
        format!("candidates:\n  {}", candidates.join("\n  "))
    }
}
