#![forbid(unsafe_code)]

pub mod builder;
pub mod builtins;
pub mod error;
pub mod expression;
pub mod resources;
pub mod symbol_table;

pub use builder::{AstToNetworkBuilder, LoweringStats};
pub use builtins::{UNSUPPORTED_FUNCTIONS, register_builtins};
pub use error::{ExpressionError, SymbolError};
pub use expression::{
    ExpressionNetwork, RESULT_NAME, expression_to_multi_function, expression_to_network, infer_expression_type,
};
pub use resources::ResourceCollector;
pub use symbol_table::{FunctionRef, SymbolTable};
