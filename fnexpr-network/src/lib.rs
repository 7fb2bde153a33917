#![forbid(unsafe_code)]

pub mod custom;
pub mod data_type;
pub mod debug;
pub mod error;
pub mod evaluator;
pub mod multi_function;
pub mod network;
pub mod value;

pub use custom::*;
pub use data_type::*;
pub use debug::*;
pub use error::*;
pub use evaluator::*;
pub use multi_function::*;
pub use network::*;
pub use value::*;
