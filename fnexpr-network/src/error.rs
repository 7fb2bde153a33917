#![forbid(unsafe_code)]

use miette::Diagnostic;
use thiserror::Error;

use crate::data_type::DataType;
use crate::network::{InputSocketId, NodeId, OutputSocketId};

/// Structural failures while building or validating a network.
#[derive(Debug, Error, Diagnostic, PartialEq, Eq)]
pub enum NetworkError {
    #[error("input socket {to:?} is already linked")]
    #[diagnostic(code(fnexpr::network::already_linked))]
    AlreadyLinked { to: InputSocketId },

    #[error("cannot link {from} output to {to} input")]
    #[diagnostic(
        code(fnexpr::network::type_mismatch),
        help("insert a conversion node between the two sockets")
    )]
    TypeMismatch { from: DataType, to: DataType },

    #[error("socket id out of range: {0}")]
    #[diagnostic(code(fnexpr::network::unknown_socket))]
    UnknownSocket(String),

    #[error("node {node:?} ({name}) has an unlinked input socket `{socket}`")]
    #[diagnostic(code(fnexpr::network::unlinked))]
    Unlinked {
        node: NodeId,
        name: String,
        socket: String,
    },

    #[error("socket {0:?} does not belong to an input node")]
    #[diagnostic(code(fnexpr::network::not_an_input))]
    NotAnInput(OutputSocketId),

    #[error("socket {0:?} is not consumed by an output node")]
    #[diagnostic(code(fnexpr::network::not_an_output))]
    NotAnOutput(InputSocketId),
}

/// Failures while executing a multi-function over a batch.
#[derive(Debug, Error, Diagnostic, PartialEq, Eq)]
pub enum EvalError {
    #[error("expected {expected} input buffers, got {actual}")]
    #[diagnostic(code(fnexpr::eval::input_count))]
    InputCount { expected: usize, actual: usize },

    #[error("parameter `{param}` expects {expected}, got {actual}")]
    #[diagnostic(code(fnexpr::eval::param_type))]
    ParamType {
        param: String,
        expected: DataType,
        actual: DataType,
    },

    #[error("parameter `{param}` holds {actual} elements, batch size is {expected}")]
    #[diagnostic(code(fnexpr::eval::param_len))]
    ParamLen {
        param: String,
        expected: usize,
        actual: usize,
    },

    #[error("parameter #{0} was not provided")]
    #[diagnostic(code(fnexpr::eval::missing_param))]
    MissingParam(usize),

    #[error("parameter #{index} is not {expected}")]
    #[diagnostic(code(fnexpr::eval::wrong_interface))]
    WrongInterface { index: usize, expected: &'static str },

    #[error("`{0}` did not produce all of its outputs")]
    #[diagnostic(code(fnexpr::eval::missing_output))]
    MissingOutput(String),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Network(#[from] NetworkError),
}
