#![forbid(unsafe_code)]

use std::borrow::Cow;
use std::collections::HashMap;

use tracing::trace;

use crate::error::{EvalError, NetworkError};
use crate::multi_function::{MfParams, MfSignature, MultiFunction};
use crate::network::{InputSocketId, Network, NodeKind, OutputSocketId, ParamSocket};
use crate::value::GenericArray;

/// Wraps a network into a single multi-function whose params are the given
/// input node sockets followed by the given output node sockets.
#[derive(Debug)]
pub struct NetworkEvaluator {
    network: Network,
    inputs: Vec<OutputSocketId>,
    outputs: Vec<InputSocketId>,
    signature: MfSignature,
}

type Cache<'a> = HashMap<OutputSocketId, Cow<'a, GenericArray>>;

impl NetworkEvaluator {
    pub fn new(
        network: Network,
        inputs: Vec<OutputSocketId>,
        outputs: Vec<InputSocketId>,
    ) -> Result<Self, NetworkError> {
        let mut builder = MfSignature::build("Expression");
        for &id in &inputs {
            let socket = network
                .get_output_socket(id)
                .ok_or_else(|| NetworkError::UnknownSocket(format!("{id:?}")))?;
            if !matches!(network.node(socket.node).kind, NodeKind::Input { .. }) {
                return Err(NetworkError::NotAnInput(id));
            }
            builder = builder.input(socket.name.clone(), socket.data_type);
        }
        for &id in &outputs {
            let socket = network
                .get_input_socket(id)
                .ok_or_else(|| NetworkError::UnknownSocket(format!("{id:?}")))?;
            if !matches!(network.node(socket.node).kind, NodeKind::Output { .. }) {
                return Err(NetworkError::NotAnOutput(id));
            }
            builder = builder.output(socket.name.clone(), socket.data_type);
        }
        network.check_linked(&outputs)?;

        Ok(Self {
            network,
            inputs,
            outputs,
            signature: builder.finish(),
        })
    }

    pub fn network(&self) -> &Network {
        &self.network
    }

    pub fn inputs(&self) -> &[OutputSocketId] {
        &self.inputs
    }

    pub fn outputs(&self) -> &[InputSocketId] {
        &self.outputs
    }

    /// Runs the network over `size` elements, one buffer per declared input.
    pub fn evaluate(&self, size: usize, inputs: &[GenericArray]) -> Result<Vec<GenericArray>, EvalError> {
        if inputs.len() != self.inputs.len() {
            return Err(EvalError::InputCount {
                expected: self.inputs.len(),
                actual: inputs.len(),
            });
        }
        let mut params = MfParams::new();
        for input in inputs {
            params.add_readonly_input(input);
        }
        for _ in &self.outputs {
            params.add_uninitialized_output();
        }
        self.call(size, &mut params)?;
        params
            .into_outputs()
            .into_iter()
            .skip(self.inputs.len())
            .map(|out| out.ok_or_else(|| EvalError::MissingOutput(self.name().to_string())))
            .collect()
    }

    fn compute<'a>(&self, socket: OutputSocketId, size: usize, cache: &mut Cache<'a>) -> Result<(), EvalError> {
        if cache.contains_key(&socket) {
            return Ok(());
        }
        let node = self.network.node(self.network.output_socket(socket).node);
        let function = match &node.kind {
            NodeKind::Function(function) => function,
            // Bound inputs are pre-seeded; anything else has no behavior.
            _ => return Err(EvalError::MissingOutput(node.name().to_string())),
        };

        for &input in &node.inputs {
            let origin = self.origin(input)?;
            self.compute(origin, size, cache)?;
        }

        let produced = {
            let mut params = MfParams::new();
            for &param in &node.params {
                match param {
                    ParamSocket::Input(input) => {
                        params.add_readonly_input(self.cached(input, cache)?);
                    }
                    ParamSocket::Output(_) => params.add_uninitialized_output(),
                    ParamSocket::Mutable(input, _) => {
                        params.add_mutable(self.cached(input, cache)?.clone());
                    }
                }
            }
            trace!(function = function.name(), size, "executing node");
            function.call(size, &mut params)?;
            params.into_outputs()
        };

        for (param, value) in node.params.iter().zip(produced) {
            let target = match *param {
                ParamSocket::Input(_) => continue,
                ParamSocket::Output(out) | ParamSocket::Mutable(_, out) => out,
            };
            let value = value.ok_or_else(|| EvalError::MissingOutput(function.name().to_string()))?;
            let expected = self.network.output_socket(target);
            if value.data_type() != expected.data_type {
                return Err(EvalError::ParamType {
                    param: expected.name.clone(),
                    expected: expected.data_type,
                    actual: value.data_type(),
                });
            }
            if value.len() != size {
                return Err(EvalError::ParamLen {
                    param: expected.name.clone(),
                    expected: size,
                    actual: value.len(),
                });
            }
            cache.insert(target, Cow::Owned(value));
        }
        Ok(())
    }

    fn origin(&self, input: InputSocketId) -> Result<OutputSocketId, EvalError> {
        let socket = self.network.input_socket(input);
        socket.origin.ok_or_else(|| {
            let node = self.network.node(socket.node);
            EvalError::Network(NetworkError::Unlinked {
                node: node.id,
                name: node.name().to_string(),
                socket: socket.name.clone(),
            })
        })
    }

    fn cached<'c>(&self, input: InputSocketId, cache: &'c Cache<'_>) -> Result<&'c GenericArray, EvalError> {
        let origin = self.origin(input)?;
        cache.get(&origin).map(|v| v.as_ref()).ok_or_else(|| {
            let node = self.network.node(self.network.output_socket(origin).node);
            EvalError::MissingOutput(node.name().to_string())
        })
    }
}

impl MultiFunction for NetworkEvaluator {
    fn signature(&self) -> &MfSignature {
        &self.signature
    }

    fn call(&self, size: usize, params: &mut MfParams<'_>) -> Result<(), EvalError> {
        let mut cache: Cache<'_> = HashMap::new();
        for (index, &socket) in self.inputs.iter().enumerate() {
            let array = params.readonly_input(index)?;
            let expected = self.network.output_socket(socket);
            if array.data_type() != expected.data_type {
                return Err(EvalError::ParamType {
                    param: expected.name.clone(),
                    expected: expected.data_type,
                    actual: array.data_type(),
                });
            }
            if array.len() != size {
                return Err(EvalError::ParamLen {
                    param: expected.name.clone(),
                    expected: size,
                    actual: array.len(),
                });
            }
            cache.insert(socket, Cow::Borrowed(array));
        }

        let mut results = Vec::with_capacity(self.outputs.len());
        for &output in &self.outputs {
            let origin = self.origin(output)?;
            self.compute(origin, size, &mut cache)?;
            let value = self.cached(output, &cache)?.clone();
            results.push(value);
        }

        let offset = self.inputs.len();
        for (i, value) in results.into_iter().enumerate() {
            params.set_output(offset + i, value)?;
        }
        Ok(())
    }
}
