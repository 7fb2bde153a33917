#![forbid(unsafe_code)]

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use crate::data_type::DataType;
use crate::error::NetworkError;
use crate::multi_function::{MultiFunction, ParamInterface};

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(pub u32);

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct InputSocketId(pub u32);

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct OutputSocketId(pub u32);

pub enum NodeKind {
    Function(Arc<dyn MultiFunction>),
    /// Entry point for a bound variable; one output socket.
    Input { name: String },
    /// Designated result; one input socket.
    Output { name: String },
    /// Placeholder without behavior.
    Dummy { name: String },
}

impl fmt::Debug for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeKind::Function(function) => write!(f, "Function({})", function.signature()),
            NodeKind::Input { name } => write!(f, "Input({name})"),
            NodeKind::Output { name } => write!(f, "Output({name})"),
            NodeKind::Dummy { name } => write!(f, "Dummy({name})"),
        }
    }
}

/// How one signature param of a function node maps onto its sockets.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ParamSocket {
    Input(InputSocketId),
    Output(OutputSocketId),
    Mutable(InputSocketId, OutputSocketId),
}

#[derive(Debug)]
pub struct Node {
    pub id: NodeId,
    pub kind: NodeKind,
    pub inputs: Vec<InputSocketId>,
    pub outputs: Vec<OutputSocketId>,
    /// One entry per signature param; empty for non-function nodes.
    pub params: Vec<ParamSocket>,
}

impl Node {
    pub fn name(&self) -> &str {
        match &self.kind {
            NodeKind::Function(function) => function.name(),
            NodeKind::Input { name } | NodeKind::Output { name } | NodeKind::Dummy { name } => name,
        }
    }

    pub fn function(&self) -> Option<&Arc<dyn MultiFunction>> {
        match &self.kind {
            NodeKind::Function(function) => Some(function),
            _ => None,
        }
    }

    pub fn is_function(&self) -> bool {
        matches!(self.kind, NodeKind::Function(_))
    }
}

#[derive(Clone, Debug)]
pub struct InputSocket {
    pub id: InputSocketId,
    pub node: NodeId,
    /// Position among the node's inputs.
    pub index: usize,
    pub name: String,
    pub data_type: DataType,
    pub origin: Option<OutputSocketId>,
}

#[derive(Clone, Debug)]
pub struct OutputSocket {
    pub id: OutputSocketId,
    pub node: NodeId,
    pub index: usize,
    pub name: String,
    pub data_type: DataType,
    pub targets: Vec<InputSocketId>,
}

/// Dataflow graph of multi-function nodes. Nodes and sockets live in flat
/// arenas and are never removed, so ids stay valid for the network's lifetime.
///
/// Accessors index directly and panic on ids from another network.
#[derive(Debug, Default)]
pub struct Network {
    nodes: Vec<Node>,
    inputs: Vec<InputSocket>,
    outputs: Vec<OutputSocket>,
    link_count: usize,
}

impl Network {
    pub fn new() -> Self {
        Self::default()
    }

    fn push_node(
        &mut self,
        kind: NodeKind,
        inputs: &[(String, DataType)],
        outputs: &[(String, DataType)],
    ) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        let input_ids = inputs
            .iter()
            .enumerate()
            .map(|(index, (name, data_type))| {
                let socket = InputSocketId(self.inputs.len() as u32);
                self.inputs.push(InputSocket {
                    id: socket,
                    node: id,
                    index,
                    name: name.clone(),
                    data_type: *data_type,
                    origin: None,
                });
                socket
            })
            .collect();
        let output_ids = outputs
            .iter()
            .enumerate()
            .map(|(index, (name, data_type))| {
                let socket = OutputSocketId(self.outputs.len() as u32);
                self.outputs.push(OutputSocket {
                    id: socket,
                    node: id,
                    index,
                    name: name.clone(),
                    data_type: *data_type,
                    targets: Vec::new(),
                });
                socket
            })
            .collect();
        self.nodes.push(Node {
            id,
            kind,
            inputs: input_ids,
            outputs: output_ids,
            params: Vec::new(),
        });
        id
    }

    /// Adds a node whose sockets mirror `function`'s params: an input socket
    /// per input/mutable param and an output socket per output/mutable param,
    /// both in declaration order.
    pub fn add_function(&mut self, function: Arc<dyn MultiFunction>) -> NodeId {
        let signature = function.signature();
        let inputs: Vec<(String, DataType)> = signature
            .input_params()
            .map(|(_, p)| (p.name.clone(), p.param_type.data_type))
            .collect();
        let outputs: Vec<(String, DataType)> = signature
            .output_params()
            .map(|(_, p)| (p.name.clone(), p.param_type.data_type))
            .collect();
        let interfaces: Vec<ParamInterface> = signature
            .params
            .iter()
            .map(|p| p.param_type.interface)
            .collect();

        let id = self.push_node(NodeKind::Function(function), &inputs, &outputs);
        let node = &mut self.nodes[id.0 as usize];
        let mut next_in = node.inputs.iter().copied();
        let mut next_out = node.outputs.iter().copied();
        let mut params = Vec::with_capacity(interfaces.len());
        for interface in interfaces {
            let mapping = match interface {
                ParamInterface::Input => next_in.next().map(ParamSocket::Input),
                ParamInterface::Output => next_out.next().map(ParamSocket::Output),
                ParamInterface::Mutable => next_in
                    .next()
                    .zip(next_out.next())
                    .map(|(i, o)| ParamSocket::Mutable(i, o)),
            };
            // Socket lists were built from the same params.
            if let Some(mapping) = mapping {
                params.push(mapping);
            }
        }
        node.params = params;
        id
    }

    /// Adds an input node and returns its single output socket.
    pub fn add_input(&mut self, name: impl Into<String>, data_type: DataType) -> OutputSocketId {
        let name = name.into();
        let id = self.push_node(
            NodeKind::Input { name: name.clone() },
            &[],
            &[(name, data_type)],
        );
        self.nodes[id.0 as usize].outputs[0]
    }

    /// Adds an output node and returns its single input socket.
    pub fn add_output(&mut self, name: impl Into<String>, data_type: DataType) -> InputSocketId {
        let name = name.into();
        let id = self.push_node(
            NodeKind::Output { name: name.clone() },
            &[(name, data_type)],
            &[],
        );
        self.nodes[id.0 as usize].inputs[0]
    }

    pub fn add_dummy(
        &mut self,
        name: impl Into<String>,
        inputs: &[(String, DataType)],
        outputs: &[(String, DataType)],
    ) -> NodeId {
        self.push_node(NodeKind::Dummy { name: name.into() }, inputs, outputs)
    }

    pub fn add_link(&mut self, from: OutputSocketId, to: InputSocketId) -> Result<(), NetworkError> {
        let from_type = self
            .outputs
            .get(from.0 as usize)
            .ok_or_else(|| NetworkError::UnknownSocket(format!("{from:?}")))?
            .data_type;
        let target = self
            .inputs
            .get_mut(to.0 as usize)
            .ok_or_else(|| NetworkError::UnknownSocket(format!("{to:?}")))?;
        if target.origin.is_some() {
            return Err(NetworkError::AlreadyLinked { to });
        }
        if target.data_type != from_type {
            return Err(NetworkError::TypeMismatch {
                from: from_type,
                to: target.data_type,
            });
        }
        target.origin = Some(from);
        self.outputs[from.0 as usize].targets.push(to);
        self.link_count += 1;
        Ok(())
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0 as usize]
    }

    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.iter()
    }

    pub fn input_socket(&self, id: InputSocketId) -> &InputSocket {
        &self.inputs[id.0 as usize]
    }

    pub fn output_socket(&self, id: OutputSocketId) -> &OutputSocket {
        &self.outputs[id.0 as usize]
    }

    pub fn get_input_socket(&self, id: InputSocketId) -> Option<&InputSocket> {
        self.inputs.get(id.0 as usize)
    }

    pub fn get_output_socket(&self, id: OutputSocketId) -> Option<&OutputSocket> {
        self.outputs.get(id.0 as usize)
    }

    pub fn input_sockets(&self) -> impl Iterator<Item = &InputSocket> {
        self.inputs.iter()
    }

    pub fn output_sockets(&self) -> impl Iterator<Item = &OutputSocket> {
        self.outputs.iter()
    }

    /// The `index`-th input socket of `node`.
    pub fn node_input(&self, node: NodeId, index: usize) -> Option<InputSocketId> {
        self.node(node).inputs.get(index).copied()
    }

    pub fn node_output(&self, node: NodeId, index: usize) -> Option<OutputSocketId> {
        self.node(node).outputs.get(index).copied()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn function_node_count(&self) -> usize {
        self.nodes.iter().filter(|n| n.is_function()).count()
    }

    pub fn link_count(&self) -> usize {
        self.link_count
    }

    /// Nodes feeding `sockets`, dependencies before dependents. Unlinked
    /// sockets are skipped.
    pub fn find_dependencies(&self, sockets: &[InputSocketId]) -> Vec<NodeId> {
        let mut visited = HashSet::new();
        let mut order = Vec::new();
        for &socket in sockets {
            if let Some(origin) = self.input_socket(socket).origin {
                self.visit_postorder(self.output_socket(origin).node, &mut visited, &mut order);
            }
        }
        order
    }

    fn visit_postorder(&self, node: NodeId, visited: &mut HashSet<NodeId>, order: &mut Vec<NodeId>) {
        if !visited.insert(node) {
            return;
        }
        for &input in &self.node(node).inputs {
            if let Some(origin) = self.input_socket(input).origin {
                self.visit_postorder(self.output_socket(origin).node, visited, order);
            }
        }
        order.push(node);
    }

    /// Every input socket reachable backwards from `sockets` must have an
    /// origin.
    pub fn check_linked(&self, sockets: &[InputSocketId]) -> Result<(), NetworkError> {
        let mut visited = HashSet::new();
        let mut stack: Vec<InputSocketId> = sockets.to_vec();
        while let Some(id) = stack.pop() {
            let socket = self.input_socket(id);
            let Some(origin) = socket.origin else {
                let node = self.node(socket.node);
                return Err(NetworkError::Unlinked {
                    node: node.id,
                    name: node.name().to_string(),
                    socket: socket.name.clone(),
                });
            };
            let upstream = self.output_socket(origin).node;
            if visited.insert(upstream) {
                stack.extend(self.node(upstream).inputs.iter().copied());
            }
        }
        Ok(())
    }
}
