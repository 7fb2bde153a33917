#![forbid(unsafe_code)]

use std::fmt::Write as _;

use crate::data_type::DataType;
use crate::network::{Network, NodeKind};

/// Human-readable listing of every node, its sockets and their origins.
pub fn dump(network: &Network) -> String {
    let mut out = String::new();
    for node in network.nodes() {
        let kind = match &node.kind {
            NodeKind::Function(_) => "fn",
            NodeKind::Input { .. } => "input",
            NodeKind::Output { .. } => "output",
            NodeKind::Dummy { .. } => "dummy",
        };
        let _ = writeln!(out, "n{} {kind} \"{}\"", node.id.0, node.name());
        for &input in &node.inputs {
            let socket = network.input_socket(input);
            let origin = match socket.origin {
                Some(origin) => {
                    let from = network.output_socket(origin);
                    format!("n{}.{}", from.node.0, from.name)
                }
                None => "<unlinked>".to_string(),
            };
            let _ = writeln!(out, "  in  {}: {} <- {origin}", socket.name, socket.data_type);
        }
        for &output in &node.outputs {
            let socket = network.output_socket(output);
            let _ = writeln!(
                out,
                "  out {}: {} ({} consumers)",
                socket.name,
                socket.data_type,
                socket.targets.len()
            );
        }
    }
    out
}

/// Shape of a network with ids replaced by creation order, for comparing two
/// independently built networks.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NetworkTopology {
    /// (name, input types, output types) per node.
    pub nodes: Vec<(String, Vec<DataType>, Vec<DataType>)>,
    /// ((node, output index), (node, input index)) per link.
    pub links: Vec<((u32, usize), (u32, usize))>,
}

pub fn topology(network: &Network) -> NetworkTopology {
    let nodes = network
        .nodes()
        .map(|node| {
            let inputs = node
                .inputs
                .iter()
                .map(|&s| network.input_socket(s).data_type)
                .collect();
            let outputs = node
                .outputs
                .iter()
                .map(|&s| network.output_socket(s).data_type)
                .collect();
            (node.name().to_string(), inputs, outputs)
        })
        .collect();
    let mut links: Vec<_> = network
        .input_sockets()
        .filter_map(|to| {
            let from = network.output_socket(to.origin?);
            Some(((from.node.0, from.index), (to.node.0, to.index)))
        })
        .collect();
    links.sort();
    NetworkTopology { nodes, links }
}
