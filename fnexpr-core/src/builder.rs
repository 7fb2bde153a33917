#![forbid(unsafe_code)]

use std::collections::HashMap;

use fnexpr_ast::{Expr, ExprKind, Ident, Span};
use fnexpr_network::{
    CustomMfConstant, CustomMfGenericConstant, DataType, InputSocketId, MfValue, Network, NodeId,
    NetworkError, OutputSocketId,
};
use tracing::{debug, trace};

use crate::error::{ExpressionError, candidates_help};
use crate::resources::ResourceCollector;
use crate::symbol_table::{FunctionRef, SymbolTable};

/// Counts gathered while lowering one expression.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct LoweringStats {
    pub nodes: usize,
    pub function_nodes: usize,
    pub links: usize,
    pub conversions: usize,
}

/// Lowers an AST into `network`, one node per operation, resolving names
/// against a read-only symbol table.
pub struct AstToNetworkBuilder<'a> {
    network: Network,
    symbols: &'a SymbolTable,
    resources: &'a mut ResourceCollector,
    variables: HashMap<String, OutputSocketId>,
    conversions: usize,
}

impl<'a> AstToNetworkBuilder<'a> {
    pub fn new(symbols: &'a SymbolTable, resources: &'a mut ResourceCollector) -> Self {
        Self {
            network: Network::new(),
            symbols,
            resources,
            variables: HashMap::new(),
            conversions: 0,
        }
    }

    /// Adds an input node for a free variable.
    pub fn declare_variable(&mut self, name: &str, data_type: DataType) -> Result<OutputSocketId, ExpressionError> {
        if self.variables.contains_key(name) {
            return Err(ExpressionError::DuplicateVariable {
                name: name.to_string(),
            });
        }
        let socket = self.network.add_input(name, data_type);
        self.variables.insert(name.to_string(), socket);
        Ok(socket)
    }

    pub fn network(&self) -> &Network {
        &self.network
    }

    pub fn network_mut(&mut self) -> &mut Network {
        &mut self.network
    }

    pub fn stats(&self) -> LoweringStats {
        LoweringStats {
            nodes: self.network.node_count(),
            function_nodes: self.network.function_node_count(),
            links: self.network.link_count(),
            conversions: self.conversions,
        }
    }

    pub fn into_network(self) -> Network {
        self.network
    }

    pub fn socket_type(&self, socket: OutputSocketId) -> DataType {
        self.network.output_socket(socket).data_type
    }

    /// Builds the nodes computing `expr` and returns the socket holding its value.
    pub fn build(&mut self, expr: &Expr) -> Result<OutputSocketId, ExpressionError> {
        match &expr.kind {
            ExprKind::Error => Err(ExpressionError::ErrorNode { span: expr.span }),
            ExprKind::Binary { left, op, right } => {
                let left = self.build(left)?;
                let right = self.build(right)?;
                self.insert_function(op.function_name(), &[left, right], expr.span)
            }
            ExprKind::Unary { op, expr: operand } => {
                let operand = self.build(operand)?;
                self.insert_function(op.function_name(), &[operand], expr.span)
            }
            ExprKind::IntLit(value) => self.insert_constant(*value),
            ExprKind::FloatLit(value) => self.insert_constant(*value),
            ExprKind::StringLit(value) => self.insert_constant(value.clone()),
            ExprKind::Ident(name) => self.insert_identifier(name),
            ExprKind::Call { name, args } => {
                let args = self.build_all(args)?;
                self.insert_function(&name.node, &args, expr.span)
            }
            ExprKind::Attribute { base, name } => {
                let base = self.build(base)?;
                self.insert_attribute(base, name)
            }
            ExprKind::MethodCall {
                receiver,
                name,
                args,
            } => {
                let receiver = self.build(receiver)?;
                let args = self.build_all(args)?;
                self.insert_method(receiver, name, &args, expr.span)
            }
        }
    }

    fn build_all(&mut self, exprs: &[Expr]) -> Result<Vec<OutputSocketId>, ExpressionError> {
        exprs.iter().map(|e| self.build(e)).collect()
    }

    fn insert_constant<T: MfValue>(&mut self, value: T) -> Result<OutputSocketId, ExpressionError> {
        let name = format!("constant {}", value.format());
        let function: FunctionRef = self.resources.construct(name, CustomMfConstant::new(value));
        Ok(self.add_node(function)?.1)
    }

    fn insert_identifier(&mut self, name: &Ident) -> Result<OutputSocketId, ExpressionError> {
        if let Some(&socket) = self.variables.get(&name.node) {
            return Ok(socket);
        }
        if let Some(value) = self.symbols.try_lookup_single_constant(&name.node) {
            let function: FunctionRef = self.resources.construct(
                format!("constant {}", name.node),
                CustomMfGenericConstant::new(value.clone()),
            );
            return Ok(self.add_node(function)?.1);
        }
        Err(ExpressionError::UnresolvedIdentifier {
            name: name.node.clone(),
            span: name.span,
        })
    }

    fn insert_attribute(&mut self, base: OutputSocketId, name: &Ident) -> Result<OutputSocketId, ExpressionError> {
        let symbols = self.symbols;
        let ty = self.socket_type(base);
        let Some(function) = symbols.try_lookup_attribute(ty, &name.node) else {
            return Err(ExpressionError::MissingAttribute {
                ty,
                name: name.node.clone(),
                span: name.span,
            });
        };
        let (node, output) = self.add_node(function.clone())?;
        let input = self.node_input(node, 0, &name.node, 1, 0, name.span)?;
        self.network.add_link(base, input)?;
        Ok(output)
    }

    fn insert_method(
        &mut self,
        receiver: OutputSocketId,
        name: &Ident,
        args: &[OutputSocketId],
        span: Span,
    ) -> Result<OutputSocketId, ExpressionError> {
        let symbols = self.symbols;
        let ty = self.socket_type(receiver);
        let Some(function) = symbols.try_lookup_method(ty, &name.node) else {
            return Err(ExpressionError::MissingMethod {
                ty,
                name: name.node.clone(),
                span: name.span,
            });
        };
        let expected = function.signature().input_count();
        if expected != args.len() + 1 {
            return Err(ExpressionError::ArityMismatch {
                name: name.node.clone(),
                expected: expected.saturating_sub(1),
                actual: args.len(),
                span,
            });
        }
        let (node, output) = self.add_node(function.clone())?;
        let receiver_input = self.node_input(node, 0, &name.node, expected, args.len(), span)?;
        self.network.add_link(receiver, receiver_input)?;
        for (i, &arg) in args.iter().enumerate() {
            let input = self.node_input(node, i + 1, &name.node, expected, args.len(), span)?;
            self.link_with_conversion(arg, input, span)?;
        }
        Ok(output)
    }

    /// Resolves the best overload of `name` for `args` and links them to a
    /// new node, converting where needed.
    pub fn insert_function(
        &mut self,
        name: &str,
        args: &[OutputSocketId],
        span: Span,
    ) -> Result<OutputSocketId, ExpressionError> {
        let symbols = self.symbols;
        let arg_types: Vec<DataType> = args.iter().map(|&s| self.socket_type(s)).collect();
        let candidates = symbols.lookup_function_candidates(name);

        let best = candidates
            .iter()
            .filter_map(|f| self.suitability(f, &arg_types).map(|score| (score, f)))
            .min_by_key(|(score, _)| *score);

        let Some((score, function)) = best else {
            if symbols.is_unsupported(name) {
                return Err(ExpressionError::NotImplemented {
                    name: name.to_string(),
                    span,
                });
            }
            let candidates: Vec<String> = candidates.iter().map(|f| f.signature().to_string()).collect();
            return Err(ExpressionError::NoMatchingOverload {
                name: name.to_string(),
                arg_types,
                hint: candidates_help(&candidates),
                candidates,
                span,
            });
        };
        debug!(
            function = name,
            overload = %function.signature(),
            conversions = score,
            "selected overload"
        );

        let (node, output) = self.add_node(function.clone())?;
        for (i, &arg) in args.iter().enumerate() {
            let input = self.node_input(node, i, name, args.len(), args.len(), span)?;
            self.link_with_conversion(arg, input, span)?;
        }
        Ok(output)
    }

    /// Number of conversions needed to call `function` with `arg_types`, or
    /// `None` if it cannot be called with them. Pure outputs are skipped.
    fn suitability(&self, function: &FunctionRef, arg_types: &[DataType]) -> Option<usize> {
        let signature = function.signature();
        if signature.input_count() != arg_types.len() || signature.output_count() == 0 {
            return None;
        }
        let mut conversions = 0;
        for ((_, param), &arg) in signature.input_params().zip(arg_types) {
            let wanted = param.param_type.data_type;
            if wanted == arg {
                continue;
            }
            if !self.symbols.can_convert(arg, wanted) {
                return None;
            }
            conversions += 1;
        }
        Some(conversions)
    }

    /// Returns `socket` itself when it already has type `to`, otherwise the
    /// output of one new converter node.
    pub fn insert_conversion(
        &mut self,
        socket: OutputSocketId,
        to: DataType,
        span: Span,
    ) -> Result<OutputSocketId, ExpressionError> {
        let from = self.socket_type(socket);
        if from == to {
            return Ok(socket);
        }
        let symbols = self.symbols;
        let Some(converter) = symbols.try_lookup_conversion(from, to) else {
            return Err(ExpressionError::MissingConversion { from, to, span });
        };
        trace!(%from, %to, "inserting conversion");
        let (node, output) = self.add_node(converter.clone())?;
        let input = self.node_input(node, 0, "conversion", 1, 1, span)?;
        self.network.add_link(socket, input)?;
        self.conversions += 1;
        Ok(output)
    }

    fn link_with_conversion(
        &mut self,
        from: OutputSocketId,
        to: InputSocketId,
        span: Span,
    ) -> Result<(), ExpressionError> {
        let wanted = self.network.input_socket(to).data_type;
        let converted = self.insert_conversion(from, wanted, span)?;
        self.network.add_link(converted, to)?;
        Ok(())
    }

    /// Adds a function node; returns it with its first output socket.
    fn add_node(&mut self, function: FunctionRef) -> Result<(NodeId, OutputSocketId), ExpressionError> {
        let node = self.network.add_function(function);
        let output = self.network.node_output(node, 0).ok_or_else(|| {
            let name = self.network.node(node).name();
            NetworkError::UnknownSocket(format!("`{name}` has no output socket"))
        })?;
        Ok((node, output))
    }

    fn node_input(
        &self,
        node: NodeId,
        index: usize,
        name: &str,
        expected: usize,
        actual: usize,
        span: Span,
    ) -> Result<InputSocketId, ExpressionError> {
        self.network
            .node_input(node, index)
            .ok_or_else(|| ExpressionError::ArityMismatch {
                name: name.to_string(),
                expected,
                actual,
                span,
            })
    }
}
