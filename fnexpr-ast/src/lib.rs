#![forbid(unsafe_code)]

use miette::SourceSpan;

pub type Span = SourceSpan;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Spanned<T> {
    pub span: Span,
    pub node: T,
}

impl<T> Spanned<T> {
    pub fn new(span: Span, node: T) -> Self {
        Self { span, node }
    }
}

pub fn span(start: usize, len: usize) -> Span {
    SourceSpan::new(start.into(), len)
}

pub fn span_between(start: usize, end: usize) -> Span {
    debug_assert!(end >= start);
    span(start, end - start)
}

pub type Ident = Spanned<String>;

#[derive(Clone, Debug, PartialEq)]
pub struct Expr {
    pub span: Span,
    pub kind: ExprKind,
}

#[derive(Clone, Debug, PartialEq)]
pub enum ExprKind {
    /// Placeholder left behind by the recovering parser.
    Error,
    Binary {
        left: Box<Expr>,
        op: BinOp,
        right: Box<Expr>,
    },
    Unary {
        op: UnaryOp,
        expr: Box<Expr>,
    },
    IntLit(i32),
    FloatLit(f32),
    StringLit(String),
    /// `name(args...)`
    Call {
        name: Ident,
        args: Vec<Expr>,
    },
    Ident(Ident),
    /// `base.name`
    Attribute {
        base: Box<Expr>,
        name: Ident,
    },
    /// `receiver.name(args...)`
    MethodCall {
        receiver: Box<Expr>,
        name: Ident,
        args: Vec<Expr>,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum UnaryOp {
    Neg,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BinOp {
    Lt,
    Gt,
    Eq,
    Le,
    Ge,

    Add,
    Sub,
    Mul,
    Div,
    Pow,
}

impl BinOp {
    /// Name under which the operator is registered in a symbol table.
    pub fn function_name(self) -> &'static str {
        match self {
            BinOp::Lt => "a<b",
            BinOp::Gt => "a>b",
            BinOp::Eq => "a==b",
            BinOp::Le => "a<=b",
            BinOp::Ge => "a>=b",
            BinOp::Add => "a+b",
            BinOp::Sub => "a-b",
            BinOp::Mul => "a*b",
            BinOp::Div => "a/b",
            BinOp::Pow => "a**b",
        }
    }

    pub fn symbol(self) -> &'static str {
        match self {
            BinOp::Lt => "<",
            BinOp::Gt => ">",
            BinOp::Eq => "==",
            BinOp::Le => "<=",
            BinOp::Ge => ">=",
            BinOp::Add => "+",
            BinOp::Sub => "-",
            BinOp::Mul => "*",
            BinOp::Div => "/",
            BinOp::Pow => "**",
        }
    }

    pub fn is_comparison(self) -> bool {
        matches!(
            self,
            BinOp::Lt | BinOp::Gt | BinOp::Eq | BinOp::Le | BinOp::Ge
        )
    }
}

impl UnaryOp {
    pub fn function_name(self) -> &'static str {
        match self {
            UnaryOp::Neg => "-a",
        }
    }
}

impl Expr {
    pub fn new(span: Span, kind: ExprKind) -> Self {
        Self { span, kind }
    }

    pub fn error(span: Span) -> Self {
        Self {
            span,
            kind: ExprKind::Error,
        }
    }

    /// Ordered child nodes. A method call lists its receiver first.
    pub fn children(&self) -> Vec<&Expr> {
        match &self.kind {
            ExprKind::Error
            | ExprKind::IntLit(_)
            | ExprKind::FloatLit(_)
            | ExprKind::StringLit(_)
            | ExprKind::Ident(_) => Vec::new(),
            ExprKind::Binary { left, right, .. } => vec![left.as_ref(), right.as_ref()],
            ExprKind::Unary { expr, .. } => vec![expr.as_ref()],
            ExprKind::Call { args, .. } => args.iter().collect(),
            ExprKind::Attribute { base, .. } => vec![base.as_ref()],
            ExprKind::MethodCall { receiver, args, .. } => {
                let mut out = Vec::with_capacity(args.len() + 1);
                out.push(receiver.as_ref());
                out.extend(args.iter());
                out
            }
        }
    }

    /// True if any node in the tree is an `Error` placeholder.
    pub fn contains_error(&self) -> bool {
        matches!(self.kind, ExprKind::Error) || self.children().into_iter().any(Expr::contains_error)
    }

    /// Number of nodes in the tree, including `self`.
    pub fn node_count(&self) -> usize {
        1 + self
            .children()
            .into_iter()
            .map(Expr::node_count)
            .sum::<usize>()
    }
}
