#![forbid(unsafe_code)]

use fnexpr_ast::Span;

#[derive(Clone, Debug, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
}

#[derive(Clone, Debug, PartialEq)]
pub enum TokenKind {
    // Operators / punctuation
    EqEq,
    Lt,
    Gt,
    Le,
    Ge,

    Plus,
    Minus,
    Star,
    StarStar,
    Slash,

    Dot,
    Comma,

    LParen,
    RParen,

    Eof,

    // Literals / identifiers
    Ident(String),
    /// Unsigned magnitude; a leading `-` is a separate token.
    Int(u32),
    Float(f32),
    String(String),
}

impl TokenKind {
    /// Short human-readable form used in parse diagnostics.
    pub fn describe(&self) -> String {
        match self {
            TokenKind::EqEq => "'=='".to_string(),
            TokenKind::Lt => "'<'".to_string(),
            TokenKind::Gt => "'>'".to_string(),
            TokenKind::Le => "'<='".to_string(),
            TokenKind::Ge => "'>='".to_string(),
            TokenKind::Plus => "'+'".to_string(),
            TokenKind::Minus => "'-'".to_string(),
            TokenKind::Star => "'*'".to_string(),
            TokenKind::StarStar => "'**'".to_string(),
            TokenKind::Slash => "'/'".to_string(),
            TokenKind::Dot => "'.'".to_string(),
            TokenKind::Comma => "','".to_string(),
            TokenKind::LParen => "'('".to_string(),
            TokenKind::RParen => "')'".to_string(),
            TokenKind::Eof => "end of input".to_string(),
            TokenKind::Ident(name) => format!("identifier `{name}`"),
            TokenKind::Int(n) => format!("integer {n}"),
            TokenKind::Float(f) => format!("float {f}"),
            TokenKind::String(_) => "string literal".to_string(),
        }
    }
}
