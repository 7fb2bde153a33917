#![forbid(unsafe_code)]
#![allow(unused_assignments)]

use fnexpr_ast::{span_between, Span};
use logos::Logos;
use miette::Diagnostic;
use thiserror::Error;

use crate::token::{Token, TokenKind};

#[derive(Debug, Error, Diagnostic)]
#[error("lex error: {message}")]
#[diagnostic(code(fnexpr::lex))]
#[allow(unused_assignments)]
pub struct LexError {
    pub message: String,
    #[label]
    pub span: Span,
}

#[derive(Logos, Debug, Clone, PartialEq)]
#[logos(skip r"[ \t\r\n\f]+")]
enum RawToken {
    #[token("==")]
    EqEq,
    #[token("<=")]
    Le,
    #[token(">=")]
    Ge,
    #[token("<")]
    Lt,
    #[token(">")]
    Gt,

    #[token("+")]
    Plus,
    #[token("-")]
    Minus,
    #[token("**")]
    StarStar,
    #[token("*")]
    Star,
    #[token("/")]
    Slash,

    #[token(".")]
    Dot,
    #[token(",")]
    Comma,

    #[token("(")]
    LParen,
    #[token(")")]
    RParen,

    #[regex(r"0b[01_]+", |lex| parse_int_prefixed(lex.slice(), 2, 2))]
    #[regex(r"0o[0-7_]+", |lex| parse_int_prefixed(lex.slice(), 8, 2))]
    #[regex(r"0x[0-9a-fA-F_]+", |lex| parse_int_prefixed(lex.slice(), 16, 2))]
    #[regex(r"[0-9][0-9_]*", |lex| parse_int_decimal(lex.slice()))]
    Int(Option<u32>),

    #[regex(r"[0-9][0-9_]*\.[0-9][0-9_]*([eE][+-]?[0-9]+)?", |lex| parse_float(lex.slice()))]
    #[regex(r"[0-9][0-9_]*[eE][+-]?[0-9]+", |lex| parse_float(lex.slice()))]
    #[regex(r"\.[0-9][0-9_]*([eE][+-]?[0-9]+)?", |lex| parse_float(lex.slice()))]
    Float(Option<f32>),

    /// `"..."` accepting only the escapes `\n \t \r \" \\`.
    #[regex(r#""([^"\\]|\\.)*""#, |lex| unescape(lex.slice()))]
    String(Option<String>),

    #[regex(r"[a-zA-Z_][a-zA-Z0-9_]*", |lex| lex.slice().to_string())]
    Ident(String),
}

/// Largest literal magnitude: `i32::MAX + 1`, which only fits once negated.
pub const MAX_INT_MAGNITUDE: u32 = 1 << 31;

fn parse_int_decimal(s: &str) -> Option<u32> {
    let digits = strip_underscores(s)?;
    digits.parse::<u32>().ok().filter(|&n| n <= MAX_INT_MAGNITUDE)
}

fn parse_int_prefixed(s: &str, radix: u32, prefix_len: usize) -> Option<u32> {
    let rest = s.get(prefix_len..)?;
    let digits = strip_underscores(rest)?;
    u32::from_str_radix(&digits, radix)
        .ok()
        .filter(|&n| n <= MAX_INT_MAGNITUDE)
}

fn parse_float(s: &str) -> Option<f32> {
    let digits = s.replace('_', "");
    let value = digits.parse::<f32>().ok()?;
    value.is_finite().then_some(value)
}

fn strip_underscores(s: &str) -> Option<String> {
    if s.is_empty() {
        return None;
    }
    if s.starts_with('_') || s.ends_with('_') || s.contains("__") {
        return None;
    }
    Some(s.replace('_', ""))
}

fn unescape(quoted: &str) -> Option<String> {
    let body = quoted.strip_prefix('"')?.strip_suffix('"')?;
    let mut out = String::with_capacity(body.len());
    let mut escaped = false;
    for c in body.chars() {
        if !escaped {
            if c == '\\' {
                escaped = true;
            } else {
                out.push(c);
            }
            continue;
        }
        escaped = false;
        out.push(match c {
            'n' => '\n',
            't' => '\t',
            'r' => '\r',
            '"' => '"',
            '\\' => '\\',
            _ => return None,
        });
    }
    (!escaped).then_some(out)
}

pub struct Lexer<'a> {
    src: &'a str,
}

impl<'a> Lexer<'a> {
    pub fn new(src: &'a str) -> Self {
        Self { src }
    }

    pub fn lex(&self) -> Result<Vec<Token>, LexError> {
        let mut tokens = Vec::new();
        let mut raw_tokens = RawToken::lexer(self.src);

        while let Some(raw) = raw_tokens.next() {
            let range = raw_tokens.span();
            let span = span_between(range.start, range.end);
            let invalid = |what: &str| LexError {
                message: format!("invalid {what}"),
                span,
            };

            let kind = match raw.map_err(|()| invalid("token"))? {
                RawToken::EqEq => TokenKind::EqEq,
                RawToken::Le => TokenKind::Le,
                RawToken::Ge => TokenKind::Ge,
                RawToken::Lt => TokenKind::Lt,
                RawToken::Gt => TokenKind::Gt,
                RawToken::Plus => TokenKind::Plus,
                RawToken::Minus => TokenKind::Minus,
                RawToken::StarStar => TokenKind::StarStar,
                RawToken::Star => TokenKind::Star,
                RawToken::Slash => TokenKind::Slash,
                RawToken::Dot => TokenKind::Dot,
                RawToken::Comma => TokenKind::Comma,
                RawToken::LParen => TokenKind::LParen,
                RawToken::RParen => TokenKind::RParen,
                RawToken::Ident(name) => TokenKind::Ident(name),
                RawToken::Int(value) => TokenKind::Int(value.ok_or_else(|| invalid("integer literal"))?),
                RawToken::Float(value) => TokenKind::Float(value.ok_or_else(|| invalid("float literal"))?),
                RawToken::String(value) => TokenKind::String(value.ok_or_else(|| invalid("string literal"))?),
            };
            tokens.push(Token { kind, span });
        }

        let end = self.src.len();
        tokens.push(Token {
            kind: TokenKind::Eof,
            span: span_between(end, end),
        });
        Ok(tokens)
    }
}
