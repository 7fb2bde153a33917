#![forbid(unsafe_code)]

mod lexer;
mod token;

pub use lexer::{LexError, Lexer, MAX_INT_MAGNITUDE};
pub use token::{Token, TokenKind};

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(src: &str) -> Vec<TokenKind> {
        Lexer::new(src)
            .lex()
            .unwrap()
            .into_iter()
            .map(|t| t.kind)
            .collect()
    }

    #[test]
    fn lex_operators_prefer_longest_match() {
        assert_eq!(
            kinds("a ** b * c <= d == e"),
            vec![
                TokenKind::Ident("a".into()),
                TokenKind::StarStar,
                TokenKind::Ident("b".into()),
                TokenKind::Star,
                TokenKind::Ident("c".into()),
                TokenKind::Le,
                TokenKind::Ident("d".into()),
                TokenKind::EqEq,
                TokenKind::Ident("e".into()),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn lex_int_literals_with_bases_and_underscores() {
        let ints: Vec<u32> = kinds("1_000 0b1010_0110 0o755 0x7FFF_FFFF")
            .into_iter()
            .filter_map(|k| match k {
                TokenKind::Int(n) => Some(n),
                _ => None,
            })
            .collect();
        assert_eq!(ints, vec![1000, 0b1010_0110, 0o755, 0x7FFF_FFFF]);
    }

    #[test]
    fn lex_rejects_int_out_of_range() {
        assert_eq!(kinds("2147483648")[0], TokenKind::Int(MAX_INT_MAGNITUDE));
        let err = Lexer::new("2147483649").lex().unwrap_err();
        assert!(err.message.contains("invalid integer literal"));
        assert!(Lexer::new("0x1_0000_0000").lex().is_err());
    }

    #[test]
    fn lex_float_forms() {
        assert_eq!(
            kinds("1.5 .25 2e3 1.0e-1"),
            vec![
                TokenKind::Float(1.5),
                TokenKind::Float(0.25),
                TokenKind::Float(2000.0),
                TokenKind::Float(0.1),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn lex_attribute_access_is_not_a_float() {
        assert_eq!(
            kinds("v.x"),
            vec![
                TokenKind::Ident("v".into()),
                TokenKind::Dot,
                TokenKind::Ident("x".into()),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn lex_string_escapes_are_strict() {
        let tokens = kinds("\"a\\n\\t\\\"\\\\\"");
        assert_eq!(tokens[0], TokenKind::String("a\n\t\"\\".to_string()));

        let err = Lexer::new("\"\\q\"").lex().unwrap_err();
        assert!(err.message.contains("invalid string literal"));
    }

    #[test]
    fn lex_reports_span_of_unexpected_character() {
        let err = Lexer::new("1 + $").lex().unwrap_err();
        assert_eq!(err.message, "invalid token");
        assert_eq!(err.span.offset(), 4);
    }
}
