//! Tokens of the frame expression dialect.

use logos::Logos;

/// Token kinds of the frame expression dialect.
#[derive(Logos, Debug, Clone, Copy, PartialEq, Eq)]
#[logos(skip r"[ \t\r\n]+")]
pub enum TokenKind {
    #[token("->")]
    Arrow,
    #[token(".")]
    Dot,
    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token("+")]
    Plus,
    #[token("-")]
    Minus,
    #[token("*")]
    Star,
    #[token("/")]
    Slash,
    #[token("%")]
    Percent,
    #[token("==")]
    EqEq,
    #[token("!=")]
    NotEq,
    #[token("<")]
    Lt,
    #[token("<=")]
    LtEq,
    #[token(">")]
    Gt,
    #[token(">=")]
    GtEq,
    #[token("!")]
    Bang,
    #[token("&&")]
    AndAnd,
    #[token("||")]
    OrOr,

    #[token("true")]
    True,
    #[token("false")]
    False,
    #[token("null")]
    #[token("nullptr")]
    #[token("NULL")]
    Null,

    /// Decimal or `0x` hex integer.
    #[regex(r"[0-9]+")]
    #[regex(r"0[xX][0-9A-Fa-f]+")]
    Int,

    /// Decimal float with optional exponent.
    #[regex(r"[0-9]+\.[0-9]+([eE][+-]?[0-9]+)?")]
    Float,

    /// Double-quoted string without escapes.
    #[regex(r#""[^"\r\n]*""#)]
    Str,

    #[regex(r"[A-Za-z_][A-Za-z0-9_]*")]
    Ident,
}

/// A token with its byte span.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub start: usize,
    pub end: usize,
}

/// Tokenize `source`, failing at the first unrecognized character.
pub fn tokenize(source: &str) -> Result<Vec<Token>, usize> {
    let mut lexer = TokenKind::lexer(source);
    let mut tokens = Vec::new();
    while let Some(kind) = lexer.next() {
        let span = lexer.span();
        let kind = kind.map_err(|()| span.start)?;
        tokens.push(Token {
            kind,
            start: span.start,
            end: span.end,
        });
    }
    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        tokenize(source)
            .unwrap()
            .into_iter()
            .map(|token| token.kind)
            .collect()
    }

    #[test]
    fn arrow_is_one_token() {
        assert_eq!(
            kinds("this -> mid"),
            [TokenKind::Ident, TokenKind::Arrow, TokenKind::Ident]
        );
        assert_eq!(
            kinds("a - -1"),
            [TokenKind::Ident, TokenKind::Minus, TokenKind::Minus, TokenKind::Int]
        );
    }

    #[test]
    fn numbers_and_keywords() {
        assert_eq!(
            kinds("0x1f 2.5e3 nullptr truest"),
            [TokenKind::Int, TokenKind::Float, TokenKind::Null, TokenKind::Ident]
        );
    }

    #[test]
    fn reports_offset_of_bad_character() {
        assert_eq!(tokenize("a @ b"), Err(2));
    }
}
