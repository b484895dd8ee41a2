use smol_str::SmolStr;
use tprobe_core::Value;

use crate::error::HostError;

use super::ast::{BinaryOp, Expr, UnaryOp};
use super::lexer::{tokenize, Token, TokenKind};

/// Deepest expression tree, and deepest parenthesis or unary nesting, accepted.
pub const MAX_DEPTH: usize = 128;

const TOO_DEEP: &str = "expression nested too deeply";

/// Parse one expression of the frame dialect.
pub fn parse_expression(source: &str) -> Result<Expr, HostError> {
    let tokens = tokenize(source).map_err(HostError::Lex)?;
    let mut parser = Parser {
        source,
        tokens,
        pos: 0,
        nesting: 0,
    };
    let expr = parser.or_expr()?;
    if let Some(token) = parser.peek() {
        return Err(parser.error_at(token.start, "unexpected trailing input"));
    }
    Ok(expr)
}

struct Parser<'src> {
    source: &'src str,
    tokens: Vec<Token>,
    pos: usize,
    nesting: usize,
}

impl<'src> Parser<'src> {
    fn peek(&self) -> Option<Token> {
        self.tokens.get(self.pos).copied()
    }

    fn bump(&mut self) -> Option<Token> {
        let token = self.peek()?;
        self.pos += 1;
        Some(token)
    }

    fn eat(&mut self, kind: TokenKind) -> bool {
        if self.peek().is_some_and(|token| token.kind == kind) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn text(&self, token: Token) -> &'src str {
        &self.source[token.start..token.end]
    }

    fn error_at(&self, offset: usize, message: &str) -> HostError {
        HostError::Syntax {
            offset,
            message: message.into(),
        }
    }

    fn end_offset(&self) -> usize {
        self.source.len()
    }

    fn offset(&self) -> usize {
        self.peek().map_or(self.end_offset(), |token| token.start)
    }

    /// Run `parse` one nesting level deeper, failing past [`MAX_DEPTH`].
    fn nested(
        &mut self,
        offset: usize,
        parse: impl FnOnce(&mut Self) -> Result<Expr, HostError>,
    ) -> Result<Expr, HostError> {
        if self.nesting >= MAX_DEPTH {
            return Err(self.error_at(offset, TOO_DEEP));
        }
        self.nesting += 1;
        let result = parse(self);
        self.nesting -= 1;
        result
    }

    fn checked(&self, expr: Expr, offset: usize) -> Result<Expr, HostError> {
        if expr.depth() > MAX_DEPTH {
            return Err(self.error_at(offset, TOO_DEEP));
        }
        Ok(expr)
    }

    fn binary_level(
        &mut self,
        next: fn(&mut Self) -> Result<Expr, HostError>,
        ops: &[(TokenKind, BinaryOp)],
    ) -> Result<Expr, HostError> {
        let mut left = next(self)?;
        'outer: loop {
            let offset = self.offset();
            for (kind, op) in ops {
                if self.eat(*kind) {
                    let right = next(self)?;
                    let expr = Expr::Binary {
                        op: *op,
                        left: Box::new(left),
                        right: Box::new(right),
                    };
                    left = self.checked(expr, offset)?;
                    continue 'outer;
                }
            }
            return Ok(left);
        }
    }

    fn or_expr(&mut self) -> Result<Expr, HostError> {
        self.binary_level(Self::and_expr, &[(TokenKind::OrOr, BinaryOp::Or)])
    }

    fn and_expr(&mut self) -> Result<Expr, HostError> {
        self.binary_level(Self::comparison, &[(TokenKind::AndAnd, BinaryOp::And)])
    }

    fn comparison(&mut self) -> Result<Expr, HostError> {
        self.binary_level(
            Self::additive,
            &[
                (TokenKind::EqEq, BinaryOp::Eq),
                (TokenKind::NotEq, BinaryOp::Ne),
                (TokenKind::LtEq, BinaryOp::Le),
                (TokenKind::Lt, BinaryOp::Lt),
                (TokenKind::GtEq, BinaryOp::Ge),
                (TokenKind::Gt, BinaryOp::Gt),
            ],
        )
    }

    fn additive(&mut self) -> Result<Expr, HostError> {
        self.binary_level(
            Self::multiplicative,
            &[
                (TokenKind::Plus, BinaryOp::Add),
                (TokenKind::Minus, BinaryOp::Sub),
            ],
        )
    }

    fn multiplicative(&mut self) -> Result<Expr, HostError> {
        self.binary_level(
            Self::unary,
            &[
                (TokenKind::Star, BinaryOp::Mul),
                (TokenKind::Slash, BinaryOp::Div),
                (TokenKind::Percent, BinaryOp::Mod),
            ],
        )
    }

    fn unary(&mut self) -> Result<Expr, HostError> {
        let offset = self.offset();
        let op = if self.eat(TokenKind::Minus) {
            UnaryOp::Neg
        } else if self.eat(TokenKind::Bang) {
            UnaryOp::Not
        } else {
            return self.postfix();
        };
        let expr = self.nested(offset, Self::unary)?;
        self.checked(
            Expr::Unary {
                op,
                expr: Box::new(expr),
            },
            offset,
        )
    }

    fn postfix(&mut self) -> Result<Expr, HostError> {
        let mut expr = self.primary()?;
        loop {
            let offset = self.offset();
            let deref = if self.eat(TokenKind::Dot) {
                false
            } else if self.eat(TokenKind::Arrow) {
                true
            } else {
                return Ok(expr);
            };
            let field = match self.bump() {
                Some(token) if token.kind == TokenKind::Ident => SmolStr::new(self.text(token)),
                Some(token) => return Err(self.error_at(token.start, "expected member name")),
                None => return Err(self.error_at(self.end_offset(), "expected member name")),
            };
            expr = self.checked(
                Expr::Member {
                    target: Box::new(expr),
                    field,
                    deref,
                },
                offset,
            )?;
        }
    }

    fn primary(&mut self) -> Result<Expr, HostError> {
        let Some(token) = self.bump() else {
            return Err(self.error_at(self.end_offset(), "expected expression"));
        };
        let text = self.text(token);
        match token.kind {
            TokenKind::Ident => Ok(Expr::Name(SmolStr::new(text))),
            TokenKind::True => Ok(Expr::Literal(Value::Bool(true))),
            TokenKind::False => Ok(Expr::Literal(Value::Bool(false))),
            TokenKind::Null => Ok(Expr::Literal(Value::Null)),
            TokenKind::Int => parse_int(text)
                .map(|value| Expr::Literal(Value::Int(value)))
                .ok_or_else(|| self.error_at(token.start, "integer literal out of range")),
            TokenKind::Float => text
                .parse::<f64>()
                .map(|value| Expr::Literal(Value::Float(value)))
                .map_err(|_| self.error_at(token.start, "invalid float literal")),
            TokenKind::Str => Ok(Expr::Literal(Value::Text(
                text[1..text.len() - 1].into(),
            ))),
            TokenKind::LParen => {
                let expr = self.nested(token.start, Self::or_expr)?;
                if !self.eat(TokenKind::RParen) {
                    return Err(self.error_at(self.offset(), "expected ')'"));
                }
                Ok(expr)
            }
            _ => Err(self.error_at(token.start, "expected expression")),
        }
    }
}

fn parse_int(text: &str) -> Option<i64> {
    match text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        Some(hex) => i64::from_str_radix(hex, 16).ok(),
        None => text.parse().ok(),
    }
}
