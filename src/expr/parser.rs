//! Recursive-descent parser.
//!
//! Grammar (lowest to highest precedence):
//!
//! ```text
//! expr    := term (('+' | '-') term)*
//! term    := unary (('*' | '/') unary)*
//! unary   := ('+' | '-') unary | power
//! power   := primary ('^' unary)?          right-associative
//! primary := NUMBER | IDENT | IDENT '(' expr ')' | '(' expr ')'
//! ```
//!
//! `-x^2` therefore parses as `-(x^2)` and `2^-1` is accepted.
//! Only calls to functions in the supplied `FunctionSet` are accepted.
//! Trees deeper than [`MAX_DEPTH`] are rejected as syntax errors, which also
//! bounds the recursion of evaluation and differentiation.

use crate::error::ExprErrorKind;
use crate::expr::ast::{BinOp, Expr, Function, FunctionSet};
use crate::expr::lexer::{Token, TokenKind, tokenize};

/// Deepest tree (and parenthesis nesting) the parser accepts.
pub const MAX_DEPTH: usize = 256;

pub fn parse(input: &str, functions: &FunctionSet) -> Result<Expr, ExprErrorKind> {
    let tokens = tokenize(input)?;
    if tokens.is_empty() {
        return Err(ExprErrorKind::Syntax {
            offset: 0,
            message: "empty expression".to_string(),
        });
    }

    let mut parser = Parser {
        tokens,
        pos: 0,
        end: input.len(),
        nesting: 0,
        functions,
    };
    let parsed = parser.expr()?;
    if let Some(tok) = parser.peek() {
        return Err(ExprErrorKind::Syntax {
            offset: tok.offset,
            message: format!("unexpected {}", describe(&tok.kind)),
        });
    }
    Ok(parsed.expr)
}

/// A subtree together with its height.
struct Parsed {
    expr: Expr,
    depth: usize,
}

impl Parsed {
    fn leaf(expr: Expr) -> Self {
        Self { expr, depth: 1 }
    }
}

struct Parser<'f> {
    tokens: Vec<Token>,
    pos: usize,
    end: usize,
    nesting: usize,
    functions: &'f FunctionSet,
}

impl Parser<'_> {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<Token> {
        let tok = self.tokens.get(self.pos).cloned();
        if tok.is_some() {
            self.pos += 1;
        }
        tok
    }

    fn eat(&mut self, kind: &TokenKind) -> bool {
        if self.peek().map(|t| &t.kind) == Some(kind) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn offset(&self) -> usize {
        self.peek().map(|t| t.offset).unwrap_or(self.end)
    }

    fn too_deep(&self) -> ExprErrorKind {
        ExprErrorKind::Syntax {
            offset: self.offset(),
            message: "expression nested too deeply".to_string(),
        }
    }

    /// Wrap `expr` as a node of height `depth`, refusing trees past `MAX_DEPTH`.
    fn node(&self, expr: Expr, depth: usize) -> Result<Parsed, ExprErrorKind> {
        if depth > MAX_DEPTH {
            return Err(self.too_deep());
        }
        Ok(Parsed { expr, depth })
    }

    /// Run one level of recursive descent, bounding the parser's own stack.
    fn nested(&mut self, rule: fn(&mut Self) -> Result<Parsed, ExprErrorKind>) -> Result<Parsed, ExprErrorKind> {
        if self.nesting >= MAX_DEPTH {
            return Err(self.too_deep());
        }
        self.nesting += 1;
        let parsed = rule(self);
        self.nesting -= 1;
        parsed
    }

    fn binary(&self, op: BinOp, lhs: Parsed, rhs: Parsed) -> Result<Parsed, ExprErrorKind> {
        let depth = lhs.depth.max(rhs.depth) + 1;
        self.node(Expr::binary(op, lhs.expr, rhs.expr), depth)
    }

    fn expr(&mut self) -> Result<Parsed, ExprErrorKind> {
        let mut lhs = self.term()?;
        loop {
            let op = if self.eat(&TokenKind::Plus) {
                BinOp::Add
            } else if self.eat(&TokenKind::Minus) {
                BinOp::Sub
            } else {
                return Ok(lhs);
            };
            let rhs = self.term()?;
            lhs = self.binary(op, lhs, rhs)?;
        }
    }

    fn term(&mut self) -> Result<Parsed, ExprErrorKind> {
        let mut lhs = self.unary()?;
        loop {
            let op = if self.eat(&TokenKind::Star) {
                BinOp::Mul
            } else if self.eat(&TokenKind::Slash) {
                BinOp::Div
            } else {
                return Ok(lhs);
            };
            let rhs = self.unary()?;
            lhs = self.binary(op, lhs, rhs)?;
        }
    }

    fn unary(&mut self) -> Result<Parsed, ExprErrorKind> {
        if self.eat(&TokenKind::Minus) {
            let inner = self.nested(Self::unary)?;
            return self.node(Expr::Neg(Box::new(inner.expr)), inner.depth + 1);
        }
        if self.eat(&TokenKind::Plus) {
            return self.nested(Self::unary);
        }
        self.power()
    }

    fn power(&mut self) -> Result<Parsed, ExprErrorKind> {
        let base = self.primary()?;
        if self.eat(&TokenKind::Caret) {
            let exponent = self.nested(Self::unary)?;
            return self.binary(BinOp::Pow, base, exponent);
        }
        Ok(base)
    }

    fn primary(&mut self) -> Result<Parsed, ExprErrorKind> {
        let offset = self.offset();
        let Some(tok) = self.next() else {
            return Err(ExprErrorKind::Syntax {
                offset,
                message: "unexpected end of expression".to_string(),
            });
        };

        match tok.kind {
            TokenKind::Number(v) => Ok(Parsed::leaf(Expr::Num(v))),
            TokenKind::Ident(name) => {
                if !self.eat(&TokenKind::LParen) {
                    return Ok(Parsed::leaf(Expr::Var(name)));
                }
                let func = Function::from_name(&name)
                    .filter(|f| self.functions.contains(*f))
                    .ok_or_else(|| ExprErrorKind::UnknownFunction(name.clone()))?;
                let arg = self.nested(Self::expr)?;
                self.expect_rparen()?;
                self.node(
                    Expr::Call {
                        func,
                        arg: Box::new(arg.expr),
                    },
                    arg.depth + 1,
                )
            }
            TokenKind::LParen => {
                let inner = self.nested(Self::expr)?;
                self.expect_rparen()?;
                Ok(inner)
            }
            other => Err(ExprErrorKind::Syntax {
                offset: tok.offset,
                message: format!("unexpected {}", describe(&other)),
            }),
        }
    }

    fn expect_rparen(&mut self) -> Result<(), ExprErrorKind> {
        let offset = self.offset();
        if self.eat(&TokenKind::RParen) {
            Ok(())
        } else {
            Err(ExprErrorKind::Syntax {
                offset,
                message: "expected `)`".to_string(),
            })
        }
    }
}

fn describe(kind: &TokenKind) -> String {
    match kind {
        TokenKind::Number(v) => format!("number `{v}`"),
        TokenKind::Ident(name) => format!("identifier `{name}`"),
        TokenKind::Plus => "`+`".to_string(),
        TokenKind::Minus => "`-`".to_string(),
        TokenKind::Star => "`*`".to_string(),
        TokenKind::Slash => "`/`".to_string(),
        TokenKind::Caret => "`^`".to_string(),
        TokenKind::LParen => "`(`".to_string(),
        TokenKind::RParen => "`)`".to_string(),
    }
}
