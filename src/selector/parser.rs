//! Pratt parser producing the expression AST.

use super::ExprError;
use super::lexer::{Spanned, Token, tokenize};

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Expr {
    /// Field lookup against the context item.
    Field(String),
    /// `*`: every value of a mapping.
    Wildcard,
    /// Numeric path step (`rows.0`): positional index into the whole sequence.
    Index(usize),
    /// `$name`, `$` (context, empty name) or `$$` (root, name `$`).
    Variable(String),
    Number(f64),
    Str(String),
    Bool(bool),
    Null,
    /// `a.b.c`: each step after the first runs once per item of the previous result.
    Path(Vec<Expr>),
    /// `step[predicate]`
    Filter(Box<Expr>, Box<Expr>),
    Negate(Box<Expr>),
    Binary(BinOp, Box<Expr>, Box<Expr>),
    Condition(Box<Expr>, Box<Expr>, Option<Box<Expr>>),
    Array(Vec<Expr>),
    Object(Vec<(Expr, Expr)>),
    Call(String, Vec<Expr>),
    Lambda(Vec<String>, Box<Expr>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Concat,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    And,
    Or,
}

const BP_CONDITION: u8 = 20;
const BP_OR: u8 = 25;
const BP_AND: u8 = 30;
const BP_COMPARE: u8 = 40;
const BP_ADDITIVE: u8 = 50;
const BP_MULTIPLICATIVE: u8 = 60;
const BP_PREFIX: u8 = 70;
const BP_PATH: u8 = 75;
const BP_POSTFIX: u8 = 80;

/// Parse a full expression; trailing tokens are a syntax error.
pub(crate) fn parse(src: &str) -> Result<Expr, ExprError> {
    let tokens = tokenize(src)?;
    let mut parser = Parser {
        tokens,
        pos: 0,
        end: src.len(),
    };
    let expr = parser.expression(0)?;
    match parser.peek() {
        None => Ok(expr),
        Some(t) => Err(parser.error_at(t.pos, format!("unexpected {:?}", t.token))),
    }
}

struct Parser {
    tokens: Vec<Spanned>,
    pos: usize,
    end: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Spanned> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Result<Spanned, ExprError> {
        let t = self
            .tokens
            .get(self.pos)
            .cloned()
            .ok_or_else(|| self.error_at(self.end, "unexpected end of expression"))?;
        self.pos += 1;
        Ok(t)
    }

    fn eat(&mut self, token: &Token) -> bool {
        if self.peek().is_some_and(|t| &t.token == token) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, token: Token) -> Result<(), ExprError> {
        let t = self.next()?;
        if t.token == token {
            Ok(())
        } else {
            Err(self.error_at(t.pos, format!("expected {token:?}, found {:?}", t.token)))
        }
    }

    fn error_at(&self, position: usize, message: impl Into<String>) -> ExprError {
        ExprError::Syntax {
            position,
            message: message.into(),
        }
    }

    fn expression(&mut self, min_bp: u8) -> Result<Expr, ExprError> {
        let mut lhs = self.prefix()?;
        while let Some(bp) = self.peek().and_then(|t| infix_binding_power(&t.token)) {
            if bp <= min_bp {
                break;
            }
            lhs = self.infix(lhs, bp)?;
        }
        Ok(lhs)
    }

    fn prefix(&mut self) -> Result<Expr, ExprError> {
        let t = self.next()?;
        Ok(match t.token {
            Token::Name(name) => match name.as_str() {
                "true" => Expr::Bool(true),
                "false" => Expr::Bool(false),
                "null" => Expr::Null,
                "function" => self.lambda()?,
                // `function($v){ return expr }` is accepted; `return` is a no-op.
                "return" => self.expression(0)?,
                _ => Expr::Field(name),
            },
            Token::QuotedName(name) => Expr::Field(name),
            Token::Variable(name) => {
                if self.eat(&Token::LParen) {
                    let args = self.arguments()?;
                    Expr::Call(name, args)
                } else {
                    Expr::Variable(name)
                }
            }
            Token::Number(n) => Expr::Number(n),
            Token::Str(s) => Expr::Str(s),
            Token::Star => Expr::Wildcard,
            Token::Minus => Expr::Negate(Box::new(self.expression(BP_PREFIX)?)),
            Token::LParen => {
                let inner = self.expression(0)?;
                self.expect(Token::RParen)?;
                inner
            }
            Token::LBracket => {
                let mut items = Vec::new();
                if !self.eat(&Token::RBracket) {
                    loop {
                        items.push(self.expression(0)?);
                        if self.eat(&Token::RBracket) {
                            break;
                        }
                        self.expect(Token::Comma)?;
                    }
                }
                Expr::Array(items)
            }
            Token::LBrace => {
                let mut pairs = Vec::new();
                if !self.eat(&Token::RBrace) {
                    loop {
                        let key = self.expression(0)?;
                        self.expect(Token::Colon)?;
                        let value = self.expression(0)?;
                        pairs.push((key, value));
                        if self.eat(&Token::RBrace) {
                            break;
                        }
                        self.expect(Token::Comma)?;
                    }
                }
                Expr::Object(pairs)
            }
            other => return Err(self.error_at(t.pos, format!("unexpected {other:?}"))),
        })
    }

    fn infix(&mut self, lhs: Expr, bp: u8) -> Result<Expr, ExprError> {
        let t = self.next()?;
        Ok(match t.token {
            Token::Dot => {
                let step = match self.peek().map(|t| &t.token) {
                    Some(Token::Number(n)) if n.fract() == 0.0 && *n >= 0.0 => {
                        let idx = *n as usize;
                        self.pos += 1;
                        Expr::Index(idx)
                    }
                    _ => self.expression(BP_PATH)?,
                };
                match lhs {
                    Expr::Path(mut steps) => {
                        steps.push(step);
                        Expr::Path(steps)
                    }
                    first => Expr::Path(vec![first, step]),
                }
            }
            Token::LBracket => {
                let predicate = self.expression(0)?;
                self.expect(Token::RBracket)?;
                Expr::Filter(Box::new(lhs), Box::new(predicate))
            }
            Token::Question => {
                let then = self.expression(0)?;
                let otherwise = if self.eat(&Token::Colon) {
                    Some(Box::new(self.expression(BP_CONDITION)?))
                } else {
                    None
                };
                Expr::Condition(Box::new(lhs), Box::new(then), otherwise)
            }
            token => {
                let op = binary_op(&token)
                    .ok_or_else(|| self.error_at(t.pos, format!("unexpected {token:?}")))?;
                let rhs = self.expression(bp)?;
                Expr::Binary(op, Box::new(lhs), Box::new(rhs))
            }
        })
    }

    fn arguments(&mut self) -> Result<Vec<Expr>, ExprError> {
        let mut args = Vec::new();
        if self.eat(&Token::RParen) {
            return Ok(args);
        }
        loop {
            args.push(self.expression(0)?);
            if self.eat(&Token::RParen) {
                return Ok(args);
            }
            self.expect(Token::Comma)?;
        }
    }

    fn lambda(&mut self) -> Result<Expr, ExprError> {
        self.expect(Token::LParen)?;
        let mut params = Vec::new();
        if !self.eat(&Token::RParen) {
            loop {
                let t = self.next()?;
                match t.token {
                    Token::Variable(name) if !name.is_empty() => params.push(name),
                    other => {
                        return Err(self.error_at(t.pos, format!("expected parameter, found {other:?}")));
                    }
                }
                if self.eat(&Token::RParen) {
                    break;
                }
                self.expect(Token::Comma)?;
            }
        }
        self.expect(Token::LBrace)?;
        let body = self.expression(0)?;
        self.expect(Token::RBrace)?;
        Ok(Expr::Lambda(params, Box::new(body)))
    }
}

fn infix_binding_power(token: &Token) -> Option<u8> {
    Some(match token {
        Token::Dot => BP_PATH,
        Token::LBracket => BP_POSTFIX,
        Token::Question => BP_CONDITION,
        Token::Name(n) if n == "or" => BP_OR,
        Token::Name(n) if n == "and" => BP_AND,
        Token::Eq | Token::Ne | Token::Lt | Token::Le | Token::Gt | Token::Ge => BP_COMPARE,
        Token::Plus | Token::Minus | Token::Amp => BP_ADDITIVE,
        Token::Star | Token::Slash | Token::Percent => BP_MULTIPLICATIVE,
        _ => return None,
    })
}

fn binary_op(token: &Token) -> Option<BinOp> {
    Some(match token {
        Token::Plus => BinOp::Add,
        Token::Minus => BinOp::Sub,
        Token::Star => BinOp::Mul,
        Token::Slash => BinOp::Div,
        Token::Percent => BinOp::Mod,
        Token::Amp => BinOp::Concat,
        Token::Eq => BinOp::Eq,
        Token::Ne => BinOp::Ne,
        Token::Lt => BinOp::Lt,
        Token::Le => BinOp::Le,
        Token::Gt => BinOp::Gt,
        Token::Ge => BinOp::Ge,
        Token::Name(n) if n == "and" => BinOp::And,
        Token::Name(n) if n == "or" => BinOp::Or,
        _ => return None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn field(name: &str) -> Expr {
        Expr::Field(name.to_string())
    }

    #[test]
    fn dotted_paths_flatten_into_one_path() {
        assert_eq!(
            parse("a.b.0").unwrap(),
            Expr::Path(vec![field("a"), field("b"), Expr::Index(0)])
        );
    }

    #[test]
    fn predicates_bind_to_their_step() {
        assert_eq!(
            parse("library.books[price > 10]").unwrap(),
            Expr::Path(vec![
                field("library"),
                Expr::Filter(
                    Box::new(field("books")),
                    Box::new(Expr::Binary(
                        BinOp::Gt,
                        Box::new(field("price")),
                        Box::new(Expr::Number(10.0))
                    ))
                ),
            ])
        );
    }

    #[test]
    fn arithmetic_precedence() {
        assert_eq!(
            parse("1 + 2 * 3").unwrap(),
            Expr::Binary(
                BinOp::Add,
                Box::new(Expr::Number(1.0)),
                Box::new(Expr::Binary(
                    BinOp::Mul,
                    Box::new(Expr::Number(2.0)),
                    Box::new(Expr::Number(3.0))
                ))
            )
        );
    }

    #[test]
    fn lambdas_accept_return_keyword() {
        let parsed = parse("$map(xs, function($v, $i){ return $v.name })").unwrap();
        match parsed {
            Expr::Call(name, args) => {
                assert_eq!(name, "map");
                assert_eq!(
                    args[1],
                    Expr::Lambda(
                        vec!["v".into(), "i".into()],
                        Box::new(Expr::Path(vec![Expr::Variable("v".into()), field("name")]))
                    )
                );
            }
            other => panic!("expected call, got {other:?}"),
        }
    }

    #[test]
    fn syntax_errors() {
        assert!(parse("a.").is_err());
        assert!(parse("(a").is_err());
        assert!(parse("a b").is_err());
        assert!(parse("{\"k\" 1}").is_err());
    }
}
