//! Recursive-descent parser for binding expressions.

use std::rc::Rc;

use super::ast::{BinaryOp, Expr, FunctionDef, LogicalOp, Stmt, UnaryOp};
use super::lexer::{tokenize, Token, TokenKind};
use super::ExprError;

/// Parse a complete expression. Trailing input is an error.
pub fn parse(source: &str) -> Result<Expr, ExprError> {
    let mut parser = Parser::new(tokenize(source)?);
    let expr = parser.parse_expression()?;
    parser.expect_end()?;
    Ok(expr)
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn new(tokens: Vec<Token>) -> Self {
        Self { tokens, pos: 0 }
    }

    // ------------------------------------------------------------------------
    // Expressions
    // ------------------------------------------------------------------------

    fn parse_expression(&mut self) -> Result<Expr, ExprError> {
        self.parse_assignment()
    }

    fn parse_assignment(&mut self) -> Result<Expr, ExprError> {
        let offset = self.peek().offset;
        let target = self.parse_conditional()?;
        if self.eat("=") {
            if !target.is_assignable() {
                return Err(ExprError::UnexpectedToken {
                    found: "=".to_string(),
                    expected: "an assignable expression before '='".to_string(),
                    offset,
                });
            }
            let value = self.parse_assignment()?;
            return Ok(Expr::Assign(Box::new(target), Box::new(value)));
        }
        Ok(target)
    }

    fn parse_conditional(&mut self) -> Result<Expr, ExprError> {
        let condition = self.parse_or()?;
        if self.eat("?") {
            let then = self.parse_assignment()?;
            self.expect(":")?;
            let otherwise = self.parse_assignment()?;
            return Ok(Expr::Conditional(
                Box::new(condition),
                Box::new(then),
                Box::new(otherwise),
            ));
        }
        Ok(condition)
    }

    fn parse_or(&mut self) -> Result<Expr, ExprError> {
        let mut left = self.parse_and()?;
        while self.eat("||") {
            let right = self.parse_and()?;
            left = Expr::Logical(LogicalOp::Or, Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> Result<Expr, ExprError> {
        let mut left = self.parse_equality()?;
        while self.eat("&&") {
            let right = self.parse_equality()?;
            left = Expr::Logical(LogicalOp::And, Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_equality(&mut self) -> Result<Expr, ExprError> {
        self.parse_binary_level(
            &[
                ("===", BinaryOp::StrictEq),
                ("!==", BinaryOp::StrictNe),
                ("==", BinaryOp::LooseEq),
                ("!=", BinaryOp::LooseNe),
            ],
            Self::parse_relational,
        )
    }

    fn parse_relational(&mut self) -> Result<Expr, ExprError> {
        self.parse_binary_level(
            &[
                ("<=", BinaryOp::Le),
                (">=", BinaryOp::Ge),
                ("<", BinaryOp::Lt),
                (">", BinaryOp::Gt),
            ],
            Self::parse_additive,
        )
    }

    fn parse_additive(&mut self) -> Result<Expr, ExprError> {
        self.parse_binary_level(
            &[("+", BinaryOp::Add), ("-", BinaryOp::Sub)],
            Self::parse_multiplicative,
        )
    }

    fn parse_multiplicative(&mut self) -> Result<Expr, ExprError> {
        self.parse_binary_level(
            &[("*", BinaryOp::Mul), ("/", BinaryOp::Div), ("%", BinaryOp::Mod)],
            Self::parse_unary,
        )
    }

    fn parse_binary_level(
        &mut self,
        operators: &[(&str, BinaryOp)],
        next: fn(&mut Self) -> Result<Expr, ExprError>,
    ) -> Result<Expr, ExprError> {
        let mut left = next(self)?;
        'outer: loop {
            for (symbol, op) in operators {
                if self.eat(symbol) {
                    let right = next(self)?;
                    left = Expr::Binary(*op, Box::new(left), Box::new(right));
                    continue 'outer;
                }
            }
            return Ok(left);
        }
    }

    fn parse_unary(&mut self) -> Result<Expr, ExprError> {
        let op = if self.eat("!") {
            UnaryOp::Not
        } else if self.eat("-") {
            UnaryOp::Neg
        } else if self.eat("+") {
            UnaryOp::Plus
        } else {
            return self.parse_postfix();
        };
        let operand = self.parse_unary()?;
        Ok(Expr::Unary(op, Box::new(operand)))
    }

    fn parse_postfix(&mut self) -> Result<Expr, ExprError> {
        let mut expr = self.parse_primary()?;
        loop {
            if self.eat(".") {
                let name = self.expect_identifier()?;
                expr = Expr::Member(Box::new(expr), name);
            } else if self.eat("[") {
                let index = self.parse_expression()?;
                self.expect("]")?;
                expr = Expr::Index(Box::new(expr), Box::new(index));
            } else if self.eat("(") {
                let args = self.parse_list(")", Self::parse_expression)?;
                expr = Expr::Call(Box::new(expr), args);
            } else {
                return Ok(expr);
            }
        }
    }

    fn parse_primary(&mut self) -> Result<Expr, ExprError> {
        let token = self.advance();
        match token.kind {
            TokenKind::Number(n) => Ok(Expr::Number(n)),
            TokenKind::Str(s) => Ok(Expr::Str(s)),
            TokenKind::Ident(name) => Ok(match name.as_str() {
                "true" => Expr::Bool(true),
                "false" => Expr::Bool(false),
                "null" => Expr::Null,
                "undefined" => Expr::Undefined,
                "function" => self.parse_function()?,
                _ => Expr::Ident(name),
            }),
            TokenKind::Punct("(") => {
                let inner = self.parse_expression()?;
                self.expect(")")?;
                Ok(inner)
            }
            TokenKind::Punct("[") => Ok(Expr::Array(self.parse_list("]", Self::parse_expression)?)),
            TokenKind::Punct("{") => self.parse_object(),
            TokenKind::Eof => Err(ExprError::UnexpectedEnd {
                expected: "an expression".to_string(),
            }),
            TokenKind::Punct(_) => Err(ExprError::UnexpectedToken {
                found: token.describe(),
                expected: "an expression".to_string(),
                offset: token.offset,
            }),
        }
    }

    fn parse_object(&mut self) -> Result<Expr, ExprError> {
        let entries = self.parse_list("}", |parser| {
            let token = parser.advance();
            let key = match token.kind {
                TokenKind::Ident(name) => name,
                TokenKind::Str(s) => s,
                TokenKind::Number(n) => crate::value::Value::Number(n).to_string(),
                _ => {
                    return Err(parser.unexpected(&token, "a property name"));
                }
            };
            if parser.eat(":") {
                let value = parser.parse_expression()?;
                Ok((key, value))
            } else {
                // Shorthand `{name}` reads the variable of the same name.
                Ok((key.clone(), Expr::Ident(key)))
            }
        })?;
        Ok(Expr::Object(entries))
    }

    fn parse_function(&mut self) -> Result<Expr, ExprError> {
        // Optional name, ignored.
        if matches!(self.peek().kind, TokenKind::Ident(_)) {
            self.advance();
        }
        self.expect("(")?;
        let params = self.parse_list(")", Self::expect_identifier)?;
        self.expect("{")?;

        let mut body = Vec::new();
        loop {
            if self.eat("}") {
                break;
            }
            if self.eat(";") {
                continue;
            }
            if self.peek().kind == TokenKind::Ident("return".to_string()) {
                self.advance();
                let value = if self.check(";") || self.check("}") {
                    None
                } else {
                    Some(self.parse_expression()?)
                };
                body.push(Stmt::Return(value));
            } else {
                body.push(Stmt::Expr(self.parse_expression()?));
            }
        }

        Ok(Expr::Function(Rc::new(FunctionDef { params, body })))
    }

    /// Comma-separated items up to `close`, allowing a trailing comma.
    fn parse_list<T>(
        &mut self,
        close: &str,
        mut item: impl FnMut(&mut Self) -> Result<T, ExprError>,
    ) -> Result<Vec<T>, ExprError> {
        let mut items = Vec::new();
        loop {
            if self.eat(close) {
                return Ok(items);
            }
            items.push(item(self)?);
            if !self.eat(",") {
                self.expect(close)?;
                return Ok(items);
            }
        }
    }

    // ------------------------------------------------------------------------
    // Token helpers
    // ------------------------------------------------------------------------

    fn peek(&self) -> &Token {
        // The token stream always ends with Eof.
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn advance(&mut self) -> Token {
        let token = self.peek().clone();
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        token
    }

    fn check(&self, symbol: &str) -> bool {
        matches!(self.peek().kind, TokenKind::Punct(p) if p == symbol)
    }

    fn eat(&mut self, symbol: &str) -> bool {
        if self.check(symbol) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, symbol: &str) -> Result<(), ExprError> {
        if self.eat(symbol) {
            return Ok(());
        }
        let token = self.peek().clone();
        Err(self.unexpected(&token, &format!("'{symbol}'")))
    }

    fn expect_identifier(&mut self) -> Result<String, ExprError> {
        let token = self.advance();
        match token.kind {
            TokenKind::Ident(name) => Ok(name),
            _ => Err(self.unexpected(&token, "an identifier")),
        }
    }

    fn expect_end(&self) -> Result<(), ExprError> {
        let token = self.peek();
        match token.kind {
            TokenKind::Eof => Ok(()),
            _ => Err(self.unexpected(token, "end of input")),
        }
    }

    fn unexpected(&self, token: &Token, expected: &str) -> ExprError {
        match token.kind {
            TokenKind::Eof => ExprError::UnexpectedEnd {
                expected: expected.to_string(),
            },
            _ => ExprError::UnexpectedToken {
                found: token.describe(),
                expected: expected.to_string(),
                offset: token.offset,
            },
        }
    }
}
