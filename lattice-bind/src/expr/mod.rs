//! Binding Expression Language
//!
//! Directive tables are rewritten into source text of a small, dynamically
//! typed expression language and then evaluated against a scope. This module
//! implements that language: a lexer, a recursive-descent parser producing an
//! [`Expr`] tree, and a tree-walking evaluator.
//!
//! # Grammar (informal)
//!
//! ```text
//! expr        := assignment
//! assignment  := conditional ( "=" assignment )?
//! conditional := or ( "?" assignment ":" assignment )?
//! or          := and ( "||" and )*
//! and         := equality ( "&&" equality )*
//! equality    := relational ( ("==" | "!=" | "===" | "!==") relational )*
//! relational  := additive ( ("<" | "<=" | ">" | ">=") additive )*
//! additive    := multiplicative ( ("+" | "-") multiplicative )*
//! multiplicative := unary ( ("*" | "/" | "%") unary )*
//! unary       := ("!" | "-" | "+") unary | postfix
//! postfix     := primary ( "." ident | "[" expr "]" | "(" args ")" )*
//! primary     := literal | ident | array | object | function | "(" expr ")"
//! function    := "function" "(" params ")" "{" statement* "}"
//! statement   := "return" expr? ";"? | expr ";"?
//! ```
//!
//! # Name Resolution
//!
//! Identifiers resolve through a [`Scope`]. Unknown names are an error, not
//! `undefined`. The builtin `$lazy` wraps a zero-argument function into a
//! deferred value that is only evaluated when unwrapped.

pub mod ast;
mod eval;
mod lexer;
mod parser;

use std::cell::RefCell;
use std::rc::Rc;

use indexmap::IndexMap;
use thiserror::Error;

use crate::value::Value;

pub use ast::{BinaryOp, Expr, FunctionDef, LogicalOp, Stmt, UnaryOp};
pub use eval::eval;
pub use parser::parse;

/// Errors raised while lexing, parsing or evaluating an expression.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ExprError {
    #[error("unexpected character '{ch}' at offset {offset}")]
    UnexpectedChar { ch: char, offset: usize },

    #[error("unterminated string literal starting at offset {offset}")]
    UnterminatedString { offset: usize },

    #[error("unexpected token '{found}' at offset {offset}, expected {expected}")]
    UnexpectedToken {
        found: String,
        expected: String,
        offset: usize,
    },

    #[error("unexpected end of expression, expected {expected}")]
    UnexpectedEnd { expected: String },

    #[error("'{0}' is not defined")]
    UnknownIdentifier(String),

    #[error("{0} is not a function")]
    NotCallable(String),

    #[error("invalid assignment target")]
    InvalidAssignment,

    #[error("cannot read property '{property}' of {base}")]
    PropertyOfNullish { property: String, base: &'static str },

    #[error("{0}")]
    Thrown(String),
}

/// Name resolution for evaluation.
pub trait Scope {
    /// Resolve a name, or `None` if it is not bound in this scope.
    fn lookup(&self, name: &str) -> Option<Value>;

    /// Assign to a name. Returns false if the scope cannot hold it.
    fn assign(&self, name: &str, value: Value) -> bool;
}

/// A scope of local variables layered over a parent scope.
///
/// Function calls bind their parameters in one of these.
pub struct LocalScope {
    vars: RefCell<IndexMap<String, Value>>,
    parent: Option<Rc<dyn Scope>>,
}

impl LocalScope {
    pub fn new(parent: Option<Rc<dyn Scope>>) -> Self {
        Self {
            vars: RefCell::new(IndexMap::new()),
            parent,
        }
    }

    /// Bind a local variable, shadowing any outer binding.
    pub fn define(&self, name: impl Into<String>, value: Value) {
        self.vars.borrow_mut().insert(name.into(), value);
    }

    /// Builder form of [`LocalScope::define`].
    pub fn with(self, name: impl Into<String>, value: Value) -> Self {
        self.define(name, value);
        self
    }
}

impl Scope for LocalScope {
    fn lookup(&self, name: &str) -> Option<Value> {
        if let Some(value) = self.vars.borrow().get(name) {
            return Some(value.clone());
        }
        self.parent.as_ref().and_then(|parent| parent.lookup(name))
    }

    fn assign(&self, name: &str, value: Value) -> bool {
        let mut vars = self.vars.borrow_mut();
        if let Some(slot) = vars.get_mut(name) {
            *slot = value;
            return true;
        }
        drop(vars);
        match &self.parent {
            Some(parent) => parent.assign(name, value),
            None => {
                self.define(name, value);
                true
            }
        }
    }
}

/// Parse and evaluate `source` in `scope`.
pub fn evaluate(source: &str, scope: Rc<dyn Scope>) -> Result<Value, ExprError> {
    let expr = parse(source)?;
    eval(&expr, &scope)
}
