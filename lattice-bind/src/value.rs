//! Dynamic Values
//!
//! Binding expressions are dynamically typed. [`Value`] is the runtime
//! representation shared by the expression evaluator, the view models that
//! applications bind against, and the directive handlers.
//!
//! # Reference Semantics
//!
//! Arrays, objects, functions and cells are shared handles. Cloning a
//! `Value::Object` clones the handle, not the map, so a write through one
//! clone is visible through every other. Strict equality compares these
//! variants by identity.
//!
//! # Cells
//!
//! `Observable` wraps a writable [`Signal`] and `Computed` a read-only
//! [`Memo`]. Calling either with no arguments reads it, and calling an
//! observable with one argument writes it. [`Value::unwrap_observable`]
//! reads through cells and deferred wrappers so handlers see plain data.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;

use crate::dom::Node;
use crate::expr::ExprError;
use crate::reactive::{Memo, Signal};

/// A shared, mutable array.
pub type Array = Rc<RefCell<Vec<Value>>>;

/// A shared, mutable, insertion-ordered object.
pub type Object = Rc<RefCell<IndexMap<String, Value>>>;

type NativeFn = dyn Fn(&[Value]) -> Result<Value, ExprError>;

/// A callable value.
#[derive(Clone)]
pub struct Function(Rc<NativeFn>);

impl Function {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&[Value]) -> Result<Value, ExprError> + 'static,
    {
        Self(Rc::new(f))
    }

    pub fn call(&self, args: &[Value]) -> Result<Value, ExprError> {
        (self.0)(args)
    }

    pub fn ptr_eq(&self, other: &Function) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Function({:p})", Rc::as_ptr(&self.0) as *const ())
    }
}

/// A dynamically typed value.
#[derive(Clone, Default)]
pub enum Value {
    #[default]
    Undefined,
    Null,
    Bool(bool),
    Number(f64),
    String(String),
    Array(Array),
    Object(Object),
    /// A writable reactive cell.
    Observable(Signal<Value>),
    /// A read-only derived cell.
    Computed(Memo<Value>),
    Function(Function),
    /// An expression whose evaluation is postponed until it is unwrapped.
    Deferred(Function),
    /// A document node, as passed to event and render callbacks.
    Node(Node),
}

impl Value {
    // ------------------------------------------------------------------------
    // Constructors
    // ------------------------------------------------------------------------

    pub fn string(s: impl Into<String>) -> Self {
        Value::String(s.into())
    }

    pub fn array(items: impl IntoIterator<Item = Value>) -> Self {
        Value::Array(Rc::new(RefCell::new(items.into_iter().collect())))
    }

    pub fn object<K>(entries: impl IntoIterator<Item = (K, Value)>) -> Self
    where
        K: Into<String>,
    {
        Value::Object(Rc::new(RefCell::new(
            entries.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        )))
    }

    pub fn observable(initial: Value) -> Self {
        Value::Observable(Signal::new(initial))
    }

    pub fn computed<F>(compute: F) -> Self
    where
        F: Fn() -> Value + 'static,
    {
        Value::Computed(Memo::new(compute))
    }

    pub fn function<F>(f: F) -> Self
    where
        F: Fn(&[Value]) -> Result<Value, ExprError> + 'static,
    {
        Value::Function(Function::new(f))
    }

    /// Convert a JSON document into a value tree.
    ///
    /// Objects and arrays become fresh shared containers.
    pub fn from_json(json: &serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(*b),
            serde_json::Value::Number(n) => Value::Number(n.as_f64().unwrap_or(f64::NAN)),
            serde_json::Value::String(s) => Value::String(s.clone()),
            serde_json::Value::Array(items) => Value::array(items.iter().map(Value::from_json)),
            serde_json::Value::Object(map) => {
                Value::object(map.iter().map(|(k, v)| (k.clone(), Value::from_json(v))))
            }
        }
    }

    // ------------------------------------------------------------------------
    // Inspection
    // ------------------------------------------------------------------------

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Undefined => "undefined",
            Value::Null => "null",
            Value::Bool(_) => "boolean",
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::Array(_) => "array",
            Value::Object(_) => "object",
            Value::Observable(_) => "observable",
            Value::Computed(_) => "computed",
            Value::Function(_) => "function",
            Value::Deferred(_) => "deferred",
            Value::Node(_) => "node",
        }
    }

    pub fn is_nullish(&self) -> bool {
        matches!(self, Value::Undefined | Value::Null)
    }

    pub fn is_function(&self) -> bool {
        matches!(self, Value::Function(_))
    }

    pub fn is_writable_observable(&self) -> bool {
        matches!(self, Value::Observable(_))
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&Array> {
        match self {
            Value::Array(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&Object> {
        match self {
            Value::Object(map) => Some(map),
            _ => None,
        }
    }

    pub fn as_node(&self) -> Option<&Node> {
        match self {
            Value::Node(node) => Some(node),
            _ => None,
        }
    }

    /// Read a named property.
    ///
    /// Objects return the stored entry, arrays answer `length` and numeric
    /// indices, strings answer `length`. Everything else is undefined.
    pub fn get(&self, key: &str) -> Value {
        match self {
            Value::Object(map) => map.borrow().get(key).cloned().unwrap_or_default(),
            Value::Array(items) => {
                let items = items.borrow();
                if key == "length" {
                    Value::Number(items.len() as f64)
                } else {
                    key.parse::<usize>()
                        .ok()
                        .and_then(|i| items.get(i).cloned())
                        .unwrap_or_default()
                }
            }
            Value::String(s) if key == "length" => Value::Number(s.chars().count() as f64),
            _ => Value::Undefined,
        }
    }

    /// Write a named property on an object or an index of an array.
    ///
    /// Returns false when the target cannot hold properties.
    pub fn set(&self, key: &str, value: Value) -> bool {
        match self {
            Value::Object(map) => {
                map.borrow_mut().insert(key.to_string(), value);
                true
            }
            Value::Array(items) => match key.parse::<usize>() {
                Ok(index) => {
                    let mut items = items.borrow_mut();
                    if index >= items.len() {
                        items.resize(index + 1, Value::Undefined);
                    }
                    items[index] = value;
                    true
                }
                Err(_) => false,
            },
            _ => false,
        }
    }

    // ------------------------------------------------------------------------
    // Cells
    // ------------------------------------------------------------------------

    /// Read through cells and deferred wrappers until a plain value remains.
    ///
    /// Reads are tracked, so unwrapping inside a computation subscribes it.
    pub fn unwrap_observable(&self) -> Result<Value, ExprError> {
        let mut current = self.clone();
        loop {
            current = match current {
                Value::Observable(signal) => signal.get(),
                Value::Computed(memo) => memo.get(),
                Value::Deferred(f) => f.call(&[])?,
                plain => return Ok(plain),
            };
        }
    }

    /// Invoke a callable value.
    ///
    /// Observables read with no arguments and write their first argument
    /// otherwise.
    pub fn call(&self, args: &[Value]) -> Result<Value, ExprError> {
        match self {
            Value::Function(f) | Value::Deferred(f) => f.call(args),
            Value::Observable(signal) => match args.first() {
                None => Ok(signal.get()),
                Some(value) => {
                    signal.set(value.clone());
                    Ok(Value::Undefined)
                }
            },
            Value::Computed(memo) if args.is_empty() => Ok(memo.get()),
            other => Err(ExprError::NotCallable(other.type_name().to_string())),
        }
    }

    // ------------------------------------------------------------------------
    // Conversions
    // ------------------------------------------------------------------------

    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Undefined | Value::Null => false,
            Value::Bool(b) => *b,
            Value::Number(n) => *n != 0.0 && !n.is_nan(),
            Value::String(s) => !s.is_empty(),
            _ => true,
        }
    }

    pub fn to_number(&self) -> f64 {
        match self {
            Value::Undefined => f64::NAN,
            Value::Null => 0.0,
            Value::Bool(b) => f64::from(u8::from(*b)),
            Value::Number(n) => *n,
            Value::String(s) => {
                let trimmed = s.trim();
                if trimmed.is_empty() {
                    0.0
                } else {
                    trimmed.parse().unwrap_or(f64::NAN)
                }
            }
            Value::Array(items) => {
                let items = items.borrow();
                match items.len() {
                    0 => 0.0,
                    1 => items[0].to_number(),
                    _ => f64::NAN,
                }
            }
            _ => f64::NAN,
        }
    }

    /// String conversion used for text content and attribute values.
    pub fn to_display_string(&self) -> String {
        self.to_string()
    }

    // ------------------------------------------------------------------------
    // Equality
    // ------------------------------------------------------------------------

    /// Identity for shared handles, value equality for primitives.
    pub fn strict_eq(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Undefined, Value::Undefined) | (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Array(a), Value::Array(b)) => Rc::ptr_eq(a, b),
            (Value::Object(a), Value::Object(b)) => Rc::ptr_eq(a, b),
            (Value::Observable(a), Value::Observable(b)) => a == b,
            (Value::Computed(a), Value::Computed(b)) => a == b,
            (Value::Function(a), Value::Function(b)) => a.ptr_eq(b),
            (Value::Deferred(a), Value::Deferred(b)) => a.ptr_eq(b),
            (Value::Node(a), Value::Node(b)) => a == b,
            _ => false,
        }
    }

    /// Equality with type coercion between primitives.
    pub fn loose_eq(&self, other: &Value) -> bool {
        match (self, other) {
            (a, b) if a.is_nullish() || b.is_nullish() => a.is_nullish() && b.is_nullish(),
            (Value::Bool(_), _) => Value::Number(self.to_number()).loose_eq(other),
            (_, Value::Bool(_)) => self.loose_eq(&Value::Number(other.to_number())),
            (Value::Number(a), Value::String(_)) => *a == other.to_number(),
            (Value::String(_), Value::Number(b)) => self.to_number() == *b,
            (Value::Array(_) | Value::Object(_), Value::Number(_) | Value::String(_)) => {
                Value::String(self.to_string()).loose_eq(other)
            }
            (Value::Number(_) | Value::String(_), Value::Array(_) | Value::Object(_)) => {
                self.loose_eq(&Value::String(other.to_string()))
            }
            _ => self.strict_eq(other),
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.strict_eq(other)
    }
}

fn format_number(n: f64) -> String {
    if n.is_nan() {
        "NaN".to_string()
    } else if n.is_infinite() {
        let sign = if n > 0.0 { "" } else { "-" };
        format!("{sign}Infinity")
    } else if n == n.trunc() && n.abs() < 1e21 {
        format!("{}", n as i64)
    } else {
        format!("{n}")
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Undefined => f.write_str("undefined"),
            Value::Null => f.write_str("null"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Number(n) => f.write_str(&format_number(*n)),
            Value::String(s) => f.write_str(s),
            Value::Array(items) => {
                let parts: Vec<String> = items
                    .borrow()
                    .iter()
                    .map(|item| if item.is_nullish() { String::new() } else { item.to_string() })
                    .collect();
                f.write_str(&parts.join(","))
            }
            Value::Object(_) => f.write_str("[object Object]"),
            Value::Observable(signal) => write!(f, "{}", signal.get_untracked()),
            Value::Computed(_) => f.write_str("[computed]"),
            Value::Function(_) | Value::Deferred(_) => f.write_str("function"),
            Value::Node(node) => write!(f, "[node {}]", node.id()),
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Undefined => f.write_str("Undefined"),
            Value::Null => f.write_str("Null"),
            Value::Bool(b) => write!(f, "Bool({b})"),
            Value::Number(n) => write!(f, "Number({n})"),
            Value::String(s) => write!(f, "String({s:?})"),
            Value::Array(items) => f.debug_list().entries(items.borrow().iter()).finish(),
            Value::Object(map) => f.debug_map().entries(map.borrow().iter()).finish(),
            Value::Observable(signal) => write!(f, "Observable({:?})", signal.get_untracked()),
            Value::Computed(memo) => write!(f, "{memo:?}"),
            Value::Function(func) => write!(f, "{func:?}"),
            Value::Deferred(func) => write!(f, "Deferred({func:?})"),
            Value::Node(node) => write!(f, "Node({})", node.id()),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Number(f64::from(n))
    }
}

impl From<usize> for Value {
    fn from(n: usize) -> Self {
        Value::Number(n as f64)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}
