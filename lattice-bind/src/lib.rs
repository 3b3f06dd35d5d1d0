//! Lattice Bind
//!
//! A declarative binding engine for the Lattice reactive UI framework.
//! Nodes carry a directive table in an attribute (`data-bind` by default)
//! or in a `<!-- ko ... -->` comment, and the engine keeps the document in
//! step with the data those tables read. It implements:
//!
//! - Reactive primitives (signals, memos, effects)
//! - A parser and rewriter for directive tables
//! - Hierarchical binding contexts
//! - The two-phase apply algorithm, one effect per bound node
//! - A default directive set, including the control-flow family
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - `reactive`: Core reactive primitives and dependency tracking
//! - `scheduler`: The deferred task queue for `after<event>` writes
//! - `value`: Dynamic values that directive tables evaluate to
//! - `expr`: The expression language directive tables are written in
//! - `dom`: The document tree the engine binds
//! - `binding`: Registry, parser, rewriter, contexts and the engine
//! - `directives`: The default directives
//!
//! # Example
//!
//! ```rust
//! use lattice_bind::dom::markup::parse_element;
//! use lattice_bind::{Engine, Value};
//!
//! let engine = Engine::new();
//! let name = Value::observable(Value::from("Ann"));
//! let root = parse_element(r#"<p data-bind="text: name"></p>"#).unwrap();
//! engine
//!     .apply_bindings(Value::object([("name", name.clone())]), &root)
//!     .unwrap();
//! assert_eq!(root.text_content(), "Ann");
//!
//! // The paragraph follows the cell.
//! name.call(&[Value::from("Bo")]).unwrap();
//! assert_eq!(root.text_content(), "Bo");
//! ```

pub mod binding;
pub mod config;
pub mod directives;
pub mod dom;
pub mod error;
pub mod expr;
pub mod reactive;
pub mod scheduler;
pub mod value;

pub use binding::{
    AllBindings, BindingArgs, BindingContext, BindingSource, Directive, DirectiveFlags, Engine,
    InitOutcome, ValueAccessor,
};
pub use config::BindingConfig;
pub use dom::Node;
pub use error::{BindingError, Result};
pub use value::Value;
