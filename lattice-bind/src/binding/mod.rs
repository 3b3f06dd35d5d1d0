//! Declarative Bindings
//!
//! This module turns directive tables written on nodes into live
//! computations:
//!
//! - `flags`: behavioural traits a directive declares
//! - `registry`: directive descriptors and lookup by name
//! - `parser`: splits a directive table into ordered entries
//! - `rewriter`: turns entries into an executable table literal
//! - `context`: the scope chain a table is evaluated in
//! - `provider`: finds and evaluates a node's table
//! - `engine`: the per-node init/update protocol and the tree walk

pub mod context;
pub mod engine;
pub mod flags;
pub mod parser;
pub mod provider;
pub mod registry;
pub mod rewriter;

pub use context::{BindingContext, ContextSlot};
pub use engine::{
    AllBindings, ApplyOutcome, BindingArgs, BindingSource, Engine, InitOutcome, ValueAccessor,
};
pub use flags::DirectiveFlags;
pub use parser::{parse_object_literal, ParsedEntry};
pub use registry::{Directive, Registry};
pub use rewriter::{
    insert_property_accessors, rewrite, write_value_to_property, PROPERTY_WRITERS_KEY,
};
