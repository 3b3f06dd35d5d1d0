//! Node disposal.
//!
//! Anything tied to a node's lifetime (most importantly the computation that
//! keeps its directives up to date) registers a disposal callback here.
//! [`clean_node`] runs the callbacks of a node and of every node beneath it,
//! then drops their out-of-band data.

use std::cell::RefCell;

use tracing::trace;

use super::{data, Node};

const CALLBACKS_KEY: &str = "__disposal_callbacks__";

type Callback = Box<dyn FnOnce()>;

/// Run `callback` once when `node` is cleaned or removed.
pub fn add_disposal_callback<F>(node: &Node, callback: F)
where
    F: FnOnce() + 'static,
{
    match data::get::<RefCell<Vec<Callback>>>(node, CALLBACKS_KEY) {
        Some(callbacks) => callbacks.borrow_mut().push(Box::new(callback)),
        None => data::set(node, CALLBACKS_KEY, RefCell::new(vec![Box::new(callback) as Callback])),
    }
}

/// Number of callbacks waiting on `node`.
pub fn pending_callbacks(node: &Node) -> usize {
    data::get::<RefCell<Vec<Callback>>>(node, CALLBACKS_KEY)
        .map(|callbacks| callbacks.borrow().len())
        .unwrap_or(0)
}

fn clean_single(node: &Node) {
    let callbacks = data::get::<RefCell<Vec<Callback>>>(node, CALLBACKS_KEY)
        .map(|callbacks| std::mem::take(&mut *callbacks.borrow_mut()))
        .unwrap_or_default();
    for callback in callbacks {
        callback();
    }
    data::clear(node);
}

/// Dispose `node` and its descendants without detaching it.
///
/// The node itself is cleaned first, then descendants in document order.
pub fn clean_node(node: &Node) {
    trace!(node = %node.id(), "cleaning node");
    let descendants = node.descendants();
    clean_single(node);
    for descendant in &descendants {
        clean_single(descendant);
    }
}

/// Dispose `node` and detach it from its parent.
pub fn remove_node(node: &Node) {
    clean_node(node);
    node.detach();
}
