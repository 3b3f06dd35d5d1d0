//! Out-of-band node data.
//!
//! Binding state attached to a node (its stored context, disposal callbacks,
//! event listeners, saved content) is kept in a thread-local table keyed by
//! [`NodeId`] rather than on the node itself. Cleaning a node clears its
//! entry.

use std::any::Any;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use super::{Node, NodeId};

thread_local! {
    static STORE: RefCell<HashMap<NodeId, HashMap<&'static str, Rc<dyn Any>>>> =
        RefCell::new(HashMap::new());
}

/// Store a value under `key` for `node`, replacing any previous value.
pub fn set<T: 'static>(node: &Node, key: &'static str, value: T) {
    STORE.with(|store| {
        store
            .borrow_mut()
            .entry(node.id())
            .or_default()
            .insert(key, Rc::new(value));
    });
}

/// Fetch the value stored under `key`, if it exists and has type `T`.
pub fn get<T: 'static>(node: &Node, key: &'static str) -> Option<Rc<T>> {
    let entry = STORE.with(|store| {
        store
            .borrow()
            .get(&node.id())
            .and_then(|values| values.get(key).cloned())
    })?;
    entry.downcast::<T>().ok()
}

pub fn has(node: &Node, key: &'static str) -> bool {
    STORE.with(|store| {
        store
            .borrow()
            .get(&node.id())
            .is_some_and(|values| values.contains_key(key))
    })
}

pub fn remove(node: &Node, key: &'static str) {
    STORE.with(|store| {
        if let Some(values) = store.borrow_mut().get_mut(&node.id()) {
            values.remove(key);
        }
    });
}

/// Drop everything stored for `node`.
///
/// The values are dropped after the table borrow is released, so their
/// destructors may touch the store again.
pub fn clear(node: &Node) {
    let removed = STORE.with(|store| store.borrow_mut().remove(&node.id()));
    drop(removed);
}

/// Number of nodes with stored data.
pub fn node_count() -> usize {
    STORE.with(|store| store.borrow().len())
}
