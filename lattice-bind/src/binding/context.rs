//! Binding contexts.
//!
//! A [`BindingContext`] is the scope a directive table is evaluated in: the
//! current data item, its ancestors, the root, and named slots added by
//! control-flow directives (`$index`, `$item`, the switch record, ...).
//! Contexts are immutable and cheap to clone; deriving one copies the slot
//! list so slots flow down to descendants.

use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;
use smallvec::SmallVec;

use crate::directives::switch::SwitchScope;
use crate::dom::{data, Node};
use crate::expr::Scope;
use crate::value::Value;

const CONTEXT_KEY: &str = "__ko_binding_context__";
const SWITCH_SLOT: &str = "$switch";

/// A named scope extension.
#[derive(Clone, Debug)]
pub enum ContextSlot {
    /// A value visible to expressions under the slot's name.
    Value(Value),
    /// The enclosing `switch` record, visible only to `case` directives.
    Switch(SwitchScope),
}

struct ContextInner {
    data: Value,
    parent: Option<Value>,
    parents: SmallVec<[Value; 4]>,
    root: Value,
    slots: IndexMap<String, ContextSlot>,
}

#[derive(Clone)]
pub struct BindingContext {
    inner: Rc<ContextInner>,
}

impl BindingContext {
    /// A root context: no parents, and `$root` is `data` itself.
    pub fn root(data: Value) -> Self {
        Self {
            inner: Rc::new(ContextInner {
                root: data.clone(),
                data,
                parent: None,
                parents: SmallVec::new(),
                slots: IndexMap::new(),
            }),
        }
    }

    /// A context for `data` nested one level below this one.
    pub fn child(&self, data: Value) -> Self {
        let mut parents = SmallVec::with_capacity(self.inner.parents.len() + 1);
        parents.push(self.inner.data.clone());
        parents.extend(self.inner.parents.iter().cloned());
        Self {
            inner: Rc::new(ContextInner {
                data,
                parent: Some(self.inner.data.clone()),
                parents,
                root: self.inner.root.clone(),
                slots: self.derived_slots(),
            }),
        }
    }

    /// The same context with one more value slot.
    pub fn extend(&self, name: impl Into<String>, value: Value) -> Self {
        self.with_slots([(name.into(), ContextSlot::Value(value))])
    }

    /// The same context with additional or replaced slots.
    pub fn with_slots(&self, slots: impl IntoIterator<Item = (String, ContextSlot)>) -> Self {
        let mut merged = self.derived_slots();
        merged.extend(slots);
        Self {
            inner: Rc::new(ContextInner {
                data: self.inner.data.clone(),
                parent: self.inner.parent.clone(),
                parents: self.inner.parents.clone(),
                root: self.inner.root.clone(),
                slots: merged,
            }),
        }
    }

    /// Slots for a derived context. Values are shared; a switch scope is
    /// copied so a case claiming a slot later does not reach back into it.
    fn derived_slots(&self) -> IndexMap<String, ContextSlot> {
        self.inner
            .slots
            .iter()
            .map(|(name, slot)| {
                let slot = match slot {
                    ContextSlot::Switch(scope) => ContextSlot::Switch(scope.derive()),
                    value => value.clone(),
                };
                (name.clone(), slot)
            })
            .collect()
    }

    pub(crate) fn with_switch(&self, scope: SwitchScope) -> Self {
        self.with_slots([(SWITCH_SLOT.to_string(), ContextSlot::Switch(scope))])
    }

    pub fn data(&self) -> &Value {
        &self.inner.data
    }

    pub fn parent(&self) -> Option<&Value> {
        self.inner.parent.as_ref()
    }

    /// Ancestor data items, nearest first.
    pub fn parents(&self) -> &[Value] {
        &self.inner.parents
    }

    pub fn root_data(&self) -> &Value {
        &self.inner.root
    }

    pub fn slot(&self, name: &str) -> Option<&ContextSlot> {
        self.inner.slots.get(name)
    }

    pub(crate) fn switch_scope(&self) -> Option<SwitchScope> {
        match self.slot(SWITCH_SLOT)? {
            ContextSlot::Switch(scope) => Some(scope.clone()),
            ContextSlot::Value(_) => None,
        }
    }

    /// This context as an expression scope.
    pub fn scope(&self) -> Rc<dyn Scope> {
        Rc::new(self.clone())
    }

    fn context_name(&self, name: &str) -> Option<Value> {
        let value = match name {
            "$data" => self.inner.data.clone(),
            "$parent" => self.inner.parent.clone().unwrap_or_default(),
            "$parents" => Value::array(self.inner.parents.iter().cloned()),
            "$root" => self.inner.root.clone(),
            "$context" => self.as_object(),
            _ => match self.inner.slots.get(name)? {
                ContextSlot::Value(value) => value.clone(),
                ContextSlot::Switch(_) => return None,
            },
        };
        Some(value)
    }

    fn as_object(&self) -> Value {
        let mut entries = vec![
            ("$data".to_string(), self.inner.data.clone()),
            ("$parent".to_string(), self.inner.parent.clone().unwrap_or_default()),
            (
                "$parents".to_string(),
                Value::array(self.inner.parents.iter().cloned()),
            ),
            ("$root".to_string(), self.inner.root.clone()),
        ];
        for (name, slot) in &self.inner.slots {
            if let ContextSlot::Value(value) = slot {
                entries.push((name.clone(), value.clone()));
            }
        }
        Value::object(entries)
    }
}

impl Scope for BindingContext {
    /// Properties of the data item shadow context names.
    fn lookup(&self, name: &str) -> Option<Value> {
        if let Value::Object(object) = &self.inner.data {
            if let Some(value) = object.borrow().get(name) {
                return Some(value.clone());
            }
        }
        self.context_name(name)
    }

    fn assign(&self, name: &str, value: Value) -> bool {
        self.inner.data.set(name, value)
    }
}

impl fmt::Debug for BindingContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BindingContext")
            .field("data", &self.inner.data)
            .field("depth", &self.inner.parents.len())
            .field("slots", &self.inner.slots.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Remember the context a node was bound with.
pub fn store_context(node: &Node, context: &BindingContext) {
    data::set(node, CONTEXT_KEY, context.clone());
}

/// The context stored on the node itself, if any.
pub fn stored_context(node: &Node) -> Option<BindingContext> {
    data::get::<BindingContext>(node, CONTEXT_KEY).map(|context| (*context).clone())
}

/// The context of the nearest node, starting at `node` and walking up,
/// that has one stored.
///
/// Only elements and comments have contexts.
pub fn context_for(node: &Node) -> Option<BindingContext> {
    if node.is_text() {
        return None;
    }
    let mut current = Some(node.clone());
    while let Some(candidate) = current {
        if let Some(context) = stored_context(&candidate) {
            return Some(context);
        }
        current = candidate.parent();
    }
    None
}

/// The data item `node` is bound to.
pub fn data_for(node: &Node) -> Option<Value> {
    context_for(node).map(|context| context.data().clone())
}
