//! Binding application engine.
//!
//! Every bound node gets one [`Effect`] that evaluates the node's directive
//! table and drives its directives through two phases:
//!
//! 1. On the first run only, every directive's `init` handler runs, in table
//!    order. At most one directive may take control of the node's
//!    descendants.
//! 2. On every run, every directive's `update` handler runs, in table order.
//!
//! The effect re-runs whenever a cell read by the table or by an `update`
//! handler changes, and is disposed when the node is cleaned or removed.
//!
//! After a node's own directives ran, the engine walks its children
//! (virtual-element aware) unless a directive controls them.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use tracing::{debug, error, trace};

use super::context::{self, BindingContext};
use super::flags::DirectiveFlags;
use super::provider;
use super::registry::{Directive, Registry};
use super::rewriter::{write_value_to_property, PROPERTY_WRITERS_KEY};
use crate::config::BindingConfig;
use crate::directives;
use crate::dom::{disposal, virtual_elements, Node};
use crate::error::{BindingError, Result};
use crate::reactive::Effect;
use crate::value::Value;

/// What an `init` handler tells the engine.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InitOutcome {
    /// The directive binds the node's descendants itself.
    pub controls_descendant_bindings: bool,
}

impl InitOutcome {
    pub const fn proceed() -> Self {
        Self {
            controls_descendant_bindings: false,
        }
    }

    pub const fn controls_descendants() -> Self {
        Self {
            controls_descendant_bindings: true,
        }
    }
}

/// Result of applying bindings to a single node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ApplyOutcome {
    pub should_bind_descendants: bool,
}

/// Reads one directive's value.
///
/// Accessors handed to directives read the node's latest evaluated table,
/// so an event handler registered at init time sees values from later runs.
#[derive(Clone)]
pub struct ValueAccessor(Rc<dyn Fn() -> Value>);

impl ValueAccessor {
    pub fn new<F>(read: F) -> Self
    where
        F: Fn() -> Value + 'static,
    {
        Self(Rc::new(read))
    }

    /// An accessor that always returns `value`.
    pub fn fixed(value: Value) -> Self {
        Self::new(move || value.clone())
    }

    pub fn get(&self) -> Value {
        (self.0)()
    }

    /// The value with cells and deferred expressions read through.
    pub fn unwrapped(&self) -> Result<Value> {
        Ok(self.get().unwrap_observable()?)
    }
}

impl fmt::Debug for ValueAccessor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ValueAccessor")
    }
}

/// The evaluated directive table of a node.
///
/// Clones share the table, which is replaced on every run of the node's
/// effect.
#[derive(Clone, Default)]
pub struct AllBindings {
    table: Rc<RefCell<Value>>,
}

impl AllBindings {
    pub fn new(table: Value) -> Self {
        Self {
            table: Rc::new(RefCell::new(table)),
        }
    }

    fn replace(&self, table: Value) {
        *self.table.borrow_mut() = table;
    }

    /// The raw value bound to `key`, or `undefined`.
    pub fn get(&self, key: &str) -> Value {
        self.table.borrow().get(key)
    }

    pub fn has(&self, key: &str) -> bool {
        self.table
            .borrow()
            .as_object()
            .is_some_and(|object| object.borrow().contains_key(key))
    }

    /// Directive keys in table order, without the property-writer table.
    pub fn keys(&self) -> Vec<String> {
        match self.table.borrow().as_object() {
            Some(object) => object
                .borrow()
                .keys()
                .filter(|key| *key != PROPERTY_WRITERS_KEY)
                .cloned()
                .collect(),
            None => Vec::new(),
        }
    }

    pub fn table(&self) -> Value {
        self.table.borrow().clone()
    }

    pub fn accessor(&self, key: &str) -> ValueAccessor {
        let bindings = self.clone();
        let key = key.to_string();
        ValueAccessor::new(move || bindings.get(&key))
    }

    /// Run the property writer generated for `key`, if there is one.
    pub fn write_value_to_property(&self, key: &str, value: Value) -> bool {
        let table = self.table();
        write_value_to_property(&table, key, value)
    }
}

impl fmt::Debug for AllBindings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AllBindings")
            .field("keys", &self.keys())
            .finish()
    }
}

/// Where a node's directive table comes from.
#[derive(Clone)]
pub enum BindingSource {
    /// The node's binding attribute or virtual-element comment.
    Provider,
    /// Directive-table text, rewritten and evaluated in the node's context.
    Text(String),
    /// An already evaluated table.
    Table(Value),
    /// A function producing the table, evaluated on every run.
    Accessor(Rc<dyn Fn(&BindingContext) -> Result<Value>>),
}

impl From<Value> for BindingSource {
    fn from(table: Value) -> Self {
        BindingSource::Table(table)
    }
}

impl From<&str> for BindingSource {
    fn from(text: &str) -> Self {
        BindingSource::Text(text.to_string())
    }
}

impl From<Value> for BindingContext {
    fn from(data: Value) -> Self {
        BindingContext::root(data)
    }
}

impl From<&BindingContext> for BindingContext {
    fn from(context: &BindingContext) -> Self {
        context.clone()
    }
}

/// Everything a directive handler is given.
#[derive(Clone, Debug)]
pub struct BindingArgs {
    pub engine: Engine,
    pub node: Node,
    /// The table key, such as `text` or `attr.href`.
    pub key: String,
    /// The part after the dot of a two-level key.
    pub sub_key: Option<String>,
    pub value: ValueAccessor,
    pub bindings: AllBindings,
    pub context: BindingContext,
}

impl BindingArgs {
    /// The directive's raw value.
    pub fn value(&self) -> Value {
        self.value.get()
    }

    pub fn unwrapped_value(&self) -> Result<Value> {
        self.value.unwrapped()
    }

    /// The data item the node is bound to.
    pub fn data(&self) -> &Value {
        self.context.data()
    }

    /// A copy of these arguments with a fixed value, for delegating to
    /// another directive's handlers.
    pub fn with_value(&self, value: Value) -> Self {
        Self {
            value: ValueAccessor::fixed(value),
            ..self.clone()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    BeforeInit,
    DuringInit,
    AfterInit,
}

/// Per-node state owned by the node's effect.
struct NodeState {
    phase: Cell<Phase>,
    bindings: AllBindings,
    controller: RefCell<Option<String>>,
}

impl NodeState {
    fn new() -> Self {
        Self {
            phase: Cell::new(Phase::BeforeInit),
            bindings: AllBindings::default(),
            controller: RefCell::new(None),
        }
    }
}

struct EngineInner {
    registry: RefCell<Registry>,
    config: BindingConfig,
    unique_names: Cell<u64>,
}

/// The binding engine: a directive registry plus configuration.
///
/// Clones share the registry.
#[derive(Clone)]
pub struct Engine {
    inner: Rc<EngineInner>,
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Engine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Engine")
            .field("directives", &self.inner.registry.borrow().len())
            .field("config", &self.inner.config)
            .finish()
    }
}

impl Engine {
    /// An engine with the default configuration and directive set.
    pub fn new() -> Self {
        Self::with_config(BindingConfig::default())
    }

    pub fn with_config(config: BindingConfig) -> Self {
        let engine = Self::bare(config);
        directives::register_defaults(&engine);
        engine
    }

    /// An engine with no directives registered.
    pub fn bare(config: BindingConfig) -> Self {
        Self {
            inner: Rc::new(EngineInner {
                registry: RefCell::new(Registry::new()),
                config,
                unique_names: Cell::new(0),
            }),
        }
    }

    pub fn config(&self) -> &BindingConfig {
        &self.inner.config
    }

    // ------------------------------------------------------------------------
    // Registry
    // ------------------------------------------------------------------------

    pub fn register(&self, directive: Directive) -> Option<Rc<Directive>> {
        self.inner.registry.borrow_mut().register(directive)
    }

    pub fn lookup(&self, name: &str) -> Option<Rc<Directive>> {
        self.inner.registry.borrow().lookup(name)
    }

    pub fn resolve(&self, key: &str) -> Option<(Rc<Directive>, Option<String>)> {
        self.inner.registry.borrow().resolve(key)
    }

    pub fn with_registry<R>(&self, f: impl FnOnce(&Registry) -> R) -> R {
        f(&self.inner.registry.borrow())
    }

    /// A fresh name for `uniqueName`.
    pub fn next_unique_name(&self) -> String {
        let next = self.inner.unique_names.get() + 1;
        self.inner.unique_names.set(next);
        format!("{}{}", self.inner.config.unique_name_prefix, next)
    }

    // ------------------------------------------------------------------------
    // Entry points
    // ------------------------------------------------------------------------

    /// Bind `root` and its whole subtree.
    ///
    /// `context` is a [`BindingContext`] or a data value, which becomes a
    /// root context.
    pub fn apply_bindings(&self, context: impl Into<BindingContext>, root: &Node) -> Result<()> {
        if !(root.is_element() || root.is_comment()) {
            return Err(BindingError::InvalidRoot);
        }
        debug!(node = %root.id(), "applying bindings");
        self.apply_to_node_and_descendants(&context.into(), root, true)
    }

    /// Bind a single node with an explicit directive table. Descendants are
    /// not visited.
    pub fn apply_bindings_to_node(
        &self,
        node: &Node,
        source: impl Into<BindingSource>,
        context: impl Into<BindingContext>,
    ) -> Result<ApplyOutcome> {
        self.apply_to_node_internal(node, source.into(), &context.into(), true)
    }

    /// Bind the descendants of `node` but not `node` itself.
    pub fn apply_bindings_to_descendants(
        &self,
        context: impl Into<BindingContext>,
        node: &Node,
    ) -> Result<()> {
        if node.is_element() || node.is_comment() {
            self.apply_to_descendants_internal(&context.into(), node, true)?;
        }
        Ok(())
    }

    pub fn context_for(&self, node: &Node) -> Option<BindingContext> {
        context::context_for(node)
    }

    pub fn data_for(&self, node: &Node) -> Option<Value> {
        context::data_for(node)
    }

    // ------------------------------------------------------------------------
    // Tree walk
    // ------------------------------------------------------------------------

    pub(crate) fn apply_to_node_and_descendants(
        &self,
        context: &BindingContext,
        node: &Node,
        is_root: bool,
    ) -> Result<()> {
        let is_element = node.is_element();
        let mut bind_descendants = true;
        if (is_element && is_root) || provider::node_has_bindings(self, node) {
            bind_descendants = self
                .apply_to_node_internal(node, BindingSource::Provider, context, is_root)?
                .should_bind_descendants;
        }
        if bind_descendants {
            // Children of a virtual element cannot find their context by
            // walking up, so they store it themselves.
            self.apply_to_descendants_internal(context, node, !is_element && is_root)?;
        }
        Ok(())
    }

    fn apply_to_descendants_internal(
        &self,
        context: &BindingContext,
        parent: &Node,
        are_roots: bool,
    ) -> Result<()> {
        let mut next = virtual_elements::first_child(parent);
        while let Some(child) = next {
            // Taken before binding: the child may replace or move itself.
            next = virtual_elements::next_sibling(&child);
            self.apply_to_node_and_descendants(context, &child, are_roots)?;
        }
        Ok(())
    }

    fn apply_to_node_internal(
        &self,
        node: &Node,
        source: BindingSource,
        context: &BindingContext,
        is_root: bool,
    ) -> Result<ApplyOutcome> {
        let state = Rc::new(NodeState::new());
        {
            let engine = self.clone();
            let node = node.clone();
            let context = context.clone();
            let state = state.clone();
            let anchor = node.clone();
            self.run_anchored(&anchor, "bindings", move || {
                engine.evaluate_node(&node, &source, &context, is_root, &state)
            })?;
        }
        let should_bind_descendants = state.controller.borrow().is_none();
        Ok(ApplyOutcome {
            should_bind_descendants,
        })
    }

    /// Run `run` in an effect whose lifetime is tied to `anchor`.
    ///
    /// An error from the first run is returned and the effect is dropped.
    /// Errors from later runs have no caller to go to and are logged.
    pub(crate) fn run_anchored<F>(&self, anchor: &Node, label: &'static str, run: F) -> Result<()>
    where
        F: Fn() -> Result<()> + 'static,
    {
        let first_error: Rc<RefCell<Option<BindingError>>> = Rc::default();
        let first_run = Rc::new(Cell::new(true));
        let effect = {
            let first_error = first_error.clone();
            let first_run = first_run.clone();
            let anchor_id = anchor.id();
            Effect::new_lazy(move || {
                if let Err(err) = run() {
                    if first_run.get() {
                        *first_error.borrow_mut() = Some(err);
                    } else {
                        error!(node = %anchor_id, computation = label, error = %err, "binding update failed");
                    }
                }
            })
        };
        {
            let effect = effect.clone();
            disposal::add_disposal_callback(anchor, move || effect.dispose());
        }

        effect.execute();
        first_run.set(false);

        let failed = first_error.take();
        match failed {
            Some(err) => {
                effect.dispose();
                Err(err)
            }
            None => Ok(()),
        }
    }

    fn evaluate_node(
        &self,
        node: &Node,
        source: &BindingSource,
        context: &BindingContext,
        is_root: bool,
        state: &NodeState,
    ) -> Result<()> {
        if is_root {
            context::store_context(node, context);
        }

        let table = match source {
            BindingSource::Provider => provider::get_bindings(self, node, context)?,
            BindingSource::Text(text) => Some(provider::parse_bindings_string(self, text, context)?),
            BindingSource::Table(table) => Some(table.clone()),
            BindingSource::Accessor(accessor) => Some(accessor(context)?),
        };
        let Some(table) = table else {
            return Ok(());
        };
        state.bindings.replace(table);
        let keys = state.bindings.keys();

        if state.phase.get() == Phase::BeforeInit {
            state.phase.set(Phase::DuringInit);
            for key in &keys {
                let Some((directive, sub_key)) = self.resolve(key) else {
                    continue;
                };
                if node.is_comment() && !directive.has_all(DirectiveFlags::VIRTUAL_ALLOWED) {
                    return Err(BindingError::VirtualNotAllowed {
                        directive: directive.name().to_string(),
                    });
                }

                let mut controls = false;
                if let Some(init) = directive.init() {
                    trace!(node = %node.id(), directive = %key, "init");
                    let args = self.binding_args(node, key, sub_key, context, &state.bindings);
                    controls = init(&args)?.controls_descendant_bindings;
                }

                if controls || directive.has_all(DirectiveFlags::CONTENT_BIND) {
                    let mut controller = state.controller.borrow_mut();
                    match controller.as_deref() {
                        Some(first) if first != directive.name() => {
                            return Err(BindingError::MultipleControllers {
                                first: first.to_string(),
                                second: directive.name().to_string(),
                            });
                        }
                        _ => *controller = Some(directive.name().to_string()),
                    }
                }
            }
            state.phase.set(Phase::AfterInit);
        }

        if state.phase.get() == Phase::AfterInit {
            for key in &keys {
                let Some((directive, sub_key)) = self.resolve(key) else {
                    continue;
                };
                if let Some(update) = directive.update() {
                    trace!(node = %node.id(), directive = %key, "update");
                    let args = self.binding_args(node, key, sub_key, context, &state.bindings);
                    update(&args)?;
                }
            }
        }
        Ok(())
    }

    fn binding_args(
        &self,
        node: &Node,
        key: &str,
        sub_key: Option<String>,
        context: &BindingContext,
        bindings: &AllBindings,
    ) -> BindingArgs {
        BindingArgs {
            engine: self.clone(),
            node: node.clone(),
            key: key.to_string(),
            sub_key,
            value: bindings.accessor(key),
            bindings: bindings.clone(),
            context: context.clone(),
        }
    }
}
