//! Directive registry.
//!
//! A [`Directive`] is an immutable descriptor: a name, a set of
//! [`DirectiveFlags`] and optional `init`/`update` handlers. The
//! [`Registry`] maps names to descriptors in registration order.

use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;

use super::engine::{BindingArgs, InitOutcome};
use super::flags::DirectiveFlags;
use crate::error::Result;

type InitHandler = Rc<dyn Fn(&BindingArgs) -> Result<InitOutcome>>;
type UpdateHandler = Rc<dyn Fn(&BindingArgs) -> Result<()>>;

/// A registered directive.
#[derive(Clone)]
pub struct Directive {
    name: String,
    flags: DirectiveFlags,
    init: Option<InitHandler>,
    update: Option<UpdateHandler>,
}

impl Directive {
    /// A directive with no handlers.
    pub fn new(name: impl Into<String>, flags: DirectiveFlags) -> Self {
        Self {
            name: name.into(),
            flags,
            init: None,
            update: None,
        }
    }

    /// Set the handler run once, on the node's first binding pass.
    pub fn with_init<F>(mut self, init: F) -> Self
    where
        F: Fn(&BindingArgs) -> Result<InitOutcome> + 'static,
    {
        self.init = Some(Rc::new(init));
        self
    }

    /// Set the handler run on every binding pass, after all inits.
    pub fn with_update<F>(mut self, update: F) -> Self
    where
        F: Fn(&BindingArgs) -> Result<()> + 'static,
    {
        self.update = Some(Rc::new(update));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn flags(&self) -> DirectiveFlags {
        self.flags
    }

    pub fn has_all(&self, required: DirectiveFlags) -> bool {
        self.flags.has_all(required)
    }

    pub fn has_none(&self, excluded: DirectiveFlags) -> bool {
        self.flags.has_none(excluded)
    }

    pub(crate) fn init(&self) -> Option<&InitHandler> {
        self.init.as_ref()
    }

    pub(crate) fn update(&self) -> Option<&UpdateHandler> {
        self.update.as_ref()
    }
}

impl fmt::Debug for Directive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Directive")
            .field("name", &self.name)
            .field("flags", &self.flags)
            .field("init", &self.init.is_some())
            .field("update", &self.update.is_some())
            .finish()
    }
}

/// Name to descriptor table.
#[derive(Debug, Default, Clone)]
pub struct Registry {
    directives: IndexMap<String, Rc<Directive>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a directive under its name, returning the one it replaced.
    pub fn register(&mut self, directive: Directive) -> Option<Rc<Directive>> {
        self.directives
            .insert(directive.name.clone(), Rc::new(directive))
    }

    pub fn lookup(&self, name: &str) -> Option<Rc<Directive>> {
        self.directives.get(name).cloned()
    }

    /// Resolve a directive-table key.
    ///
    /// A plain name resolves directly. A dotted key such as `attr.href`
    /// resolves to `attr` with sub-key `href`, but only when `attr` is
    /// flagged [`DirectiveFlags::TWO_LEVEL`].
    pub fn resolve(&self, key: &str) -> Option<(Rc<Directive>, Option<String>)> {
        if let Some(directive) = self.lookup(key) {
            return Some((directive, None));
        }
        let (head, sub_key) = key.split_once('.')?;
        let directive = self.lookup(head)?;
        if !directive.has_all(DirectiveFlags::TWO_LEVEL) || sub_key.is_empty() {
            return None;
        }
        Some((directive, Some(sub_key.to_string())))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.directives.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.directives.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.directives.len()
    }

    pub fn is_empty(&self) -> bool {
        self.directives.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_replaces_and_returns_previous() {
        let mut registry = Registry::new();
        assert!(registry
            .register(Directive::new("text", DirectiveFlags::CONTENT_SET))
            .is_none());
        let previous = registry
            .register(Directive::new("text", DirectiveFlags::empty()))
            .unwrap();
        assert_eq!(previous.flags(), DirectiveFlags::CONTENT_SET);
        assert_eq!(registry.len(), 1);
        assert!(registry.lookup("text").unwrap().flags().is_empty());
        assert!(registry.lookup("html").is_none());
    }

    #[test]
    fn dotted_keys_need_two_level() {
        let mut registry = Registry::new();
        registry.register(Directive::new("attr", DirectiveFlags::TWO_LEVEL));
        registry.register(Directive::new("text", DirectiveFlags::empty()));

        let (directive, sub_key) = registry.resolve("attr.href").unwrap();
        assert_eq!(directive.name(), "attr");
        assert_eq!(sub_key.as_deref(), Some("href"));

        assert!(registry.resolve("text.x").is_none());
        assert!(registry.resolve("attr.").is_none());
        assert!(registry.resolve("missing.x").is_none());
        assert_eq!(registry.resolve("text").unwrap().1, None);
    }

    #[test]
    fn handlers_are_optional() {
        let directive = Directive::new("noop", DirectiveFlags::NO_VALUE)
            .with_update(|_| Ok(()));
        assert!(directive.init().is_none());
        assert!(directive.update().is_some());
        assert!(directive.has_all(DirectiveFlags::NO_VALUE));
        assert!(directive.has_none(DirectiveFlags::TWO_WAY));
    }
}
