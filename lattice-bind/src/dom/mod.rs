//! Document Tree
//!
//! A small mutable document model for the binding engine to drive: element,
//! text and comment nodes with attributes, a class list, an inline style map
//! and the live form properties (`value`, `checked`, `selected`, focus) that
//! directives read and write.
//!
//! # Ownership
//!
//! A parent owns its children; a child holds a weak back-reference to its
//! parent. [`Node`] is a cheap handle, and two handles are equal exactly when
//! they refer to the same node.
//!
//! Per-node binding state (stored contexts, disposal callbacks, listeners)
//! lives out-of-band in [`data`], keyed by [`NodeId`], so cloning a node
//! never copies it.

pub mod data;
pub mod disposal;
pub mod events;
pub mod forms;
pub mod markup;
pub mod virtual_elements;

use std::cell::{Cell, RefCell};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::rc::{Rc, Weak};
use std::sync::atomic::{AtomicU64, Ordering};

use indexmap::IndexMap;

/// Unique identifier for a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u64);

impl NodeId {
    fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        NodeId(COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Element,
    Text,
    Comment,
}

struct NodeInner {
    id: NodeId,
    kind: NodeKind,
    /// Lowercase tag name for elements, empty otherwise.
    tag: String,
    /// Character data of text and comment nodes.
    text: RefCell<String>,
    parent: RefCell<Weak<NodeInner>>,
    children: RefCell<Vec<Node>>,
    attributes: RefCell<IndexMap<String, String>>,
    style: RefCell<IndexMap<String, String>>,
    value: RefCell<String>,
    checked: Cell<bool>,
    selected: Cell<bool>,
    focused: Cell<bool>,
}

/// A handle to a document node.
#[derive(Clone)]
pub struct Node(Rc<NodeInner>);

impl Node {
    fn with_kind(kind: NodeKind, tag: String, text: String) -> Self {
        Node(Rc::new(NodeInner {
            id: NodeId::new(),
            kind,
            tag,
            text: RefCell::new(text),
            parent: RefCell::new(Weak::new()),
            children: RefCell::new(Vec::new()),
            attributes: RefCell::new(IndexMap::new()),
            style: RefCell::new(IndexMap::new()),
            value: RefCell::new(String::new()),
            checked: Cell::new(false),
            selected: Cell::new(false),
            focused: Cell::new(false),
        }))
    }

    pub fn element(tag: &str) -> Self {
        Self::with_kind(NodeKind::Element, tag.to_ascii_lowercase(), String::new())
    }

    pub fn text(data: &str) -> Self {
        Self::with_kind(NodeKind::Text, String::new(), data.to_string())
    }

    pub fn comment(data: &str) -> Self {
        Self::with_kind(NodeKind::Comment, String::new(), data.to_string())
    }

    // ------------------------------------------------------------------------
    // Identity
    // ------------------------------------------------------------------------

    pub fn id(&self) -> NodeId {
        self.0.id
    }

    pub fn kind(&self) -> NodeKind {
        self.0.kind
    }

    pub fn is_element(&self) -> bool {
        self.0.kind == NodeKind::Element
    }

    pub fn is_text(&self) -> bool {
        self.0.kind == NodeKind::Text
    }

    pub fn is_comment(&self) -> bool {
        self.0.kind == NodeKind::Comment
    }

    pub fn tag_name(&self) -> &str {
        &self.0.tag
    }

    /// Character data of a text or comment node.
    pub fn data(&self) -> String {
        self.0.text.borrow().clone()
    }

    pub fn set_data(&self, data: &str) {
        *self.0.text.borrow_mut() = data.to_string();
    }

    // ------------------------------------------------------------------------
    // Navigation
    // ------------------------------------------------------------------------

    pub fn parent(&self) -> Option<Node> {
        self.0.parent.borrow().upgrade().map(Node)
    }

    pub fn children(&self) -> Vec<Node> {
        self.0.children.borrow().clone()
    }

    pub fn child_count(&self) -> usize {
        self.0.children.borrow().len()
    }

    pub fn first_child(&self) -> Option<Node> {
        self.0.children.borrow().first().cloned()
    }

    pub fn last_child(&self) -> Option<Node> {
        self.0.children.borrow().last().cloned()
    }

    /// Position of this node among its parent's children.
    pub fn index_in_parent(&self) -> Option<usize> {
        let parent = self.parent()?;
        let children = parent.0.children.borrow();
        children.iter().position(|child| child == self)
    }

    pub fn next_sibling(&self) -> Option<Node> {
        let parent = self.parent()?;
        let index = self.index_in_parent()?;
        let children = parent.0.children.borrow();
        children.get(index + 1).cloned()
    }

    pub fn previous_sibling(&self) -> Option<Node> {
        let parent = self.parent()?;
        let index = self.index_in_parent()?;
        let children = parent.0.children.borrow();
        index.checked_sub(1).and_then(|i| children.get(i).cloned())
    }

    /// True if `other` is this node or one of its descendants.
    pub fn contains(&self, other: &Node) -> bool {
        let mut current = Some(other.clone());
        while let Some(node) = current {
            if &node == self {
                return true;
            }
            current = node.parent();
        }
        false
    }

    /// Topmost ancestor (the node itself when detached).
    pub fn root(&self) -> Node {
        let mut current = self.clone();
        while let Some(parent) = current.parent() {
            current = parent;
        }
        current
    }

    /// All descendants in document order, excluding the node itself.
    pub fn descendants(&self) -> Vec<Node> {
        let mut out = Vec::new();
        fn walk(node: &Node, out: &mut Vec<Node>) {
            for child in node.children() {
                out.push(child.clone());
                walk(&child, out);
            }
        }
        walk(self, &mut out);
        out
    }

    // ------------------------------------------------------------------------
    // Mutation
    // ------------------------------------------------------------------------

    /// Append a child, moving it out of its current parent first.
    pub fn append_child(&self, child: &Node) {
        child.detach();
        *child.0.parent.borrow_mut() = Rc::downgrade(&self.0);
        self.0.children.borrow_mut().push(child.clone());
    }

    /// Insert `child` before `reference`, or append when there is none.
    pub fn insert_before(&self, child: &Node, reference: Option<&Node>) {
        child.detach();
        let index = reference.and_then(|r| {
            self.0.children.borrow().iter().position(|c| c == r)
        });
        *child.0.parent.borrow_mut() = Rc::downgrade(&self.0);
        let mut children = self.0.children.borrow_mut();
        match index {
            Some(index) => children.insert(index, child.clone()),
            None => children.push(child.clone()),
        }
    }

    /// Insert `child` directly after this node in its parent.
    pub fn insert_after_self(&self, child: &Node) {
        if let Some(parent) = self.parent() {
            let next = self.next_sibling();
            parent.insert_before(child, next.as_ref());
        }
    }

    pub fn remove_child(&self, child: &Node) {
        let mut children = self.0.children.borrow_mut();
        if let Some(index) = children.iter().position(|c| c == child) {
            children.remove(index);
            *child.0.parent.borrow_mut() = Weak::new();
        }
    }

    /// Remove this node from its parent, if any.
    pub fn detach(&self) {
        if let Some(parent) = self.parent() {
            parent.remove_child(self);
        }
    }

    /// Put `replacement` where this node stands and detach this node.
    pub fn replace_with(&self, replacement: &Node) {
        if let Some(parent) = self.parent() {
            parent.insert_before(replacement, Some(self));
            parent.remove_child(self);
        }
    }

    /// Detach every child without cleaning them.
    pub fn clear_children(&self) {
        let children = std::mem::take(&mut *self.0.children.borrow_mut());
        for child in children {
            *child.0.parent.borrow_mut() = Weak::new();
        }
    }

    /// Concatenated character data of all descendant text nodes.
    pub fn text_content(&self) -> String {
        match self.kind() {
            NodeKind::Text | NodeKind::Comment => self.data(),
            NodeKind::Element => self
                .descendants()
                .iter()
                .filter(|node| node.is_text())
                .map(Node::data)
                .collect(),
        }
    }

    /// Replace all children with a single text node.
    pub fn set_text_content(&self, text: &str) {
        match self.kind() {
            NodeKind::Text | NodeKind::Comment => self.set_data(text),
            NodeKind::Element => {
                self.clear_children();
                if !text.is_empty() {
                    self.append_child(&Node::text(text));
                }
            }
        }
    }

    // ------------------------------------------------------------------------
    // Attributes, classes and style
    // ------------------------------------------------------------------------

    pub fn get_attribute(&self, name: &str) -> Option<String> {
        self.0.attributes.borrow().get(name).cloned()
    }

    pub fn has_attribute(&self, name: &str) -> bool {
        self.0.attributes.borrow().contains_key(name)
    }

    pub fn set_attribute(&self, name: &str, value: &str) {
        self.0
            .attributes
            .borrow_mut()
            .insert(name.to_string(), value.to_string());
    }

    pub fn remove_attribute(&self, name: &str) {
        self.0.attributes.borrow_mut().shift_remove(name);
    }

    pub fn attributes(&self) -> Vec<(String, String)> {
        self.0
            .attributes
            .borrow()
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    pub fn class_list(&self) -> Vec<String> {
        self.get_attribute("class")
            .map(|classes| classes.split_whitespace().map(str::to_string).collect())
            .unwrap_or_default()
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.class_list().iter().any(|c| c == class)
    }

    /// Add or remove a class name.
    pub fn toggle_class(&self, class: &str, present: bool) {
        let mut classes = self.class_list();
        let existing = classes.iter().position(|c| c == class);
        match (present, existing) {
            (true, None) => classes.push(class.to_string()),
            (false, Some(index)) => {
                classes.remove(index);
            }
            _ => return,
        }
        if classes.is_empty() {
            self.remove_attribute("class");
        } else {
            self.set_attribute("class", &classes.join(" "));
        }
    }

    pub fn style(&self, property: &str) -> Option<String> {
        self.0.style.borrow().get(property).cloned()
    }

    /// Set an inline style property. An empty value removes it.
    pub fn set_style(&self, property: &str, value: &str) {
        let mut style = self.0.style.borrow_mut();
        if value.is_empty() {
            style.shift_remove(property);
        } else {
            style.insert(property.to_string(), value.to_string());
        }
    }

    pub fn styles(&self) -> Vec<(String, String)> {
        self.0
            .style
            .borrow()
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    // ------------------------------------------------------------------------
    // Form properties
    // ------------------------------------------------------------------------

    /// The raw `value` property. See [`forms::read_value`] for control-aware reads.
    pub fn value(&self) -> String {
        self.0.value.borrow().clone()
    }

    pub fn set_value(&self, value: &str) {
        *self.0.value.borrow_mut() = value.to_string();
    }

    pub fn checked(&self) -> bool {
        self.0.checked.get()
    }

    pub fn set_checked(&self, checked: bool) {
        self.0.checked.set(checked);
    }

    pub fn selected(&self) -> bool {
        self.0.selected.get()
    }

    pub fn set_selected(&self, selected: bool) {
        self.0.selected.set(selected);
    }

    pub fn focused(&self) -> bool {
        self.0.focused.get()
    }

    pub fn set_focused(&self, focused: bool) {
        self.0.focused.set(focused);
    }

    // ------------------------------------------------------------------------
    // Cloning
    // ------------------------------------------------------------------------

    /// Copy this node and its subtree into fresh, detached nodes.
    ///
    /// Out-of-band data is not copied.
    pub fn deep_clone(&self) -> Node {
        let copy = Self::with_kind(self.0.kind, self.0.tag.clone(), self.data());
        *copy.0.attributes.borrow_mut() = self.0.attributes.borrow().clone();
        *copy.0.style.borrow_mut() = self.0.style.borrow().clone();
        *copy.0.value.borrow_mut() = self.value();
        copy.set_checked(self.checked());
        copy.set_selected(self.selected());
        for child in self.children() {
            copy.append_child(&child.deep_clone());
        }
        copy
    }
}

impl PartialEq for Node {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl Eq for Node {}

impl Hash for Node {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.id.hash(state);
    }
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind() {
            NodeKind::Element => write!(f, "<{} {}>", self.tag_name(), self.id()),
            NodeKind::Text => write!(f, "Text({:?} {})", self.data(), self.id()),
            NodeKind::Comment => write!(f, "Comment({:?} {})", self.data(), self.id()),
        }
    }
}
