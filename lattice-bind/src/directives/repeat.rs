//! `repeat`: stamp out copies of a node.
//!
//! ```text
//! <li data-bind="repeat: 3">...</li>
//! <li data-bind="repeat: {count: n}">...</li>
//! <li data-bind="repeat: {foreach: items, index: '$i', item: '$it', bind: 'text: $it()'}">...</li>
//! ```
//!
//! The node is replaced by a placeholder comment and kept as a template.
//! Copies live directly after the placeholder. When the count changes,
//! surplus copies are removed from the end and missing ones appended; the
//! copies that stay are not rebound. Each copy's context holds its index
//! and, when iterating, an item accessor that reads the current array slot
//! by position. Changing the array re-fires every accessor, so a surviving
//! copy picks up the value now at its index.

use std::cell::RefCell;
use std::rc::Rc;

use tracing::{trace, warn};

use crate::binding::{
    provider, BindingArgs, BindingContext, BindingSource, Directive, DirectiveFlags, Engine,
    InitOutcome, ValueAccessor,
};
use crate::dom::{disposal, Node};
use crate::error::Result;
use crate::reactive::Signal;
use crate::value::Value;

const PLACEHOLDER: &str = "ko_repeatplaceholder";

/// Options read once when the directive initialises.
#[derive(Debug, Clone, PartialEq)]
struct RepeatParams {
    index: String,
    item: String,
    bind: Option<String>,
}

impl RepeatParams {
    fn read(param: &Value) -> Self {
        let mut params = Self {
            index: "$index".to_string(),
            item: "$item".to_string(),
            bind: None,
        };
        if let Value::Object(object) = param {
            let object = object.borrow();
            if let Some(index) = object.get("index") {
                params.index = index.to_display_string();
            }
            if let Some(item) = object.get("item") {
                params.item = item.to_display_string();
            }
            params.bind = object.get("bind").map(Value::to_display_string);
        }
        params
    }
}

/// Generated copies and the array they iterate.
struct Repeater {
    engine: Engine,
    context: BindingContext,
    params: RepeatParams,
    template: Node,
    placeholder: Node,
    nodes: RefCell<Vec<Node>>,
    array: Rc<RefCell<Value>>,
    /// Notified after every count change so item accessors re-read.
    changed: Signal<()>,
}

pub(crate) fn directive() -> Directive {
    Directive::new("repeat", DirectiveFlags::CONTENT_BIND).with_init(init)
}

fn init(args: &BindingArgs) -> Result<InitOutcome> {
    let params = RepeatParams::read(&args.unwrapped_value()?);

    let template = args.node.deep_clone();
    template.remove_attribute(&args.engine.config().binding_attribute);

    if args.node.parent().is_none() {
        warn!(node = %args.node.id(), "repeat needs a parent node; nothing rendered");
        return Ok(InitOutcome::controls_descendants());
    }
    let placeholder = Node::comment(PLACEHOLDER);
    args.node.replace_with(&placeholder);
    {
        let original = args.node.clone();
        disposal::add_disposal_callback(&placeholder, move || disposal::clean_node(&original));
    }

    let repeater = Rc::new(Repeater {
        engine: args.engine.clone(),
        context: args.context.clone(),
        params,
        template,
        placeholder: placeholder.clone(),
        nodes: RefCell::new(Vec::new()),
        array: Rc::default(),
        changed: Signal::new(()),
    });
    let value = args.value.clone();
    args.engine
        .run_anchored(&placeholder, "repeat", move || repeater.render(&value))?;
    Ok(InitOutcome::controls_descendants())
}

impl Repeater {
    fn render(&self, value: &ValueAccessor) -> Result<()> {
        let (count, iterating) = self.desired_count(&value.unwrapped()?)?;

        {
            let mut nodes = self.nodes.borrow_mut();
            while nodes.len() > count {
                if let Some(node) = nodes.pop() {
                    disposal::remove_node(&node);
                }
            }
        }
        self.changed.notify();

        let start = self.nodes.borrow().len();
        if start >= count {
            return Ok(());
        }
        trace!(from = start, to = count, "repeat adding copies");

        let mut after = self
            .nodes
            .borrow()
            .last()
            .cloned()
            .unwrap_or_else(|| self.placeholder.clone());
        let index_attribute = &self.engine.config().repeat_index_attribute;
        for index in start..count {
            let node = self.template.deep_clone();
            after.insert_after_self(&node);
            node.set_attribute(index_attribute, &index.to_string());
            self.nodes.borrow_mut().push(node.clone());
            after = node;
        }

        let added: Vec<Node> = self.nodes.borrow()[start..].to_vec();
        for (offset, node) in added.iter().enumerate() {
            let index = start + offset;
            let mut context = self.context.extend(self.params.index.clone(), Value::from(index));
            if iterating {
                context = context.extend(self.params.item.clone(), self.item_accessor(index));
            }
            self.bind_copy(&context, node)?;
        }
        Ok(())
    }

    /// The number of copies wanted, and whether an array is iterated.
    fn desired_count(&self, value: &Value) -> Result<(usize, bool)> {
        let (count, iterating) = match value {
            Value::Object(object) if object.borrow().contains_key("count") => {
                (value.get("count").unwrap_observable()?.to_number(), false)
            }
            Value::Object(object) if object.borrow().contains_key("foreach") => {
                let array = value.get("foreach").unwrap_observable()?;
                let length = array.get("length").to_number();
                *self.array.borrow_mut() = array;
                (length, true)
            }
            other => (other.to_number(), false),
        };
        let count = if count.is_finite() && count > 0.0 {
            count.ceil() as usize
        } else {
            0
        };
        Ok((count, iterating))
    }

    fn item_accessor(&self, index: usize) -> Value {
        let changed = self.changed.clone();
        let array = self.array.clone();
        Value::function(move |_| {
            changed.get();
            let current = array.borrow().clone();
            current.get(&index.to_string()).unwrap_observable()
        })
    }

    fn bind_copy(&self, context: &BindingContext, node: &Node) -> Result<()> {
        let mut bind_descendants = true;
        if let Some(bind) = &self.params.bind {
            let table = provider::parse_bindings_string(&self.engine, bind, context)?;
            bind_descendants = self
                .engine
                .apply_bindings_to_node(node, BindingSource::Table(table), context)?
                .should_bind_descendants;
        }
        if bind_descendants {
            self.engine.apply_bindings_to_descendants(context, node)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use super::*;
    use crate::dom::markup::parse_element;

    fn copies(ul: &Node) -> Vec<Node> {
        ul.children().into_iter().filter(Node::is_element).collect()
    }

    #[test]
    fn fixed_count_and_index_attribute() {
        let engine = Engine::new();
        let ul = parse_element(
            r#"<ul><li data-bind="repeat: 3"><span data-bind="text: $index"></span></li></ul>"#,
        )
        .unwrap();
        engine.apply_bindings(Value::Null, &ul).unwrap();

        let copies = copies(&ul);
        assert_eq!(copies.len(), 3);
        assert!(ul.children()[0].is_comment());
        assert_eq!(ul.text_content(), "012");
        assert_eq!(copies[2].get_attribute("data-repeat-index").as_deref(), Some("2"));
        assert!(!copies[0].has_attribute("data-bind"));
    }

    #[test]
    fn fractional_counts_round_up() {
        let engine = Engine::new();
        let ul = parse_element(r#"<ul><li data-bind="repeat: 2.5"></li></ul>"#).unwrap();
        engine.apply_bindings(Value::Null, &ul).unwrap();
        assert_eq!(copies(&ul).len(), 3);
    }

    #[test]
    fn count_follows_a_cell() {
        let engine = Engine::new();
        let n = Value::observable(Value::from(2));
        let ul = parse_element(r#"<ul><li data-bind="repeat: {count: n}"></li></ul>"#).unwrap();
        engine
            .apply_bindings(Value::object([("n", n.clone())]), &ul)
            .unwrap();
        assert_eq!(copies(&ul).len(), 2);

        n.call(&[Value::from(5)]).unwrap();
        assert_eq!(copies(&ul).len(), 5);
        n.call(&[Value::from(0)]).unwrap();
        assert!(copies(&ul).is_empty());
    }

    #[test]
    fn surviving_copies_read_the_shifted_item() {
        let engine = Engine::new();
        let items = Value::observable(Value::array([Value::from("a"), Value::from("b")]));
        let ul = parse_element(
            r#"<ul><li data-bind="repeat: {foreach: items, item: '$it', bind: 'text: $it()'}"></li></ul>"#,
        )
        .unwrap();
        engine
            .apply_bindings(Value::object([("items", items.clone())]), &ul)
            .unwrap();
        assert_eq!(ul.text_content(), "ab");
        let first = copies(&ul)[0].clone();

        items.call(&[Value::array([Value::from("z")])]).unwrap();
        assert_eq!(ul.text_content(), "z");
        assert_eq!(copies(&ul)[0], first);
    }

    #[test]
    fn removing_the_placeholder_cleans_the_template_node() {
        let engine = Engine::new();
        let ul = parse_element(r#"<ul><li data-bind="repeat: 1"></li></ul>"#).unwrap();
        let li = ul.children()[0].clone();
        let cleaned = Rc::new(Cell::new(false));
        {
            let cleaned = cleaned.clone();
            disposal::add_disposal_callback(&li, move || cleaned.set(true));
        }
        engine.apply_bindings(Value::Null, &ul).unwrap();
        disposal::remove_node(&ul.children()[0]);
        assert!(cleaned.get());
    }
}
