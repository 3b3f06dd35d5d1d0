//! Binding provider.
//!
//! Finds a node's directive table (the binding attribute of an element, or
//! the text of a `<!-- ko ... -->` start comment) and evaluates it into a
//! table value in a binding context.

use tracing::debug;

use super::context::BindingContext;
use super::engine::Engine;
use super::rewriter::rewrite;
use crate::dom::{virtual_elements, Node};
use crate::error::{BindingError, Result};
use crate::expr::evaluate;
use crate::value::Value;

/// The raw directive table of `node`, if it has one.
pub fn bindings_string(engine: &Engine, node: &Node) -> Option<String> {
    if node.is_element() {
        node.get_attribute(&engine.config().binding_attribute)
    } else if node.is_comment() {
        virtual_elements::virtual_bindings_string(node)
    } else {
        None
    }
}

pub fn node_has_bindings(engine: &Engine, node: &Node) -> bool {
    bindings_string(engine, node).is_some()
}

/// Evaluate the directive table of `node`, or `None` if it has none.
pub fn get_bindings(engine: &Engine, node: &Node, context: &BindingContext) -> Result<Option<Value>> {
    match bindings_string(engine, node) {
        Some(text) => parse_bindings_string(engine, &text, context).map(Some),
        None => Ok(None),
    }
}

/// Rewrite and evaluate a directive table in `context`.
pub fn parse_bindings_string(engine: &Engine, text: &str, context: &BindingContext) -> Result<Value> {
    let rewritten = engine.with_registry(|registry| rewrite(text, registry));
    let source = format!("{{{rewritten}}}");
    evaluate(&source, context.scope()).map_err(|source_err| {
        debug!(bindings = text, rewritten = %source, "directive table failed to evaluate");
        BindingError::InvalidBindings {
            bindings: text.to_string(),
            source: source_err,
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::markup::parse_element;

    #[test]
    fn reads_attribute_and_virtual_comment() {
        let engine = Engine::new();
        let div = parse_element(r#"<div data-bind="text: a"></div>"#).unwrap();
        assert_eq!(bindings_string(&engine, &div).as_deref(), Some("text: a"));
        assert!(node_has_bindings(&engine, &Node::comment(" ko if: x ")));
        assert!(!node_has_bindings(&engine, &Node::comment("plain")));
        assert!(!node_has_bindings(&engine, &Node::text("text: a")));
    }

    #[test]
    fn evaluates_in_context() {
        let engine = Engine::new();
        let context = BindingContext::root(Value::object([("name", Value::from("Ann"))]));
        let table = parse_bindings_string(&engine, "text: name, visible: 1 > 0", &context).unwrap();
        assert_eq!(table.get("text"), Value::from("Ann"));
        assert_eq!(table.get("visible"), Value::from(true));
    }

    #[test]
    fn unknown_names_fail_with_the_table_text() {
        let engine = Engine::new();
        let context = BindingContext::root(Value::object::<&str>([]));
        let err = parse_bindings_string(&engine, "text: missing", &context).unwrap_err();
        assert!(matches!(err, BindingError::InvalidBindings { ref bindings, .. } if bindings == "text: missing"));
    }

    #[test]
    fn honours_configured_attribute() {
        let config = crate::BindingConfig {
            binding_attribute: "data-ko".into(),
            ..Default::default()
        };
        let engine = Engine::with_config(config);
        let div = parse_element(r#"<div data-ko="text: a" data-bind="x: 1"></div>"#).unwrap();
        assert_eq!(bindings_string(&engine, &div).as_deref(), Some("text: a"));
    }
}
