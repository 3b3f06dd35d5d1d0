//! `withlight`: bind the content against an object, without templates.
//!
//! The first pass binds the node's content in place and keeps a pristine
//! copy of it. Every later pass throws the bound content away, restores a
//! fresh copy and binds that against the new object.

use tracing::trace;

use crate::binding::{BindingArgs, Directive, DirectiveFlags, InitOutcome};
use crate::dom::{data, virtual_elements, Node};
use crate::error::{BindingError, Result};
use crate::value::Value;

const SAVED_CONTENT_KEY: &str = "__ko_withlight_content__";

pub(crate) fn directive() -> Directive {
    Directive::new("withlight", DirectiveFlags::CONTENT_BIND)
        .with_init(|_| Ok(InitOutcome::controls_descendants()))
        .with_update(update)
}

fn update(args: &BindingArgs) -> Result<()> {
    let value = args.unwrapped_value()?;
    if !matches!(value, Value::Object(_) | Value::Array(_)) {
        return Err(BindingError::RequiresObject {
            directive: "withlight".into(),
        });
    }

    match data::get::<Vec<Node>>(&args.node, SAVED_CONTENT_KEY) {
        None => {
            let saved: Vec<Node> = args.node.children().iter().map(Node::deep_clone).collect();
            data::set(&args.node, SAVED_CONTENT_KEY, saved);
        }
        Some(saved) => {
            trace!(node = %args.node.id(), "restoring withlight content");
            virtual_elements::empty_node(&args.node);
            for child in saved.iter() {
                args.node.append_child(&child.deep_clone());
            }
        }
    }

    let context = args.context.child(value);
    let mut next = args.node.first_child();
    while let Some(child) = next {
        next = virtual_elements::next_sibling(&child);
        if child.is_element() || child.is_comment() {
            args.engine
                .apply_to_node_and_descendants(&context, &child, true)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::disposal;
    use crate::dom::markup::parse_element;
    use crate::Engine;

    #[test]
    fn rebinds_fresh_content_on_each_change() {
        let engine = Engine::new();
        let person = Value::observable(Value::object([("name", Value::from("Ann"))]));
        let div = parse_element(
            r#"<div data-bind="withlight: person"><span data-bind="text: name">?</span></div>"#,
        )
        .unwrap();
        engine
            .apply_bindings(Value::object([("person", person.clone())]), &div)
            .unwrap();
        assert_eq!(div.text_content(), "Ann");
        let first = div.children()[0].clone();
        assert_eq!(disposal::pending_callbacks(&first), 1);

        person
            .call(&[Value::object([("name", Value::from("Bo"))])])
            .unwrap();
        assert_eq!(div.text_content(), "Bo");
        assert_eq!(div.child_count(), 1);
        assert_ne!(div.children()[0], first);
        // The replaced span was disposed.
        assert_eq!(disposal::pending_callbacks(&first), 0);
    }

    #[test]
    fn parent_data_is_reachable() {
        let engine = Engine::new();
        let data = Value::object([
            ("inner", Value::object([("x", Value::from(1))])),
            ("label", Value::from("L")),
        ]);
        let div = parse_element(
            r#"<div data-bind="withlight: inner"><b data-bind="text: $parent.label + x"></b></div>"#,
        )
        .unwrap();
        engine.apply_bindings(data, &div).unwrap();
        assert_eq!(div.text_content(), "L1");
    }

    #[test]
    fn requires_an_object() {
        let engine = Engine::new();
        let div = parse_element(r#"<div data-bind="withlight: 5"></div>"#).unwrap();
        assert_eq!(
            engine.apply_bindings(Value::Null, &div),
            Err(BindingError::RequiresObject {
                directive: "withlight".into()
            })
        );
    }
}
