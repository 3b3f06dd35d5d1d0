//! Directives that write a node's own content, attributes or styling:
//! `text`, `html`, `visible`, `enable`, `disable`, `css`, `style`, `attr`
//! and `uniqueName`.

use tracing::trace;

use crate::binding::{BindingArgs, Directive, DirectiveFlags, Engine, InitOutcome};
use crate::dom::{markup, virtual_elements, Node};
use crate::error::Result;
use crate::value::Value;

use super::{display_text, is_absent};

pub(crate) fn directives() -> Vec<Directive> {
    vec![
        Directive::new(
            "text",
            DirectiveFlags::CONTENT_SET | DirectiveFlags::VIRTUAL_ALLOWED,
        )
        .with_init(text_init)
        .with_update(text_update),
        Directive::new(
            "html",
            DirectiveFlags::CONTENT_SET | DirectiveFlags::CONTENT_BIND,
        )
        .with_init(|_| Ok(InitOutcome::controls_descendants()))
        .with_update(html_update),
        Directive::new("visible", DirectiveFlags::empty()).with_update(visible_update),
        Directive::new("enable", DirectiveFlags::empty())
            .with_update(|args| set_enabled(&args.node, args.unwrapped_value()?.is_truthy())),
        Directive::new("disable", DirectiveFlags::empty())
            .with_update(|args| set_enabled(&args.node, !args.unwrapped_value()?.is_truthy())),
        Directive::new("css", DirectiveFlags::TWO_LEVEL).with_update(css_update),
        Directive::new("style", DirectiveFlags::TWO_LEVEL).with_update(style_update),
        Directive::new("attr", DirectiveFlags::TWO_LEVEL).with_update(attr_update),
        Directive::new("uniqueName", DirectiveFlags::NO_VALUE).with_init(unique_name_init),
    ]
}

/// Leave the node with exactly one text child.
fn text_init(args: &BindingArgs) -> Result<InitOutcome> {
    let children = virtual_elements::child_nodes(&args.node);
    if !matches!(children.as_slice(), [only] if only.is_text()) {
        virtual_elements::set_children(&args.node, &[Node::text("")]);
    }
    Ok(InitOutcome::proceed())
}

fn text_update(args: &BindingArgs) -> Result<()> {
    let text = display_text(&args.unwrapped_value()?);
    let children = virtual_elements::child_nodes(&args.node);
    match children.as_slice() {
        [only] if only.is_text() => only.set_data(&text),
        _ => virtual_elements::set_children(&args.node, &[Node::text(&text)]),
    }
    Ok(())
}

/// Replace the content with parsed markup. The new nodes are not bound.
fn html_update(args: &BindingArgs) -> Result<()> {
    let html = display_text(&args.unwrapped_value()?);
    trace!(node = %args.node.id(), len = html.len(), "setting html content");
    virtual_elements::set_children(&args.node, &markup::parse(&html));
    Ok(())
}

fn visible_update(args: &BindingArgs) -> Result<()> {
    let visible = args.unwrapped_value()?.is_truthy();
    let currently_visible = args.node.style("display").as_deref() != Some("none");
    if visible && !currently_visible {
        args.node.set_style("display", "");
    } else if !visible && currently_visible {
        args.node.set_style("display", "none");
    }
    Ok(())
}

fn set_enabled(node: &Node, enabled: bool) -> Result<()> {
    let disabled = node.has_attribute("disabled");
    if enabled && disabled {
        node.remove_attribute("disabled");
    } else if !enabled && !disabled {
        node.set_attribute("disabled", "");
    }
    Ok(())
}

/// The `(name, value)` pairs a two-level directive applies.
///
/// With a sub-key the whole value belongs to that one name; otherwise the
/// value is a table of names, each unwrapped on its own.
fn named_values(args: &BindingArgs) -> Result<Vec<(String, Value)>> {
    let value = args.unwrapped_value()?;
    if let Some(name) = &args.sub_key {
        return Ok(vec![(name.clone(), value)]);
    }
    let entries: Vec<(String, Value)> = match value.as_object() {
        Some(object) => object
            .borrow()
            .iter()
            .map(|(name, value)| (name.clone(), value.clone()))
            .collect(),
        None => return Ok(Vec::new()),
    };
    entries
        .into_iter()
        .map(|(name, value)| Ok((name, value.unwrap_observable()?)))
        .collect()
}

fn css_update(args: &BindingArgs) -> Result<()> {
    for (class, on) in named_values(args)? {
        args.node.toggle_class(&class, on.is_truthy());
    }
    Ok(())
}

fn style_update(args: &BindingArgs) -> Result<()> {
    for (property, value) in named_values(args)? {
        let value = if value.is_truthy() {
            value.to_display_string()
        } else {
            String::new()
        };
        args.node.set_style(&property, &value);
    }
    Ok(())
}

fn attr_update(args: &BindingArgs) -> Result<()> {
    for (name, value) in named_values(args)? {
        if is_absent(&value) {
            args.node.remove_attribute(&name);
        } else {
            args.node.set_attribute(&name, &value.to_display_string());
        }
    }
    Ok(())
}

fn unique_name_init(args: &BindingArgs) -> Result<InitOutcome> {
    if args.unwrapped_value()?.is_truthy() {
        assign_unique_name(&args.engine, &args.node);
    }
    Ok(InitOutcome::proceed())
}

/// Give `node` a generated `name` attribute.
pub(crate) fn assign_unique_name(engine: &Engine, node: &Node) {
    node.set_attribute("name", &engine.next_unique_name());
}
