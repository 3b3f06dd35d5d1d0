//! Two-way form directives: `value`, `checked`, `hasfocus`, `options` and
//! `selectedOptions`.
//!
//! Each listens for the events that signal a user edit and writes the
//! control's state back with [`write_model`]: straight into a bound cell,
//! or through the property writer generated for a plain property path.
//! Writes run untracked so a listener fired during a binding pass does not
//! subscribe that pass to the model.

use std::rc::Rc;

use tracing::{error, trace};

use crate::binding::{
    AllBindings, BindingArgs, Directive, DirectiveFlags, InitOutcome, ValueAccessor,
};
use crate::dom::{disposal, events, forms, markup, Node};
use crate::error::{BindingError, Result};
use crate::reactive::ReactiveContext;
use crate::scheduler;
use crate::value::Value;

use super::content::assign_unique_name;
use super::{display_text, write_model};

pub(crate) fn directives() -> Vec<Directive> {
    vec![
        Directive::new("value", DirectiveFlags::TWO_WAY)
            .with_init(value_init)
            .with_update(value_update),
        Directive::new("options", DirectiveFlags::CONTENT_SET).with_update(options_update),
        Directive::new("selectedOptions", DirectiveFlags::TWO_WAY)
            .with_init(selected_options_init)
            .with_update(selected_options_update),
        Directive::new("checked", DirectiveFlags::TWO_WAY)
            .with_init(checked_init)
            .with_update(checked_update),
        Directive::new("hasfocus", DirectiveFlags::TWO_WAY)
            .with_init(hasfocus_init)
            .with_update(hasfocus_update),
    ]
}

/// Register `write` for `event_type`, logging the errors it returns.
fn on_event<F>(node: &Node, event_type: &str, write: F)
where
    F: Fn() -> Result<()> + 'static,
{
    let node_id = node.id();
    let name = event_type.to_string();
    events::register_event_handler(node, event_type, move |_| {
        if let Err(err) = ReactiveContext::untracked(&write) {
            error!(node = %node_id, event = %name, error = %err, "model write failed");
        }
    });
}

fn require_select(node: &Node, directive: &str) -> Result<()> {
    if node.tag_name() == "select" {
        Ok(())
    } else {
        Err(BindingError::RequiresElement {
            directive: directive.into(),
            tag: "select".into(),
        })
    }
}

// ----------------------------------------------------------------------------
// value
// ----------------------------------------------------------------------------

/// Listen for `change` plus every `valueUpdate` event. An event named
/// `after<event>` writes on the next turn instead, once the control has
/// taken the edit.
fn value_init(args: &BindingArgs) -> Result<InitOutcome> {
    let mut event_names = vec!["change".to_string()];
    match args.bindings.get("valueUpdate").unwrap_observable()? {
        Value::String(name) => event_names.push(name),
        Value::Array(names) => {
            event_names.extend(names.borrow().iter().map(Value::to_display_string));
        }
        _ => {}
    }
    let mut seen = Vec::with_capacity(event_names.len());
    event_names.retain(|name| {
        let first = !seen.contains(name);
        if first {
            seen.push(name.clone());
        }
        first
    });

    let write: Rc<dyn Fn()> = {
        let node = args.node.clone();
        let model = args.value.clone();
        let bindings = args.bindings.clone();
        Rc::new(move || {
            ReactiveContext::untracked(|| {
                write_model(&model.get(), &bindings, "value", forms::read_value(&node));
            })
        })
    };
    for name in event_names {
        let (event_type, deferred) = match name.strip_prefix("after") {
            Some(event_type) => (event_type.to_string(), true),
            None => (name, false),
        };
        trace!(node = %args.node.id(), event = %event_type, deferred, "value listens");
        let write = write.clone();
        events::register_event_handler(&args.node, &event_type, move |_| {
            if deferred {
                let write = write.clone();
                scheduler::defer(move || write());
            } else {
                write();
            }
        });
    }
    Ok(InitOutcome::proceed())
}

fn value_update(args: &BindingArgs) -> Result<()> {
    let node = &args.node;
    let is_select = node.tag_name() == "select";
    if is_select {
        // Re-run when the options change.
        args.bindings.get("options").unwrap_observable()?;
    }

    let new_value = args.unwrapped_value()?;
    let element_value = forms::read_value(node);
    let mut changed = !new_value.loose_eq(&element_value);

    // 0 loosely equals "", but writing 0 into an empty control must show it.
    let zero = Value::Number(0.0);
    if new_value.strict_eq(&zero)
        && !element_value.strict_eq(&zero)
        && !element_value.strict_eq(&Value::from("0"))
    {
        changed = true;
    }
    // With a caption, "no selection" and "caption selected" both read as
    // undefined; select the caption.
    if is_select
        && !changed
        && matches!(new_value, Value::Undefined)
        && forms::selected_index(node).is_none()
    {
        changed = true;
    }

    if changed {
        forms::write_value(node, &new_value);
        // A value the options cannot show is rejected back to the model.
        if is_select && !new_value.strict_eq(&forms::read_value(node)) {
            trace!(node = %node.id(), "value not among options");
            events::trigger_event(node, "change");
        }
    }
    Ok(())
}

// ----------------------------------------------------------------------------
// options / selectedOptions
// ----------------------------------------------------------------------------

/// Rebuild a `<select>`'s options from an array.
///
/// `optionsCaption` prepends an option whose value is `undefined`.
/// `optionsValue` names the item property used as each option's value and
/// `optionsText` names the property, or is a function, giving its text.
/// Options whose values were selected before the rebuild stay selected.
fn options_update(args: &BindingArgs) -> Result<()> {
    let select = &args.node;
    require_select(select, "options")?;

    let previously_selected = forms::selected_values(select);
    let value = args.unwrapped_value()?;

    for option in forms::options(select) {
        disposal::remove_node(&option);
    }
    if !value.is_truthy() {
        return Ok(());
    }

    let items: Vec<Value> = match &value {
        Value::Array(items) => items.borrow().clone(),
        other => vec![other.clone()],
    };

    let caption = args.bindings.get("optionsCaption").unwrap_observable()?;
    if caption.is_truthy() {
        let option = Node::element("option");
        markup::parse_into(&option, &caption.to_display_string());
        forms::write_value(&option, &Value::Undefined);
        select.append_child(&option);
    }

    let value_property = args.bindings.get("optionsValue").unwrap_observable()?;
    let text_source = args.bindings.get("optionsText").unwrap_observable()?;
    for item in &items {
        let option_value = match &value_property {
            Value::String(property) => item.get(property),
            _ => item.clone(),
        }
        .unwrap_observable()?;

        let option = Node::element("option");
        forms::write_value(&option, &option_value);
        let text = match &text_source {
            Value::Function(_) => text_source.call(std::slice::from_ref(item))?,
            Value::String(property) => item.get(property),
            _ => option_value.clone(),
        };
        option.set_text_content(&display_text(&text.unwrap_observable()?));
        select.append_child(&option);
    }

    let mut retained = 0;
    for option in forms::options(select) {
        let option_value = forms::read_value(&option);
        if previously_selected.iter().any(|v| v.strict_eq(&option_value)) {
            forms::set_option_selected(&option, true);
            retained += 1;
        }
    }
    trace!(node = %select.id(), options = items.len(), retained, "options rebuilt");
    Ok(())
}

fn selected_options_init(args: &BindingArgs) -> Result<InitOutcome> {
    let node = args.node.clone();
    let model = args.value.clone();
    let bindings = args.bindings.clone();
    on_event(&args.node, "change", move || {
        let selected = Value::array(forms::selected_values(&node));
        write_model(&model.get(), &bindings, "selectedOptions", selected);
        Ok(())
    });
    Ok(InitOutcome::proceed())
}

fn selected_options_update(args: &BindingArgs) -> Result<()> {
    require_select(&args.node, "selectedOptions")?;
    args.bindings.get("options").unwrap_observable()?;

    if let Value::Array(selected) = args.unwrapped_value()? {
        let selected = selected.borrow().clone();
        for option in forms::options(&args.node) {
            let value = forms::read_value(&option);
            forms::set_option_selected(&option, selected.iter().any(|v| v.strict_eq(&value)));
        }
    }
    Ok(())
}

// ----------------------------------------------------------------------------
// checked
// ----------------------------------------------------------------------------

fn checked_init(args: &BindingArgs) -> Result<InitOutcome> {
    let node = args.node.clone();
    let model = args.value.clone();
    let bindings = args.bindings.clone();
    on_event(&args.node, "click", move || write_checked(&node, &model, &bindings));

    if forms::input_type(&args.node) == "radio" && !args.node.has_attribute("name") {
        assign_unique_name(&args.engine, &args.node);
    }
    Ok(InitOutcome::proceed())
}

/// A checkbox writes its state; a checkbox bound to an array adds or
/// removes its value instead. A radio writes its value when it becomes
/// checked.
fn write_checked(node: &Node, model: &ValueAccessor, bindings: &AllBindings) -> Result<()> {
    let is_checkbox = match forms::input_type(node).as_str() {
        "checkbox" => true,
        "radio" if node.checked() => false,
        _ => return Ok(()),
    };
    let to_write = if is_checkbox {
        Value::Bool(node.checked())
    } else {
        Value::String(node.value())
    };

    let model = model.get();
    if is_checkbox {
        if let Value::Array(items) = model.unwrap_observable()? {
            let own = Value::String(node.value());
            let existing = items.borrow().iter().position(|item| item.strict_eq(&own));
            let changed = match (node.checked(), existing) {
                (true, None) => {
                    items.borrow_mut().push(own);
                    true
                }
                (false, Some(index)) => {
                    items.borrow_mut().remove(index);
                    true
                }
                _ => false,
            };
            if let (true, Value::Observable(cell)) = (changed, &model) {
                cell.notify();
            }
            return Ok(());
        }
    }
    write_model(&model, bindings, "checked", to_write);
    Ok(())
}

fn checked_update(args: &BindingArgs) -> Result<()> {
    let value = args.unwrapped_value()?;
    let node = &args.node;
    let own = Value::String(node.value());
    match forms::input_type(node).as_str() {
        "checkbox" => {
            let checked = match &value {
                Value::Array(items) => items.borrow().iter().any(|item| item.strict_eq(&own)),
                other => other.is_truthy(),
            };
            node.set_checked(checked);
        }
        "radio" => node.set_checked(own.loose_eq(&value)),
        _ => {}
    }
    Ok(())
}

// ----------------------------------------------------------------------------
// hasfocus
// ----------------------------------------------------------------------------

fn hasfocus_init(args: &BindingArgs) -> Result<InitOutcome> {
    for (event_type, focused) in [
        ("focus", true),
        ("focusin", true),
        ("blur", false),
        ("focusout", false),
    ] {
        let model = args.value.clone();
        let bindings = args.bindings.clone();
        on_event(&args.node, event_type, move || {
            let model = model.get();
            let focused = Value::Bool(focused);
            if !focused.loose_eq(&model.unwrap_observable()?) {
                write_model(&model, &bindings, "hasfocus", focused);
            }
            Ok(())
        });
    }
    Ok(InitOutcome::proceed())
}

fn hasfocus_update(args: &BindingArgs) -> Result<()> {
    let focused = args.unwrapped_value()?.is_truthy();
    args.node.set_focused(focused);
    events::trigger_event(&args.node, if focused { "focusin" } else { "focusout" });
    Ok(())
}
