//! `event`, `click` and `submit`.
//!
//! Handlers are read from the directive table when the event fires, so a
//! re-evaluated table takes effect without re-registering listeners. A
//! handler is called with the node's data and the event and runs untracked.
//! Unless it returns exactly `true`, the event's default action is
//! prevented. `<event>Bubble: false` in the same table stops propagation.

use tracing::error;

use crate::binding::{BindingArgs, Directive, DirectiveFlags, InitOutcome, ValueAccessor};
use crate::dom::events;
use crate::error::{BindingError, Result};
use crate::reactive::ReactiveContext;
use crate::value::Value;

pub(crate) fn directives() -> Vec<Directive> {
    vec![
        Directive::new(
            "event",
            DirectiveFlags::EVENT_HANDLER | DirectiveFlags::TWO_LEVEL,
        )
        .with_init(event_init),
        Directive::new("click", DirectiveFlags::EVENT_HANDLER).with_init(|args| {
            listen(args, "click", args.value.clone());
            Ok(InitOutcome::proceed())
        }),
        Directive::new("submit", DirectiveFlags::EVENT_HANDLER).with_init(submit_init),
    ]
}

/// `event: {click: f, keyup: g}`, `event.click: f` or `event: handlers`.
fn event_init(args: &BindingArgs) -> Result<InitOutcome> {
    if let Some(name) = &args.sub_key {
        listen(args, name, args.value.clone());
        return Ok(InitOutcome::proceed());
    }
    let names: Vec<String> = match args.value().as_object() {
        Some(table) => table.borrow().keys().cloned().collect(),
        None => Vec::new(),
    };
    for name in names {
        let table = args.value.clone();
        let key = name.clone();
        listen(args, &name, ValueAccessor::new(move || table.get().get(&key)));
    }
    Ok(InitOutcome::proceed())
}

fn listen(args: &BindingArgs, event_type: &str, handler: ValueAccessor) {
    let node_id = args.node.id();
    let bindings = args.bindings.clone();
    let context = args.context.clone();
    let name = event_type.to_string();
    events::register_event_handler(&args.node, event_type, move |event| {
        let handler = handler.get();
        if !handler.is_truthy() {
            return;
        }
        let call_args = [context.data().clone(), event.to_value()];
        let returned = ReactiveContext::untracked(|| handler.call(&call_args));
        let allow_default = match returned {
            Ok(value) => matches!(value, Value::Bool(true)),
            Err(err) => {
                error!(node = %node_id, event = %name, error = %err, "event handler failed");
                false
            }
        };
        if !allow_default {
            event.prevent_default();
        }

        let bubble = bindings.get(&format!("{name}Bubble")).unwrap_observable();
        if matches!(bubble, Ok(Value::Bool(false))) {
            event.stop_propagation();
        }
    });
}

fn submit_init(args: &BindingArgs) -> Result<InitOutcome> {
    if !args.value().is_function() {
        return Err(BindingError::NotAFunction {
            directive: "submit".into(),
        });
    }
    let handler = args.value.clone();
    let form = args.node.clone();
    events::register_event_handler(&args.node, "submit", move |event| {
        let handler = handler.get();
        let returned = ReactiveContext::untracked(|| handler.call(&[Value::Node(form.clone())]));
        match returned {
            Ok(Value::Bool(true)) => {}
            Ok(_) => event.prevent_default(),
            Err(err) => {
                error!(node = %form.id(), error = %err, "submit handler failed");
                event.prevent_default();
            }
        }
    });
    Ok(InitOutcome::proceed())
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;
    use crate::dom::markup::parse_element;
    use crate::dom::Node;
    use crate::Engine;

    fn recorder() -> (Rc<RefCell<Vec<Value>>>, Value) {
        let calls = Rc::new(RefCell::new(Vec::new()));
        let log = calls.clone();
        let handler = Value::function(move |args| {
            let passed = args.iter().filter(|arg| !matches!(arg, Value::Undefined));
            log.borrow_mut().extend(passed.cloned());
            Ok(Value::Undefined)
        });
        (calls, handler)
    }

    #[test]
    fn click_passes_data_and_prevents_default() {
        let (calls, handler) = recorder();
        let data = Value::object([("go", handler)]);
        let button = parse_element(r#"<button data-bind="click: go"></button>"#).unwrap();
        Engine::new().apply_bindings(data.clone(), &button).unwrap();

        let event = events::trigger_event(&button, "click");
        assert!(event.default_prevented());
        let calls = calls.borrow();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0], data);
        assert_eq!(calls[1].get("type"), Value::from("click"));
    }

    #[test]
    fn returning_true_keeps_the_default_action() {
        let div = parse_element(
            r#"<div><input type="checkbox" data-bind="click: function(){ return true }"></div>"#,
        )
        .unwrap();
        Engine::new().apply_bindings(Value::Null, &div).unwrap();
        let input = div.children()[0].clone();

        let event = events::trigger_event(&input, "click");
        assert!(!event.default_prevented());
        assert!(input.checked());
    }

    #[test]
    fn prevented_click_undoes_the_checkbox_toggle() {
        let input = parse_element(r#"<input type="checkbox" data-bind="click: function(){}">"#)
            .unwrap();
        let div = Node::element("div");
        div.append_child(&input);
        Engine::new().apply_bindings(Value::Null, &div).unwrap();

        events::trigger_event(&input, "click");
        assert!(!input.checked());
    }

    #[test]
    fn event_groups_and_bubbling() {
        let (inner_calls, inner) = recorder();
        let (outer_calls, outer) = recorder();
        let div = parse_element(
            r#"<div data-bind="event: {focus: outer, keyup: outer}"><span data-bind="event: {keyup: inner}, keyupBubble: false"></span></div>"#,
        )
        .unwrap();
        Engine::new()
            .apply_bindings(Value::object([("inner", inner), ("outer", outer)]), &div)
            .unwrap();
        let span = div.children()[0].clone();

        events::trigger_event(&span, "keyup");
        assert_eq!(inner_calls.borrow().len(), 2);
        assert!(outer_calls.borrow().is_empty());

        events::trigger_event(&div, "focus");
        assert_eq!(outer_calls.borrow().len(), 2);
    }

    #[test]
    fn event_table_from_data() {
        let (calls, handler) = recorder();
        let handlers = Value::object([("mouseover", handler)]);
        let div = parse_element(r#"<div data-bind="event: handlers || {}"></div>"#).unwrap();
        Engine::new()
            .apply_bindings(Value::object([("handlers", handlers)]), &div)
            .unwrap();
        events::trigger_event(&div, "mouseover");
        assert_eq!(calls.borrow().len(), 2);
    }

    #[test]
    fn handler_is_read_when_the_event_fires() {
        let (first_calls, first) = recorder();
        let (second_calls, second) = recorder();
        let current = Value::observable(first);
        let button = parse_element(r#"<button data-bind="click: current()"></button>"#).unwrap();
        Engine::new()
            .apply_bindings(Value::object([("current", current.clone())]), &button)
            .unwrap();

        current.call(&[second]).unwrap();
        events::trigger_event(&button, "click");
        assert!(first_calls.borrow().is_empty());
        assert_eq!(second_calls.borrow().len(), 2);
    }

    #[test]
    fn submit_requires_a_function() {
        let form = parse_element(r#"<form data-bind="submit: 5"></form>"#).unwrap();
        assert_eq!(
            Engine::new().apply_bindings(Value::Null, &form),
            Err(BindingError::NotAFunction {
                directive: "submit".into()
            })
        );
    }

    #[test]
    fn submit_receives_the_form() {
        let (calls, handler) = recorder();
        let form = parse_element(r#"<form data-bind="submit: save"></form>"#).unwrap();
        Engine::new()
            .apply_bindings(Value::object([("save", handler)]), &form)
            .unwrap();
        let event = events::trigger_event(&form, "submit");
        assert!(event.default_prevented());
        assert_eq!(*calls.borrow(), vec![Value::Node(form.clone())]);
    }
}
