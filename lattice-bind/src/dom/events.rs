//! Native-style events.
//!
//! Listeners are registered per node and event type. [`trigger_event`]
//! dispatches an event at a target and bubbles it to the root unless a
//! listener stops propagation.
//!
//! Clicking a checkbox or radio button flips its `checked` state before
//! listeners run, and the flip is undone if a listener prevents the default
//! action. No other default actions are simulated.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use tracing::trace;

use super::{data, Node};
use crate::value::Value;

const LISTENERS_KEY: &str = "__event_listeners__";

type Listener = Rc<dyn Fn(&Event)>;
type Listeners = RefCell<Vec<(String, Listener)>>;

struct EventInner {
    event_type: String,
    target: Node,
    default_prevented: Cell<bool>,
    propagation_stopped: Cell<bool>,
}

/// An event being dispatched. Clones share state.
#[derive(Clone)]
pub struct Event(Rc<EventInner>);

impl Event {
    pub fn new(event_type: &str, target: &Node) -> Self {
        Event(Rc::new(EventInner {
            event_type: event_type.to_string(),
            target: target.clone(),
            default_prevented: Cell::new(false),
            propagation_stopped: Cell::new(false),
        }))
    }

    pub fn event_type(&self) -> &str {
        &self.0.event_type
    }

    pub fn target(&self) -> &Node {
        &self.0.target
    }

    pub fn prevent_default(&self) {
        self.0.default_prevented.set(true);
    }

    pub fn default_prevented(&self) -> bool {
        self.0.default_prevented.get()
    }

    pub fn stop_propagation(&self) {
        self.0.propagation_stopped.set(true);
    }

    pub fn propagation_stopped(&self) -> bool {
        self.0.propagation_stopped.get()
    }

    /// An object view of the event for binding expressions:
    /// `type`, `target`, `preventDefault()` and `stopPropagation()`.
    pub fn to_value(&self) -> Value {
        let prevent = self.clone();
        let stop = self.clone();
        Value::object([
            ("type", Value::from(self.event_type())),
            ("target", Value::Node(self.target().clone())),
            (
                "preventDefault",
                Value::function(move |_| {
                    prevent.prevent_default();
                    Ok(Value::Undefined)
                }),
            ),
            (
                "stopPropagation",
                Value::function(move |_| {
                    stop.stop_propagation();
                    Ok(Value::Undefined)
                }),
            ),
        ])
    }
}

/// Listen for `event_type` events reaching `node`.
pub fn register_event_handler<F>(node: &Node, event_type: &str, handler: F)
where
    F: Fn(&Event) + 'static,
{
    let entry = (event_type.to_string(), Rc::new(handler) as Listener);
    match data::get::<Listeners>(node, LISTENERS_KEY) {
        Some(listeners) => listeners.borrow_mut().push(entry),
        None => data::set(node, LISTENERS_KEY, RefCell::new(vec![entry])),
    }
}

/// Number of listeners registered on `node` for `event_type`.
pub fn listener_count(node: &Node, event_type: &str) -> usize {
    data::get::<Listeners>(node, LISTENERS_KEY)
        .map(|listeners| {
            listeners
                .borrow()
                .iter()
                .filter(|(kind, _)| kind == event_type)
                .count()
        })
        .unwrap_or(0)
}

fn is_checkable(node: &Node) -> Option<String> {
    if node.tag_name() != "input" {
        return None;
    }
    let kind = node.get_attribute("type")?.to_ascii_lowercase();
    matches!(kind.as_str(), "checkbox" | "radio").then_some(kind)
}

fn radio_group(node: &Node) -> Vec<Node> {
    let Some(name) = node.get_attribute("name") else {
        return vec![node.clone()];
    };
    node.root()
        .descendants()
        .into_iter()
        .filter(|other| {
            other.tag_name() == "input"
                && other.get_attribute("type").as_deref() == Some("radio")
                && other.get_attribute("name").as_deref() == Some(name.as_str())
        })
        .collect()
}

/// Dispatch `event_type` at `target`, bubbling to the root.
pub fn trigger_event(target: &Node, event_type: &str) -> Event {
    let event = Event::new(event_type, target);

    // Checkable inputs toggle before listeners observe the click.
    let mut undo: Vec<(Node, bool)> = Vec::new();
    if event_type == "click" {
        match is_checkable(target).as_deref() {
            Some("checkbox") => {
                undo.push((target.clone(), target.checked()));
                target.set_checked(!target.checked());
            }
            Some(_) => {
                for radio in radio_group(target) {
                    undo.push((radio.clone(), radio.checked()));
                    radio.set_checked(&radio == target);
                }
            }
            None => {}
        }
    }

    trace!(node = %target.id(), event = event_type, "dispatching event");

    let mut current = Some(target.clone());
    while let Some(node) = current {
        let listeners: Vec<Listener> = data::get::<Listeners>(&node, LISTENERS_KEY)
            .map(|listeners| {
                listeners
                    .borrow()
                    .iter()
                    .filter(|(kind, _)| kind == event_type)
                    .map(|(_, listener)| listener.clone())
                    .collect()
            })
            .unwrap_or_default();

        for listener in listeners {
            listener(&event);
        }

        if event.propagation_stopped() {
            break;
        }
        current = node.parent();
    }

    if event.default_prevented() {
        for (node, checked) in undo {
            node.set_checked(checked);
        }
    }

    event
}
