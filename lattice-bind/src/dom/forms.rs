//! Form control values.
//!
//! `<option>` elements can carry values of any type: a non-string value is
//! kept in the option's out-of-band data and its display string goes into
//! the `value` property. `<select>` reads and writes through its options.

use super::{data, Node};
use crate::value::Value;

const OPTION_VALUE_KEY: &str = "__option_value__";

/// The `<option>` children of a `<select>`.
pub fn options(select: &Node) -> Vec<Node> {
    select
        .children()
        .into_iter()
        .filter(|child| child.tag_name() == "option")
        .collect()
}

pub fn is_multiple(select: &Node) -> bool {
    select.has_attribute("multiple")
}

/// Index of the first selected option.
pub fn selected_index(select: &Node) -> Option<usize> {
    options(select).iter().position(Node::selected)
}

/// Select a single option by index, or clear the selection.
pub fn set_selected_index(select: &Node, index: Option<usize>) {
    for (i, option) in options(select).iter().enumerate() {
        option.set_selected(Some(i) == index);
    }
}

/// Change one option's selection state, keeping single-select exclusive.
pub fn set_option_selected(option: &Node, selected: bool) {
    if selected {
        if let Some(select) = option.parent().filter(|p| p.tag_name() == "select") {
            if !is_multiple(&select) {
                for other in options(&select) {
                    other.set_selected(false);
                }
            }
        }
    }
    option.set_selected(selected);
}

/// Read the current value of a control.
pub fn read_value(node: &Node) -> Value {
    match node.tag_name() {
        "option" => {
            if let Some(stored) = data::get::<Value>(node, OPTION_VALUE_KEY) {
                return (*stored).clone();
            }
            if node.has_attribute("value") || !node.value().is_empty() {
                Value::String(node.value())
            } else {
                Value::String(node.text_content())
            }
        }
        "select" => match selected_index(node) {
            Some(index) => read_value(&options(node)[index]),
            None => Value::Undefined,
        },
        _ => Value::String(node.value()),
    }
}

/// Write a value into a control.
///
/// Writing to a `<select>` selects the first option whose value loosely
/// equals `value`, or clears the selection when none does.
pub fn write_value(node: &Node, value: &Value) {
    match node.tag_name() {
        "option" => match value {
            Value::String(s) => {
                data::remove(node, OPTION_VALUE_KEY);
                node.set_value(s);
            }
            other => {
                data::set(node, OPTION_VALUE_KEY, other.clone());
                node.set_value(&display_value(other));
            }
        },
        "select" => {
            let index = options(node)
                .iter()
                .position(|option| read_value(option).loose_eq(value));
            set_selected_index(node, index);
        }
        _ => node.set_value(&display_value(value)),
    }
}

/// Values of every selected option, in document order.
pub fn selected_values(select: &Node) -> Vec<Value> {
    options(select)
        .iter()
        .filter(|option| option.selected())
        .map(read_value)
        .collect()
}

/// Input type in lowercase, defaulting to `text`.
pub fn input_type(node: &Node) -> String {
    node.get_attribute("type")
        .map(|t| t.to_ascii_lowercase())
        .unwrap_or_else(|| "text".to_string())
}

fn display_value(value: &Value) -> String {
    if value.is_nullish() {
        String::new()
    } else {
        value.to_string()
    }
}
