//! Integration Tests for the Control-Flow Directives
//!
//! These tests cover the directives that own their descendants: `repeat`,
//! `switch`/`case`, the template family and `withlight`.

use std::cell::Cell;
use std::rc::Rc;

use lattice_bind::dom::markup::{inner_markup, parse, parse_element};
use lattice_bind::dom::{disposal, Node};
use lattice_bind::{BindingError, Engine, Value};

fn numbers(items: &[i32]) -> Value {
    Value::array(items.iter().copied().map(Value::from))
}

fn element_children(node: &Node) -> Vec<Node> {
    node.children().into_iter().filter(Node::is_element).collect()
}

fn shown(div: &Node) -> Vec<bool> {
    element_children(div)
        .iter()
        .map(|child| child.child_count() > 0)
        .collect()
}

/// Test that shrinking a repeat disposes exactly the surplus copies and that
/// growing it appends new copies right after the survivor.
#[test]
fn repeat_shrinks_and_grows_in_place() {
    let engine = Engine::new();
    let items = Value::observable(numbers(&[1, 2, 3]));
    let ul = parse_element(
        r#"<ul><li data-bind="repeat: {foreach: items, bind: 'text: $item()'}"></li></ul>"#,
    )
    .unwrap();
    engine
        .apply_bindings(Value::object([("items", items.clone())]), &ul)
        .unwrap();
    assert_eq!(ul.text_content(), "123");

    let disposed = Rc::new(Cell::new(0));
    let copies = element_children(&ul);
    for copy in &copies {
        let disposed = disposed.clone();
        disposal::add_disposal_callback(copy, move || disposed.set(disposed.get() + 1));
    }

    items.call(&[numbers(&[1])]).unwrap();
    assert_eq!(element_children(&ul), vec![copies[0].clone()]);
    assert_eq!(disposed.get(), 2);
    assert_eq!(ul.text_content(), "1");

    items.call(&[numbers(&[1, 2, 3, 4])]).unwrap();
    let grown = element_children(&ul);
    assert_eq!(grown.len(), 4);
    assert_eq!(grown[0], copies[0]);
    assert_eq!(grown[1].previous_sibling(), Some(copies[0].clone()));
    assert_eq!(ul.text_content(), "1234");
    assert_eq!(disposed.get(), 2);
    assert_eq!(
        grown[3].get_attribute("data-repeat-index").as_deref(),
        Some("3")
    );
}

/// Test that a surviving copy reads whatever item now sits at its index.
#[test]
fn repeat_items_follow_their_index() {
    let engine = Engine::new();
    let letters = |items: &[&str]| Value::array(items.iter().map(|item| Value::from(*item)));
    let items = Value::observable(letters(&["a", "b"]));
    let ul = parse_element(
        r#"<ul><li data-bind="repeat: {foreach: items, index: '$i', item: '$x', bind: 'text: $i + $x()'}"></li></ul>"#,
    )
    .unwrap();
    engine
        .apply_bindings(Value::object([("items", items.clone())]), &ul)
        .unwrap();
    assert_eq!(ul.text_content(), "0a1b");

    items.call(&[letters(&["z", "y"])]).unwrap();
    assert_eq!(ul.text_content(), "0z1y");
}

/// Test that the first matching case wins and the else case is skipped.
#[test]
fn switch_picks_the_first_match() {
    let engine = Engine::new();
    let div = parse_element(
        r#"<div data-bind="switch: 2"><p data-bind="case: 1">one</p><p data-bind="case: 2">two</p><p data-bind="case: $else">else</p></div>"#,
    )
    .unwrap();
    engine.apply_bindings(Value::Null, &div).unwrap();
    assert_eq!(shown(&div), vec![false, true, false]);
    assert_eq!(div.text_content(), "two");
}

/// Test that reordering cases changes the winner only through sibling order.
#[test]
fn switch_case_order_decides() {
    let engine = Engine::new();
    let div = parse_element(
        r#"<div data-bind="switch: 2"><p data-bind="case: $else">else</p><p data-bind="case: 2">two</p><p data-bind="case: 1">one</p></div>"#,
    )
    .unwrap();
    engine.apply_bindings(Value::Null, &div).unwrap();
    assert_eq!(shown(&div), vec![true, false, false]);
}

/// Test that changing the switch value re-evaluates every case.
#[test]
fn switch_follows_its_value() {
    let engine = Engine::new();
    let mode = Value::observable(Value::from("view"));
    let div = parse_element(
        r#"<div data-bind="switch: mode"><p data-bind="case: 'view'">v</p><p data-bind="case: ['edit', 'new']">e</p><p data-bind="case: $else">?</p></div>"#,
    )
    .unwrap();
    engine
        .apply_bindings(Value::object([("mode", mode.clone())]), &div)
        .unwrap();
    assert_eq!(div.text_content(), "v");

    mode.call(&[Value::from("new")]).unwrap();
    assert_eq!(div.text_content(), "e");

    mode.call(&[Value::from("gone")]).unwrap();
    assert_eq!(div.text_content(), "?");
}

/// Test nested foreach with a parent lookup.
#[test]
fn nested_foreach_reaches_the_parent() {
    let engine = Engine::new();
    let groups = Value::array([
        Value::object([("name", Value::from("a")), ("items", numbers(&[1, 2]))]),
        Value::object([("name", Value::from("b")), ("items", numbers(&[3]))]),
    ]);
    let div = parse_element(
        r#"<div data-bind="foreach: groups"><ul data-bind="foreach: items"><li data-bind="text: $parent.name + $data"></li></ul></div>"#,
    )
    .unwrap();
    engine
        .apply_bindings(Value::object([("groups", groups)]), &div)
        .unwrap();
    assert_eq!(div.text_content(), "a1a2b3");
}

/// Test that foreach re-renders when its array cell changes.
#[test]
fn foreach_follows_a_cell() {
    let engine = Engine::new();
    let list = Value::observable(numbers(&[1, 2]));
    let ul = parse_element(r#"<ul data-bind="foreach: list"><li data-bind="text: $data"></li></ul>"#)
        .unwrap();
    engine
        .apply_bindings(Value::object([("list", list.clone())]), &ul)
        .unwrap();
    assert_eq!(ul.text_content(), "12");

    list.call(&[numbers(&[3, 4, 5])]).unwrap();
    assert_eq!(ul.text_content(), "345");
    assert_eq!(ul.child_count(), 3);
}

/// Test `with` and `if` inside comment-delimited virtual elements.
#[test]
fn virtual_with_and_if() {
    let engine = Engine::new();
    let shown = Value::observable(Value::from(true));
    let nodes = parse(
        r#"<div><!-- ko with: person --><span data-bind="text: name"></span><!-- ko if: $parent.shown --><b>!</b><!-- /ko --><!-- /ko --></div>"#,
    );
    let div = &nodes[0];
    let data = Value::object([
        ("person", Value::object([("name", Value::from("Ann"))])),
        ("shown", shown.clone()),
    ]);
    engine.apply_bindings(data, div).unwrap();
    assert_eq!(div.text_content(), "Ann!");

    shown.call(&[Value::from(false)]).unwrap();
    assert_eq!(div.text_content(), "Ann");
}

/// Test that withlight binds the node's own content against a new object.
#[test]
fn withlight_rebinds_on_change() {
    let engine = Engine::new();
    let person = Value::observable(Value::object([("name", Value::from("Ann"))]));
    let div = parse_element(
        r#"<div data-bind="withlight: person"><span data-bind="text: name"></span></div>"#,
    )
    .unwrap();
    engine
        .apply_bindings(Value::object([("person", person.clone())]), &div)
        .unwrap();
    assert_eq!(div.text_content(), "Ann");

    person
        .call(&[Value::object([("name", Value::from("Cy"))])])
        .unwrap();
    assert_eq!(div.text_content(), "Cy");
}

/// Test that `if` on a virtual element keeps nested virtual elements inside
/// it, in order.
#[test]
fn virtual_if_keeps_nested_virtual_content_in_order() {
    let engine = Engine::new();
    let nodes = parse(
        "<div><!-- ko if: on --><!-- ko text: a --><!-- /ko -->|<!-- ko text: b --><!-- /ko --><!-- /ko -->!</div>",
    );
    let div = &nodes[0];
    let on = Value::observable(Value::from(true));
    let data = Value::object([
        ("on", on.clone()),
        ("a", Value::from("A")),
        ("b", Value::from("B")),
    ]);
    engine.apply_bindings(data, div).unwrap();
    assert_eq!(div.text_content(), "A|B!");
    assert_eq!(
        inner_markup(div),
        "<!-- ko if: on --><!-- ko text: a -->A<!-- /ko -->|<!-- ko text: b -->B<!-- /ko --><!-- /ko -->!"
    );

    on.call(&[Value::from(false)]).unwrap();
    assert_eq!(div.text_content(), "!");
    on.call(&[Value::from(true)]).unwrap();
    assert_eq!(div.text_content(), "A|B!");
}

/// Test that a virtual foreach renders items whose template holds virtual
/// elements in item order.
#[test]
fn virtual_foreach_with_nested_virtual_elements() {
    let engine = Engine::new();
    let nodes = parse(
        "<ul><!-- ko foreach: items --><!-- ko text: $data --><!-- /ko -->,<!-- /ko -->.</ul>",
    );
    let ul = &nodes[0];
    let items = Value::observable(numbers(&[1, 2, 3]));
    engine
        .apply_bindings(Value::object([("items", items.clone())]), ul)
        .unwrap();
    assert_eq!(ul.text_content(), "1,2,3,.");

    items.call(&[numbers(&[7, 8])]).unwrap();
    assert_eq!(ul.text_content(), "7,8,.");
}

/// Test `case` directives below a foreach: each item claims its own case.
#[test]
fn cases_under_foreach() {
    let engine = Engine::new();
    let div = parse_element(
        r#"<div data-bind="switch: 2"><ul data-bind="foreach: items"><li data-bind="case: $data"><b data-bind="text: $data"></b></li></ul></div>"#,
    )
    .unwrap();
    engine
        .apply_bindings(Value::object([("items", numbers(&[1, 2, 3]))]), &div)
        .unwrap();
    assert_eq!(div.text_content(), "2");
}

/// Test a `case` inside a `with` that renders again for a new object.
#[test]
fn case_under_rerendered_with() {
    let engine = Engine::new();
    let obj = Value::observable(Value::object([("n", Value::from(3))]));
    let div = parse_element(
        r#"<div data-bind="switch: 1"><section data-bind="with: obj"><p data-bind="case: n">one</p></section></div>"#,
    )
    .unwrap();
    engine
        .apply_bindings(Value::object([("obj", obj.clone())]), &div)
        .unwrap();
    assert_eq!(div.text_content(), "");

    obj.call(&[Value::object([("n", Value::from(1))])]).unwrap();
    assert_eq!(div.text_content(), "one");
}

/// Test that a case below another case is still rejected when a context
/// was derived in between.
#[test]
fn case_below_case_through_with_is_nested() {
    let engine = Engine::new();
    let div = parse_element(
        r#"<div data-bind="switch: 1"><div data-bind="case: 1"><section data-bind="with: inner"><p data-bind="case: 1">x</p></section></div></div>"#,
    )
    .unwrap();
    let data = Value::object([("inner", Value::object([("k", Value::from(0))]))]);
    assert_eq!(
        engine.apply_bindings(data, &div),
        Err(BindingError::CaseNested)
    );
}

/// Test that a fractional repeat count rounds up.
#[test]
fn repeat_rounds_fractional_counts_up() {
    let engine = Engine::new();
    let ul = parse_element(r#"<ul><li data-bind="repeat: {count: n}"></li></ul>"#).unwrap();
    engine
        .apply_bindings(Value::object([("n", Value::from(2.5))]), &ul)
        .unwrap();
    assert_eq!(element_children(&ul).len(), 3);
}
