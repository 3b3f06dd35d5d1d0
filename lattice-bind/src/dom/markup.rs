//! Markup parsing and serialization.
//!
//! A lenient parser for the HTML-like markup that binding fixtures and
//! `html` directive values are written in: elements, quoted or bare
//! attributes, text with the common entities, comments and void elements.
//! Unknown closing tags are ignored and unclosed elements are closed at the
//! end of input.
//!
//! Whitespace-only text between tags is dropped.

use super::forms::input_type;
use super::{Node, NodeKind};

const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param", "source",
    "track", "wbr",
];

fn is_void(tag: &str) -> bool {
    VOID_ELEMENTS.contains(&tag)
}

/// Parse markup into a list of top-level nodes.
pub fn parse(markup: &str) -> Vec<Node> {
    let holder = Node::element("template");
    parse_into(&holder, markup);
    let nodes = holder.children();
    holder.clear_children();
    nodes
}

/// Parse markup and return its first element, if any.
pub fn parse_element(markup: &str) -> Option<Node> {
    parse(markup).into_iter().find(Node::is_element)
}

/// Parse markup and append the resulting nodes to `container`.
pub fn parse_into(container: &Node, markup: &str) {
    let mut stack: Vec<Node> = vec![container.clone()];
    let mut rest = markup;

    while !rest.is_empty() {
        let Some(lt) = rest.find('<') else {
            push_text(&stack, rest);
            break;
        };
        if lt > 0 {
            push_text(&stack, &rest[..lt]);
            rest = &rest[lt..];
        }

        if let Some(body) = rest.strip_prefix("<!--") {
            let (comment, after) = match body.find("-->") {
                Some(end) => (&body[..end], &body[end + 3..]),
                None => (body, ""),
            };
            current(&stack).append_child(&Node::comment(comment));
            rest = after;
        } else if let Some(body) = rest.strip_prefix("</") {
            let end = body.find('>').unwrap_or(body.len());
            let tag = body[..end].trim().to_ascii_lowercase();
            if let Some(depth) = stack.iter().skip(1).rposition(|n| n.tag_name() == tag) {
                stack.truncate(depth + 1);
            }
            rest = body.get(end + 1..).unwrap_or("");
        } else if rest[1..].starts_with(|c: char| c.is_ascii_alphabetic()) {
            let (element, self_closing, after) = parse_open_tag(&rest[1..]);
            current(&stack).append_child(&element);
            let tag = element.tag_name().to_string();
            rest = after;
            if self_closing || is_void(&tag) {
                continue;
            }
            if tag == "textarea" {
                // Raw text up to the closing tag becomes the value.
                let close = rest.find("</textarea").unwrap_or(rest.len());
                let text = decode_entities(&rest[..close]);
                element.set_value(&text);
                if !text.is_empty() {
                    element.append_child(&Node::text(&text));
                }
                rest = &rest[close..];
            }
            stack.push(element);
        } else {
            push_text(&stack, "<");
            rest = &rest[1..];
        }
    }
}

fn current(stack: &[Node]) -> &Node {
    // The container is never popped.
    &stack[stack.len() - 1]
}

fn push_text(stack: &[Node], raw: &str) {
    if raw.trim().is_empty() {
        return;
    }
    current(stack).append_child(&Node::text(&decode_entities(raw)));
}

/// Parse `tag attr="v" ...>` and return the element, whether it was
/// self-closing, and the remaining input.
fn parse_open_tag(input: &str) -> (Node, bool, &str) {
    let name_end = input
        .find(|c: char| c.is_whitespace() || c == '>' || c == '/')
        .unwrap_or(input.len());
    let element = Node::element(&input[..name_end]);
    let mut rest = &input[name_end..];

    loop {
        rest = rest.trim_start();
        if rest.is_empty() {
            return (element, false, rest);
        }
        if let Some(after) = rest.strip_prefix("/>") {
            return (element, true, after);
        }
        if let Some(after) = rest.strip_prefix('>') {
            return (element, false, after);
        }
        if let Some(after) = rest.strip_prefix('/') {
            rest = after;
            continue;
        }

        let name_end = rest
            .find(|c: char| c.is_whitespace() || c == '=' || c == '>' || c == '/')
            .unwrap_or(rest.len());
        let name = rest[..name_end].to_ascii_lowercase();
        rest = rest[name_end..].trim_start();

        let mut value = String::new();
        if let Some(after) = rest.strip_prefix('=') {
            let after = after.trim_start();
            match after.chars().next() {
                Some(quote @ ('"' | '\'')) => {
                    let body = &after[1..];
                    let end = body.find(quote).unwrap_or(body.len());
                    value = decode_entities(&body[..end]);
                    rest = body.get(end + 1..).unwrap_or("");
                }
                _ => {
                    let end = after
                        .find(|c: char| c.is_whitespace() || c == '>')
                        .unwrap_or(after.len());
                    value = decode_entities(&after[..end]);
                    rest = &after[end..];
                }
            }
        }
        if !name.is_empty() {
            apply_attribute(&element, &name, &value);
        }
    }
}

fn apply_attribute(element: &Node, name: &str, value: &str) {
    match name {
        "style" => {
            for declaration in value.split(';') {
                if let Some((property, v)) = declaration.split_once(':') {
                    element.set_style(property.trim(), v.trim());
                }
            }
        }
        _ => {
            element.set_attribute(name, value);
            match name {
                "value" => element.set_value(value),
                "checked" if element.tag_name() == "input" => element.set_checked(true),
                "selected" if element.tag_name() == "option" => element.set_selected(true),
                _ => {}
            }
        }
    }
}

fn decode_entities(text: &str) -> String {
    if !text.contains('&') {
        return text.to_string();
    }
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        rest = &rest[amp..];
        let Some(semi) = rest.find(';').filter(|&i| i <= 10) else {
            out.push('&');
            rest = &rest[1..];
            continue;
        };
        let entity = &rest[1..semi];
        let decoded = match entity {
            "amp" => Some('&'),
            "lt" => Some('<'),
            "gt" => Some('>'),
            "quot" => Some('"'),
            "apos" => Some('\''),
            "nbsp" => Some('\u{a0}'),
            _ => entity
                .strip_prefix('#')
                .and_then(|code| match code.strip_prefix(['x', 'X']) {
                    Some(hex) => u32::from_str_radix(hex, 16).ok(),
                    None => code.parse().ok(),
                })
                .and_then(char::from_u32),
        };
        match decoded {
            Some(c) => {
                out.push(c);
                rest = &rest[semi + 1..];
            }
            None => {
                out.push('&');
                rest = &rest[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

fn escape_text(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

fn escape_attribute(text: &str) -> String {
    escape_text(text).replace('"', "&quot;")
}

/// Serialize a node and its subtree.
///
/// Form state is reflected where markup can express it: `checked` on
/// inputs, `selected` on options and the current `value` of text inputs.
pub fn to_markup(node: &Node) -> String {
    let mut out = String::new();
    write_node(node, &mut out);
    out
}

/// Serialize the children of a node.
pub fn inner_markup(node: &Node) -> String {
    let mut out = String::new();
    for child in node.children() {
        write_node(&child, &mut out);
    }
    out
}

fn write_node(node: &Node, out: &mut String) {
    match node.kind() {
        NodeKind::Text => out.push_str(&escape_text(&node.data())),
        NodeKind::Comment => {
            out.push_str("<!--");
            out.push_str(&node.data());
            out.push_str("-->");
        }
        NodeKind::Element => {
            let tag = node.tag_name();
            out.push('<');
            out.push_str(tag);

            let mut attributes = node.attributes();
            if tag == "input" && !matches!(input_type(node).as_str(), "checkbox" | "radio") {
                let value = node.value();
                attributes.retain(|(name, _)| name != "value");
                if !value.is_empty() {
                    attributes.push(("value".to_string(), value));
                }
            }
            let reflect = |attributes: &mut Vec<(String, String)>, name: &str, on: bool| {
                attributes.retain(|(n, _)| n != name);
                if on {
                    attributes.push((name.to_string(), String::new()));
                }
            };
            if tag == "input" {
                reflect(&mut attributes, "checked", node.checked());
            }
            if tag == "option" {
                reflect(&mut attributes, "selected", node.selected());
            }

            for (name, value) in attributes {
                out.push(' ');
                out.push_str(&name);
                if !value.is_empty() {
                    out.push_str("=\"");
                    out.push_str(&escape_attribute(&value));
                    out.push('"');
                }
            }

            let styles = node.styles();
            if !styles.is_empty() {
                let declarations: Vec<String> = styles
                    .iter()
                    .map(|(property, value)| format!("{property}: {value}"))
                    .collect();
                out.push_str(" style=\"");
                out.push_str(&escape_attribute(&declarations.join("; ")));
                out.push('"');
            }
            out.push('>');

            if is_void(tag) {
                return;
            }
            for child in node.children() {
                write_node(&child, out);
            }
            out.push_str("</");
            out.push_str(tag);
            out.push('>');
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_nested_elements_and_attributes() {
        let nodes = parse(r#"<div id="a" data-bind='text: name'><span class=x>hi</span><br></div>"#);
        assert_eq!(nodes.len(), 1);
        let div = &nodes[0];
        assert_eq!(div.get_attribute("data-bind").as_deref(), Some("text: name"));
        assert_eq!(div.child_count(), 2);
        assert_eq!(div.children()[0].get_attribute("class").as_deref(), Some("x"));
        assert_eq!(div.text_content(), "hi");
    }

    #[test]
    fn parses_comments_and_virtual_markers() {
        let nodes = parse("<ul><!-- ko foreach: items --><li></li><!-- /ko --></ul>");
        let ul = &nodes[0];
        assert_eq!(ul.child_count(), 3);
        assert!(ul.children()[0].is_comment());
        assert_eq!(ul.children()[0].data(), " ko foreach: items ");
    }

    #[test]
    fn form_attributes_initialize_properties() {
        let input = parse_element(r#"<input type="checkbox" value="v" checked>"#).unwrap();
        assert!(input.checked());
        assert_eq!(input.value(), "v");

        let styled = parse_element(r#"<p style="color: red; display:none"></p>"#).unwrap();
        assert_eq!(styled.style("display").as_deref(), Some("none"));
        assert!(!styled.has_attribute("style"));
    }

    #[test]
    fn decodes_entities() {
        let p = parse_element("<p>a &amp; b &lt;c&gt; &#65;&#x42; &bogus;</p>").unwrap();
        assert_eq!(p.text_content(), "a & b <c> AB &bogus;");
    }

    #[test]
    fn serializes_back_to_markup() {
        let source = r#"<div class="box"><p>x &amp; y</p><!--note--><input></div>"#;
        let div = parse_element(source).unwrap();
        assert_eq!(to_markup(&div), source);
        assert_eq!(inner_markup(&div), r#"<p>x &amp; y</p><!--note--><input>"#);
    }

    #[test]
    fn tolerates_stray_closing_tags() {
        let nodes = parse("<div><span>a</b></span></div></p>");
        assert_eq!(nodes.len(), 1);
        assert_eq!(to_markup(&nodes[0]), "<div><span>a</span></div>");
    }
}
