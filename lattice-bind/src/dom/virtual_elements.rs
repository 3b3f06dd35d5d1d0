//! Virtual elements.
//!
//! A pair of comments can stand in for an element where a real element is
//! not allowed:
//!
//! ```text
//! <!-- ko if: visible -->
//!     <li>...</li>
//! <!-- /ko -->
//! ```
//!
//! The start comment carries the directive table. The nodes between it and
//! its matching end comment are its virtual children. The functions here
//! give a uniform child/sibling view over real and virtual containers.

use tracing::warn;

use super::disposal::remove_node;
use super::Node;

const START_PREFIX: &str = "ko";
const END_MARKER: &str = "/ko";

/// True for a `<!-- ko ... -->` start comment.
pub fn is_start_comment(node: &Node) -> bool {
    if !node.is_comment() {
        return false;
    }
    let data = node.data();
    let trimmed = data.trim();
    match trimmed.strip_prefix(START_PREFIX) {
        Some(rest) => rest.starts_with(char::is_whitespace) && !rest.trim().is_empty(),
        None => false,
    }
}

/// True for a `<!-- /ko -->` end comment.
pub fn is_end_comment(node: &Node) -> bool {
    node.is_comment() && node.data().trim() == END_MARKER
}

/// The directive table of a start comment.
pub fn virtual_bindings_string(node: &Node) -> Option<String> {
    if !is_start_comment(node) {
        return None;
    }
    let data = node.data();
    let rest = data.trim().strip_prefix(START_PREFIX)?;
    Some(rest.trim().to_string())
}

/// Find the end comment closing `start`, skipping nested pairs.
pub fn matching_end_comment(start: &Node) -> Option<Node> {
    let mut depth = 1usize;
    let mut current = start.next_sibling();
    while let Some(node) = current {
        if is_start_comment(&node) {
            depth += 1;
        } else if is_end_comment(&node) {
            depth -= 1;
            if depth == 0 {
                return Some(node);
            }
        }
        current = node.next_sibling();
    }
    warn!(node = %start.id(), "virtual element has no closing comment");
    None
}

fn virtual_children(start: &Node) -> Vec<Node> {
    let Some(end) = matching_end_comment(start) else {
        return Vec::new();
    };
    let mut children = Vec::new();
    let mut current = start.next_sibling();
    while let Some(node) = current {
        if node == end {
            break;
        }
        current = node.next_sibling();
        children.push(node);
    }
    children
}

/// Children of a real element or of a virtual element.
pub fn child_nodes(node: &Node) -> Vec<Node> {
    if is_start_comment(node) {
        virtual_children(node)
    } else {
        node.children()
    }
}

pub fn first_child(node: &Node) -> Option<Node> {
    if !is_start_comment(node) {
        return node.first_child();
    }
    let next = node.next_sibling()?;
    if is_end_comment(&next) {
        None
    } else {
        Some(next)
    }
}

/// The next sibling, treating a virtual element as one node.
///
/// Returns `None` at the end comment of an enclosing virtual element.
pub fn next_sibling(node: &Node) -> Option<Node> {
    let last = if is_start_comment(node) {
        matching_end_comment(node).unwrap_or_else(|| node.clone())
    } else {
        node.clone()
    };
    let next = last.next_sibling()?;
    if is_end_comment(&next) {
        None
    } else {
        Some(next)
    }
}

/// Remove and dispose every child.
pub fn empty_node(node: &Node) {
    for child in child_nodes(node) {
        remove_node(&child);
    }
}

/// Append `child` as the last child.
pub fn append_child(container: &Node, child: &Node) {
    append_children(container, std::slice::from_ref(child));
}

/// Append `children`, in order, after the current last child.
///
/// The closing comment of a virtual container is found once, before any
/// insertion: a half-inserted nested pair would unbalance the lookup.
pub fn append_children(container: &Node, children: &[Node]) {
    if !is_start_comment(container) {
        for child in children {
            container.append_child(child);
        }
        return;
    }
    match (container.parent(), matching_end_comment(container)) {
        (Some(parent), Some(end)) => {
            for child in children {
                parent.insert_before(child, Some(&end));
            }
        }
        _ => {
            let mut after = container.clone();
            for child in children {
                after.insert_after_self(child);
                after = child.clone();
            }
        }
    }
}

/// Insert `child` directly after `after`, or as the first child.
pub fn insert_after(container: &Node, child: &Node, after: Option<&Node>) {
    match after {
        Some(after) => after.insert_after_self(child),
        None if is_start_comment(container) => container.insert_after_self(child),
        None => {
            let first = container.first_child();
            container.insert_before(child, first.as_ref());
        }
    }
}

/// Replace all children with `children`.
pub fn set_children(container: &Node, children: &[Node]) {
    empty_node(container);
    append_children(container, children);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fragment() -> (Node, Node, Node) {
        // <ul><!-- ko foreach: x --><li/><!-- ko if: y --><li/><!-- /ko --><!-- /ko --><li/></ul>
        let ul = Node::element("ul");
        let start = Node::comment(" ko foreach: x ");
        let inner_start = Node::comment("ko if: y");
        let end = Node::comment(" /ko ");
        ul.append_child(&start);
        ul.append_child(&Node::element("li"));
        ul.append_child(&inner_start);
        ul.append_child(&Node::element("li"));
        ul.append_child(&Node::comment("/ko"));
        ul.append_child(&end);
        ul.append_child(&Node::element("li"));
        (ul, start, inner_start)
    }

    #[test]
    fn detects_markers_and_bindings() {
        let (_, start, _) = fragment();
        assert!(is_start_comment(&start));
        assert_eq!(virtual_bindings_string(&start).as_deref(), Some("foreach: x"));
        assert!(!is_start_comment(&Node::comment("kodiak")));
        assert!(!is_start_comment(&Node::comment("ko")));
    }

    #[test]
    fn matching_end_skips_nested_pairs() {
        let (ul, start, _) = fragment();
        let end = matching_end_comment(&start).unwrap();
        assert_eq!(end.index_in_parent(), Some(5));
        assert_eq!(child_nodes(&start).len(), 4);
        assert_eq!(ul.children().len(), 7);
    }

    #[test]
    fn sibling_iteration_treats_virtual_element_as_one_node() {
        let (ul, start, inner_start) = fragment();
        let after = next_sibling(&start).unwrap();
        assert_eq!(after.index_in_parent(), Some(6));

        let first = first_child(&start).unwrap();
        assert_eq!(next_sibling(&first), Some(inner_start.clone()));
        assert_eq!(next_sibling(&inner_start), None);
        assert_eq!(first_child(&ul), Some(start));
    }

    #[test]
    fn set_children_of_virtual_element() {
        let (ul, start, _) = fragment();
        let replacement = Node::element("p");
        set_children(&start, &[replacement.clone()]);

        assert_eq!(child_nodes(&start), vec![replacement]);
        assert_eq!(ul.children().len(), 4);
    }

    #[test]
    fn set_children_keeps_nested_pairs_inside_the_container() {
        let (ul, start, _) = fragment();
        let nested = [
            Node::comment("ko text: a"),
            Node::comment("/ko"),
            Node::text("|"),
            Node::comment("ko text: b"),
            Node::comment("/ko"),
        ];
        set_children(&start, &nested);

        assert_eq!(child_nodes(&start), nested.to_vec());
        assert_eq!(start.index_in_parent(), Some(0));
        let end = matching_end_comment(&start).unwrap();
        assert_eq!(end.index_in_parent(), Some(6));
        assert_eq!(ul.children().len(), 8);
    }
}
