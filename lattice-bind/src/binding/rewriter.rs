//! Expression rewriter.
//!
//! Turns parsed directive-table entries into the text of an object literal
//! that the expression evaluator can run in a binding context. Along the
//! way it:
//!
//! - flattens `name: {sub: v}` groups of two-level directives into
//!   `'name.sub': v` keys,
//! - wraps method references given to event directives so event arguments
//!   are forwarded,
//! - emits a property writer for every writable expression bound to a
//!   two-way directive, collected under [`PROPERTY_WRITERS_KEY`],
//! - defers expressions that contain a call with `$lazy(...)` so they are
//!   evaluated when the directive unwraps them, inside its own tracking.

use std::rc::Rc;

use tracing::warn;

use super::flags::DirectiveFlags;
use super::parser::{parse_object_literal, ParsedEntry};
use super::registry::{Directive, Registry};
use crate::value::Value;

/// Reserved table key holding the property writers.
pub const PROPERTY_WRITERS_KEY: &str = "_ko_property_writers";

/// Parse and rewrite a directive table.
pub fn rewrite(text: &str, registry: &Registry) -> String {
    insert_property_accessors(&parse_object_literal(text), registry)
}

/// Rewrite parsed entries into executable object-literal text (without the
/// enclosing braces). Empty input gives an empty string.
pub fn insert_property_accessors(entries: &[ParsedEntry], registry: &Registry) -> String {
    let mut results = Vec::with_capacity(entries.len());
    let mut writers = Vec::new();
    rewrite_entries(entries, registry, None, &mut results, &mut writers);

    if !writers.is_empty() {
        results.push(format!(
            "{}:{{{}}}",
            quote_key(PROPERTY_WRITERS_KEY),
            writers.join(",")
        ));
    }
    results.join(",")
}

fn rewrite_entries(
    entries: &[ParsedEntry],
    registry: &Registry,
    parent: Option<(&Rc<Directive>, &str)>,
    results: &mut Vec<String>,
    writers: &mut Vec<String>,
) {
    for entry in entries {
        match entry {
            ParsedEntry::KeyValue { key, value } => {
                let (full_key, directive) = match parent {
                    Some((directive, parent_key)) => {
                        (format!("{parent_key}.{key}"), Some(Rc::clone(directive)))
                    }
                    None => (key.clone(), registry.resolve(key).map(|(d, _)| d)),
                };
                match directive {
                    Some(directive) => rewrite_keyed(
                        &full_key, key, value, &directive, parent, registry, results, writers,
                    ),
                    None => results.push(format!("{}:{}", quote_key(&full_key), value)),
                }
            }
            ParsedEntry::Unknown(key) => {
                let no_value = registry
                    .lookup(key)
                    .is_some_and(|d| d.has_all(DirectiveFlags::NO_VALUE));
                if no_value {
                    results.push(format!("{}:true", quote_key(key)));
                } else {
                    results.push(key.clone());
                }
            }
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn rewrite_keyed(
    full_key: &str,
    key: &str,
    value: &str,
    directive: &Rc<Directive>,
    parent: Option<(&Rc<Directive>, &str)>,
    registry: &Registry,
    results: &mut Vec<String>,
    writers: &mut Vec<String>,
) {
    if parent.is_none() && directive.has_all(DirectiveFlags::TWO_LEVEL) && value.starts_with('{')
    {
        let group = parse_object_literal(value);
        rewrite_entries(&group, registry, Some((directive, key)), results, writers);
        return;
    }

    let mut expression = value.to_string();
    if is_writable_value(value) {
        if directive.has_all(DirectiveFlags::EVENT_HANDLER) {
            expression = format!("function(_x,_y,_z){{({value})(_x,_y,_z);}}");
        } else if directive.has_all(DirectiveFlags::TWO_WAY) {
            writers.push(format!(
                "{}:function(_z){{{value}=_z;}}",
                quote_key(full_key)
            ));
        }
    } else if directive.has_none(DirectiveFlags::EVENT_HANDLER) && value.contains('(') {
        expression = format!("$lazy(function(){{return {value}}})");
    }
    results.push(format!("{}:{}", quote_key(full_key), expression));
}

fn quote_key(key: &str) -> String {
    format!("'{}'", key.replace('\\', "\\\\").replace('\'', "\\'"))
}

/// True if `expression` can be the target of an assignment: a name,
/// optionally followed by `.member` and `[index]` accesses.
///
/// `true`, `false` and `null` are excluded.
pub fn is_writable_value(expression: &str) -> bool {
    let expression = expression.trim();
    if ["true", "false", "null"]
        .iter()
        .any(|word| expression.eq_ignore_ascii_case(word))
    {
        return false;
    }
    let chars: Vec<char> = expression.chars().collect();
    match name_end(&chars, 0) {
        Some(end) => matches_accessors(&chars, end),
        None => false,
    }
}

fn name_end(chars: &[char], start: usize) -> Option<usize> {
    let first = chars.get(start)?;
    if !(first.is_ascii_alphabetic() || matches!(first, '_' | '$')) {
        return None;
    }
    let len = chars[start + 1..]
        .iter()
        .take_while(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '$'))
        .count();
    Some(start + 1 + len)
}

/// Match `([...])*(.name([...])*)*` through to the end of input.
///
/// Index contents are unconstrained, so every closing bracket is a
/// candidate end and the rest of the input decides.
fn matches_accessors(chars: &[char], pos: usize) -> bool {
    match chars.get(pos) {
        None => true,
        Some('[') => (pos + 1..chars.len())
            .filter(|&end| chars[end] == ']')
            .any(|end| matches_accessors(chars, end + 1)),
        Some('.') => match name_end(chars, pos + 1) {
            Some(end) => matches_accessors(chars, end),
            None => false,
        },
        Some(_) => false,
    }
}

/// Invoke the property writer registered for `key` in an evaluated table.
///
/// Returns whether a writer ran. A missing writer is not an error: the
/// binding may simply target a read-only value.
pub fn write_value_to_property(table: &Value, key: &str, value: Value) -> bool {
    let writer = table.get(PROPERTY_WRITERS_KEY).get(key);
    if !writer.is_function() {
        return false;
    }
    match writer.call(&[value]) {
        Ok(_) => true,
        Err(err) => {
            warn!(key, error = %err, "property writer failed");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::{evaluate, LocalScope, Scope};

    fn registry() -> Registry {
        let mut registry = Registry::new();
        registry.register(Directive::new("value", DirectiveFlags::TWO_WAY));
        registry.register(Directive::new("text", DirectiveFlags::CONTENT_SET));
        registry.register(Directive::new("click", DirectiveFlags::EVENT_HANDLER));
        registry.register(Directive::new("attr", DirectiveFlags::TWO_LEVEL));
        registry.register(Directive::new(
            "event",
            DirectiveFlags::EVENT_HANDLER | DirectiveFlags::TWO_LEVEL,
        ));
        registry.register(Directive::new("uniqueName", DirectiveFlags::NO_VALUE));
        registry
    }

    #[test]
    fn writable_values() {
        for ok in ["a", "$data", "_x.y", "a[0]", "a[b].c[1]", "person.names['first']", "a[1]+b[2]"] {
            assert!(is_writable_value(ok), "{ok}");
        }
        for bad in ["true", "NULL", "1", "a()", "a.b()", "a + b", "a.", ".a", "'s'", "a[0"] {
            assert!(!is_writable_value(bad), "{bad}");
        }
    }

    #[test]
    fn plain_entries_keep_their_shape() {
        let entries = parse_object_literal("text: name, visible: shown, unknown: 3");
        let expected: Vec<String> = entries
            .iter()
            .map(|e| format!("'{}':{}", e.key(), e.value().unwrap_or_default()))
            .collect();
        assert_eq!(insert_property_accessors(&entries, &registry()), expected.join(","));
        assert_eq!(rewrite("", &registry()), "");
    }

    #[test]
    fn two_way_adds_writer() {
        let rewritten = rewrite("value: person.name", &registry());
        assert_eq!(
            rewritten,
            "'value':person.name,'_ko_property_writers':{'value':function(_z){person.name=_z;}}"
        );

        let person = Value::object([("name", Value::from("Ann"))]);
        let scope: Rc<dyn Scope> = Rc::new(LocalScope::new(None).with("person", person.clone()));
        let table = evaluate(&format!("{{{rewritten}}}"), scope).unwrap();
        assert!(write_value_to_property(&table, "value", Value::from("Bo")));
        assert_eq!(person.get("name"), Value::from("Bo"));
        assert!(!write_value_to_property(&table, "text", Value::from("x")));
    }

    #[test]
    fn event_handlers_forward_arguments() {
        assert_eq!(
            rewrite("click: save", &registry()),
            "'click':function(_x,_y,_z){(save)(_x,_y,_z);}"
        );
        // Inline functions are left as written.
        assert_eq!(
            rewrite("click: function(){ go() }", &registry()),
            "'click':function(){ go() }"
        );
    }

    #[test]
    fn calls_are_deferred() {
        assert_eq!(
            rewrite("text: name()", &registry()),
            "'text':$lazy(function(){return name()})"
        );
    }

    #[test]
    fn two_level_groups_are_flattened() {
        assert_eq!(
            rewrite("attr: {href: url, title: t()}", &registry()),
            "'attr.href':url,'attr.title':$lazy(function(){return t()})"
        );
        assert_eq!(
            rewrite("event: {mouseover: hover}", &registry()),
            "'event.mouseover':function(_x,_y,_z){(hover)(_x,_y,_z);}"
        );
        assert_eq!(rewrite("attr: attrs", &registry()), "'attr':attrs");
    }

    #[test]
    fn bare_keys() {
        assert_eq!(rewrite("uniqueName, other", &registry()), "'uniqueName':true,other");
    }

    #[test]
    fn keys_with_quotes_are_escaped() {
        assert_eq!(quote_key("it's"), r"'it\'s'");
    }
}
