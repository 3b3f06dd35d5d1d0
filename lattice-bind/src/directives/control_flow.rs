//! `if`, `ifnot`, `with` and `foreach`.
//!
//! Each is a thin adapter: it turns its own value into a `template` options
//! table and runs the template handlers with it.

use crate::binding::{BindingArgs, Directive, DirectiveFlags, InitOutcome};
use crate::error::Result;
use crate::value::Value;

use super::template;

type Adapter = fn(&BindingArgs) -> Result<Value>;

const FOREACH_OPTIONS: [&str; 5] = [
    "comparer",
    "includeDestroyed",
    "afterAdd",
    "beforeRemove",
    "afterRender",
];

pub(crate) fn directives() -> Vec<Directive> {
    vec![
        adapter("if", if_options),
        adapter("ifnot", ifnot_options),
        adapter("with", with_options),
        adapter("foreach", foreach_options),
    ]
}

fn adapter(name: &str, options: Adapter) -> Directive {
    Directive::new(
        name,
        DirectiveFlags::CONTENT_BIND | DirectiveFlags::VIRTUAL_ALLOWED,
    )
    .with_init(move |args| -> Result<InitOutcome> {
        template::init(&args.with_value(options(args)?))
    })
    .with_update(move |args| template::update(&args.with_value(options(args)?)))
}

fn if_options(args: &BindingArgs) -> Result<Value> {
    Ok(Value::object([("if", args.value())]))
}

fn ifnot_options(args: &BindingArgs) -> Result<Value> {
    Ok(Value::object([("ifnot", args.value())]))
}

fn with_options(args: &BindingArgs) -> Result<Value> {
    let value = args.value();
    Ok(Value::object([("if", value.clone()), ("data", value)]))
}

/// `foreach: items` or `foreach: {data: items, afterAdd: ..., ...}`.
fn foreach_options(args: &BindingArgs) -> Result<Value> {
    let value = args.unwrapped_value()?;
    if matches!(value, Value::Array(_)) || !value.is_truthy() {
        return Ok(Value::object([("foreach", value)]));
    }
    let mut options = vec![("foreach".to_string(), value.get("data"))];
    options.extend(
        FOREACH_OPTIONS
            .iter()
            .map(|key| (key.to_string(), value.get(key))),
    );
    Ok(Value::object(options))
}
