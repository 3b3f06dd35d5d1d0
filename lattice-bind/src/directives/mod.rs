//! Default Directives
//!
//! The directive set every [`Engine`] starts with:
//!
//! - `content`: `text`, `html`, `visible`, `enable`, `disable`, `css`,
//!   `style`, `attr`, `uniqueName`
//! - `events`: `event`, `click`, `submit`
//! - `forms`: `value`, `checked`, `hasfocus`, `options`, `selectedOptions`
//! - `template`: the rendering primitive behind the control-flow family
//! - `control_flow`: `if`, `ifnot`, `with`, `foreach`
//! - `switch`: `switch`, `case`, `casenot`
//! - `repeat`, `withlight`
//!
//! Applications add their own with [`Engine::register`].

pub mod content;
pub mod control_flow;
pub mod events;
pub mod forms;
pub mod repeat;
pub mod switch;
pub mod template;
pub mod withlight;

use tracing::debug;

use crate::binding::{AllBindings, Engine};
use crate::value::Value;

/// Register every default directive on `engine`.
pub fn register_defaults(engine: &Engine) {
    let directives = content::directives()
        .into_iter()
        .chain(events::directives())
        .chain(forms::directives())
        .chain([template::directive()])
        .chain(control_flow::directives())
        .chain(switch::directives())
        .chain([repeat::directive(), withlight::directive()]);
    for directive in directives {
        engine.register(directive);
    }
    debug!(count = engine.with_registry(|registry| registry.len()), "registered default directives");
}

/// Write a value coming from the node back to the model.
///
/// A writable cell bound directly is written through. Anything else goes
/// through the property writer the rewriter generated for `key`, if any.
pub(crate) fn write_model(model: &Value, bindings: &AllBindings, key: &str, value: Value) {
    match model {
        Value::Observable(cell) => cell.set(value),
        _ => {
            bindings.write_value_to_property(key, value);
        }
    }
}

/// True for `null`, `undefined` and `false`, the values that remove an
/// attribute or mean "no value".
pub(crate) fn is_absent(value: &Value) -> bool {
    matches!(value, Value::Undefined | Value::Null | Value::Bool(false))
}

/// Display text for content, with `null`/`undefined` as empty.
pub(crate) fn display_text(value: &Value) -> String {
    if value.is_nullish() {
        String::new()
    } else {
        value.to_display_string()
    }
}
