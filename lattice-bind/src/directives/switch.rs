//! `switch`, `case` and `casenot`.
//!
//! ```text
//! <div data-bind="switch: size">
//!     <p data-bind="case: 'small'">...</p>
//!     <p data-bind="case: ['medium', 'large']">...</p>
//!     <p data-bind="case: $else">...</p>
//! </div>
//! ```
//!
//! `switch` binds each direct child in its own context carrying a shared
//! [`SwitchRecord`]. Each `case` claims the next slot of the record's skip
//! flags on init. On update a case is skipped when the case before it
//! matched or was itself skipped; otherwise it matches its value against
//! the switch value. Either way it stores whether later cases must skip.
//! A matching case shows its content like `if`.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use tracing::trace;

use crate::binding::{
    BindingArgs, ContextSlot, Directive, DirectiveFlags, InitOutcome, ValueAccessor,
};
use crate::dom::virtual_elements;
use crate::error::{BindingError, Result};
use crate::reactive::Signal;
use crate::value::Value;

use super::template;

/// State shared by every case of one `switch`.
pub struct SwitchRecord {
    skip_flags: RefCell<Vec<Signal<bool>>>,
    value: ValueAccessor,
    /// The value of `$default` and `$else`, which matches any switch value.
    sentinel: Value,
}

impl fmt::Debug for SwitchRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SwitchRecord")
            .field("cases", &self.skip_flags.borrow().len())
            .finish()
    }
}

/// What a context below a `switch` knows about it: the shared record and
/// the case slot claimed in this context, if any.
///
/// Clones of one context share the claimed slot. A derived context gets
/// its own copy of it, taken when it is derived.
#[derive(Clone, Debug)]
pub struct SwitchScope {
    record: Rc<SwitchRecord>,
    index: Rc<Cell<Option<usize>>>,
}

impl SwitchScope {
    fn new(record: Rc<SwitchRecord>) -> Self {
        Self {
            record,
            index: Rc::new(Cell::new(None)),
        }
    }

    /// A copy for a derived context, detached from this one's slot.
    pub(crate) fn derive(&self) -> Self {
        Self {
            record: self.record.clone(),
            index: Rc::new(Cell::new(self.index.get())),
        }
    }
}

pub(crate) fn directives() -> Vec<Directive> {
    vec![
        Directive::new(
            "switch",
            DirectiveFlags::CONTENT_BIND | DirectiveFlags::VIRTUAL_ALLOWED,
        )
        .with_init(switch_init),
        case_directive("case", false),
        case_directive("casenot", true),
    ]
}

fn switch_init(args: &BindingArgs) -> Result<InitOutcome> {
    let value = args.unwrapped_value()?;
    let record = Rc::new(SwitchRecord {
        skip_flags: RefCell::new(Vec::new()),
        value: args.value.clone(),
        sentinel: Value::object::<&str>([]),
    });
    let slots = [
        ("$default", record.sentinel.clone()),
        ("$else", record.sentinel.clone()),
        ("$value", value),
    ]
    .map(|(name, value)| (name.to_string(), ContextSlot::Value(value)));
    let context = args.context.with_slots(slots);

    let mut next = virtual_elements::first_child(&args.node);
    while let Some(child) = next {
        next = virtual_elements::next_sibling(&child);
        if !(child.is_element() || child.is_comment()) {
            continue;
        }
        let scope = SwitchScope::new(record.clone());
        args.engine
            .apply_to_node_and_descendants(&context.with_switch(scope), &child, true)?;
    }
    Ok(InitOutcome::controls_descendants())
}

fn case_directive(name: &'static str, negate: bool) -> Directive {
    Directive::new(
        name,
        DirectiveFlags::CONTENT_BIND | DirectiveFlags::VIRTUAL_ALLOWED,
    )
    .with_init(case_init)
    .with_update(move |args| case_update(args, negate))
}

fn case_init(args: &BindingArgs) -> Result<InitOutcome> {
    let scope = args
        .context
        .switch_scope()
        .ok_or(BindingError::CaseOutsideSwitch)?;
    if scope.index.get().is_some() {
        return Err(BindingError::CaseNested);
    }
    let mut flags = scope.record.skip_flags.borrow_mut();
    scope.index.set(Some(flags.len()));
    flags.push(Signal::new(false));
    drop(flags);

    template::init(&args.with_value(Value::object::<&str>([])))
}

fn case_update(args: &BindingArgs, negate: bool) -> Result<()> {
    let Some(scope) = args.context.switch_scope() else {
        return Err(BindingError::CaseOutsideSwitch);
    };
    let Some(index) = scope.index.get() else {
        return Ok(());
    };

    let previous = index
        .checked_sub(1)
        .and_then(|prev| scope.record.skip_flags.borrow().get(prev).cloned());
    let (matched, skip_next) = if previous.is_some_and(|flag| flag.get()) {
        (false, true)
    } else {
        let matched = check_case(args, &scope.record)? != negate;
        (matched, matched)
    };
    trace!(node = %args.node.id(), index, matched, "case evaluated");

    template::update(&args.with_value(Value::object([("if", Value::from(matched))])))?;
    let own = scope.record.skip_flags.borrow().get(index).cloned();
    if let Some(own) = own {
        own.set(skip_next);
    }
    Ok(())
}

/// Whether the case's value matches the switch value.
///
/// The sentinel always matches. A boolean switch value matches by the
/// case value's truthiness; a boolean case value is its own answer; an
/// array matches by strict membership; anything else by loose equality.
fn check_case(args: &BindingArgs, record: &SwitchRecord) -> Result<bool> {
    let value = args.unwrapped_value()?;
    if value.strict_eq(&record.sentinel) {
        return Ok(true);
    }
    let switch_value = record.value.unwrapped()?;
    Ok(match (&switch_value, &value) {
        (Value::Bool(on), _) => {
            if value.is_truthy() {
                *on
            } else {
                !*on
            }
        }
        (_, Value::Bool(b)) => *b,
        (_, Value::Array(items)) => items.borrow().iter().any(|item| item.strict_eq(&switch_value)),
        _ => value.loose_eq(&switch_value),
    })
}
