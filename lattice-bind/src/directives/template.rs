//! Template primitive.
//!
//! `template` renders copies of a node's original content. `init` captures
//! the (virtual) children as the template and empties the node; `update`
//! renders according to an options table:
//!
//! ```text
//! { if, ifnot, data, foreach, includeDestroyed, afterRender, afterAdd, beforeRemove, comparer }
//! ```
//!
//! With `foreach` one copy is rendered per item, each bound in a child
//! context of the item with `$index` set. Without it a single copy is shown
//! or hidden by `if`/`ifnot`. Rendering never diffs: a foreach re-render
//! replaces every copy, and `comparer` is accepted but unused.
//!
//! The control-flow directives (`if`, `ifnot`, `with`, `foreach`, `case`)
//! delegate here with options built from their own value.

use std::cell::{Cell, RefCell};

use tracing::trace;

use crate::binding::{BindingArgs, BindingContext, Directive, DirectiveFlags, Engine, InitOutcome};
use crate::dom::{data, disposal, virtual_elements, Node};
use crate::error::Result;
use crate::reactive::ReactiveContext;
use crate::value::Value;

const TEMPLATE_KEY: &str = "__ko_template_nodes__";
const RENDER_KEY: &str = "__ko_template_render__";

/// What the last renders left behind.
#[derive(Default)]
struct RenderState {
    /// Whether the single-copy content is shown; `None` before the first update.
    shown: Cell<Option<bool>>,
    /// Top-level nodes of the current foreach copies.
    rendered: RefCell<Vec<Rendered>>,
    renders: Cell<usize>,
}

struct Rendered {
    node: Node,
    index: usize,
    item: Value,
}

/// The options table, with cells read through.
struct TemplateOptions {
    show: bool,
    data: Option<Value>,
    foreach: Option<Value>,
    include_destroyed: bool,
    after_render: Value,
    after_add: Value,
    before_remove: Value,
}

impl TemplateOptions {
    fn read(options: &Value) -> Result<Self> {
        let has = |key: &str| {
            options
                .as_object()
                .is_some_and(|object| object.borrow().contains_key(key))
        };
        let unwrapped = |key: &str| options.get(key).unwrap_observable();

        let mut show = true;
        if has("if") {
            show &= unwrapped("if")?.is_truthy();
        }
        if has("ifnot") {
            show &= !unwrapped("ifnot")?.is_truthy();
        }
        let data = if has("data") {
            let data = unwrapped("data")?;
            show &= data.is_truthy();
            Some(data)
        } else {
            None
        };
        let foreach = if has("foreach") {
            Some(unwrapped("foreach")?)
        } else {
            None
        };

        Ok(Self {
            show,
            data,
            foreach,
            include_destroyed: unwrapped("includeDestroyed")?.is_truthy(),
            after_render: options.get("afterRender"),
            after_add: options.get("afterAdd"),
            before_remove: options.get("beforeRemove"),
        })
    }
}

pub(crate) fn directive() -> Directive {
    Directive::new(
        "template",
        DirectiveFlags::CONTENT_BIND | DirectiveFlags::VIRTUAL_ALLOWED,
    )
    .with_init(init)
    .with_update(update)
}

/// Capture the node's children as the template and empty it.
pub fn init(args: &BindingArgs) -> Result<InitOutcome> {
    let template: Vec<Node> = virtual_elements::child_nodes(&args.node)
        .iter()
        .map(Node::deep_clone)
        .collect();
    virtual_elements::empty_node(&args.node);
    trace!(node = %args.node.id(), nodes = template.len(), "captured template");
    data::set(&args.node, TEMPLATE_KEY, template);
    data::set(&args.node, RENDER_KEY, RenderState::default());
    Ok(InitOutcome::controls_descendants())
}

/// Render the template according to the options in the directive's value.
pub fn update(args: &BindingArgs) -> Result<()> {
    let options = TemplateOptions::read(&args.unwrapped_value()?)?;
    let (Some(template), Some(state)) = (
        data::get::<Vec<Node>>(&args.node, TEMPLATE_KEY),
        data::get::<RenderState>(&args.node, RENDER_KEY),
    ) else {
        return Ok(());
    };

    match &options.foreach {
        Some(items) => render_foreach(args, &template, &state, items, &options)?,
        None => render_single(args, &template, &state, &options)?,
    }
    state.renders.set(state.renders.get() + 1);
    Ok(())
}

fn render_single(
    args: &BindingArgs,
    template: &[Node],
    state: &RenderState,
    options: &TemplateOptions,
) -> Result<()> {
    let previously = state.shown.get();
    if !options.show {
        if previously != Some(false) {
            virtual_elements::empty_node(&args.node);
        }
        state.shown.set(Some(false));
        return Ok(());
    }
    if options.data.is_none() && previously == Some(true) {
        return Ok(());
    }

    let context = match &options.data {
        Some(data) => args.context.child(data.clone()),
        None => args.context.clone(),
    };
    let nodes = clone_template(template);
    virtual_elements::set_children(&args.node, &nodes);
    state.shown.set(Some(true));
    bind_rendered(&args.engine, &context, &nodes)?;
    call_hook(
        &options.after_render,
        &[node_array(&nodes), context.data().clone()],
    )
}

fn render_foreach(
    args: &BindingArgs,
    template: &[Node],
    state: &RenderState,
    items: &Value,
    options: &TemplateOptions,
) -> Result<()> {
    let previous = std::mem::take(&mut *state.rendered.borrow_mut());
    for Rendered { node, index, item } in previous {
        if node.is_element() && options.before_remove.is_function() {
            disposal::clean_node(&node);
            call_hook(
                &options.before_remove,
                &[Value::Node(node), Value::from(index), item],
            )?;
        } else {
            // Content a directive put inside a rendered virtual element is
            // not in the rendered list.
            if virtual_elements::is_start_comment(&node) {
                for child in virtual_elements::child_nodes(&node) {
                    disposal::remove_node(&child);
                }
            }
            disposal::remove_node(&node);
        }
    }

    let items: Vec<Value> = match items {
        Value::Array(items) => items.borrow().clone(),
        nullish if nullish.is_nullish() => Vec::new(),
        single => vec![single.clone()],
    };
    let mut visible = Vec::with_capacity(items.len());
    for item in items {
        if options.include_destroyed || !item.get("_destroy").unwrap_observable()?.is_truthy() {
            visible.push(item);
        }
    }
    trace!(node = %args.node.id(), items = visible.len(), "rendering foreach");

    let is_rerender = state.renders.get() > 0;
    for (index, item) in visible.into_iter().enumerate() {
        let context = args
            .context
            .child(item.clone())
            .extend("$index", Value::from(index));
        let nodes = clone_template(template);
        virtual_elements::append_children(&args.node, &nodes);
        state
            .rendered
            .borrow_mut()
            .extend(nodes.iter().map(|node| Rendered {
                node: node.clone(),
                index,
                item: item.clone(),
            }));

        bind_rendered(&args.engine, &context, &nodes)?;
        call_hook(&options.after_render, &[node_array(&nodes), item.clone()])?;
        if is_rerender {
            for node in nodes.iter().filter(|node| node.is_element()) {
                call_hook(
                    &options.after_add,
                    &[Value::Node(node.clone()), Value::from(index), item.clone()],
                )?;
            }
        }
    }
    Ok(())
}

fn clone_template(template: &[Node]) -> Vec<Node> {
    template.iter().map(Node::deep_clone).collect()
}

fn node_array(nodes: &[Node]) -> Value {
    Value::array(nodes.iter().cloned().map(Value::Node))
}

/// Bind freshly rendered top-level nodes.
///
/// Nodes inside a virtual element among them are bound through that
/// element, not on their own.
fn bind_rendered(engine: &Engine, context: &BindingContext, nodes: &[Node]) -> Result<()> {
    let mut depth = 0usize;
    let mut roots = Vec::new();
    for node in nodes {
        if virtual_elements::is_end_comment(node) {
            depth = depth.saturating_sub(1);
            continue;
        }
        if depth == 0 && (node.is_element() || node.is_comment()) {
            roots.push(node.clone());
        }
        if virtual_elements::is_start_comment(node) {
            depth += 1;
        }
    }
    for root in &roots {
        engine.apply_to_node_and_descendants(context, root, true)?;
    }
    Ok(())
}

/// Call an optional render callback outside dependency tracking.
fn call_hook(hook: &Value, args: &[Value]) -> Result<()> {
    if hook.is_function() {
        ReactiveContext::untracked(|| hook.call(args))?;
    }
    Ok(())
}
