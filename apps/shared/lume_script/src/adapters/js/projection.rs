//! `RootElement` projection of the UI tree
//!
//! Each tree node becomes a proxy object exposing `id`, `type`, the widget API
//! and navigation helpers. Children are reachable as same-named properties
//! backed by getters, so a proxy is only built when a script touches it.

use std::sync::Arc;

use rquickjs::object::Accessor;
use rquickjs::{Array, Ctx, Function, Object, Value};

use crate::api::{CommandQueue, NodeId, UiTree, WidgetCommands, WidgetType, reserved_names};

use super::bindings::install_widget_methods;

/// Global under which the tree projection is installed
pub const ROOT_ELEMENT_GLOBAL: &str = "RootElement";

/// Flat lookups only available on the root proxy
const ROOT_ONLY: [&str; 2] = ["getElementById", "getByType"];

/// Build the `RootElement` object for `tree` and install it as a global
pub fn install_root_element<'js>(
    ctx: &Ctx<'js>,
    tree: &Arc<UiTree>,
    queue: &Arc<CommandQueue>,
) -> rquickjs::Result<()> {
    let root = create_root_element(ctx, tree, queue)?;
    ctx.globals().set(ROOT_ELEMENT_GLOBAL, root)
}

pub fn create_root_element<'js>(
    ctx: &Ctx<'js>,
    tree: &Arc<UiTree>,
    queue: &Arc<CommandQueue>,
) -> rquickjs::Result<Object<'js>> {
    let root = create_widget_proxy(ctx, tree, tree.root().node_id, queue, &ROOT_ONLY)?;

    let (t, q) = (Arc::clone(tree), Arc::clone(queue));
    root.set(
        "getElementById",
        Function::new(ctx.clone(), move |ctx: Ctx<'js>, id: String| {
            proxy_or_null(&ctx, &t, t.find_by_id(&id).map(|n| n.node_id), &q)
        })?,
    )?;

    let (t, q) = (Arc::clone(tree), Arc::clone(queue));
    root.set(
        "getByType",
        Function::new(ctx.clone(), move |ctx: Ctx<'js>, type_name: String| {
            let ids: Vec<NodeId> = match type_name.parse::<WidgetType>() {
                Ok(widget_type) => t.nodes_of_type(widget_type).iter().map(|n| n.node_id).collect(),
                Err(_) => Vec::new(),
            };
            proxy_array(&ctx, &t, &ids, &q)
        })?,
    )?;

    Ok(root)
}

/// Build the proxy object for one node
pub fn create_widget_proxy<'js>(
    ctx: &Ctx<'js>,
    tree: &Arc<UiTree>,
    node_id: NodeId,
    queue: &Arc<CommandQueue>,
    extra_reserved: &[&str],
) -> rquickjs::Result<Object<'js>> {
    let obj = Object::new(ctx.clone())?;
    let Some(node) = tree.node(node_id) else {
        return Ok(obj);
    };

    obj.set("id", node.id.as_str())?;
    let widget_type = node.widget_type();
    if let Some(widget_type) = widget_type {
        obj.set("type", widget_type.as_str())?;
        let commands = WidgetCommands::new(Arc::clone(queue), node.id.clone());
        install_widget_methods(ctx, &obj, &commands, widget_type)?;
    }

    let (t, q) = (Arc::clone(tree), Arc::clone(queue));
    obj.set(
        "getChildren",
        Function::new(ctx.clone(), move |ctx: Ctx<'js>| {
            let ids: Vec<NodeId> = t.children(node_id).iter().map(|n| n.node_id).collect();
            proxy_array(&ctx, &t, &ids, &q)
        })?,
    )?;

    let (t, q) = (Arc::clone(tree), Arc::clone(queue));
    obj.set(
        "getParent",
        Function::new(ctx.clone(), move |ctx: Ctx<'js>| {
            proxy_or_null(&ctx, &t, t.parent(node_id).map(|n| n.node_id), &q)
        })?,
    )?;

    let (t, q) = (Arc::clone(tree), Arc::clone(queue));
    obj.set(
        "findDescendant",
        Function::new(ctx.clone(), move |ctx: Ctx<'js>, id: String| {
            proxy_or_null(&ctx, &t, t.find_descendant(node_id, &id).map(|n| n.node_id), &q)
        })?,
    )?;

    let reserved = reserved_names(widget_type);
    for child in tree.children(node_id) {
        if reserved.contains(&child.id.as_str()) || extra_reserved.contains(&child.id.as_str()) {
            continue;
        }
        let child_id = child.node_id;
        let (t, q) = (Arc::clone(tree), Arc::clone(queue));
        let getter = Accessor::new_get(move |ctx: Ctx<'js>| {
            create_widget_proxy(&ctx, &t, child_id, &q, &[])
        });
        obj.prop(child.id.as_str(), getter.enumerable())?;
    }

    Ok(obj)
}

fn proxy_or_null<'js>(
    ctx: &Ctx<'js>,
    tree: &Arc<UiTree>,
    node_id: Option<NodeId>,
    queue: &Arc<CommandQueue>,
) -> rquickjs::Result<Value<'js>> {
    match node_id {
        Some(node_id) => Ok(create_widget_proxy(ctx, tree, node_id, queue, &[])?.into_value()),
        None => Ok(Value::new_null(ctx.clone())),
    }
}

fn proxy_array<'js>(
    ctx: &Ctx<'js>,
    tree: &Arc<UiTree>,
    node_ids: &[NodeId],
    queue: &Arc<CommandQueue>,
) -> rquickjs::Result<Array<'js>> {
    let array = Array::new(ctx.clone())?;
    for (index, node_id) in node_ids.iter().enumerate() {
        array.set(index, create_widget_proxy(ctx, tree, *node_id, queue, &[])?)?;
    }
    Ok(array)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::js::bindings::setup_globals;
    use crate::api::{CommandType, WidgetInfo};
    use rquickjs::{Context, Runtime};

    fn tree() -> Arc<UiTree> {
        Arc::new(UiTree::build(&[
            WidgetInfo::new("loginPanel", WidgetType::Panel),
            WidgetInfo::new("usernameInput", WidgetType::TextInput).with_parent("loginPanel"),
            WidgetInfo::new("loginButton", WidgetType::Button).with_parent("loginPanel"),
            WidgetInfo::new("cancelButton", WidgetType::Button).with_parent("loginPanel"),
            WidgetInfo::new("status", WidgetType::Label),
        ]))
    }

    fn eval_with_root<R: Send>(
        queue: &Arc<CommandQueue>,
        f: impl for<'js> FnOnce(Ctx<'js>) -> R + Send,
    ) -> R {
        let runtime = Runtime::new().unwrap();
        let context = Context::full(&runtime).unwrap();
        let tree = tree();
        context.with(|ctx| {
            setup_globals(ctx.clone(), true).unwrap();
            install_root_element(&ctx, &tree, queue).unwrap();
            f(ctx)
        })
    }

    #[test]
    fn test_hierarchical_access_enqueues() {
        let queue = Arc::new(CommandQueue::new());
        eval_with_root(&queue, |ctx| {
            ctx.eval::<(), _>("RootElement.loginPanel.usernameInput.setText('alice')").unwrap();
        });

        let commands = queue.pop_all();
        assert_eq!(commands.len(), 1);
        assert_eq!(commands[0].command_type, CommandType::SetText);
        assert_eq!(commands[0].widget_id, "usernameInput");
        assert_eq!(commands[0].value.as_text(), Some("alice"));
    }

    #[test]
    fn test_synthetic_root_shape() {
        let queue = Arc::new(CommandQueue::new());
        eval_with_root(&queue, |ctx| {
            let ok: bool = ctx
                .eval(
                    "RootElement.id === 'root' && RootElement.type === undefined \
                     && typeof RootElement.setText === 'undefined' \
                     && RootElement.getChildren().length === 2 \
                     && RootElement.getParent() === null",
                )
                .unwrap();
            assert!(ok);

            let keys: Vec<String> = ctx.eval("Object.keys(RootElement.loginPanel).filter(k => k.endsWith('Button'))").unwrap();
            assert_eq!(keys, vec!["loginButton", "cancelButton"]);
        });
    }

    #[test]
    fn test_lookup_helpers() {
        let queue = Arc::new(CommandQueue::new());
        eval_with_root(&queue, |ctx| {
            let ok: bool = ctx
                .eval(
                    "RootElement.getElementById('nonexistent') === null \
                     && RootElement.getElementById('root') === null \
                     && RootElement.getElementById('status').type === 'label' \
                     && RootElement.getByType('slider').length === 0 \
                     && RootElement.getByType('unknown').length === 0",
                )
                .unwrap();
            assert!(ok);

            let mut buttons: Vec<String> = ctx
                .eval("RootElement.getByType('button').map(b => b.getID())")
                .unwrap();
            buttons.sort();
            assert_eq!(buttons, vec!["cancelButton", "loginButton"]);
        });
    }

    #[test]
    fn test_navigation() {
        let queue = Arc::new(CommandQueue::new());
        eval_with_root(&queue, |ctx| {
            let parent: String = ctx
                .eval("RootElement.getElementById('loginButton').getParent().id")
                .unwrap();
            assert_eq!(parent, "loginPanel");

            let children: Vec<String> = ctx
                .eval("RootElement.loginPanel.getChildren().map(c => c.id)")
                .unwrap();
            assert_eq!(children, vec!["usernameInput", "loginButton", "cancelButton"]);

            let found: String = ctx
                .eval("RootElement.findDescendant('cancelButton').type")
                .unwrap();
            assert_eq!(found, "button");

            let missing: bool = ctx
                .eval("RootElement.loginPanel.findDescendant('status') === null")
                .unwrap();
            assert!(missing);
        });
    }
}
