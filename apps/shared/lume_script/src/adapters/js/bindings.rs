//! JavaScript bindings for the script API
//!
//! Bridges the runtime-agnostic types in `crate::api` into a QuickJS context:
//! console output, the per-widget `self` object, the `event` view, handler
//! resolution and error formatting.
//!
//! # JavaScript Glue Code
//!
//! Console argument formatting lives in `glue/console.js` and is embedded at
//! compile time. The native side only ever receives one pre-formatted string.

use std::path::Path;
use std::sync::Arc;

use rquickjs::convert::Coerced;
use rquickjs::function::Opt;
use rquickjs::{Ctx, Function, Object, Value};

use crate::api::{
    CommandQueue, CommandValue, ConsoleApi, Rgba, WidgetCommands, WidgetEvent, WidgetMethod,
    WidgetType, widget_methods,
};

/// Console glue, embedded from `glue/console.js`
const JS_CONSOLE_GLUE: &str = include_str!("glue/console.js");

/// Global holding the path of the script currently executing
pub const SCRIPT_ID_GLOBAL: &str = "__SCRIPT_ID__";

/// Persistent user namespace shared by all handler calls
pub const USER_GLOBAL: &str = "Global";

/// Setup console API in the JavaScript context
///
/// Output is attributed to the script named by `__SCRIPT_ID__`. With `enabled`
/// false the console object is still installed but every method is a no-op.
pub fn setup_console_api<'js>(ctx: Ctx<'js>, enabled: bool) -> Result<(), rquickjs::Error> {
    let globals = ctx.globals();
    let console_native = Object::new(ctx.clone())?;

    for (name, level) in [
        ("_log", "info"),
        ("_info", "info"),
        ("_warn", "warn"),
        ("_error", "error"),
        ("_debug", "debug"),
    ] {
        let sink = Function::new(ctx.clone(), move |ctx: Ctx<'js>, message: String| {
            if !enabled {
                return;
            }
            let script: String = ctx
                .globals()
                .get(SCRIPT_ID_GLOBAL)
                .unwrap_or_else(|_| "unknown".to_string());
            ConsoleApi::emit(level, "js", &script, &message);
        })?;
        console_native.set(name, sink)?;
    }

    globals.set("__console_native", console_native)?;
    ctx.eval::<(), _>(JS_CONSOLE_GLUE)?;

    Ok(())
}

/// Install the engine-level globals scripts rely on
pub fn setup_globals<'js>(ctx: Ctx<'js>, enable_console: bool) -> Result<(), rquickjs::Error> {
    setup_console_api(ctx.clone(), enable_console)?;
    ctx.globals().set(USER_GLOBAL, Object::new(ctx.clone())?)?;
    set_script_id(&ctx, "engine")?;
    Ok(())
}

pub fn set_script_id(ctx: &Ctx<'_>, script: &str) -> Result<(), rquickjs::Error> {
    ctx.globals().set(SCRIPT_ID_GLOBAL, script)
}

/// Give the next script a fresh CommonJS-style `module` / `exports` pair
pub fn reset_module_exports(ctx: &Ctx<'_>) -> Result<(), rquickjs::Error> {
    let globals = ctx.globals();
    let module = Object::new(ctx.clone())?;
    let exports = Object::new(ctx.clone())?;
    module.set("exports", exports.clone())?;
    globals.set("module", module)?;
    globals.set("exports", exports)?;
    Ok(())
}

/// Global name for a script's default export: base filename without extension
pub fn export_global_name(path: &str) -> Option<String> {
    Path::new(path)
        .file_stem()
        .and_then(|stem| stem.to_str())
        .filter(|stem| !stem.is_empty())
        .map(str::to_string)
}

/// Expose `module.exports.default` (or `exports.default`) as a global
///
/// Returns the global name used, if a default export was found.
pub fn publish_default_export<'js>(ctx: &Ctx<'js>, path: &str) -> Result<Option<String>, rquickjs::Error> {
    let globals = ctx.globals();

    let from_module = object_property(&globals, "module").and_then(|module| object_property(&module, "exports"));
    let from_exports = object_property(&globals, "exports");

    let mut default_export = None;
    for exports in [from_module, from_exports].into_iter().flatten() {
        let value: Value = exports.get("default")?;
        if !value.is_undefined() {
            default_export = Some(value);
            break;
        }
    }

    match (default_export, export_global_name(path)) {
        (Some(value), Some(name)) => {
            globals.set(name.as_str(), value)?;
            Ok(Some(name))
        }
        _ => Ok(None),
    }
}

fn object_property<'js>(holder: &Object<'js>, key: &str) -> Option<Object<'js>> {
    holder.get::<_, Option<Object<'js>>>(key).ok().flatten()
}

/// Format a JavaScript error with stack trace in Node.js style
///
/// Consumes the pending exception when `error` is an exception.
pub fn format_js_error(ctx: &Ctx<'_>, error: &rquickjs::Error) -> String {
    if !matches!(error, rquickjs::Error::Exception) {
        return error.to_string();
    }

    let exception = ctx.catch();

    if let Some(obj) = exception.as_object() {
        let text = |key: &str| obj.get::<_, Option<String>>(key).ok().flatten();
        let name = text("name").unwrap_or_else(|| "Error".to_string());
        let message = text("message").unwrap_or_default();
        let stack = text("stack").unwrap_or_default();

        let mut output = if message.is_empty() {
            name.clone()
        } else {
            format!("{}: {}", name, message)
        };
        if !stack.is_empty() {
            if stack.starts_with(&name) {
                output = stack;
            } else {
                output.push('\n');
                output.push_str(stack.trim_end());
            }
        }
        return output;
    }

    match exception.get::<Coerced<String>>() {
        Ok(text) => format!("Error: {}", text.0),
        Err(_) => "Error: Unknown JavaScript error".to_string(),
    }
}

/// Convert a script value into a command payload
pub fn command_value_from_js<'js>(ctx: &Ctx<'js>, value: &Value<'js>) -> CommandValue {
    if value.is_null() || value.is_undefined() {
        return CommandValue::Null;
    }
    if let Some(b) = value.as_bool() {
        return CommandValue::Bool(b);
    }
    if let Some(n) = value.as_number() {
        return CommandValue::Number(n);
    }
    if let Some(s) = value.as_string() {
        return s.to_string().map(CommandValue::Text).unwrap_or(CommandValue::Null);
    }

    match ctx.json_stringify(value.clone()) {
        Ok(Some(json)) => json
            .to_string()
            .ok()
            .and_then(|s| serde_json::from_str(&s).ok())
            .map(CommandValue::Json)
            .unwrap_or(CommandValue::Null),
        Ok(None) => CommandValue::Null,
        Err(_) => {
            // e.g. cyclic objects; clear the pending exception
            let _ = ctx.catch();
            CommandValue::Null
        }
    }
}

/// Convert a JSON payload into a script value
pub fn json_to_js<'js>(ctx: &Ctx<'js>, value: &serde_json::Value) -> rquickjs::Result<Value<'js>> {
    ctx.json_parse(value.to_string())
}

/// Install one native function per capability of `widget_type` on `obj`
///
/// Every installed function only enqueues commands through `commands`.
pub fn install_widget_methods<'js>(
    ctx: &Ctx<'js>,
    obj: &Object<'js>,
    commands: &WidgetCommands,
    widget_type: WidgetType,
) -> rquickjs::Result<()> {
    for method in widget_methods(widget_type) {
        let cmds = commands.clone();
        let func = match method {
            WidgetMethod::GetId => Function::new(ctx.clone(), move || cmds.widget_id().to_string())?,
            WidgetMethod::SetText | WidgetMethod::SetValueText => {
                Function::new(ctx.clone(), move |text: Coerced<String>| cmds.set_text(text.0))?
            }
            WidgetMethod::SetVisible => {
                Function::new(ctx.clone(), move |visible: Coerced<bool>| cmds.set_visible(visible.0))?
            }
            WidgetMethod::SetColor => Function::new(
                ctx.clone(),
                move |r: Coerced<f64>, g: Coerced<f64>, b: Coerced<f64>, a: Opt<Coerced<f64>>| {
                    let a = a.0.map(|a| a.0).unwrap_or(255.0);
                    cmds.set_color(Rgba::from_f64(r.0, g.0, b.0, a));
                },
            )?,
            WidgetMethod::SetProperty => Function::new(
                ctx.clone(),
                move |ctx: Ctx<'js>, name: Coerced<String>, value: Opt<Value<'js>>| {
                    let value = value
                        .0
                        .map(|v| command_value_from_js(&ctx, &v))
                        .unwrap_or(CommandValue::Null);
                    cmds.set_property(name.0, value);
                },
            )?,
            WidgetMethod::Focus => Function::new(ctx.clone(), move || cmds.focus())?,
            WidgetMethod::Blur => Function::new(ctx.clone(), move || cmds.blur())?,
            WidgetMethod::SetEnabled => Function::new(ctx.clone(), move |enabled: Coerced<bool>| {
                cmds.set_property("enabled", CommandValue::Bool(enabled.0))
            })?,
            WidgetMethod::SetPlaceholder => Function::new(ctx.clone(), move |text: Coerced<String>| {
                cmds.set_property("placeholder", CommandValue::Text(text.0))
            })?,
            WidgetMethod::SetChecked => Function::new(ctx.clone(), move |checked: Coerced<bool>| {
                cmds.set_property("checked", CommandValue::Bool(checked.0))
            })?,
            WidgetMethod::SetValueNumber => Function::new(ctx.clone(), move |value: Coerced<f64>| {
                cmds.set_property("value", CommandValue::Number(value.0))
            })?,
            WidgetMethod::SetSelectedIndex => Function::new(ctx.clone(), move |index: Coerced<f64>| {
                cmds.set_property("selectedIndex", CommandValue::Number(index.0.trunc()))
            })?,
        };
        obj.set(method.js_name(), func)?;
    }
    Ok(())
}

/// Build the per-call `self` object for a widget
pub fn create_widget_api<'js>(
    ctx: &Ctx<'js>,
    queue: &Arc<CommandQueue>,
    widget_id: &str,
    widget_type: WidgetType,
) -> rquickjs::Result<Object<'js>> {
    let obj = Object::new(ctx.clone())?;
    obj.set("id", widget_id)?;
    obj.set("type", widget_type.as_str())?;
    install_widget_methods(ctx, &obj, &WidgetCommands::new(Arc::clone(queue), widget_id), widget_type)?;
    Ok(obj)
}

/// Build the `event` view handed to a handler; `target` is the handler's `self`
pub fn create_event_object<'js>(
    ctx: &Ctx<'js>,
    event: &WidgetEvent,
    target: &Object<'js>,
) -> rquickjs::Result<Object<'js>> {
    let obj = Object::new(ctx.clone())?;
    obj.set("type", event.event_type.as_str())?;
    obj.set("target", target.clone())?;
    obj.set("timestamp", event.timestamp_millis() as f64)?;

    if event.event_type.is_pointer() {
        obj.set("x", event.x)?;
        obj.set("y", event.y)?;
        obj.set("button", event.button)?;
    }

    if event.event_type == crate::api::EventType::KeyPress {
        if let Some(key) = event.data.get("key") {
            obj.set("key", json_to_js(ctx, key)?)?;
        }
        if let Some(code) = event.data.get("code") {
            obj.set("keyCode", json_to_js(ctx, code)?)?;
        }
    }

    if !event.data.is_empty() {
        let data: serde_json::Map<String, serde_json::Value> = event
            .data
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        obj.set("data", json_to_js(ctx, &serde_json::Value::Object(data))?)?;
    }

    Ok(obj)
}

/// Resolve a handler name to a callable
///
/// `"ns.method"` looks up `method` on the global `ns`; any other name is a
/// global function. The error carries a human readable reason for the miss.
pub fn resolve_handler<'js>(ctx: &Ctx<'js>, name: &str) -> Result<Function<'js>, String> {
    let parts: Vec<&str> = name.split('.').collect();

    let value = if let [namespace, method] = parts.as_slice() {
        let ns = lookup_global(ctx, namespace)
            .ok_or_else(|| format!("namespace '{}' not found", namespace))?;
        let ns = ns
            .as_object()
            .ok_or_else(|| format!("'{}' is not an object", namespace))?;
        let value: Value = ns
            .get(*method)
            .map_err(|e| format!("cannot read '{}': {}", name, e))?;
        if value.is_undefined() {
            return Err(format!("method '{}' not found on '{}'", method, namespace));
        }
        value
    } else {
        lookup_global(ctx, name).ok_or_else(|| format!("function '{}' not found", name))?
    };

    value
        .into_function()
        .ok_or_else(|| format!("'{}' is not a function", name))
}

/// Look up a global binding, including top-level `const`/`let` declarations
/// which are not properties of the global object
pub fn lookup_global<'js>(ctx: &Ctx<'js>, name: &str) -> Option<Value<'js>> {
    let value: Value = ctx.globals().get(name).ok()?;
    if !value.is_undefined() {
        return Some(value);
    }
    if !is_identifier(name) {
        return None;
    }

    let probe = format!("typeof {0} === 'undefined' ? undefined : {0}", name);
    match ctx.eval::<Value, _>(probe) {
        Ok(value) if !value.is_undefined() => Some(value),
        Ok(_) => None,
        Err(_) => {
            let _ = ctx.catch();
            None
        }
    }
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' || c == '$' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$')
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{CommandType, EventType};
    use rquickjs::{Context, Runtime};

    fn with_ctx<R: Send>(f: impl for<'js> FnOnce(Ctx<'js>) -> R + Send) -> R {
        let runtime = Runtime::new().unwrap();
        let context = Context::full(&runtime).unwrap();
        context.with(|ctx| {
            setup_globals(ctx.clone(), true).unwrap();
            f(ctx)
        })
    }

    #[test]
    fn test_export_global_name() {
        assert_eq!(export_global_name("scripts/loginButton.js").as_deref(), Some("loginButton"));
        assert_eq!(export_global_name("counter.ts").as_deref(), Some("counter"));
        assert_eq!(export_global_name("plain").as_deref(), Some("plain"));
        assert_eq!(export_global_name(""), None);
    }

    #[test]
    fn test_is_identifier() {
        assert!(is_identifier("loginButton"));
        assert!(is_identifier("_private$1"));
        assert!(!is_identifier("1abc"));
        assert!(!is_identifier("a.b"));
        assert!(!is_identifier(""));
    }

    #[test]
    fn test_console_and_global_installed() {
        with_ctx(|ctx| {
            let ok: bool = ctx
                .eval("typeof console.log === 'function' && typeof Global === 'object'")
                .unwrap();
            assert!(ok);
            ctx.eval::<(), _>("console.log('hello', 1, {a: 2}, new Error('x'))").unwrap();
        });
    }

    #[test]
    fn test_resolve_bare_and_namespaced() {
        with_ctx(|ctx| {
            ctx.eval::<(), _>(
                "function onClick() {} \
                 var ns = { onClick: function () {}, value: 3 }; \
                 const lexical = { onHover() {} };",
            )
            .unwrap();

            assert!(resolve_handler(&ctx, "onClick").is_ok());
            assert!(resolve_handler(&ctx, "ns.onClick").is_ok());
            assert!(resolve_handler(&ctx, "lexical.onHover").is_ok());

            assert!(resolve_handler(&ctx, "missing").unwrap_err().contains("not found"));
            assert!(resolve_handler(&ctx, "nope.onClick").unwrap_err().contains("namespace"));
            assert!(resolve_handler(&ctx, "ns.onBlur").unwrap_err().contains("method"));
            assert!(resolve_handler(&ctx, "ns.value").unwrap_err().contains("not a function"));
        });
    }

    #[test]
    fn test_format_js_error() {
        with_ctx(|ctx| {
            let err = ctx.eval::<(), _>("throw new TypeError('bad thing')").unwrap_err();
            let text = format_js_error(&ctx, &err);
            assert!(text.starts_with("TypeError: bad thing"), "{}", text);

            let err = ctx.eval::<(), _>("throw 'plain'").unwrap_err();
            assert_eq!(format_js_error(&ctx, &err), "Error: plain");
        });
    }

    #[test]
    fn test_widget_api_enqueues_commands() {
        with_ctx(|ctx| {
            let queue = Arc::new(CommandQueue::new());
            let api = create_widget_api(&ctx, &queue, "ok", WidgetType::Button).unwrap();
            ctx.globals().set("w", api).unwrap();

            let id: String = ctx.eval("w.getID()").unwrap();
            assert_eq!(id, "ok");

            ctx.eval::<(), _>(
                "w.setText('Go'); w.setVisible(false); w.setColor(10, 20, 30); \
                 w.setEnabled(false); w.setProperty('meta', {a: [1, 2]});",
            )
            .unwrap();

            let commands = queue.pop_all();
            assert_eq!(commands.len(), 5);
            assert_eq!(commands[0].value, CommandValue::Text("Go".into()));
            assert_eq!(commands[1].value, CommandValue::Bool(false));
            assert_eq!(commands[2].value, CommandValue::Color(Rgba::new(10, 20, 30, 255)));
            assert_eq!(commands[3].command_type, CommandType::SetProperty);
            assert_eq!(commands[3].property.as_deref(), Some("enabled"));
            assert_eq!(commands[4].value, CommandValue::Json(serde_json::json!({"a": [1, 2]})));
        });
    }

    #[test]
    fn test_type_specific_methods_only_on_matching_type() {
        with_ctx(|ctx| {
            let queue = Arc::new(CommandQueue::new());
            let label = create_widget_api(&ctx, &queue, "l", WidgetType::Label).unwrap();
            let input = create_widget_api(&ctx, &queue, "i", WidgetType::TextInput).unwrap();
            ctx.globals().set("label", label).unwrap();
            ctx.globals().set("input", input).unwrap();

            let has: bool = ctx.eval("typeof label.setEnabled === 'undefined'").unwrap();
            assert!(has);

            ctx.eval::<(), _>("input.setValue('typed')").unwrap();
            let commands = queue.pop_all();
            assert_eq!(commands[0].command_type, CommandType::SetText);
            assert_eq!(commands[0].value.as_text(), Some("typed"));
        });
    }

    #[test]
    fn test_event_object_fields() {
        with_ctx(|ctx| {
            let queue = Arc::new(CommandQueue::new());
            let target = create_widget_api(&ctx, &queue, "field", WidgetType::TextInput).unwrap();

            let click = WidgetEvent::new(EventType::Click, "field").with_position(5, 7).with_button(1);
            let obj = create_event_object(&ctx, &click, &target).unwrap();
            ctx.globals().set("self", target.clone()).unwrap();
            ctx.globals().set("e", obj).unwrap();
            let ok: bool = ctx
                .eval("e.type === 'click' && e.target === self && e.x === 5 && e.y === 7 && e.button === 1 && e.data === undefined")
                .unwrap();
            assert!(ok);

            let key = WidgetEvent::new(EventType::KeyPress, "field")
                .with_data("key", "Enter")
                .with_data("code", 13);
            let obj = create_event_object(&ctx, &key, &target).unwrap();
            ctx.globals().set("k", obj).unwrap();
            let ok: bool = ctx
                .eval("k.key === 'Enter' && k.keyCode === 13 && k.data.key === 'Enter' && k.x === undefined && k.timestamp > 0")
                .unwrap();
            assert!(ok);
        });
    }

    #[test]
    fn test_default_export_published() {
        with_ctx(|ctx| {
            reset_module_exports(&ctx).unwrap();
            ctx.eval::<(), _>("module.exports.default = { onClick() {} };").unwrap();
            let name = publish_default_export(&ctx, "scripts/loginButton.js").unwrap();
            assert_eq!(name.as_deref(), Some("loginButton"));
            assert!(resolve_handler(&ctx, "loginButton.onClick").is_ok());

            reset_module_exports(&ctx).unwrap();
            ctx.eval::<(), _>("var x = 1;").unwrap();
            assert_eq!(publish_default_export(&ctx, "other.js").unwrap(), None);
        });
    }

    #[test]
    fn test_default_export_falls_back_to_exports() {
        with_ctx(|ctx| {
            reset_module_exports(&ctx).unwrap();
            ctx.eval::<(), _>("module.exports = {}; exports.default = { onFocus() {} };").unwrap();
            let name = publish_default_export(&ctx, "username.js").unwrap();
            assert_eq!(name.as_deref(), Some("username"));
            assert!(resolve_handler(&ctx, "username.onFocus").is_ok());

            // No module object at all
            ctx.eval::<(), _>("delete globalThis.module; exports.default = { onBlur() {} };").unwrap();
            assert_eq!(publish_default_export(&ctx, "form.js").unwrap().as_deref(), Some("form"));
            assert!(resolve_handler(&ctx, "form.onBlur").is_ok());
        });
    }
}
