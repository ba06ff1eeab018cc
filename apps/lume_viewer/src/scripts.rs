//! Script loading and handler auto-detection for a layout

use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

use lume_script::ScriptEngine;
use lume_script::api::{EventType, WidgetScriptBinding};
use tracing::{debug, info, warn};

use crate::host::WidgetStore;
use crate::layout::{Layout, resolve_script_path};

/// Load every script referenced by the layout, once per distinct path
///
/// Scripts are registered under the path written in the layout, so a module
/// default export is published under that file's stem. A script that fails
/// to load is logged and its widgets stay unbound.
pub fn load_layout_scripts(engine: &ScriptEngine, layout: &Layout, layout_path: &Path) -> usize {
    let paths: BTreeSet<&str> = layout.scripts.values().map(String::as_str).collect();
    let mut loaded = 0;

    for script in paths {
        let file = resolve_script_path(layout_path, script);
        let source = match fs::read_to_string(&file) {
            Ok(source) => source,
            Err(e) => {
                warn!("Cannot read script '{}': {}", file.display(), e);
                continue;
            }
        };

        match engine.load_script(script, &source) {
            Ok(()) => {
                debug!("Loaded script '{}' ({} bytes)", script, source.len());
                loaded += 1;
            }
            Err(e) => warn!("{}", e),
        }
    }

    loaded
}

/// Candidate handler names for one widget and event kind, in lookup order
pub fn handler_candidates(script_path: &str, widget_id: &str, event_type: EventType) -> Vec<String> {
    let handler = event_type.handler_name();
    let mut candidates = Vec::with_capacity(3);

    if let Some(stem) = Path::new(script_path).file_stem().and_then(|s| s.to_str()) {
        candidates.push(format!("{}.{}", stem, handler));
    }
    let by_id = format!("{}.{}", widget_id, handler);
    if !candidates.contains(&by_id) {
        candidates.push(by_id);
    }
    candidates.push(handler.to_string());
    candidates
}

/// Build a binding for `widget_id` from whatever handlers the script defines
pub fn detect_binding(
    engine: &ScriptEngine,
    widget_id: &str,
    script_path: &str,
    store: &WidgetStore,
) -> Option<WidgetScriptBinding> {
    let widget = store.get(widget_id)?;
    let mut binding = WidgetScriptBinding::new(script_path, widget.widget_type);

    for event_type in EventType::ALL {
        let found = handler_candidates(script_path, widget_id, event_type)
            .into_iter()
            .find(|name| engine.has_handler(name));
        if let Some(name) = found {
            debug!("Widget '{}': {} -> {}", widget_id, event_type, name);
            binding = binding.with_handler(event_type, name);
        }
    }

    Some(binding)
}

/// Bind every scripted widget whose script loaded, returning the bound count
pub fn bind_layout_widgets(engine: &ScriptEngine, layout: &Layout, store: &WidgetStore) -> usize {
    let mut bound = 0;

    for (widget_id, script_path) in &layout.scripts {
        if engine.script(script_path).is_none() {
            warn!("Widget '{}' left unbound: script '{}' is not loaded", widget_id, script_path);
            continue;
        }

        let Some(binding) = detect_binding(engine, widget_id, script_path, store) else {
            warn!("Widget '{}' has a script but is not in the layout", widget_id);
            continue;
        };

        if binding.handlers.is_empty() {
            warn!("Script '{}' defines no handlers for widget '{}'", script_path, widget_id);
        }

        let handler_count = binding.handlers.len();
        match engine.register_widget(widget_id, binding) {
            Ok(()) => {
                info!("Bound widget '{}' to '{}' ({} handlers)", widget_id, script_path, handler_count);
                bound += 1;
            }
            Err(e) => warn!("{}", e),
        }
    }

    bound
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use lume_schema::Validatable;
    use lume_script::ScriptEngineConfig;
    use lume_script::api::{CommandQueue, EventQueue, WidgetType};

    fn engine() -> ScriptEngine {
        ScriptEngine::new(
            Arc::new(EventQueue::new()),
            Arc::new(CommandQueue::new()),
            ScriptEngineConfig::default().with_console(false),
        )
        .unwrap()
    }

    #[test]
    fn test_handler_candidates_order() {
        assert_eq!(
            handler_candidates("scripts/login.js", "loginButton", EventType::Click),
            vec!["login.onClick", "loginButton.onClick", "onClick"]
        );
        assert_eq!(
            handler_candidates("ok.js", "ok", EventType::Change),
            vec!["ok.onChange", "onChange"]
        );
    }

    #[test]
    fn test_detect_and_bind() {
        let layout = Layout::from_json_str(
            r#"{
                "widgets": [
                    { "id": "ok", "type": "button" },
                    { "id": "name", "type": "textinput" }
                ],
                "scripts": { "ok": "ok.js", "name": "missing.js" }
            }"#,
        )
        .unwrap();
        let store = WidgetStore::from_specs(&layout.widgets);
        let engine = engine();
        engine
            .load_script(
                "ok.js",
                "var ok = { onClick: function (self) { self.setText('hi'); } };\n\
                 function onHover(self) {}",
            )
            .unwrap();

        assert_eq!(bind_layout_widgets(&engine, &layout, &store), 1);

        let binding = engine.binding("ok").unwrap();
        assert_eq!(binding.widget_type, WidgetType::Button);
        assert_eq!(binding.handler(EventType::Click), Some("ok.onClick"));
        assert_eq!(binding.handler(EventType::Hover), Some("onHover"));
        assert_eq!(binding.handler(EventType::Submit), None);
        assert!(engine.binding("name").is_none());
    }

    #[test]
    fn test_demo_login_flow() {
        let layout_path = Path::new(env!("CARGO_MANIFEST_DIR")).join("../../demos/login/layout.json");
        let layout = Layout::from_json_file(&layout_path).unwrap();
        let mut store = WidgetStore::from_specs(&layout.widgets);

        let engine = engine();
        engine.set_ui_tree(store.widgets()).unwrap();
        assert_eq!(load_layout_scripts(&engine, &layout, &layout_path), 2);
        assert_eq!(bind_layout_widgets(&engine, &layout, &store), 3);
        assert_eq!(
            engine.binding("loginButton").unwrap().handler(EventType::Click),
            Some("loginButton.onClick")
        );
        assert_eq!(engine.binding("remember").unwrap().handler(EventType::Click), Some("onClick"));

        let events = engine.event_queue();
        assert!(events.push(
            lume_script::api::WidgetEvent::new(EventType::Change, "username").with_data("value", "alice")
        ));
        assert!(events.push(lume_script::api::WidgetEvent::new(EventType::Click, "remember")));
        assert!(events.push(lume_script::api::WidgetEvent::new(EventType::Click, "loginButton")));

        engine.start().unwrap();
        let deadline = std::time::Instant::now() + std::time::Duration::from_secs(5);
        while engine.stats().processed < 3 && std::time::Instant::now() < deadline {
            std::thread::sleep(std::time::Duration::from_millis(5));
        }
        engine.stop();

        assert_eq!(engine.stats().handled, 3);
        store.apply_all(&engine.command_queue().pop_all());

        let button = store.get("loginButton").unwrap();
        assert_eq!(button.text, "Logging in...");
        assert!(!button.enabled);
        assert_eq!(
            store.get("remember").unwrap().properties.get("checked"),
            Some(&serde_json::json!(true))
        );
        let status = store.get("statusLabel").unwrap();
        assert_eq!(status.text, "Welcome, alice (remembered)");
        assert_eq!(status.color, lume_script::api::Rgba::new(80, 200, 120, 255));
    }
}
