//! Layout files
//!
//! A layout describes the widgets the viewer hosts, which script drives which
//! widget, and an optional scripted interaction timeline used to exercise the
//! scripts without a real input device.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use lume_schema::Validatable;
use lume_script::api::{EventType, Rgba, WidgetEvent, WidgetType};
use lume_script::ScriptEngineConfig;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Axis-aligned widget bounds in window coordinates
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Bounds {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl Bounds {
    pub fn contains(&self, x: i32, y: i32) -> bool {
        let right = self.x as i64 + self.width as i64;
        let bottom = self.y as i64 + self.height as i64;
        x >= self.x && y >= self.y && (x as i64) < right && (y as i64) < bottom
    }
}

/// One widget declaration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct WidgetSpec {
    pub id: String,

    #[serde(rename = "type")]
    pub widget_type: WidgetType,

    /// Parent widget id; omitted, empty or "root" means top level
    #[serde(default)]
    pub parent_id: Option<String>,

    #[serde(default)]
    pub text: String,

    #[serde(default = "default_true")]
    pub visible: bool,

    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default)]
    pub color: Rgba,

    /// Higher values sit on top when hit-testing
    #[serde(default)]
    pub z_index: i32,

    /// Whether pointer interactions can target this widget
    #[serde(default = "default_true")]
    pub interactive: bool,

    #[serde(default)]
    pub bounds: Option<Bounds>,
}

fn default_true() -> bool {
    true
}

/// A synthetic input scheduled on a given tick
///
/// Either `target` names the widget directly, or `x`/`y` are hit-tested
/// against widget bounds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Interaction {
    /// 1-based tick on which the event is pushed
    pub tick: u64,

    #[serde(rename = "type")]
    pub event_type: EventType,

    #[serde(default)]
    pub target: Option<String>,

    #[serde(default)]
    pub x: i32,

    #[serde(default)]
    pub y: i32,

    #[serde(default)]
    pub button: i32,

    #[serde(default)]
    pub data: BTreeMap<String, serde_json::Value>,
}

impl Interaction {
    /// Build the event for an already resolved target widget
    pub fn to_event(&self, widget_id: &str) -> WidgetEvent {
        let mut event = WidgetEvent::new(self.event_type, widget_id)
            .with_position(self.x, self.y)
            .with_button(self.button);
        for (key, value) in &self.data {
            event = event.with_data(key.clone(), value.clone());
        }
        event
    }
}

/// Root of a layout file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Layout {
    pub widgets: Vec<WidgetSpec>,

    /// Widget id to script file, relative to the layout file
    #[serde(default)]
    pub scripts: BTreeMap<String, String>,

    #[serde(default)]
    pub engine: ScriptEngineConfig,

    #[serde(default)]
    pub interactions: Vec<Interaction>,
}

impl Validatable for Layout {}

impl Layout {
    /// Cross-field checks the schema cannot express
    pub fn validate(&self) -> Result<(), String> {
        let mut seen = std::collections::HashSet::new();
        for widget in &self.widgets {
            if widget.id.is_empty() {
                return Err("Widget with empty id".to_string());
            }
            if !seen.insert(widget.id.as_str()) {
                return Err(format!("Duplicate widget id '{}'", widget.id));
            }
        }

        for widget_id in self.scripts.keys() {
            if !seen.contains(widget_id.as_str()) {
                return Err(format!("Script bound to unknown widget '{}'", widget_id));
            }
        }

        for interaction in &self.interactions {
            if interaction.tick == 0 {
                return Err("Interaction ticks start at 1".to_string());
            }
            if let Some(target) = &interaction.target {
                if !seen.contains(target.as_str()) {
                    return Err(format!("Interaction targets unknown widget '{}'", target));
                }
            }
        }

        if self.engine.event_queue_capacity == 0 {
            return Err("engine.event_queue_capacity must be at least 1".to_string());
        }

        Ok(())
    }

    /// Last tick with a scheduled interaction, 0 when there is none
    pub fn last_interaction_tick(&self) -> u64 {
        self.interactions.iter().map(|i| i.tick).max().unwrap_or(0)
    }

    /// Interactions scheduled for `tick`, in file order
    pub fn interactions_at(&self, tick: u64) -> impl Iterator<Item = &Interaction> {
        self.interactions.iter().filter(move |i| i.tick == tick)
    }
}

/// Resolve a script path from the layout against the layout's directory
pub fn resolve_script_path(layout_path: &Path, script: &str) -> PathBuf {
    let script_path = Path::new(script);
    if script_path.is_absolute() {
        return script_path.to_path_buf();
    }
    layout_path
        .parent()
        .unwrap_or_else(|| Path::new("."))
        .join(script_path)
}

#[cfg(test)]
mod tests {
    use super::*;

    const LOGIN_LAYOUT: &str = r#"{
        "widgets": [
            { "id": "loginPanel", "type": "panel", "bounds": { "x": 0, "y": 0, "width": 400, "height": 300 } },
            { "id": "loginButton", "type": "button", "parentId": "loginPanel", "text": "Login",
              "zIndex": 2, "bounds": { "x": 20, "y": 200, "width": 100, "height": 30 } },
            { "id": "statusLabel", "type": "label", "parentId": "loginPanel", "color": { "r": 200, "g": 200, "b": 200 } }
        ],
        "scripts": { "loginButton": "scripts/loginButton.js" },
        "engine": { "enable_console": false },
        "interactions": [
            { "tick": 2, "type": "click", "target": "loginButton" },
            { "tick": 5, "type": "hover", "x": 30, "y": 210, "data": { "source": "test" } }
        ]
    }"#;

    #[test]
    fn test_parse_layout() {
        let layout = Layout::from_json_str(LOGIN_LAYOUT).unwrap();
        assert_eq!(layout.widgets.len(), 3);

        let button = &layout.widgets[1];
        assert_eq!(button.widget_type, WidgetType::Button);
        assert_eq!(button.parent_id.as_deref(), Some("loginPanel"));
        assert_eq!(button.z_index, 2);
        assert!(button.visible);
        assert!(button.interactive);

        let label = &layout.widgets[2];
        assert_eq!(label.color, Rgba::new(200, 200, 200, 255));
        assert!(label.bounds.is_none());

        assert!(!layout.engine.enable_console);
        assert_eq!(layout.engine.event_queue_capacity, 100);
        assert_eq!(layout.last_interaction_tick(), 5);
        assert!(layout.validate().is_ok());
    }

    #[test]
    fn test_schema_rejects_bad_widget_type() {
        let result = Layout::from_json_str(r#"{ "widgets": [ { "id": "a", "type": "spinner" } ] }"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_validate_rejects_duplicates_and_unknown_targets() {
        let duplicate = Layout::from_json_str(
            r#"{ "widgets": [ { "id": "a", "type": "label" }, { "id": "a", "type": "button" } ] }"#,
        )
        .unwrap();
        assert!(duplicate.validate().unwrap_err().contains("Duplicate"));

        let unknown_script = Layout::from_json_str(
            r#"{ "widgets": [ { "id": "a", "type": "label" } ], "scripts": { "b": "b.js" } }"#,
        )
        .unwrap();
        assert!(unknown_script.validate().unwrap_err().contains("'b'"));

        let tick_zero = Layout::from_json_str(
            r#"{ "widgets": [ { "id": "a", "type": "button" } ],
                 "interactions": [ { "tick": 0, "type": "click", "target": "a" } ] }"#,
        )
        .unwrap();
        assert!(tick_zero.validate().is_err());
    }

    #[test]
    fn test_interaction_to_event() {
        let layout = Layout::from_json_str(LOGIN_LAYOUT).unwrap();
        let hover = layout.interactions_at(5).next().unwrap();
        let event = hover.to_event("loginButton");

        assert_eq!(event.event_type, EventType::Hover);
        assert_eq!(event.widget_id, "loginButton");
        assert_eq!((event.x, event.y), (30, 210));
        assert_eq!(event.data.get("source"), Some(&serde_json::json!("test")));
        assert_eq!(layout.interactions_at(3).count(), 0);
    }

    #[test]
    fn test_demo_layout_is_valid() {
        let layout = Layout::from_json_str(include_str!("../../../demos/login/layout.json")).unwrap();
        assert!(layout.validate().is_ok());
        assert_eq!(layout.scripts.get("remember").map(String::as_str), Some("scripts/username.js"));
    }

    #[test]
    fn test_bounds_contains() {
        let bounds = Bounds { x: 10, y: 10, width: 5, height: 5 };
        assert!(bounds.contains(10, 10));
        assert!(bounds.contains(14, 14));
        assert!(!bounds.contains(15, 10));
        assert!(!bounds.contains(9, 12));
    }

    #[test]
    fn test_resolve_script_path() {
        let layout = Path::new("demos/login/layout.json");
        assert_eq!(
            resolve_script_path(layout, "scripts/a.js"),
            PathBuf::from("demos/login/scripts/a.js")
        );
        assert_eq!(resolve_script_path(layout, "/abs/a.js"), PathBuf::from("/abs/a.js"));
    }
}
