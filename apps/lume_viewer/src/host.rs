//! Host-side widget state
//!
//! The viewer owns these widgets. Scripts never touch them directly: their
//! mutations arrive as [`WidgetCommand`]s drained from the command queue once
//! per tick and applied here.

use std::collections::{BTreeMap, HashMap};

use lume_script::api::{CommandType, Rgba, Widget, WidgetCommand, WidgetType};
use tracing::{debug, warn};

use crate::layout::{Bounds, WidgetSpec};

/// A live widget with the properties scripts can change
#[derive(Debug, Clone, PartialEq)]
pub struct HostWidget {
    pub id: String,
    pub widget_type: WidgetType,
    pub parent_id: Option<String>,
    pub text: String,
    pub visible: bool,
    pub enabled: bool,
    pub color: Rgba,
    pub focused: bool,
    pub z_index: i32,
    pub interactive: bool,
    pub bounds: Option<Bounds>,
    /// Everything set through `setProperty` that has no dedicated field
    pub properties: BTreeMap<String, serde_json::Value>,
}

impl From<&WidgetSpec> for HostWidget {
    fn from(spec: &WidgetSpec) -> Self {
        Self {
            id: spec.id.clone(),
            widget_type: spec.widget_type,
            parent_id: spec.parent_id.clone(),
            text: spec.text.clone(),
            visible: spec.visible,
            enabled: spec.enabled,
            color: spec.color,
            focused: false,
            z_index: spec.z_index,
            interactive: spec.interactive,
            bounds: spec.bounds,
            properties: BTreeMap::new(),
        }
    }
}

impl Widget for HostWidget {
    fn id(&self) -> &str {
        &self.id
    }

    fn widget_type(&self) -> WidgetType {
        self.widget_type
    }

    fn parent_id(&self) -> Option<&str> {
        self.parent_id.as_deref()
    }
}

/// All widgets of one layout, in declaration order
#[derive(Debug, Default)]
pub struct WidgetStore {
    widgets: Vec<HostWidget>,
    index: HashMap<String, usize>,
}

impl WidgetStore {
    pub fn from_specs(specs: &[WidgetSpec]) -> Self {
        let mut store = Self::default();
        for spec in specs {
            if store.index.contains_key(&spec.id) {
                warn!("Duplicate widget id '{}' ignored", spec.id);
                continue;
            }
            store.index.insert(spec.id.clone(), store.widgets.len());
            store.widgets.push(HostWidget::from(spec));
        }
        store
    }

    pub fn widgets(&self) -> &[HostWidget] {
        &self.widgets
    }

    pub fn get(&self, id: &str) -> Option<&HostWidget> {
        self.index.get(id).map(|&i| &self.widgets[i])
    }

    fn get_mut(&mut self, id: &str) -> Option<&mut HostWidget> {
        match self.index.get(id) {
            Some(&i) => self.widgets.get_mut(i),
            None => None,
        }
    }

    pub fn len(&self) -> usize {
        self.widgets.len()
    }

    /// Id of the widget currently holding focus
    pub fn focused(&self) -> Option<&str> {
        self.widgets.iter().find(|w| w.focused).map(|w| w.id.as_str())
    }

    /// Topmost visible, interactive widget whose bounds contain the point
    ///
    /// Ties on z-index go to the widget declared last.
    pub fn hit_test(&self, x: i32, y: i32) -> Option<&HostWidget> {
        self.widgets
            .iter()
            .filter(|w| w.visible && w.interactive)
            .filter(|w| w.bounds.is_some_and(|b| b.contains(x, y)))
            .max_by_key(|w| w.z_index)
    }

    /// Apply one script command
    ///
    /// Returns false when the command was ignored (unknown widget or a value
    /// of the wrong kind).
    pub fn apply(&mut self, command: &WidgetCommand) -> bool {
        if self.get(&command.widget_id).is_none() {
            warn!("Command {} for unknown widget '{}' ignored", command.command_type, command.widget_id);
            return false;
        }

        match command.command_type {
            CommandType::SetText => {
                let text = match command.value.as_text() {
                    Some(text) => text.to_string(),
                    None => command.value.to_json().to_string(),
                };
                debug!("Set text on {}: {}", command.widget_id, text);
                self.with_widget(&command.widget_id, |w| w.text = text)
            }
            CommandType::SetVisible => match command.value.as_bool() {
                Some(visible) => self.with_widget(&command.widget_id, |w| w.visible = visible),
                None => self.reject(command),
            },
            CommandType::SetColor => match command.value.as_color() {
                Some(color) => self.with_widget(&command.widget_id, |w| w.color = color),
                None => self.reject(command),
            },
            CommandType::SetProperty => {
                let Some(property) = command.property.clone() else {
                    return self.reject(command);
                };
                debug!("Set property {} on {}", property, command.widget_id);
                match (property.as_str(), command.value.as_bool()) {
                    ("enabled", Some(enabled)) => {
                        self.with_widget(&command.widget_id, |w| w.enabled = enabled)
                    }
                    ("visible", Some(visible)) => {
                        self.with_widget(&command.widget_id, |w| w.visible = visible)
                    }
                    ("interactive", Some(interactive)) => {
                        self.with_widget(&command.widget_id, |w| w.interactive = interactive)
                    }
                    _ => {
                        let value = command.value.to_json();
                        self.with_widget(&command.widget_id, |w| {
                            w.properties.insert(property, value);
                        })
                    }
                }
            }
            CommandType::Focus => {
                for widget in &mut self.widgets {
                    widget.focused = widget.id == command.widget_id;
                }
                true
            }
            CommandType::Blur => self.with_widget(&command.widget_id, |w| w.focused = false),
        }
    }

    /// Apply a drained batch in order, returning how many took effect
    pub fn apply_all(&mut self, commands: &[WidgetCommand]) -> usize {
        commands.iter().filter(|command| self.apply(command)).count()
    }

    fn with_widget(&mut self, id: &str, f: impl FnOnce(&mut HostWidget)) -> bool {
        match self.get_mut(id) {
            Some(widget) => {
                f(widget);
                true
            }
            None => false,
        }
    }

    fn reject(&self, command: &WidgetCommand) -> bool {
        warn!(
            "Command {} on '{}' carries an unusable value: {:?}",
            command.command_type, command.widget_id, command.value
        );
        false
    }
}
