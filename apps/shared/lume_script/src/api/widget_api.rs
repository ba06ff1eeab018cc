//! Widget API capability table
//!
//! Describes which methods a script's `self` object exposes for each widget type.
//! Runtime adapters install one native function per [`WidgetMethod`] returned by
//! [`widget_methods`]; every method funnels through [`WidgetCommands`], which only
//! ever pushes onto the [`CommandQueue`].

use std::sync::Arc;

use super::command_queue::{CommandQueue, CommandType, CommandValue, WidgetCommand};
use super::widget::{Rgba, WidgetType};

/// One method of the per-widget script API
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WidgetMethod {
    GetId,
    SetText,
    SetVisible,
    SetColor,
    SetProperty,
    Focus,
    Blur,
    /// Button: `setEnabled(bool)` -> set-property `enabled`
    SetEnabled,
    /// Text input: `setValue(text)` -> set-text
    SetValueText,
    /// Text input: `setPlaceholder(text)` -> set-property `placeholder`
    SetPlaceholder,
    /// Checkbox / radio button: `setChecked(bool)` -> set-property `checked`
    SetChecked,
    /// Slider: `setValue(number)` -> set-property `value`
    SetValueNumber,
    /// Combo box / list view: `setSelectedIndex(n)` -> set-property `selectedIndex`
    SetSelectedIndex,
}

impl WidgetMethod {
    /// Name the method is installed under on the script object
    pub fn js_name(&self) -> &'static str {
        match self {
            WidgetMethod::GetId => "getID",
            WidgetMethod::SetText => "setText",
            WidgetMethod::SetVisible => "setVisible",
            WidgetMethod::SetColor => "setColor",
            WidgetMethod::SetProperty => "setProperty",
            WidgetMethod::Focus => "focus",
            WidgetMethod::Blur => "blur",
            WidgetMethod::SetEnabled => "setEnabled",
            WidgetMethod::SetValueText | WidgetMethod::SetValueNumber => "setValue",
            WidgetMethod::SetPlaceholder => "setPlaceholder",
            WidgetMethod::SetChecked => "setChecked",
            WidgetMethod::SetSelectedIndex => "setSelectedIndex",
        }
    }
}

const COMMON_METHODS: [WidgetMethod; 7] = [
    WidgetMethod::GetId,
    WidgetMethod::SetText,
    WidgetMethod::SetVisible,
    WidgetMethod::SetColor,
    WidgetMethod::SetProperty,
    WidgetMethod::Focus,
    WidgetMethod::Blur,
];

/// Capability list for a widget type: the common methods plus type-specific ones
pub fn widget_methods(widget_type: WidgetType) -> Vec<WidgetMethod> {
    let mut methods = COMMON_METHODS.to_vec();
    match widget_type {
        WidgetType::Button => methods.push(WidgetMethod::SetEnabled),
        WidgetType::TextInput => {
            methods.push(WidgetMethod::SetValueText);
            methods.push(WidgetMethod::SetPlaceholder);
        }
        WidgetType::CheckBox | WidgetType::RadioButton => methods.push(WidgetMethod::SetChecked),
        WidgetType::Slider => methods.push(WidgetMethod::SetValueNumber),
        WidgetType::ComboBox | WidgetType::ListView => methods.push(WidgetMethod::SetSelectedIndex),
        WidgetType::Label
        | WidgetType::Image
        | WidgetType::GridView
        | WidgetType::TableView
        | WidgetType::Panel => {}
    }
    methods
}

/// Names reserved on a widget object; child widgets with these ids are not
/// exposed as properties so they cannot shadow the API
pub fn reserved_names(widget_type: Option<WidgetType>) -> Vec<&'static str> {
    let mut names = vec!["id", "type", "getChildren", "getParent", "findDescendant"];
    if let Some(widget_type) = widget_type {
        names.extend(widget_methods(widget_type).iter().map(|m| m.js_name()));
    }
    names
}

/// Command builder scoped to one widget
#[derive(Clone)]
pub struct WidgetCommands {
    queue: Arc<CommandQueue>,
    widget_id: String,
}

impl WidgetCommands {
    pub fn new(queue: Arc<CommandQueue>, widget_id: impl Into<String>) -> Self {
        Self {
            queue,
            widget_id: widget_id.into(),
        }
    }

    pub fn widget_id(&self) -> &str {
        &self.widget_id
    }

    pub fn set_text(&self, text: impl Into<String>) {
        self.push(CommandType::SetText, CommandValue::Text(text.into()));
    }

    pub fn set_visible(&self, visible: bool) {
        self.push(CommandType::SetVisible, CommandValue::Bool(visible));
    }

    pub fn set_color(&self, color: Rgba) {
        self.push(CommandType::SetColor, CommandValue::Color(color));
    }

    pub fn set_property(&self, property: impl Into<String>, value: CommandValue) {
        self.queue
            .push(WidgetCommand::set_property(self.widget_id.clone(), property, value));
    }

    pub fn focus(&self) {
        self.push(CommandType::Focus, CommandValue::Null);
    }

    pub fn blur(&self) {
        self.push(CommandType::Blur, CommandValue::Null);
    }

    fn push(&self, command_type: CommandType, value: CommandValue) {
        self.queue
            .push(WidgetCommand::new(command_type, self.widget_id.clone(), value));
    }
}
