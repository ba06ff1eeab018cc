//! Widget model shared by the host loop and the script worker
//!
//! The host owns its live widgets; everything on the script side works from
//! [`WidgetInfo`] snapshots taken through the read-only [`Widget`] trait.

use std::fmt;
use std::str::FromStr;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Types of widgets supported by the UI system
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum WidgetType {
    /// Clickable button with label
    Button,
    /// Static text display
    Label,
    /// Single line text entry
    TextInput,
    /// Numeric slider
    Slider,
    /// Dropdown selection
    ComboBox,
    CheckBox,
    RadioButton,
    Image,
    ListView,
    GridView,
    TableView,
    /// Plain container
    Panel,
}

impl WidgetType {
    pub fn as_str(&self) -> &'static str {
        match self {
            WidgetType::Button => "button",
            WidgetType::Label => "label",
            WidgetType::TextInput => "textinput",
            WidgetType::Slider => "slider",
            WidgetType::ComboBox => "combobox",
            WidgetType::CheckBox => "checkbox",
            WidgetType::RadioButton => "radiobutton",
            WidgetType::Image => "image",
            WidgetType::ListView => "listview",
            WidgetType::GridView => "gridview",
            WidgetType::TableView => "tableview",
            WidgetType::Panel => "panel",
        }
    }
}

impl fmt::Display for WidgetType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WidgetType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "button" => Ok(WidgetType::Button),
            "label" => Ok(WidgetType::Label),
            "textinput" => Ok(WidgetType::TextInput),
            "slider" => Ok(WidgetType::Slider),
            "combobox" => Ok(WidgetType::ComboBox),
            "checkbox" => Ok(WidgetType::CheckBox),
            "radiobutton" => Ok(WidgetType::RadioButton),
            "image" => Ok(WidgetType::Image),
            "listview" => Ok(WidgetType::ListView),
            "gridview" => Ok(WidgetType::GridView),
            "tableview" => Ok(WidgetType::TableView),
            "panel" => Ok(WidgetType::Panel),
            _ => Err(format!("Unknown widget type: {}", s)),
        }
    }
}

/// RGBA color with 0-255 channels
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    #[serde(default = "opaque")]
    pub a: u8,
}

fn opaque() -> u8 {
    255
}

impl Rgba {
    pub const WHITE: Rgba = Rgba::new(255, 255, 255, 255);
    pub const BLACK: Rgba = Rgba::new(0, 0, 0, 255);

    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// Build a color from script numbers, clamping each channel into 0-255
    pub fn from_f64(r: f64, g: f64, b: f64, a: f64) -> Self {
        fn channel(v: f64) -> u8 {
            if v.is_nan() { 0 } else { v.round().clamp(0.0, 255.0) as u8 }
        }
        Self::new(channel(r), channel(g), channel(b), channel(a))
    }
}

impl Default for Rgba {
    fn default() -> Self {
        Self::WHITE
    }
}

impl fmt::Display for Rgba {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "rgba({}, {}, {}, {})", self.r, self.g, self.b, self.a)
    }
}

/// Read-only face of a host widget
///
/// Implemented by whatever the host loop renders. The script side never keeps
/// a reference to an implementor, only the [`WidgetInfo`] snapshot.
pub trait Widget {
    fn id(&self) -> &str;
    fn widget_type(&self) -> WidgetType;
    /// Declared parent id; `None`, `""` or `"root"` mean top level
    fn parent_id(&self) -> Option<&str>;
}

/// Immutable snapshot of a widget's identity and position in the hierarchy
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WidgetInfo {
    pub id: String,
    pub widget_type: WidgetType,
    pub parent_id: Option<String>,
}

impl WidgetInfo {
    pub fn new(id: impl Into<String>, widget_type: WidgetType) -> Self {
        Self {
            id: id.into(),
            widget_type,
            parent_id: None,
        }
    }

    pub fn with_parent(mut self, parent_id: impl Into<String>) -> Self {
        self.parent_id = Some(parent_id.into());
        self
    }

    pub fn snapshot<W: Widget + ?Sized>(widget: &W) -> Self {
        Self {
            id: widget.id().to_string(),
            widget_type: widget.widget_type(),
            parent_id: widget.parent_id().map(str::to_string),
        }
    }
}

impl Widget for WidgetInfo {
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
