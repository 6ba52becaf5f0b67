//! Widget domain models.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// A persisted, user-authored custom widget.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WidgetDefinition {
    pub id: i64,
    #[serde(rename = "type", default, deserialize_with = "lenient_kind")]
    pub kind: WidgetKind,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub config: WidgetConfig,
    #[serde(default)]
    pub data_source: Option<DataSource>,
    #[serde(default)]
    pub style: Option<WidgetStyle>,
    /// Refresh period in seconds.
    #[serde(default, deserialize_with = "lenient_interval")]
    pub refresh_interval: Option<u64>,
}

impl WidgetDefinition {
    /// CSS class that scopes this widget's container and stylesheet.
    pub fn scope_class(&self) -> String {
        format!("tessera-widget-{}", self.id)
    }
}

/// Widget variant. Anything unrecognized is kept as `Unknown`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum WidgetKind {
    Html,
    Text,
    Iframe,
    Api,
    Chart,
    Unknown(String),
}

impl WidgetKind {
    /// Parse from string.
    pub fn from_str(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "html" => Self::Html,
            "text" => Self::Text,
            "iframe" => Self::Iframe,
            "api" => Self::Api,
            "chart" => Self::Chart,
            _ => Self::Unknown(s.to_string()),
        }
    }

    /// Convert to string.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Html => "html",
            Self::Text => "text",
            Self::Iframe => "iframe",
            Self::Api => "api",
            Self::Chart => "chart",
            Self::Unknown(s) => s,
        }
    }
}

impl Default for WidgetKind {
    fn default() -> Self {
        Self::Unknown(String::new())
    }
}

impl From<String> for WidgetKind {
    fn from(s: String) -> Self {
        Self::from_str(&s)
    }
}

impl From<WidgetKind> for String {
    fn from(kind: WidgetKind) -> Self {
        kind.as_str().to_string()
    }
}

/// Variant-specific configuration. Unknown keys are retained in `extra`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WidgetConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub html_content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub css_content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text_content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text_format: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iframe_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iframe_sandbox: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chart_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chart_config: Option<ChartAxes>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl WidgetConfig {
    pub fn text_format(&self) -> TextFormat {
        self.text_format
            .as_deref()
            .map(TextFormat::from_str)
            .unwrap_or(TextFormat::Plain)
    }

    pub fn chart_kind(&self) -> ChartKind {
        self.chart_type
            .as_deref()
            .map(ChartKind::from_str)
            .unwrap_or(ChartKind::Line)
    }
}

/// How a text widget's content is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TextFormat {
    Plain,
    Markdown,
    Html,
}

impl TextFormat {
    /// Parse from string. Unrecognized formats are treated as plain text.
    pub fn from_str(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "markdown" | "md" => Self::Markdown,
            "html" => Self::Html,
            _ => Self::Plain,
        }
    }
}

/// Chart kind handed to the charting collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChartKind {
    Line,
    Bar,
    Area,
    Pie,
}

impl ChartKind {
    /// Parse from string. Unrecognized kinds fall back to a line chart.
    pub fn from_str(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "bar" => Self::Bar,
            "area" => Self::Area,
            "pie" => Self::Pie,
            _ => Self::Line,
        }
    }
}

/// Explicit axis keys for chart widgets.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChartAxes {
    #[serde(default)]
    pub x_axis: Option<String>,
    #[serde(default)]
    pub y_axis: Option<String>,
}

/// Description of how to fetch external data for a widget.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DataSource {
    #[serde(rename = "type", default)]
    pub source_type: Option<String>,
    #[serde(default)]
    pub endpoint: Option<String>,
    #[serde(default)]
    pub method: Option<String>,
    #[serde(default)]
    pub headers: Option<BTreeMap<String, String>>,
    #[serde(default)]
    pub params: Option<Map<String, Value>>,
    #[serde(default)]
    pub body: Option<Value>,
    #[serde(default)]
    pub data_path: Option<String>,
    /// Function body applied to the fetched data.
    #[serde(default)]
    pub transform: Option<String>,
}

impl DataSource {
    /// Only `api` sources are fetched. A missing type counts as `api`.
    pub fn is_api(&self) -> bool {
        self.source_type
            .as_deref()
            .map_or(true, |t| t.eq_ignore_ascii_case("api"))
    }
}

/// Visual properties of the widget container.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WidgetStyle {
    #[serde(default)]
    pub background_color: Option<Value>,
    #[serde(default)]
    pub text_color: Option<Value>,
    #[serde(default)]
    pub border_color: Option<Value>,
    #[serde(default)]
    pub border_radius: Option<Value>,
    #[serde(default)]
    pub padding: Option<Value>,
    #[serde(default)]
    pub font_size: Option<Value>,
    #[serde(default)]
    pub font_family: Option<Value>,
    #[serde(default)]
    pub border_width: Option<Value>,
    #[serde(default)]
    pub box_shadow: Option<Value>,
}

/// A normalized chart record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartRow {
    pub category: String,
    pub value: f64,
    /// The source record's fields, when the source element was an object.
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub fields: Map<String, Value>,
}

/// Host-facing mount configuration supplied by the dashboard grid.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MountConfig {
    #[serde(default)]
    pub widget_id: Option<i64>,
    #[serde(default, deserialize_with = "lenient_mount_interval")]
    pub refresh_interval: Option<u64>,
}

/// Non-string `type` values (null, numbers, objects) become `Unknown`.
fn lenient_kind<'de, D>(deserializer: D) -> Result<WidgetKind, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => WidgetKind::from_str(&s),
        Value::Null => WidgetKind::default(),
        other => WidgetKind::Unknown(other.to_string()),
    })
}

/// Any JSON number is accepted and fractions are truncated. Zero or
/// negative values mean no refresh; non-numeric values are ignored.
fn lenient_interval<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(interval_secs(Value::deserialize(deserializer)?).filter(|secs| *secs > 0))
}

/// Like `lenient_interval`, but keeps an explicit zero so a host can
/// switch off the definition's refresh.
fn lenient_mount_interval<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(interval_secs(Value::deserialize(deserializer)?))
}

fn interval_secs(value: Value) -> Option<u64> {
    let secs = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }?;
    if !secs.is_finite() {
        return None;
    }
    Some(if secs < 1.0 { 0 } else { secs as u64 })
}
