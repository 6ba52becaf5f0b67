//! Render results.

use serde::Serialize;
use serde_json::Value;
use tessera_core::{ChartKind, ChartRow, TextFormat};

use crate::sanitize::{SafeCss, SafeHtml};

/// Default sandbox tokens for iframe widgets.
pub const DEFAULT_IFRAME_SANDBOX: &[&str] = &[
    "allow-scripts",
    "allow-same-origin",
    "allow-forms",
    "allow-popups",
    "allow-popups-to-escape-sandbox",
];

/// The variant-specific payload ready for display. Derived per pipeline
/// run and never persisted.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RenderResult {
    Html {
        html: SafeHtml,
        #[serde(skip_serializing_if = "Option::is_none")]
        css: Option<SafeCss>,
    },
    /// Text content. `html` is escaped text for plain widgets and sanitized
    /// markup for markdown/html widgets.
    Text { format: TextFormat, html: SafeHtml },
    Iframe { src: String, sandbox: Vec<String> },
    /// Api widget rendered through its template.
    ApiHtml { html: SafeHtml },
    /// Api widget without a template: pretty-printed JSON shown as text.
    ApiJson { json: String },
    Chart { chart: ChartKind, rows: Vec<ChartRow> },
    /// Nothing to show yet: no data, no rows or no content.
    Empty { message: String },
    /// The definition's type is not one this engine renders.
    Unknown { widget_type: String },
    /// Configuration error surfaced inline for this widget.
    Error { message: String },
    /// Render error: the raw data as JSON.
    Fallback { reason: String, raw: String },
}

impl RenderResult {
    pub fn empty(message: impl Into<String>) -> Self {
        Self::Empty {
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
        }
    }

    /// Raw JSON view used when a widget cannot be rendered.
    pub fn fallback(reason: impl Into<String>, data: &Value) -> Self {
        Self::Fallback {
            reason: reason.into(),
            raw: serde_json::to_string_pretty(data).unwrap_or_else(|_| data.to_string()),
        }
    }

    /// Short name of the variant, for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Html { .. } => "html",
            Self::Text { .. } => "text",
            Self::Iframe { .. } => "iframe",
            Self::ApiHtml { .. } => "api_html",
            Self::ApiJson { .. } => "api_json",
            Self::Chart { .. } => "chart",
            Self::Empty { .. } => "empty",
            Self::Unknown { .. } => "unknown",
            Self::Error { .. } => "error",
            Self::Fallback { .. } => "fallback",
        }
    }

    /// The markup a host may inject into the page, if any.
    pub fn injectable_html(&self) -> Option<&SafeHtml> {
        match self {
            Self::Html { html, .. } | Self::Text { html, .. } | Self::ApiHtml { html } => Some(html),
            _ => None,
        }
    }
}
