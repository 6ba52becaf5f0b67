//! Widget type dispatch.
//!
//! Selects the render strategy from the widget's kind. Every HTML-producing
//! branch goes through the [`SanitizationGate`].

use reqwest::Url;
use serde_json::Value;
use std::sync::Arc;
use tessera_core::{TesseraError, TesseraResult, TextFormat, WidgetDefinition, WidgetKind};
use tracing::warn;

use crate::coerce::coerce_rows;
use crate::render::{RenderResult, DEFAULT_IFRAME_SANDBOX};
use crate::sanitize::SanitizationGate;
use crate::template::{escape_html, markdown_to_html, render_api_template};

/// Turns a definition plus resolved data into a [`RenderResult`].
#[derive(Clone)]
pub struct WidgetTypeDispatcher {
    gate: Arc<SanitizationGate>,
}

impl WidgetTypeDispatcher {
    pub fn new(gate: Arc<SanitizationGate>) -> Self {
        Self { gate }
    }

    /// Render `definition`. Never fails: render errors become a raw JSON
    /// fallback.
    pub fn dispatch(&self, definition: &WidgetDefinition, data: &Value) -> RenderResult {
        match self.try_dispatch(definition, data) {
            Ok(result) => result,
            Err(e) => {
                warn!(widget_id = definition.id, error = %e, "Render failed, showing raw data");
                let raw = if data.is_null() {
                    serde_json::to_value(&definition.config).unwrap_or(Value::Null)
                } else {
                    data.clone()
                };
                RenderResult::fallback(e.to_string(), &raw)
            }
        }
    }

    fn try_dispatch(&self, definition: &WidgetDefinition, data: &Value) -> TesseraResult<RenderResult> {
        match &definition.kind {
            WidgetKind::Html => Ok(self.render_html(definition)),
            WidgetKind::Text => Ok(self.render_text(definition)),
            WidgetKind::Iframe => render_iframe(definition),
            WidgetKind::Api => self.render_api(definition, data),
            WidgetKind::Chart => Ok(render_chart(definition, data)),
            WidgetKind::Unknown(widget_type) => Ok(RenderResult::Unknown {
                widget_type: widget_type.clone(),
            }),
        }
    }

    fn render_html(&self, definition: &WidgetDefinition) -> RenderResult {
        let Some(content) = non_blank(definition.config.html_content.as_deref()) else {
            return RenderResult::empty("No HTML content configured");
        };

        let css = non_blank(definition.config.css_content.as_deref())
            .map(|css| self.gate.scoped_css(css, &definition.scope_class()));

        RenderResult::Html {
            html: self.gate.html(content),
            css,
        }
    }

    fn render_text(&self, definition: &WidgetDefinition) -> RenderResult {
        let Some(content) = non_blank(definition.config.text_content.as_deref()) else {
            return RenderResult::empty("No text content configured");
        };

        let format = definition.config.text_format();
        let html = match format {
            TextFormat::Plain => self.gate.escaped_text(escape_html(content)),
            TextFormat::Markdown => self.gate.html(&markdown_to_html(content)),
            TextFormat::Html => self.gate.html(content),
        };

        RenderResult::Text { format, html }
    }

    fn render_api(&self, definition: &WidgetDefinition, data: &Value) -> TesseraResult<RenderResult> {
        if data.is_null() {
            return Ok(RenderResult::empty("No data"));
        }

        match non_blank(definition.config.template.as_deref()) {
            Some(template) => Ok(RenderResult::ApiHtml {
                html: self.gate.html(&render_api_template(template, data)),
            }),
            None => {
                let json = serde_json::to_string_pretty(data)
                    .map_err(|e| TesseraError::render(e.to_string()))?;
                Ok(RenderResult::ApiJson { json })
            }
        }
    }
}

impl Default for WidgetTypeDispatcher {
    fn default() -> Self {
        Self::new(Arc::new(SanitizationGate::new()))
    }
}

fn render_iframe(definition: &WidgetDefinition) -> TesseraResult<RenderResult> {
    let Some(raw_url) = non_blank(definition.config.iframe_url.as_deref()) else {
        return Ok(RenderResult::empty("No URL configured"));
    };

    let src = iframe_src(raw_url.trim())?;

    let sandbox = match &definition.config.iframe_sandbox {
        Some(tokens) => tokens
            .iter()
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .collect(),
        None => DEFAULT_IFRAME_SANDBOX.iter().map(|t| t.to_string()).collect(),
    };

    Ok(RenderResult::Iframe { src, sandbox })
}

/// Absolute URLs must be http(s). Relative references resolve against the
/// host page and are passed through as written.
fn iframe_src(raw: &str) -> TesseraResult<String> {
    match Url::parse(raw) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => Ok(url.to_string()),
        Ok(url) => Err(TesseraError::render(format!(
            "Iframe URL scheme '{}' is not allowed",
            url.scheme()
        ))),
        // Without a scheme it can only be a relative reference.
        Err(e) => match Url::parse("http://localhost/").and_then(|base| base.join(raw)) {
            Ok(_) => Ok(raw.to_string()),
            Err(_) => Err(TesseraError::render(format!(
                "Invalid iframe URL '{}': {}",
                raw, e
            ))),
        },
    }
}

fn render_chart(definition: &WidgetDefinition, data: &Value) -> RenderResult {
    let rows = coerce_rows(data, definition.config.chart_config.as_ref());
    if rows.is_empty() {
        return RenderResult::empty("No data to chart");
    }

    RenderResult::Chart {
        chart: definition.config.chart_kind(),
        rows,
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}
