//! HTML widget frames rendered with tera.

use tera::{Context, Tera};
use tessera_core::WidgetDefinition;
use tessera_engine::style::container_style;
use tessera_engine::template::escape_html;
use tessera_engine::RenderResult;

const FRAME_TEMPLATE: &str = "widget.html";

const FRAME_HTML: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<title>{{ name }}</title>
{% if result.css %}<style>{{ result.css | safe }}</style>{% endif %}
</head>
<body>
<div class="tessera-widget {{ scope }}" data-kind="{{ result.kind }}"{% if style %} style="{{ style }}"{% endif %}>
{% if result.kind == "html" or result.kind == "api_html" %}{{ result.html | safe }}
{% elif result.kind == "text" %}{% if result.format == "plain" %}<div style="white-space: pre-wrap">{{ result.html | safe }}</div>{% else %}{{ result.html | safe }}{% endif %}
{% elif result.kind == "iframe" %}<iframe src="{{ result.src }}" sandbox="{{ result.sandbox | join(sep=" ") }}" style="width: 100%; height: 100%; border: 0"></iframe>
{% elif result.kind == "api_json" %}<pre class="tessera-json">{{ result.json }}</pre>
{% elif result.kind == "chart" %}<table class="tessera-chart" data-chart="{{ result.chart }}">
<thead><tr><th>Category</th><th>Value</th></tr></thead>
<tbody>{% for row in result.rows %}<tr><td>{{ row.category }}</td><td>{{ row.value }}</td></tr>{% endfor %}</tbody>
</table>
{% elif result.kind == "empty" %}<p class="tessera-empty">{{ result.message }}</p>
{% elif result.kind == "unknown" %}<p class="tessera-unknown">Unknown widget type: {{ result.widget_type }}</p>
{% elif result.kind == "error" %}<p class="tessera-error">{{ result.message }}</p>
{% elif result.kind == "fallback" %}<p class="tessera-error">{{ result.reason }}</p>
<pre class="tessera-json">{{ result.raw }}</pre>
{% endif %}
</div>
</body>
</html>
"#;

/// Compiled view templates.
pub fn templates() -> tera::Result<Tera> {
    let mut tera = Tera::default();
    tera.add_raw_template(FRAME_TEMPLATE, FRAME_HTML)?;
    Ok(tera)
}

/// Full HTML document for one widget render.
pub fn render_frame(
    views: &Tera,
    definition: &WidgetDefinition,
    result: &RenderResult,
) -> tera::Result<String> {
    let mut context = Context::new();
    context.insert("name", &definition.name);
    context.insert("scope", &definition.scope_class());
    context.insert(
        "style",
        &definition.style.as_ref().map(container_style).unwrap_or_default(),
    );
    context.insert("result", result);
    views.render(FRAME_TEMPLATE, &context)
}

/// Escaped JSON dump of a result, for when the frame itself fails.
pub fn raw_frame(result: &RenderResult) -> String {
    let raw = serde_json::to_string_pretty(result).unwrap_or_default();
    format!("<pre class=\"tessera-json\">{}</pre>", escape_html(&raw))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tessera_core::{WidgetConfig, WidgetKind, WidgetStyle};
    use tessera_engine::WidgetTypeDispatcher;

    fn definition(kind: WidgetKind, config: WidgetConfig) -> WidgetDefinition {
        WidgetDefinition {
            id: 5,
            kind,
            name: "Revenue <Q3>".to_string(),
            config,
            data_source: None,
            style: Some(WidgetStyle {
                background_color: Some(json!("#fff")),
                padding: Some(json!(12)),
                ..Default::default()
            }),
            refresh_interval: None,
        }
    }

    fn frame(def: &WidgetDefinition, data: serde_json::Value) -> String {
        let result = WidgetTypeDispatcher::default().dispatch(def, &data);
        render_frame(&templates().unwrap(), def, &result).unwrap()
    }

    #[test]
    fn test_html_frame_injects_sanitized_markup() {
        let def = definition(
            WidgetKind::Html,
            WidgetConfig {
                html_content: Some("<h2>Hi</h2><script>x()</script>".to_string()),
                css_content: Some("h2 { color: red }".to_string()),
                ..Default::default()
            },
        );
        let html = frame(&def, serde_json::Value::Null);

        assert!(html.contains("<h2>Hi</h2>"));
        assert!(!html.contains("<script>"));
        assert!(html.contains(".tessera-widget-5 h2 { color: red }"));
        assert!(html.contains("class=\"tessera-widget tessera-widget-5\""));
        assert!(html.contains("padding: 12px"));
        assert!(html.contains("Revenue &lt;Q3&gt;"));
    }

    #[test]
    fn test_api_json_is_escaped() {
        let def = definition(WidgetKind::Api, WidgetConfig::default());
        let html = frame(&def, json!({"tag": "<b>"}));
        assert!(html.contains("&lt;b&gt;"));
        assert!(!html.contains("<b>"));
    }

    #[test]
    fn test_chart_rows_render_as_table() {
        let def = definition(WidgetKind::Chart, WidgetConfig::default());
        let html = frame(&def, json!([{"name": "North", "count": 4}]));
        assert!(html.contains("data-chart=\"line\""));
        assert!(html.contains("<td>North</td>"));
    }

    #[test]
    fn test_iframe_frame_carries_sandbox() {
        let def = definition(
            WidgetKind::Iframe,
            WidgetConfig {
                iframe_url: Some("https://example.com/report".to_string()),
                iframe_sandbox: Some(vec!["allow-scripts".to_string(), "allow-forms".to_string()]),
                ..Default::default()
            },
        );
        let html = frame(&def, serde_json::Value::Null);
        assert!(html.contains("sandbox=\"allow-scripts allow-forms\""));
    }

    #[test]
    fn test_raw_frame_escapes() {
        let raw = raw_frame(&RenderResult::error("<oops>"));
        assert!(raw.contains("&lt;oops&gt;"));
    }
}
