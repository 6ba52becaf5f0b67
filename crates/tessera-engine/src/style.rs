//! Widget container styling.

use regex::Regex;
use serde_json::Value;
use std::sync::LazyLock;
use tessera_core::WidgetStyle;

use crate::sanitize::SafeCss;

static COMMENTS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)/\*.*?\*/").expect("valid regex"));

/// Inline CSS declarations for a widget container.
pub fn container_style(style: &WidgetStyle) -> String {
    let mut declarations: Vec<String> = Vec::new();
    let mut push = |property: &str, value: &Option<Value>, length: bool| {
        if let Some(value) = value.as_ref().and_then(|v| css_value(v, length)) {
            declarations.push(format!("{}: {}", property, value));
        }
    };

    push("background-color", &style.background_color, false);
    push("color", &style.text_color, false);
    push("border-color", &style.border_color, false);
    push("border-width", &style.border_width, true);
    push("border-radius", &style.border_radius, true);
    push("padding", &style.padding, true);
    push("font-size", &style.font_size, true);
    push("font-family", &style.font_family, false);
    push("box-shadow", &style.box_shadow, false);

    if style.border_color.is_some() || style.border_width.is_some() {
        declarations.push("border-style: solid".to_string());
    }

    declarations.join("; ")
}

/// Render a style value. Numbers on length properties gain `px`. Values that
/// could escape the declaration or load resources are dropped.
fn css_value(value: &Value, length: bool) -> Option<String> {
    let raw = match value {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) if length => format!("{}px", n),
        Value::Number(n) => n.to_string(),
        _ => return None,
    };

    let lower = raw.to_lowercase();
    let unsafe_value = raw.is_empty()
        || raw.contains(|c: char| matches!(c, ';' | '{' | '}' | '<' | '>' | '"' | '\\'))
        || lower.contains("url(")
        || lower.contains("expression");
    (!unsafe_value).then_some(raw)
}

/// Prefix every selector in `css` with `.{scope}` so the stylesheet only
/// applies inside the widget container. `@media`/`@supports` blocks are
/// scoped recursively; other at-rules pass through unchanged. An
/// unbalanced trailing block is dropped.
pub fn scope_css(css: &SafeCss, scope: &str) -> String {
    let css = COMMENTS.replace_all(css.as_str(), "");
    scope_rules(&css, scope)
}

fn scope_rules(css: &str, scope: &str) -> String {
    let mut out = String::new();
    let mut rest = css;

    while let Some(open) = rest.find('{') {
        let Some(close) = matching_brace(rest, open) else {
            break;
        };
        let prelude = rest[..open].rsplit(';').next().unwrap_or("").trim();
        let body = &rest[open + 1..close];

        if prelude.starts_with("@media") || prelude.starts_with("@supports") {
            out.push_str(&format!("{} {{\n{}}}\n", prelude, scope_rules(body, scope)));
        } else if prelude.starts_with('@') {
            out.push_str(&format!("{} {{ {} }}\n", prelude, body.trim()));
        } else if !prelude.is_empty() {
            let selectors = prelude
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(|s| scope_selector(s, scope))
                .collect::<Vec<_>>()
                .join(", ");
            out.push_str(&format!("{} {{ {} }}\n", selectors, body.trim()));
        }

        rest = &rest[close + 1..];
    }
    out
}

fn scope_selector(selector: &str, scope: &str) -> String {
    match selector {
        ":root" | "html" | "body" | ":host" => format!(".{}", scope),
        _ => format!(".{} {}", scope, selector),
    }
}

fn matching_brace(text: &str, open: usize) -> Option<usize> {
    let mut depth = 0usize;
    for (i, c) in text[open..].char_indices() {
        match c {
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(open + i);
                }
            }
            _ => {}
        }
    }
    None
}
