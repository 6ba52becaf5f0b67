//! Template rendering for api and text widgets.
//!
//! Two modes: `{{field}}` placeholder substitution for api widgets, and a
//! markdown-lite converter for text widgets. The converter is a fixed chain
//! of pure string passes and is intentionally lossy; it is not CommonMark.
//! Neither mode sanitizes its output, callers hand the result to the
//! [`SanitizationGate`](crate::sanitize::SanitizationGate).

use regex::{Captures, Regex};
use serde_json::Value;
use std::sync::LazyLock;

static PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{\{\s*([A-Za-z0-9_\-.]+)\s*\}\}").expect("valid regex"));

/// Render an api template against one record, or once per record of a
/// sequence. Unresolved placeholders are left as written.
pub fn render_api_template(template: &str, data: &Value) -> String {
    match data {
        Value::Array(records) => records
            .iter()
            .map(|record| render_record(template, record))
            .collect(),
        record => render_record(template, record),
    }
}

fn render_record(template: &str, record: &Value) -> String {
    PLACEHOLDER
        .replace_all(template, |caps: &Captures| match lookup(record, &caps[1]) {
            Some(value) => escape_html(&display_value(value)),
            None => caps[0].to_string(),
        })
        .into_owned()
}

fn lookup<'a>(record: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.').try_fold(record, |current, segment| match current {
        Value::Object(map) => map.get(segment),
        Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
        _ => None,
    })
}

fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Escape text for inclusion in HTML.
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

type Pass = fn(&str) -> String;

/// Markdown passes in application order. Headers must run before emphasis
/// and line breaks before list items.
const MARKDOWN_PASSES: &[Pass] = &[
    headers,
    bold,
    italic,
    links,
    line_breaks,
    list_items,
    inline_code,
    paragraphs,
];

/// Convert markdown-lite text to HTML.
pub fn markdown_to_html(text: &str) -> String {
    let normalized = text.replace("\r\n", "\n");
    MARKDOWN_PASSES
        .iter()
        .fold(normalized, |html, pass| pass(&html))
}

static H3: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?m)^###[ \t]+(.+)$").expect("valid regex"));
static H2: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?m)^##[ \t]+(.+)$").expect("valid regex"));
static H1: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?m)^#[ \t]+(.+)$").expect("valid regex"));
static BOLD_STARS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\*\*([^*\n]+?)\*\*").expect("valid regex"));
static BOLD_UNDERSCORES: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"__([^_\n]+?)__").expect("valid regex"));
static ITALIC: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\*([^*\s][^*\n]*?)\*").expect("valid regex"));
static LINK: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\[([^\]\n]+)\]\(([^)\s]+)\)").expect("valid regex"));
static LIST_ITEM: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[-*+][ \t]+(.+)$").expect("valid regex"));
static INLINE_CODE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"`([^`\n]+)`").expect("valid regex"));
static BLANK_LINES: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\n[ \t]*\n").expect("valid regex"));

fn headers(text: &str) -> String {
    let text = H3.replace_all(text, "<h3>$1</h3>");
    let text = H2.replace_all(&text, "<h2>$1</h2>");
    H1.replace_all(&text, "<h1>$1</h1>").into_owned()
}

fn bold(text: &str) -> String {
    let text = BOLD_STARS.replace_all(text, "<strong>$1</strong>");
    BOLD_UNDERSCORES
        .replace_all(&text, "<strong>$1</strong>")
        .into_owned()
}

fn italic(text: &str) -> String {
    ITALIC.replace_all(text, "<em>$1</em>").into_owned()
}

fn links(text: &str) -> String {
    LINK.replace_all(
        text,
        r#"<a href="$2" target="_blank" rel="noopener noreferrer">$1</a>"#,
    )
    .into_owned()
}

fn is_block_line(line: &str) -> bool {
    let line = line.trim_start();
    line.starts_with("<h1>")
        || line.starts_with("<h2>")
        || line.starts_with("<h3>")
        || LIST_ITEM.is_match(line)
}

/// Single newlines inside running text become `<br>`.
fn line_breaks(text: &str) -> String {
    let lines: Vec<&str> = text.split('\n').collect();
    let mut out = String::with_capacity(text.len());

    for (i, line) in lines.iter().enumerate() {
        out.push_str(line);
        if let Some(next) = lines.get(i + 1) {
            let joins_text = !line.trim().is_empty()
                && !next.trim().is_empty()
                && !is_block_line(line)
                && !is_block_line(next);
            if joins_text {
                out.push_str("<br>");
            }
            out.push('\n');
        }
    }
    out
}

/// Runs of `- item` lines become one `<ul>`.
fn list_items(text: &str) -> String {
    let mut out: Vec<String> = Vec::new();
    let mut in_list = false;

    for line in text.split('\n') {
        match LIST_ITEM.captures(line.trim_start()) {
            Some(caps) => {
                if !in_list {
                    out.push("<ul>".to_string());
                    in_list = true;
                }
                out.push(format!("<li>{}</li>", &caps[1]));
            }
            None => {
                if in_list {
                    out.push("</ul>".to_string());
                    in_list = false;
                }
                out.push(line.to_string());
            }
        }
    }
    if in_list {
        out.push("</ul>".to_string());
    }
    out.join("\n")
}

fn inline_code(text: &str) -> String {
    INLINE_CODE.replace_all(text, "<code>$1</code>").into_owned()
}

/// Blank-line separated blocks that are not already block elements are
/// wrapped in `<p>`.
fn paragraphs(text: &str) -> String {
    BLANK_LINES
        .split(text)
        .map(str::trim)
        .filter(|block| !block.is_empty())
        .map(|block| {
            let is_block = ["<h1>", "<h2>", "<h3>", "<ul>"]
                .iter()
                .any(|tag| block.starts_with(tag));
            if is_block {
                block.to_string()
            } else {
                format!("<p>{}</p>", block)
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_single_record() {
        assert_eq!(
            render_api_template("Hello {{name}}", &json!({"name": "Ana"})),
            "Hello Ana"
        );
    }

    #[test]
    fn test_sequence_concatenates() {
        assert_eq!(
            render_api_template("Hello {{name}}", &json!([{"name": "A"}, {"name": "B"}])),
            "Hello AHello B"
        );
    }

    #[test]
    fn test_unresolved_placeholders_stay_literal() {
        assert_eq!(
            render_api_template("{{ missing }} / {{name}}", &json!({"name": "x"})),
            "{{ missing }} / x"
        );
        assert_eq!(render_api_template("{{name}}", &Value::Null), "{{name}}");
        assert_eq!(render_api_template("{{name}", &json!({"name": "x"})), "{{name}");
    }

    #[test]
    fn test_nested_and_typed_values() {
        let data = json!({"user": {"name": "Ana"}, "count": 3, "active": true, "tags": ["a"], "none": null});
        assert_eq!(
            render_api_template("{{user.name}}|{{count}}|{{active}}|{{tags.0}}|{{none}}", &data),
            "Ana|3|true|a|"
        );
    }

    #[test]
    fn test_values_are_escaped() {
        assert_eq!(
            render_api_template("<b>{{v}}</b>", &json!({"v": "<i>x</i>"})),
            "<b>&lt;i&gt;x&lt;/i&gt;</b>"
        );
    }

    #[test]
    fn test_markdown_document() {
        let md = "# Title\n\nSome **bold** and *it* text.\nNext line\n\n- a\n- b";
        assert_eq!(
            markdown_to_html(md),
            "<h1>Title</h1>\n<p>Some <strong>bold</strong> and <em>it</em> text.<br>\nNext line</p>\n<ul>\n<li>a</li>\n<li>b</li>\n</ul>"
        );
    }

    #[test]
    fn test_header_levels() {
        assert_eq!(
            markdown_to_html("### three\n## two\n# one"),
            "<h3>three</h3>\n<h2>two</h2>\n<h1>one</h1>"
        );
        assert_eq!(markdown_to_html("#nospace"), "<p>#nospace</p>");
    }

    #[test]
    fn test_links_and_code() {
        assert_eq!(
            markdown_to_html("See [docs](https://example.com) and `cargo`"),
            "<p>See <a href=\"https://example.com\" target=\"_blank\" rel=\"noopener noreferrer\">docs</a> and <code>cargo</code></p>"
        );
    }

    #[test]
    fn test_star_list_items_are_not_italic() {
        assert_eq!(
            markdown_to_html("* one\n* two"),
            "<ul>\n<li>one</li>\n<li>two</li>\n</ul>"
        );
    }

    #[test]
    fn test_empty_input() {
        assert_eq!(markdown_to_html(""), "");
        assert_eq!(markdown_to_html("\n\n"), "");
    }
}
