//! The sanitization gate.
//!
//! Every HTML string that can reach an injection boundary is a [`SafeHtml`],
//! and a `SafeHtml` can only be produced here.

use regex::Regex;
use serde::Serialize;
use std::fmt;
use std::sync::LazyLock;
use tracing::debug;

/// HTML that passed the gate. Serializes as a plain string; cannot be
/// constructed or deserialized anywhere else.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct SafeHtml(String);

impl SafeHtml {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Display for SafeHtml {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Stylesheet text that passed the CSS gate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct SafeCss(String);

impl SafeCss {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Display for SafeCss {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

const EXTRA_TAGS: &[&str] = &[
    "article", "aside", "figcaption", "figure", "footer", "header", "main", "mark",
    "nav", "section",
];
const GENERIC_ATTRIBUTES: &[&str] = &["class", "id", "style", "title"];

static ACTIVE_CSS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)expression\s*\(|javascript\s*:|vbscript\s*:|@import|behavior\s*:|-moz-binding")
        .expect("valid regex")
});

/// Strips active content (scripts, event handlers, `javascript:` URLs)
/// while keeping structural and visual markup.
pub struct SanitizationGate {
    html: ammonia::Builder<'static>,
}

impl SanitizationGate {
    pub fn new() -> Self {
        let mut html = ammonia::Builder::default();
        html.add_tags(EXTRA_TAGS)
            .add_generic_attributes(GENERIC_ATTRIBUTES)
            .add_tag_attributes("a", &["target"]);
        Self { html }
    }

    /// Sanitize an HTML fragment.
    pub fn html(&self, input: &str) -> SafeHtml {
        let cleaned = self.html.clean(input).to_string();
        if cleaned.len() != input.len() {
            debug!(before = input.len(), after = cleaned.len(), "Sanitizer rewrote HTML");
        }
        SafeHtml(cleaned)
    }

    /// Sanitize stylesheet text. Removes `<` so the text cannot close its
    /// `<style>` element, and strips script-capable constructs.
    pub fn css(&self, input: &str) -> SafeCss {
        let without_tags = input.replace('<', "");
        SafeCss(ACTIVE_CSS.replace_all(&without_tags, "").into_owned())
    }

    /// Sanitize stylesheet text and scope its selectors to `.{scope}`.
    pub fn scoped_css(&self, input: &str, scope: &str) -> SafeCss {
        let clean = self.css(input);
        SafeCss(crate::style::scope_css(&clean, scope))
    }

    /// Wrap text that is already escaped for HTML.
    pub(crate) fn escaped_text(&self, escaped: String) -> SafeHtml {
        SafeHtml(escaped)
    }
}

impl Default for SanitizationGate {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_script_tags_are_removed() {
        let gate = SanitizationGate::new();
        let inputs = [
            "<script>alert(1)</script><p>ok</p>",
            "<p>a</p><SCRIPT src=x></SCRIPT>",
            "<div><script>document.cookie</script></div>",
            "<scr<script>ipt>alert(1)</script>",
            "<svg><script>alert(1)</script></svg>",
        ];
        for input in inputs {
            let out = gate.html(input);
            assert!(!out.as_str().to_lowercase().contains("<script"), "{input} -> {out}");
        }
    }

    #[test]
    fn test_event_handlers_are_removed() {
        let gate = SanitizationGate::new();
        let out = gate.html(r#"<img src="a.png" onerror="alert(1)"><a href="javascript:alert(1)" onclick="x()">x</a>"#);
        let lower = out.as_str().to_lowercase();
        assert!(!lower.contains("onerror"));
        assert!(!lower.contains("onclick"));
        assert!(!lower.contains("javascript:"));
    }

    #[test]
    fn test_visual_markup_is_kept() {
        let gate = SanitizationGate::new();
        let out = gate.html(r#"<section class="card"><h2 style="color: red">Total</h2><table><tr><td>1</td></tr></table></section>"#);
        assert!(out.as_str().contains(r#"<section class="card">"#));
        assert!(out.as_str().contains(r#"<h2 style="color: red">"#));
        assert!(out.as_str().contains("<td>1</td>"));
    }

    #[test]
    fn test_css_cannot_break_out() {
        let gate = SanitizationGate::new();
        let css = gate.css("p { color: red } </style><script>alert(1)</script> @import url(x.css); div { width: expression(alert(1)) }");
        assert!(!css.as_str().contains('<'));
        assert!(!css.as_str().to_lowercase().contains("@import"));
        assert!(!css.as_str().to_lowercase().contains("expression("));
        assert!(css.as_str().contains("p { color: red }"));
    }

    #[test]
    fn test_child_combinator_is_kept() {
        let css = SanitizationGate::new().css("ul > li { margin: 0 }");
        assert_eq!(css.as_str(), "ul > li { margin: 0 }");
    }
}
