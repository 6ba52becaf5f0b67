//! Custom widget definitions.

pub mod model;

use crate::error::{TesseraError, TesseraResult};
use model::WidgetDefinition;

/// Parse a single persisted widget definition.
pub fn parse_definition(json: &str) -> TesseraResult<WidgetDefinition> {
    Ok(serde_json::from_str(json)?)
}

/// Parse a list of persisted widget definitions, rejecting duplicate ids.
pub fn parse_definitions(json: &str) -> TesseraResult<Vec<WidgetDefinition>> {
    let definitions: Vec<WidgetDefinition> = serde_json::from_str(json)?;

    let mut seen = std::collections::HashSet::new();
    for def in &definitions {
        if !seen.insert(def.id) {
            return Err(TesseraError::configuration(format!(
                "Duplicate widget id {} in definition list",
                def.id
            )));
        }
    }

    Ok(definitions)
}

#[cfg(test)]
mod tests {
    use super::*;
    use model::{TextFormat, WidgetKind};

    #[test]
    fn test_parse_full_definition() {
        let json = r##"{
            "id": 7,
            "type": "api",
            "name": "Open invoices",
            "config": { "template": "<b>{{total}}</b>" },
            "data_source": {
                "type": "api",
                "endpoint": "/finance/invoices",
                "method": "GET",
                "params": { "status": "open" },
                "data_path": "data.summary",
                "transform": "return data"
            },
            "style": { "backgroundColor": "#fff", "padding": 12 },
            "refresh_interval": 30
        }"##;

        let def = parse_definition(json).unwrap();
        assert_eq!(def.id, 7);
        assert_eq!(def.kind, WidgetKind::Api);
        assert_eq!(def.config.template.as_deref(), Some("<b>{{total}}</b>"));
        let source = def.data_source.as_ref().unwrap();
        assert!(source.is_api());
        assert_eq!(source.data_path.as_deref(), Some("data.summary"));
        assert_eq!(def.refresh_interval, Some(30));
        let style = def.style.unwrap();
        assert_eq!(style.background_color, Some(serde_json::json!("#fff")));
    }

    #[test]
    fn test_unknown_type_is_preserved() {
        let def = parse_definition(r#"{"id": 1, "type": "foo", "name": "x"}"#).unwrap();
        assert_eq!(def.kind, WidgetKind::Unknown("foo".to_string()));
        assert_eq!(def.config.text_format(), TextFormat::Plain);
    }

    #[test]
    fn test_non_string_type_is_unknown() {
        let def = parse_definition(r#"{"id": 1, "type": null, "name": "x"}"#).unwrap();
        assert_eq!(def.kind, WidgetKind::Unknown(String::new()));

        let def = parse_definition(r#"{"id": 2, "type": 3, "name": "x"}"#).unwrap();
        assert_eq!(def.kind, WidgetKind::Unknown("3".to_string()));
    }

    #[test]
    fn test_refresh_interval_accepts_any_number() {
        let interval = |raw: &str| {
            let json = format!(r#"{{"id": 1, "type": "api", "refresh_interval": {}}}"#, raw);
            parse_definition(&json).unwrap().refresh_interval
        };

        assert_eq!(interval("30.0"), Some(30));
        assert_eq!(interval("2.5"), Some(2));
        assert_eq!(interval("-1"), None);
        assert_eq!(interval("0"), None);
        assert_eq!(interval("0.4"), None);
        assert_eq!(interval("null"), None);
        assert_eq!(interval("\"soon\""), None);
    }

    #[test]
    fn test_one_odd_entry_does_not_fail_the_list() {
        let json = r#"[
            {"id": 1, "type": "html", "name": "a", "refresh_interval": 2.5},
            {"id": 2, "type": null, "name": "b", "refresh_interval": -1}
        ]"#;
        let defs = parse_definitions(json).unwrap();
        assert_eq!(defs.len(), 2);
        assert_eq!(defs[0].refresh_interval, Some(2));
        assert_eq!(defs[1].refresh_interval, None);
    }

    #[test]
    fn test_mount_config_keeps_explicit_zero() {
        let mount: model::MountConfig =
            serde_json::from_str(r#"{"widget_id": 4, "refresh_interval": -3}"#).unwrap();
        assert_eq!(mount.refresh_interval, Some(0));
    }

    #[test]
    fn test_duplicate_ids_rejected() {
        let json = r#"[{"id": 1, "type": "html", "name": "a"}, {"id": 1, "type": "text", "name": "b"}]"#;
        assert!(matches!(
            parse_definitions(json),
            Err(TesseraError::Configuration(_))
        ));
    }
}
