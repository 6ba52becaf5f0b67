//! The widget render pipeline.
//!
//! fetch → transform → coerce/template → sanitize → render, strictly in
//! that order for one run. Failures resolve locally:
//!
//! | Failure        | Outcome                                   |
//! |----------------|-------------------------------------------|
//! | configuration  | inline error result, pipeline halts       |
//! | network        | logged, data becomes null, run continues  |
//! | transform      | logged, untransformed data is used        |
//! | render         | raw JSON fallback                         |

use serde_json::Value;
use std::sync::Arc;
use tessera_core::{EngineConfig, TesseraResult, WidgetDefinition, WidgetKind};
use tracing::{debug, warn};

use crate::dispatch::WidgetTypeDispatcher;
use crate::render::RenderResult;
use crate::resolver::{DataFetcher, DataSourceResolver};
use crate::sanitize::SanitizationGate;
use crate::transform::{evaluator_from_settings, Evaluator, TransformEngine};

/// Composes the pipeline stages. Cheap to share behind an `Arc`.
#[derive(Clone)]
pub struct WidgetPipeline {
    fetcher: Arc<dyn DataFetcher>,
    transform: TransformEngine,
    dispatcher: WidgetTypeDispatcher,
}

impl WidgetPipeline {
    pub fn new(
        fetcher: Arc<dyn DataFetcher>,
        evaluator: Arc<dyn Evaluator>,
        gate: Arc<SanitizationGate>,
    ) -> Self {
        Self {
            fetcher,
            transform: TransformEngine::new(evaluator),
            dispatcher: WidgetTypeDispatcher::new(gate),
        }
    }

    /// Pipeline backed by the HTTP resolver and the configured evaluator.
    pub fn from_config(config: &EngineConfig) -> Self {
        Self::new(
            Arc::new(DataSourceResolver::from_config(config)),
            evaluator_from_settings(&config.transform),
            Arc::new(SanitizationGate::new()),
        )
    }

    /// Run the whole pipeline for one definition.
    pub async fn run(&self, definition: &WidgetDefinition) -> RenderResult {
        let data = match self.resolve_data(definition).await {
            Ok(data) => data,
            Err(e) => {
                warn!(widget_id = definition.id, error = %e, "Widget configuration error");
                return RenderResult::error(e.to_string());
            }
        };

        let result = self.dispatcher.dispatch(definition, &data);
        debug!(widget_id = definition.id, kind = result.kind(), "Widget rendered");
        result
    }

    /// Fetch and transform the widget's data. Only configuration errors are
    /// returned; network failures degrade to null.
    pub async fn resolve_data(&self, definition: &WidgetDefinition) -> TesseraResult<Value> {
        if !matches!(definition.kind, WidgetKind::Api | WidgetKind::Chart) {
            return Ok(Value::Null);
        }
        let Some(source) = definition.data_source.as_ref() else {
            return Ok(Value::Null);
        };
        if !source.is_api() {
            debug!(
                widget_id = definition.id,
                source_type = ?source.source_type,
                "Skipping non-api data source"
            );
            return Ok(Value::Null);
        }

        match self.fetcher.fetch(source).await {
            Ok(data) => Ok(self.transform.apply(data, source.transform.as_deref())),
            Err(e) if e.is_configuration() => Err(e),
            Err(e) => {
                warn!(widget_id = definition.id, error = %e, "Data source failed, rendering without data");
                Ok(Value::Null)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::json;
    use tessera_core::{DataSource, TesseraError, WidgetConfig};

    use crate::transform::LuauEvaluator;

    struct FixedFetcher(TesseraResult<Value>);

    #[async_trait]
    impl DataFetcher for FixedFetcher {
        async fn fetch(&self, _source: &DataSource) -> TesseraResult<Value> {
            match &self.0 {
                Ok(v) => Ok(v.clone()),
                Err(TesseraError::Configuration(m)) => Err(TesseraError::configuration(m.clone())),
                Err(e) => Err(TesseraError::network(e.to_string())),
            }
        }
    }

    fn pipeline(result: TesseraResult<Value>) -> WidgetPipeline {
        WidgetPipeline::new(
            Arc::new(FixedFetcher(result)),
            Arc::new(LuauEvaluator::default()),
            Arc::new(SanitizationGate::new()),
        )
    }

    fn api_widget(template: Option<&str>, transform: Option<&str>) -> WidgetDefinition {
        WidgetDefinition {
            id: 11,
            kind: WidgetKind::Api,
            name: "api".to_string(),
            config: WidgetConfig {
                template: template.map(str::to_string),
                ..Default::default()
            },
            data_source: Some(DataSource {
                endpoint: Some("/people".to_string()),
                transform: transform.map(str::to_string),
                ..Default::default()
            }),
            style: None,
            refresh_interval: None,
        }
    }

    #[tokio::test]
    async fn test_transform_then_template() {
        let p = pipeline(Ok(json!({"people": [{"first": "Ana"}]})));
        let def = api_widget(Some("Hello {{name}}"), Some("return { name = data.people[1].first }"));
        let result = p.run(&def).await;
        assert_eq!(result.injectable_html().unwrap().as_str(), "Hello Ana");
    }

    #[tokio::test]
    async fn test_network_error_degrades_to_empty() {
        let p = pipeline(Err(TesseraError::network("connection refused")));
        let result = p.run(&api_widget(Some("{{x}}"), None)).await;
        assert!(matches!(result, RenderResult::Empty { .. }));
    }

    #[tokio::test]
    async fn test_configuration_error_is_inline() {
        let p = pipeline(Err(TesseraError::configuration("Data source has no endpoint")));
        match p.run(&api_widget(None, None)).await {
            RenderResult::Error { message } => assert!(message.contains("no endpoint")),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_failing_transform_keeps_data() {
        let p = pipeline(Ok(json!({"name": "Raw"})));
        let def = api_widget(Some("{{name}}"), Some("error('nope')"));
        assert_eq!(p.run(&def).await.injectable_html().unwrap().as_str(), "Raw");
    }

    #[tokio::test]
    async fn test_runs_are_idempotent() {
        let p = pipeline(Ok(json!([{"month": "Jan", "value": 5}, {"month": "Feb", "value": 8}])));
        let mut def = api_widget(None, None);
        def.kind = WidgetKind::Chart;
        let first = p.run(&def).await;
        let second = p.run(&def).await;
        assert_eq!(first, second);
        assert!(matches!(first, RenderResult::Chart { .. }));
    }

    #[tokio::test]
    async fn test_chart_filtered_to_nothing_is_empty() {
        let p = pipeline(Ok(json!([{"month": "Jan", "value": 5}, {"month": "Feb", "value": 8}])));
        let code = r#"
            local out = {}
            for _, row in ipairs(data) do
                if row.value > 100 then table.insert(out, row) end
            end
            return out
        "#;
        let mut def = api_widget(None, Some(code));
        def.kind = WidgetKind::Chart;
        assert!(matches!(p.run(&def).await, RenderResult::Empty { .. }));
    }

    #[tokio::test]
    async fn test_static_widgets_skip_fetch() {
        let p = pipeline(Err(TesseraError::configuration("should not be called")));
        let mut def = api_widget(None, None);
        def.kind = WidgetKind::Html;
        def.config.html_content = Some("<b>static</b>".to_string());
        assert_eq!(p.run(&def).await.injectable_html().unwrap().as_str(), "<b>static</b>");
    }

    #[tokio::test]
    async fn test_unknown_type_never_fails() {
        let p = pipeline(Err(TesseraError::network("down")));
        let mut def = api_widget(None, None);
        def.kind = WidgetKind::from_str("foo");
        assert_eq!(
            p.run(&def).await,
            RenderResult::Unknown { widget_type: "foo".to_string() }
        );
    }
}
