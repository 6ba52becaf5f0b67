//! Widget definition stores.

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tessera_core::widget::parse_definitions;
use tessera_core::{EngineConfig, TesseraError, TesseraResult, WidgetDefinition};
use tokio::sync::RwLock;
use tracing::{debug, info};

/// Loads widget definitions by id.
#[async_trait]
pub trait WidgetStore: Send + Sync {
    async fn fetch(&self, id: i64) -> TesseraResult<WidgetDefinition>;

    async fn list(&self) -> TesseraResult<Vec<WidgetDefinition>>;
}

/// REST-backed store: `GET {base}/custom-widgets/{id}`.
#[derive(Clone)]
pub struct HttpWidgetStore {
    client: reqwest::Client,
    base_url: String,
}

impl HttpWidgetStore {
    pub fn new(base_url: &str, timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_default();

        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    async fn get_json(&self, url: &str) -> TesseraResult<reqwest::Response> {
        debug!(url = %url, "Fetching widget definitions");
        self.client
            .get(url)
            .send()
            .await
            .map_err(|e| TesseraError::Store(format!("Request to {} failed: {}", url, e)))
    }
}

#[async_trait]
impl WidgetStore for HttpWidgetStore {
    async fn fetch(&self, id: i64) -> TesseraResult<WidgetDefinition> {
        let url = format!("{}/custom-widgets/{}", self.base_url, id);
        let response = self.get_json(&url).await?;

        match response.status() {
            reqwest::StatusCode::NOT_FOUND => Err(TesseraError::WidgetNotFound(id)),
            status if !status.is_success() => Err(TesseraError::Store(format!(
                "Widget store returned {} for widget {}",
                status, id
            ))),
            _ => response
                .json()
                .await
                .map_err(|e| TesseraError::Store(format!("Invalid widget {}: {}", id, e))),
        }
    }

    async fn list(&self) -> TesseraResult<Vec<WidgetDefinition>> {
        let url = format!("{}/custom-widgets", self.base_url);
        let response = self.get_json(&url).await?;

        if !response.status().is_success() {
            return Err(TesseraError::Store(format!(
                "Widget store returned {} for widget list",
                response.status()
            )));
        }
        response
            .json()
            .await
            .map_err(|e| TesseraError::Store(format!("Invalid widget list: {}", e)))
    }
}

/// In-memory store, optionally seeded from a JSON file.
#[derive(Default)]
pub struct MemoryWidgetStore {
    widgets: RwLock<HashMap<i64, WidgetDefinition>>,
}

impl MemoryWidgetStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_definitions(definitions: impl IntoIterator<Item = WidgetDefinition>) -> Self {
        let widgets = definitions.into_iter().map(|d| (d.id, d)).collect();
        Self {
            widgets: RwLock::new(widgets),
        }
    }

    /// Load a JSON array of definitions.
    pub fn from_json_file(path: &Path) -> TesseraResult<Self> {
        let text = std::fs::read_to_string(path)?;
        let definitions = parse_definitions(&text)?;
        info!(path = %path.display(), count = definitions.len(), "Loaded widget definitions");
        Ok(Self::with_definitions(definitions))
    }

    /// Insert or replace a definition.
    pub async fn upsert(&self, definition: WidgetDefinition) {
        self.widgets.write().await.insert(definition.id, definition);
    }

    pub async fn remove(&self, id: i64) -> Option<WidgetDefinition> {
        self.widgets.write().await.remove(&id)
    }
}

#[async_trait]
impl WidgetStore for MemoryWidgetStore {
    async fn fetch(&self, id: i64) -> TesseraResult<WidgetDefinition> {
        self.widgets
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or(TesseraError::WidgetNotFound(id))
    }

    async fn list(&self) -> TesseraResult<Vec<WidgetDefinition>> {
        let mut widgets: Vec<WidgetDefinition> = self.widgets.read().await.values().cloned().collect();
        widgets.sort_by_key(|w| w.id);
        Ok(widgets)
    }
}

/// Store selected by configuration: remote URL, then widgets file, then an
/// empty in-memory store.
pub fn store_from_config(config: &EngineConfig) -> TesseraResult<Arc<dyn WidgetStore>> {
    if let Some(url) = &config.store.url {
        info!(url = %url, "Using HTTP widget store");
        return Ok(Arc::new(HttpWidgetStore::new(url, config.request_timeout())));
    }
    if let Some(path) = &config.store.widgets_file {
        return Ok(Arc::new(MemoryWidgetStore::from_json_file(path)?));
    }
    info!("No widget store configured, starting with an empty in-memory store");
    Ok(Arc::new(MemoryWidgetStore::new()))
}
