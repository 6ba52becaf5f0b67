//! Application state.

use std::sync::Arc;
use tera::Tera;
use tessera_core::EngineConfig;
use tessera_engine::{
    store_from_config, InstanceUpdate, WidgetPipeline, WidgetRuntime, WidgetStore, WidgetSupervisor,
};
use tokio::sync::broadcast;

use crate::view;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn WidgetStore>,
    pub pipeline: Arc<WidgetPipeline>,
    pub supervisor: Arc<WidgetSupervisor>,
    pub views: Arc<Tera>,
    pub tx: broadcast::Sender<InstanceUpdate>,
}

impl AppState {
    pub fn new(store: Arc<dyn WidgetStore>, pipeline: Arc<WidgetPipeline>) -> anyhow::Result<Self> {
        let (tx, _rx) = broadcast::channel(100);
        let runtime = WidgetRuntime::new(store.clone(), pipeline.clone()).with_updates(tx.clone());

        Ok(Self {
            store,
            pipeline,
            supervisor: Arc::new(WidgetSupervisor::new(runtime)),
            views: Arc::new(view::templates()?),
            tx,
        })
    }

    /// State wired from configuration: configured store, HTTP resolver and
    /// the configured transform evaluator.
    pub fn from_config(config: &EngineConfig) -> anyhow::Result<Self> {
        let store = store_from_config(config)?;
        let pipeline = Arc::new(WidgetPipeline::from_config(config));
        Self::new(store, pipeline)
    }
}
