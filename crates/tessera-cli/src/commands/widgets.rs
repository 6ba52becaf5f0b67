//! Widget listing command.

use anyhow::Result;
use tessera_core::EngineConfig;
use tessera_engine::store_from_config;
use tracing::debug;

use crate::output;

pub async fn execute(config: &EngineConfig) -> Result<()> {
    let store = store_from_config(config)?;
    let widgets = store.list().await?;
    debug!(count = widgets.len(), "Listed widget definitions");
    output::print_widgets_table(&widgets);
    Ok(())
}
