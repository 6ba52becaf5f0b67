//! One-shot widget render command.

use anyhow::Result;
use clap::Args;
use tessera_core::EngineConfig;
use tessera_engine::{store_from_config, WidgetPipeline};
use tracing::{debug, info};

use crate::output;

#[derive(Args)]
pub struct RenderArgs {
    /// Widget definition id
    pub widget_id: i64,

    /// Print the render result as JSON
    #[arg(long, conflicts_with = "html")]
    pub json: bool,

    /// Print the widget as a standalone HTML document
    #[arg(long)]
    pub html: bool,
}

pub async fn execute(args: RenderArgs, config: &EngineConfig) -> Result<()> {
    let store = store_from_config(config)?;
    let definition = store.fetch(args.widget_id).await?;
    debug!(widget_id = definition.id, kind = definition.kind.as_str(), "Loaded widget definition");

    let result = WidgetPipeline::from_config(config).run(&definition).await;
    info!(widget_id = definition.id, result = result.kind(), "Widget rendered");

    if args.json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else if args.html {
        let views = tessera_web::view::templates()?;
        println!("{}", tessera_web::view::render_frame(&views, &definition, &result)?);
    } else {
        output::print_render_result(&definition, &result);
    }

    Ok(())
}
