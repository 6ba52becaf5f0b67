//! Web server command.

use anyhow::Result;
use clap::Args;
use colored::Colorize;
use std::path::PathBuf;
use tessera_core::EngineConfig;
use tracing::info;

#[derive(Args)]
pub struct ServeArgs {
    /// Port to listen on (overrides config)
    #[arg(long)]
    pub port: Option<u16>,

    /// Host to bind to (overrides config)
    #[arg(long)]
    pub host: Option<String>,

    /// Also write logs to this file
    #[arg(long)]
    pub log_file: Option<PathBuf>,
}

pub async fn execute(args: ServeArgs, mut config: EngineConfig) -> Result<()> {
    if let Some(host) = args.host {
        config.server.host = host;
    }
    if let Some(port) = args.port {
        config.server.port = port;
    }
    let base = format!("{}:{}", config.server.host, config.server.port);
    info!(
        address = %base,
        api_base_url = %config.engine.api_base_url,
        transforms = config.transform.enabled,
        "Starting widget server"
    );

    println!();
    println!("  {} {}", "Tessera".cyan().bold(), "Widget Server".bold());
    println!();
    println!("  {}        http://{}/api", "API".green(), base);
    println!("  {}    http://{}/widgets/{{id}}", "Widgets".green(), base);
    println!("  {}  ws://{}/ws", "WebSocket".green(), base);
    println!("  {}   {}", "Data API".green(), config.engine.api_base_url);
    println!();
    println!("  {}", "Ctrl+C to stop".dimmed());
    println!();

    tessera_web::run_server(&config).await?;

    Ok(())
}
