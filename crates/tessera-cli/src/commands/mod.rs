//! CLI command definitions and handlers.

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tessera_core::EngineConfig;

pub mod render;
pub mod serve;
pub mod widgets;

/// Tessera - Dynamic Custom Widget Engine
#[derive(Parser)]
#[command(name = "tessera")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to a TOML config file
    #[arg(short, long, global = true, env = "TESSERA_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the widget web server
    Serve(serve::ServeArgs),

    /// Render a single widget once
    Render(render::RenderArgs),

    /// List widget definitions in the configured store
    Widgets,
}

impl Cli {
    pub async fn execute(self) -> Result<()> {
        let config = EngineConfig::load(self.config.as_deref())?;

        match self.command {
            Commands::Serve(args) => serve::execute(args, config).await,
            Commands::Render(args) => render::execute(args, &config).await,
            Commands::Widgets => widgets::execute(&config).await,
        }
    }
}
