//! Conceptrag CLI
//!
//! Seeding, search, and the MCP server over one wired container.

use anyhow::Result;
use clap::Parser;
use conceptrag_core::{Config, Container};

mod app;
mod commands;

use app::{Cli, Commands};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    let mut container = Container::new(config)?;

    match cli.command {
        Commands::Seed(args) => commands::seed(&mut container, args, cli.format).await,
        Commands::Search(args) => commands::search(&container, args, cli.format).await,
        Commands::Chunks(args) => commands::chunks(&container, args, cli.format).await,
        Commands::Concept(args) => commands::concept(&container, args, cli.format).await,
        Commands::Categories(args) => commands::categories(&container, args, cli.format),
        Commands::Status => commands::status(&container, cli.format),
        Commands::Mcp => conceptrag_mcp::start_server(&container).await,
    }
}
