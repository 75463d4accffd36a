//! CLI argument definitions

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "conceptrag")]
#[command(
    version,
    about = "Conceptual hybrid retrieval over your technical library"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Output format
    #[arg(long, global = true, value_enum, default_value = "cli")]
    pub format: OutputFormat,

    /// Config file path (defaults to the user config dir)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Ingest documents from the files directory
    Seed(SeedArgs),

    /// Hybrid search over the catalog
    Search(SearchArgs),

    /// Hybrid search over chunks
    Chunks(ChunksArgs),

    /// Chunks tagged with a concept
    Concept(ConceptArgs),

    /// List categories
    Categories(CategoriesArgs),

    /// Show store and resilience status
    Status,

    /// Run the MCP stdio server
    Mcp,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Cli,
    Json,
}

#[derive(Args)]
pub struct SeedArgs {
    /// Directory of source documents (overrides config)
    pub files_dir: Option<PathBuf>,

    /// Re-ingest everything, ignoring completeness
    #[arg(long)]
    pub force: bool,
}

#[derive(Args)]
pub struct SearchArgs {
    /// Query text
    pub query: String,

    /// Maximum results
    #[arg(short, long, default_value = "10")]
    pub limit: usize,

    /// Show component scores
    #[arg(long)]
    pub debug: bool,
}

#[derive(Args)]
pub struct ChunksArgs {
    /// Query text
    pub query: String,

    /// Restrict to one source path
    #[arg(long)]
    pub source: Option<String>,

    /// Maximum results
    #[arg(short, long, default_value = "10")]
    pub limit: usize,
}

#[derive(Args)]
pub struct ConceptArgs {
    /// Concept name
    pub concept: String,

    /// Maximum chunks
    #[arg(short, long, default_value = "10")]
    pub limit: usize,

    /// Show the hierarchical overview instead of raw chunks
    #[arg(long)]
    pub overview: bool,
}

#[derive(Args)]
pub struct CategoriesArgs {
    /// Substring filter on category names
    #[arg(long)]
    pub filter: Option<String>,

    /// Include hierarchy paths
    #[arg(long)]
    pub hierarchy: bool,

    /// Maximum results
    #[arg(short, long, default_value = "25")]
    pub limit: usize,
}
