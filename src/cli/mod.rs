//! CLI module for the CVE ingestion tool.

pub mod commands;
pub mod output;
pub mod progress;

use clap::{Parser, Subcommand};

use crate::models::OutputFormat;

/// Embed CVE records and upload them to a vector index.
#[derive(Debug, Parser)]
#[command(name = "cve-ingest")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[arg(
        long,
        short = 'f',
        global = true,
        help = "Output format: text, json, or markdown"
    )]
    pub format: Option<OutputFormat>,

    #[arg(long, short = 'v', global = true, help = "Enable verbose output")]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Embed the CVE corpus and upsert it into the vector index
    Upload(commands::UploadArgs),

    /// Manage the vector index (create, delete, stats)
    #[command(subcommand)]
    Index(commands::IndexCommand),

    /// Check corpus, embedding service and vector store status
    Status(commands::StatusArgs),

    /// Manage configuration
    #[command(subcommand)]
    Config(commands::ConfigCommand),
}
