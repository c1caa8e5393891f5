//! Index command implementation.

use anyhow::Result;
use clap::Subcommand;

use crate::cli::output::{IndexReport, get_formatter};
use crate::models::{Config, Metric, OutputFormat};
use crate::services::{IndexInfo, VectorStore, create_backend};

#[derive(Debug, Subcommand)]
pub enum IndexCommand {
    /// Create the vector index if it does not exist and wait until it is ready
    Create {
        /// Distance metric (cosine, euclidean, dotproduct)
        #[arg(long, short = 'm')]
        metric: Option<Metric>,

        /// Vector dimension, defaults to the embedding dimension
        #[arg(long, short = 'd')]
        dimension: Option<u32>,
    },

    /// Delete the vector index and everything in it
    Delete {
        /// Skip confirmation prompt
        #[arg(long, short = 'y')]
        force: bool,
    },

    /// Show index readiness and vector count
    Stats,
}

pub async fn handle_index(cmd: IndexCommand, format: OutputFormat, verbose: bool) -> Result<()> {
    let mut config = Config::load()?.config;
    match cmd {
        IndexCommand::Create { metric, dimension } => {
            if let Some(metric) = metric {
                config.vector_store.metric = metric;
            }
            if let Some(dimension) = dimension {
                config.embedding.dimension = dimension;
            }
            config.validate()?;
            handle_create(&config, format, verbose).await
        }
        IndexCommand::Delete { force } => handle_delete(&config, force, format).await,
        IndexCommand::Stats => handle_stats(&config, format).await,
    }
}

fn open_store(config: &Config) -> Result<Box<dyn VectorStore>> {
    Ok(create_backend(
        &config.vector_store,
        u64::from(config.embedding.dimension),
    )?)
}

fn report(config: &Config, info: Option<IndexInfo>) -> IndexReport {
    let mut report = IndexReport {
        index: config.vector_store.index.clone(),
        driver: config.vector_store.driver.to_string(),
        ..Default::default()
    };
    if let Some(info) = info {
        report.exists = true;
        report.ready = info.ready;
        report.vector_count = info.vector_count;
        report.dimension = info.dimension;
    }
    report
}

async fn handle_create(config: &Config, format: OutputFormat, verbose: bool) -> Result<()> {
    let formatter = get_formatter(format);
    let store = open_store(config)?;

    if verbose {
        eprintln!(
            "Creating index {} ({} dimensions, {} metric)",
            config.vector_store.index, config.embedding.dimension, config.vector_store.metric
        );
    }

    let created = store.create_index().await?;
    let message = if created {
        format!("Created index '{}'.", store.index_name())
    } else {
        format!("Index '{}' already exists.", store.index_name())
    };
    print!("{}", formatter.format_message(&message));

    let info = store.describe().await?;
    print!("{}", formatter.format_index(&report(config, info)));
    Ok(())
}

async fn handle_delete(config: &Config, force: bool, format: OutputFormat) -> Result<()> {
    let formatter = get_formatter(format);

    if !force {
        println!(
            "This will delete index '{}' and ALL of its vectors. Continue? [y/N]",
            config.vector_store.index
        );
        let mut input = String::new();
        std::io::stdin().read_line(&mut input)?;
        if !input.trim().eq_ignore_ascii_case("y") {
            print!("{}", formatter.format_message("Cancelled."));
            return Ok(());
        }
    }

    let store = open_store(config)?;
    let message = if store.delete_index().await? {
        format!("Deleted index '{}'.", store.index_name())
    } else {
        format!("Index '{}' does not exist.", store.index_name())
    };
    print!("{}", formatter.format_message(&message));
    Ok(())
}

async fn handle_stats(config: &Config, format: OutputFormat) -> Result<()> {
    let formatter = get_formatter(format);
    let store = open_store(config)?;
    let info = store.describe().await?;
    print!("{}", formatter.format_index(&report(config, info)));
    Ok(())
}
