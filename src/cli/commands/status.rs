use std::path::PathBuf;

use anyhow::Result;
use clap::Args;

use crate::cli::output::{StatusInfo, get_formatter};
use crate::models::{Config, EmbeddingConfig, EmbeddingDriver, OutputFormat, VectorDriver};
use crate::services::{ServerEmbedder, count_records, create_backend, list_partitions};

#[derive(Debug, Args)]
pub struct StatusArgs {
    /// Corpus root to inspect
    #[arg(long, short = 'c', env = "CVE_DIR")]
    pub corpus: Option<PathBuf>,
}

async fn embedding_ready(config: &EmbeddingConfig) -> bool {
    match config.driver {
        EmbeddingDriver::OpenAi => config
            .api_key
            .as_deref()
            .is_some_and(|k| !k.trim().is_empty()),
        EmbeddingDriver::Server => match ServerEmbedder::new(config) {
            Ok(embedder) => embedder.health_check().await.is_ok(),
            Err(_) => false,
        },
    }
}

pub async fn handle_status(args: StatusArgs, format: OutputFormat, _verbose: bool) -> Result<()> {
    let mut config = Config::load()?.config;
    if let Some(corpus) = args.corpus {
        config.ingest.corpus_dir = corpus;
    }
    let formatter = get_formatter(format);

    let corpus = &config.ingest.corpus_dir;
    let (corpus_found, partitions, records) = match list_partitions(corpus) {
        Ok(partitions) => (
            true,
            partitions.len(),
            count_records(corpus).unwrap_or(0),
        ),
        Err(_) => (false, 0, 0),
    };

    let embedding_ready = embedding_ready(&config.embedding).await;

    let (vector_store_connected, index_exists, vector_count) = match create_backend(
        &config.vector_store,
        u64::from(config.embedding.dimension),
    ) {
        Ok(store) => {
            let connected = store.health_check().await.unwrap_or(false);
            let info = if connected {
                store.describe().await.ok().flatten()
            } else {
                None
            };
            (
                connected,
                info.is_some(),
                info.map_or(0, |i| i.vector_count),
            )
        }
        Err(_) => (false, false, 0),
    };

    let status = StatusInfo {
        corpus_dir: corpus.display().to_string(),
        corpus_found,
        partitions,
        records,
        embedding_driver: config.embedding.driver.to_string(),
        embedding_model: config.embedding.model.clone(),
        embedding_url: config.embedding.url.clone(),
        embedding_dimension: config.embedding.dimension,
        embedding_ready,
        vector_store_driver: config.vector_store.driver.to_string(),
        vector_store_url: config.vector_store.url.clone(),
        vector_store_connected,
        index: config.vector_store.index.clone(),
        index_exists,
        vector_count,
    };

    print!("{}", formatter.format_status(&status));

    if !corpus_found {
        eprintln!();
        eprintln!(
            "Hint: corpus not found at {}. Set CVE_DIR or pass --corpus.",
            corpus.display()
        );
    }
    if !embedding_ready {
        eprintln!();
        match config.embedding.driver {
            EmbeddingDriver::OpenAi => eprintln!("Warning: OPENAI_API_KEY is not set."),
            EmbeddingDriver::Server => eprintln!(
                "Warning: embedding server not reachable at {}",
                config.embedding.url
            ),
        }
    }
    if !vector_store_connected {
        eprintln!();
        match config.vector_store.driver {
            VectorDriver::Pinecone => {
                eprintln!("Warning: Pinecone not accessible. Check PINECONE_API_KEY.");
            }
            VectorDriver::Qdrant => {
                eprintln!("Warning: Qdrant not running. Start with: docker-compose up -d qdrant");
            }
        }
    }

    Ok(())
}
