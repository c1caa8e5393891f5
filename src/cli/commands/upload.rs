//! Upload command implementation.

use std::path::PathBuf;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::Args;
use tracing::info;

use crate::cli::output::{UploadReport, get_formatter};
use crate::cli::progress::ConsoleProgress;
use crate::models::{Config, OutputFormat};
use crate::services::{
    BatchOptions, BatchUploader, CveLoader, Sanitizer, UploadSummary, count_records,
    create_backend, create_embedder,
};

#[derive(Debug, Args)]
pub struct UploadArgs {
    /// Corpus root containing one directory per partition
    #[arg(long, short = 'c', env = "CVE_DIR")]
    pub corpus: Option<PathBuf>,

    /// Records sent to the embedding service per request
    #[arg(long)]
    pub embed_batch_size: Option<usize>,

    /// Vectors sent to the store per upsert
    #[arg(long)]
    pub upsert_batch_size: Option<usize>,

    /// Load and sanitize records without calling any remote service
    #[arg(long)]
    pub dry_run: bool,
}

pub async fn handle_upload(args: UploadArgs, format: OutputFormat, verbose: bool) -> Result<()> {
    let mut config = Config::load()?.config;
    if let Some(corpus) = args.corpus {
        config.ingest.corpus_dir = corpus;
    }
    if let Some(size) = args.embed_batch_size {
        config.ingest.embed_batch_size = size;
    }
    if let Some(size) = args.upsert_batch_size {
        config.ingest.upsert_batch_size = size;
    }
    run_upload(&config, args.dry_run, format, verbose).await
}

/// Credentials are checked before the corpus is read.
async fn run_upload(
    config: &Config,
    dry_run: bool,
    format: OutputFormat,
    verbose: bool,
) -> Result<()> {
    config.validate()?;

    let formatter = get_formatter(format);
    let start_time = Instant::now();
    let corpus = config.ingest.corpus_dir.clone();

    let backends = if dry_run {
        None
    } else {
        let embedder = create_embedder(&config.embedding)?;
        let store = create_backend(&config.vector_store, embedder.dimension() as u64)?;
        Some((embedder, store))
    };

    let total = count_records(&corpus)
        .with_context(|| format!("failed to read corpus at {}", corpus.display()))?;
    let loader = CveLoader::open(&corpus, Sanitizer::new(config.sanitizer.clone()))?;

    if verbose {
        eprintln!("Found {} CVE records in {}", total, corpus.display());
    }

    let Some((embedder, store)) = backends else {
        let summary = dry_run_summary(loader, total);
        let report = UploadReport {
            index: config.vector_store.index.clone(),
            summary,
            duration_ms: start_time.elapsed().as_millis() as u64,
            dry_run: true,
        };
        print!("{}", formatter.format_upload(&report));
        return Ok(());
    };

    if store.create_index().await? {
        info!(index = store.index_name(), "created index");
        if verbose {
            eprintln!("Created index {}", store.index_name());
        }
    }

    let options = BatchOptions::new(
        config.ingest.embed_batch_size,
        config.ingest.upsert_batch_size,
    )
    .with_dimension(embedder.dimension());

    let progress = ConsoleProgress::new(total, matches!(format, OutputFormat::Text));
    let uploader = BatchUploader::new(embedder.as_ref(), store.as_ref(), options)
        .with_progress(&progress);
    let summary = uploader.run(loader, total).await;
    progress.finish();

    info!(
        uploaded = summary.uploaded,
        skipped = summary.skipped,
        failed = summary.failed_records,
        "upload finished"
    );

    let report = UploadReport {
        index: store.index_name().to_string(),
        summary,
        duration_ms: start_time.elapsed().as_millis() as u64,
        dry_run: false,
    };
    print!("{}", formatter.format_upload(&report));

    if summary.failed_batches > 0 {
        anyhow::bail!(
            "{} records in {} batches failed to upload",
            summary.failed_records,
            summary.failed_batches
        );
    }

    Ok(())
}

/// Walk the corpus the same way an upload would, without embedding anything.
fn dry_run_summary(loader: CveLoader, total: u64) -> UploadSummary {
    let mut summary = UploadSummary {
        total,
        ..Default::default()
    };
    for record in loader {
        if record.required_fields().is_some() {
            summary.uploaded += 1;
        } else {
            summary.skipped += 1;
        }
    }
    summary
}
