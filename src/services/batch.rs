//! Batch coordinator: accumulate, embed, upsert in chunks, isolate failures.

use tracing::{debug, error};

use crate::error::BatchError;
use crate::models::{PipelineRecord, UpsertUnit};
use crate::services::{Embedder, VectorStore};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchOptions {
    /// Records per embedding call.
    pub embed_batch_size: usize,
    /// Units per upsert call.
    pub upsert_batch_size: usize,
    /// Reject vectors of any other length. None skips the check.
    pub dimension: Option<usize>,
}

impl BatchOptions {
    pub fn new(embed_batch_size: usize, upsert_batch_size: usize) -> Self {
        Self {
            embed_batch_size: embed_batch_size.max(1),
            upsert_batch_size: upsert_batch_size.max(1),
            dimension: None,
        }
    }

    #[must_use]
    pub fn with_dimension(mut self, dimension: usize) -> Self {
        self.dimension = Some(dimension);
        self
    }
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self::new(1000, 100)
    }
}

/// Observer for upload progress. All methods default to no-ops.
pub trait UploadProgress: Send + Sync {
    /// Called after every successful chunk upsert.
    fn chunk_uploaded(&self, _uploaded: u64, _total: u64) {}

    /// Called when a record lacks an id or embedding input.
    fn record_skipped(&self, _record: &PipelineRecord) {}

    /// Called when a buffer is abandoned. `abandoned` counts records not written.
    fn batch_failed(&self, _abandoned: usize, _error: &BatchError) {}
}

/// Progress observer that does nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProgress;

impl UploadProgress for NoProgress {}

/// Outcome of a coordinator run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UploadSummary {
    /// Total records discovered by the independent count.
    pub total: u64,
    pub uploaded: u64,
    /// Records dropped for missing id or embedding input.
    pub skipped: u64,
    pub failed_batches: u64,
    /// Records abandoned with a failed batch.
    pub failed_records: u64,
}

/// Percentage of `total`, or None when the total is zero.
pub fn percent(uploaded: u64, total: u64) -> Option<f64> {
    (total > 0).then(|| 100.0 * uploaded as f64 / total as f64)
}

/// Drives records through embedding and upsert, one buffer at a time.
pub struct BatchUploader<'a> {
    embedder: &'a dyn Embedder,
    store: &'a dyn VectorStore,
    options: BatchOptions,
    progress: &'a dyn UploadProgress,
}

impl<'a> BatchUploader<'a> {
    pub fn new(
        embedder: &'a dyn Embedder,
        store: &'a dyn VectorStore,
        options: BatchOptions,
    ) -> Self {
        Self {
            embedder,
            store,
            options,
            progress: &NoProgress,
        }
    }

    #[must_use]
    pub fn with_progress(mut self, progress: &'a dyn UploadProgress) -> Self {
        self.progress = progress;
        self
    }

    /// Consume `records` and upload them. `total` is only used for progress.
    ///
    /// Batch failures are reported and skipped, so this never fails as a whole.
    pub async fn run<I>(&self, records: I, total: u64) -> UploadSummary
    where
        I: IntoIterator<Item = PipelineRecord>,
    {
        let mut summary = UploadSummary {
            total,
            ..Default::default()
        };
        let mut pending: Vec<PipelineRecord> = Vec::with_capacity(self.options.embed_batch_size);

        for record in records {
            if record.required_fields().is_none() {
                debug!(id = ?record.id, "skipping record without id or embedding input");
                self.progress.record_skipped(&record);
                summary.skipped += 1;
                continue;
            }

            pending.push(record);

            if pending.len() >= self.options.embed_batch_size {
                self.flush(std::mem::take(&mut pending), &mut summary).await;
            }
        }

        if !pending.is_empty() {
            self.flush(pending, &mut summary).await;
        }

        summary
    }

    async fn flush(&self, batch: Vec<PipelineRecord>, summary: &mut UploadSummary) {
        let size = batch.len();
        let before = summary.uploaded;

        if let Err(e) = self.process_batch(batch, summary).await {
            let abandoned = size - (summary.uploaded - before) as usize;
            error!(records = abandoned, error = %e, "error processing batch");
            summary.failed_batches += 1;
            summary.failed_records += abandoned as u64;
            self.progress.batch_failed(abandoned, &e);
        }
    }

    async fn process_batch(
        &self,
        batch: Vec<PipelineRecord>,
        summary: &mut UploadSummary,
    ) -> Result<(), BatchError> {
        let texts: Vec<String> = batch
            .iter()
            .map(|r| r.embedding_input.clone().unwrap_or_default())
            .collect();

        let embeddings = self.embedder.embed(texts).await?;
        if embeddings.len() != batch.len() {
            return Err(BatchError::LengthMismatch {
                expected: batch.len(),
                actual: embeddings.len(),
            });
        }

        let mut units = Vec::with_capacity(batch.len());
        for (record, values) in batch.into_iter().zip(embeddings) {
            let id = record.id.unwrap_or_default();
            if let Some(expected) = self.options.dimension
                && values.len() != expected
            {
                return Err(BatchError::DimensionMismatch {
                    id,
                    expected,
                    actual: values.len(),
                });
            }
            units.push(UpsertUnit {
                id,
                values,
                metadata: record.metadata,
            });
        }

        let mut units = units.into_iter().peekable();
        while units.peek().is_some() {
            let chunk: Vec<UpsertUnit> = units.by_ref().take(self.options.upsert_batch_size).collect();
            let len = chunk.len() as u64;
            self.store.upsert(chunk).await?;
            summary.uploaded += len;

            if let Some(pct) = percent(summary.uploaded, summary.total) {
                debug!(
                    uploaded = summary.uploaded,
                    total = summary.total,
                    "uploaded {:.1}%",
                    pct
                );
            }
            self.progress.chunk_uploaded(summary.uploaded, summary.total);
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{EmbeddingError, VectorStoreError};
    use crate::models::SanitizedMetadata;
    use crate::services::IndexInfo;
    use async_trait::async_trait;
    use pretty_assertions::assert_eq;
    use std::collections::BTreeMap;
    use std::sync::Mutex;

    /// Embeds each text as `[len, call_index]`; fails on configured calls.
    #[derive(Default)]
    struct FakeEmbedder {
        calls: Mutex<Vec<Vec<String>>>,
        fail_on: Vec<usize>,
        short_by: usize,
    }

    #[async_trait]
    impl Embedder for FakeEmbedder {
        async fn embed(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>, EmbeddingError> {
            let mut calls = self.calls.lock().unwrap();
            let call = calls.len();
            calls.push(texts.clone());
            if self.fail_on.contains(&call) {
                return Err(EmbeddingError::ServerError("status 500".to_string()));
            }
            let n = texts.len().saturating_sub(self.short_by);
            Ok(texts
                .iter()
                .take(n)
                .map(|t| vec![t.len() as f32, call as f32])
                .collect())
        }

        fn dimension(&self) -> usize {
            2
        }

        fn model(&self) -> &str {
            "fake"
        }
    }

    #[derive(Default)]
    struct FakeStore {
        calls: Mutex<Vec<Vec<String>>>,
        stored: Mutex<BTreeMap<String, Vec<f32>>>,
        fail_on: Vec<usize>,
    }

    #[async_trait]
    impl VectorStore for FakeStore {
        async fn health_check(&self) -> Result<bool, VectorStoreError> {
            Ok(true)
        }

        async fn describe(&self) -> Result<Option<IndexInfo>, VectorStoreError> {
            Ok(Some(IndexInfo {
                vector_count: self.stored.lock().unwrap().len() as u64,
                dimension: Some(2),
                ready: true,
            }))
        }

        async fn create_index(&self) -> Result<bool, VectorStoreError> {
            Ok(false)
        }

        async fn delete_index(&self) -> Result<bool, VectorStoreError> {
            Ok(false)
        }

        async fn upsert(&self, units: Vec<UpsertUnit>) -> Result<(), VectorStoreError> {
            let mut calls = self.calls.lock().unwrap();
            let call = calls.len();
            calls.push(units.iter().map(|u| u.id.clone()).collect());
            if self.fail_on.contains(&call) {
                return Err(VectorStoreError::UpsertError("status 503".to_string()));
            }
            let mut stored = self.stored.lock().unwrap();
            for unit in units {
                stored.insert(unit.id, unit.values);
            }
            Ok(())
        }

        fn index_name(&self) -> &str {
            "fake"
        }
    }

    #[derive(Default)]
    struct RecordingProgress {
        chunks: Mutex<Vec<u64>>,
        skipped: Mutex<u64>,
        failures: Mutex<Vec<usize>>,
    }

    impl UploadProgress for RecordingProgress {
        fn chunk_uploaded(&self, uploaded: u64, _total: u64) {
            self.chunks.lock().unwrap().push(uploaded);
        }

        fn record_skipped(&self, _record: &PipelineRecord) {
            *self.skipped.lock().unwrap() += 1;
        }

        fn batch_failed(&self, abandoned: usize, _error: &BatchError) {
            self.failures.lock().unwrap().push(abandoned);
        }
    }

    fn record(id: Option<&str>, text: Option<&str>) -> PipelineRecord {
        PipelineRecord {
            id: id.map(String::from),
            embedding_input: text.map(String::from),
            metadata: SanitizedMetadata::new(),
        }
    }

    fn records(n: usize) -> Vec<PipelineRecord> {
        (0..n)
            .map(|i| record(Some(&format!("CVE-{i}")), Some(&format!("text {i}"))))
            .collect()
    }

    #[tokio::test]
    async fn test_single_buffer_single_upsert() {
        let embedder = FakeEmbedder::default();
        let store = FakeStore::default();
        let uploader = BatchUploader::new(&embedder, &store, BatchOptions::new(10, 10));

        let summary = uploader.run(records(5), 5).await;

        assert_eq!(summary.uploaded, 5);
        assert_eq!(embedder.calls.lock().unwrap().len(), 1);
        assert_eq!(embedder.calls.lock().unwrap()[0].len(), 5);
        assert_eq!(store.calls.lock().unwrap().len(), 1);
        assert_eq!(store.calls.lock().unwrap()[0].len(), 5);
    }

    #[tokio::test]
    async fn test_buffers_and_chunks() {
        let embedder = FakeEmbedder::default();
        let store = FakeStore::default();
        let progress = RecordingProgress::default();
        let uploader = BatchUploader::new(&embedder, &store, BatchOptions::new(4, 3))
            .with_progress(&progress);

        let summary = uploader.run(records(10), 10).await;

        let embed_sizes: Vec<usize> = embedder.calls.lock().unwrap().iter().map(Vec::len).collect();
        let upsert_sizes: Vec<usize> = store.calls.lock().unwrap().iter().map(Vec::len).collect();
        assert_eq!(embed_sizes, vec![4, 4, 2]);
        assert_eq!(upsert_sizes, vec![3, 1, 3, 1, 2]);
        assert_eq!(*progress.chunks.lock().unwrap(), vec![3, 4, 7, 8, 10]);
        assert_eq!(summary.uploaded, 10);
    }

    #[tokio::test]
    async fn test_records_missing_fields_are_skipped() {
        let embedder = FakeEmbedder::default();
        let store = FakeStore::default();
        let progress = RecordingProgress::default();
        let uploader = BatchUploader::new(&embedder, &store, BatchOptions::new(10, 10))
            .with_progress(&progress);

        let input = vec![
            record(Some("CVE-1"), Some("one")),
            record(Some("CVE-2"), None),
            record(None, Some("orphan")),
            record(Some("CVE-4"), Some("")),
            record(Some("CVE-5"), Some("five")),
        ];
        let summary = uploader.run(input, 5).await;

        assert_eq!(summary.uploaded, 2);
        assert_eq!(summary.skipped, 3);
        assert_eq!(*progress.skipped.lock().unwrap(), 3);
        assert_eq!(
            embedder.calls.lock().unwrap()[0],
            vec!["one".to_string(), "five".to_string()]
        );
    }

    #[tokio::test]
    async fn test_embedding_failure_isolated_to_buffer() {
        let embedder = FakeEmbedder {
            fail_on: vec![1],
            ..Default::default()
        };
        let store = FakeStore::default();
        let progress = RecordingProgress::default();
        let uploader = BatchUploader::new(&embedder, &store, BatchOptions::new(2, 10))
            .with_progress(&progress);

        let summary = uploader.run(records(6), 6).await;

        assert_eq!(summary.uploaded, 4);
        assert_eq!(summary.failed_batches, 1);
        assert_eq!(summary.failed_records, 2);
        assert_eq!(*progress.failures.lock().unwrap(), vec![2]);

        let stored = store.stored.lock().unwrap();
        assert!(stored.contains_key("CVE-0"));
        assert!(!stored.contains_key("CVE-2"));
        assert!(!stored.contains_key("CVE-3"));
        assert!(stored.contains_key("CVE-5"));
    }

    #[tokio::test]
    async fn test_upsert_failure_abandons_rest_of_buffer() {
        let embedder = FakeEmbedder::default();
        let store = FakeStore {
            fail_on: vec![1],
            ..Default::default()
        };
        let uploader = BatchUploader::new(&embedder, &store, BatchOptions::new(6, 2));

        let summary = uploader.run(records(8), 8).await;

        let upsert_sizes: Vec<usize> = store.calls.lock().unwrap().iter().map(Vec::len).collect();
        assert_eq!(upsert_sizes, vec![2, 2, 2]);
        assert_eq!(summary.uploaded, 4);
        assert_eq!(summary.failed_records, 4);
        assert_eq!(summary.failed_batches, 1);
    }

    #[tokio::test]
    async fn test_vector_count_mismatch_fails_batch() {
        let embedder = FakeEmbedder {
            short_by: 1,
            ..Default::default()
        };
        let store = FakeStore::default();
        let uploader = BatchUploader::new(&embedder, &store, BatchOptions::new(3, 3));

        let summary = uploader.run(records(3), 3).await;

        assert_eq!(summary.uploaded, 0);
        assert_eq!(summary.failed_batches, 1);
        assert!(store.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_dimension_mismatch_fails_batch() {
        let embedder = FakeEmbedder::default();
        let store = FakeStore::default();
        let uploader =
            BatchUploader::new(&embedder, &store, BatchOptions::new(3, 3).with_dimension(1536));

        let summary = uploader.run(records(3), 3).await;

        assert_eq!(summary.uploaded, 0);
        assert_eq!(summary.failed_records, 3);
    }

    #[tokio::test]
    async fn test_rerun_overwrites_by_id() {
        let store = FakeStore::default();
        let options = BatchOptions::new(2, 2);

        let failing = FakeEmbedder {
            fail_on: vec![0],
            ..Default::default()
        };
        BatchUploader::new(&failing, &store, options).run(records(4), 4).await;
        assert_eq!(store.stored.lock().unwrap().len(), 2);

        let healthy = FakeEmbedder::default();
        let summary = BatchUploader::new(&healthy, &store, options).run(records(4), 4).await;
        assert_eq!(summary.uploaded, 4);
        assert_eq!(store.stat_count().await.unwrap(), 4);
    }

    #[tokio::test]
    async fn test_empty_input() {
        let embedder = FakeEmbedder::default();
        let store = FakeStore::default();
        let summary = BatchUploader::new(&embedder, &store, BatchOptions::default())
            .run(Vec::new(), 0)
            .await;

        assert_eq!(summary, UploadSummary::default());
        assert!(embedder.calls.lock().unwrap().is_empty());
    }

    #[test]
    fn test_percent() {
        assert_eq!(percent(5, 10), Some(50.0));
        assert_eq!(percent(3, 0), None);
    }

    #[test]
    fn test_zero_batch_sizes_clamped() {
        let options = BatchOptions::new(0, 0);
        assert_eq!(options.embed_batch_size, 1);
        assert_eq!(options.upsert_batch_size, 1);
    }
}
