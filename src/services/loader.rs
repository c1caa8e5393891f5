//! Streaming loader for a year-partitioned CVE corpus.
//!
//! Layout: `<root>/<partition>/cves_<partition>.json`, each file holding
//! `{ "cves": [ { "id", "embedding_input", "metadata" }, ... ] }`.

use std::fs::{self, File};
use std::io::BufReader;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use serde::de::IgnoredAny;
use serde_json::Value;
use tokio::runtime::{Handle, RuntimeFlavor};
use tracing::{debug, error, warn};
use walkdir::WalkDir;

use crate::error::{LoadError, PartitionError};
use crate::models::{Field, PipelineRecord, RawPartition, RawRecord, json_kind};
use crate::services::Sanitizer;

/// Path of the partition file inside `<root>/<partition>/`.
pub fn partition_file(partition_dir: &Path, partition: &str) -> PathBuf {
    partition_dir.join(format!("cves_{partition}.json"))
}

/// A partition directory discovered under the corpus root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Partition {
    pub key: String,
    pub file: PathBuf,
}

/// Immediate subdirectories of `root`, sorted by name.
pub fn list_partitions(root: &Path) -> Result<Vec<Partition>, LoadError> {
    if !root.is_dir() {
        return Err(LoadError::CorpusNotFound(root.to_path_buf()));
    }

    let mut partitions = Vec::new();
    for entry in WalkDir::new(root)
        .follow_links(true)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
    {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!(error = %e, "skipping unreadable corpus entry");
                continue;
            }
        };
        if !entry.file_type().is_dir() {
            continue;
        }
        let key = entry.file_name().to_string_lossy().to_string();
        let file = partition_file(entry.path(), &key);
        partitions.push(Partition { key, file });
    }

    Ok(partitions)
}

fn read_partition(path: &Path) -> Result<RawPartition, PartitionError> {
    let file = File::open(path)?;
    let partition = serde_json::from_reader(BufReader::new(file))?;
    Ok(partition)
}

/// Runs blocking file IO. On a multi-threaded runtime the worker hands its
/// other tasks (signal handling included) to another thread first.
fn blocking<T>(f: impl FnOnce() -> T) -> T {
    match Handle::try_current().map(|handle| handle.runtime_flavor()) {
        Ok(RuntimeFlavor::MultiThread) => tokio::task::block_in_place(f),
        _ => f(),
    }
}

/// Lazily yields one [`PipelineRecord`] per CVE, one partition file at a time.
///
/// Missing partition files are warned about and skipped; unreadable or
/// malformed ones are logged as errors and skipped. Neither stops the load.
/// A mistyped field only affects its own record.
pub struct CveLoader {
    sanitizer: Sanitizer,
    partitions: std::vec::IntoIter<Partition>,
    current: String,
    records: std::vec::IntoIter<Value>,
}

impl CveLoader {
    /// Fails only when the corpus root does not exist.
    pub fn open(root: &Path, sanitizer: Sanitizer) -> Result<Self, LoadError> {
        let partitions = list_partitions(root)?;
        Ok(Self {
            sanitizer,
            partitions: partitions.into_iter(),
            current: String::new(),
            records: Vec::new().into_iter(),
        })
    }

    fn next_partition(&mut self) -> bool {
        for partition in self.partitions.by_ref() {
            if !partition.file.exists() {
                warn!(partition = %partition.key, "no CVE file found for partition");
                continue;
            }

            match blocking(|| read_partition(&partition.file)) {
                Ok(raw) => {
                    debug!(
                        partition = %partition.key,
                        count = raw.cves.len(),
                        "loading CVEs"
                    );
                    self.current = partition.key;
                    self.records = raw.cves.into_iter();
                    return true;
                }
                Err(e) => {
                    error!(
                        file = %partition.file.display(),
                        error = %e,
                        "error loading CVEs"
                    );
                }
            }
        }
        false
    }

    fn to_pipeline_record(&self, entry: Value) -> PipelineRecord {
        let raw = match entry {
            Value::Object(map) => RawRecord::from(map),
            other => {
                warn!(
                    partition = %self.current,
                    kind = json_kind(&other),
                    "CVE entry is not an object"
                );
                return PipelineRecord::default();
            }
        };

        let id = raw.id();
        if let Field::Mistyped(kind) = id {
            warn!(partition = %self.current, kind, "CVE id has unusable type");
        }
        let id = id.present();

        let embedding_input = raw.embedding_input();
        if let Field::Mistyped(kind) = embedding_input {
            warn!(partition = %self.current, id = ?id, kind, "embedding_input is not a string");
        }

        let metadata = match raw.metadata() {
            Field::Present(map) => self.sanitizer.sanitize(map),
            Field::Absent => Default::default(),
            Field::Mistyped(kind) => {
                warn!(partition = %self.current, id = ?id, kind, "metadata is not an object");
                Default::default()
            }
        };

        PipelineRecord {
            id,
            embedding_input: embedding_input.present(),
            metadata,
        }
    }
}

impl Iterator for CveLoader {
    type Item = PipelineRecord;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(raw) = self.records.next() {
                return Some(self.to_pipeline_record(raw));
            }
            if !self.next_partition() {
                return None;
            }
        }
    }
}

#[derive(Deserialize)]
struct PartitionCount {
    #[serde(default)]
    cves: Vec<IgnoredAny>,
}

/// Total records across all partitions, from a separate pass over the files.
///
/// Best effort: missing or unparsable partitions count as zero without any
/// log line, so the result can be lower than what [`CveLoader`] yields if a
/// file changes between the two passes.
pub fn count_records(root: &Path) -> Result<u64, LoadError> {
    if !root.is_dir() {
        return Err(LoadError::CorpusNotFound(root.to_path_buf()));
    }

    let mut total = 0u64;
    for entry in fs::read_dir(root)? {
        let Ok(entry) = entry else { continue };
        let path = entry.path();
        if !path.is_dir() {
            continue;
        }
        let key = entry.file_name().to_string_lossy().to_string();
        let file = partition_file(&path, &key);

        let Ok(handle) = File::open(&file) else {
            continue;
        };
        if let Ok(count) = serde_json::from_reader::<_, PartitionCount>(BufReader::new(handle)) {
            total += count.cves.len() as u64;
        }
    }

    Ok(total)
}
