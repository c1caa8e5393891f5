//! Error types for the CVE ingestion pipeline.

use std::path::PathBuf;

use thiserror::Error;

/// Errors related to embedding operations.
#[derive(Debug, Error)]
pub enum EmbeddingError {
    #[error("failed to connect to embedding service: {0}")]
    ConnectionError(String),

    #[error("embedding service error: {0}")]
    ServerError(String),

    #[error("embedding request failed: {0}")]
    RequestError(#[from] reqwest::Error),

    #[error("invalid embedding response: {0}")]
    InvalidResponse(String),

    #[error("embedding timeout")]
    Timeout,
}

/// Errors related to vector store operations.
#[derive(Debug, Error)]
pub enum VectorStoreError {
    #[error("failed to connect to vector store: {0}")]
    ConnectionError(String),

    #[error("index error: {0}")]
    IndexError(String),

    #[error("index '{0}' does not exist")]
    IndexNotFound(String),

    #[error("index '{name}' not ready after {secs}s")]
    NotReady { name: String, secs: u64 },

    #[error("upsert error: {0}")]
    UpsertError(String),

    #[error("delete error: {0}")]
    DeleteError(String),

    #[error("vector store request failed: {0}")]
    RequestError(#[from] reqwest::Error),
}

/// Fatal errors raised before any record is produced.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("CVE directory '{}' not found", .0.display())]
    CorpusNotFound(PathBuf),

    #[error("failed to list CVE directory: {0}")]
    IoError(#[from] std::io::Error),
}

/// Errors for a single partition file. These are logged and skipped.
#[derive(Debug, Error)]
pub enum PartitionError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON parse error: {0}")]
    JsonParseError(#[from] serde_json::Error),
}

/// Errors that abandon one accumulation buffer.
#[derive(Debug, Error)]
pub enum BatchError {
    #[error("embedding error: {0}")]
    EmbeddingError(#[from] EmbeddingError),

    #[error("vector store error: {0}")]
    VectorStoreError(#[from] VectorStoreError),

    #[error("embedding service returned {actual} vectors for {expected} inputs")]
    LengthMismatch { expected: usize, actual: usize },

    #[error("vector for '{id}' has dimension {actual}, expected {expected}")]
    DimensionMismatch {
        id: String,
        expected: usize,
        actual: usize,
    },
}

/// Errors related to configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    TomlParseError(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerializeError(#[from] toml::ser::Error),

    #[error("validation error: {0}")]
    ValidationError(String),

    #[error("{0} environment variable is not set")]
    MissingCredential(&'static str),
}
