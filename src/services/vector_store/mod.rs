//! Vector store abstraction layer.
//!
//! This module provides a trait-based abstraction over different vector store
//! backends (Pinecone, Qdrant) so the upload pipeline never depends on a
//! concrete client.

mod pinecone;
mod qdrant;

pub use pinecone::PineconeBackend;
pub use qdrant::QdrantBackend;

use async_trait::async_trait;

use crate::error::{ConfigError, VectorStoreError};
use crate::models::{PINECONE_API_KEY_ENV, UpsertUnit, VectorDriver, VectorStoreConfig};

/// Index information as reported by the store.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IndexInfo {
    pub vector_count: u64,
    pub dimension: Option<u64>,
    pub ready: bool,
}

/// Operations the ingestion pipeline needs from a vector store.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Check if the vector store is reachable.
    async fn health_check(&self) -> Result<bool, VectorStoreError>;

    /// Describe the configured index. Returns None if it doesn't exist.
    async fn describe(&self) -> Result<Option<IndexInfo>, VectorStoreError>;

    /// Create the index if missing and wait until it is ready.
    /// Returns false when the index already existed.
    async fn create_index(&self) -> Result<bool, VectorStoreError>;

    /// Delete the index. Returns false when it did not exist.
    async fn delete_index(&self) -> Result<bool, VectorStoreError>;

    /// Insert or overwrite vectors by id.
    async fn upsert(&self, units: Vec<UpsertUnit>) -> Result<(), VectorStoreError>;

    /// Approximate number of stored vectors.
    async fn stat_count(&self) -> Result<u64, VectorStoreError> {
        match self.describe().await? {
            Some(info) => Ok(info.vector_count),
            None => Err(VectorStoreError::IndexNotFound(self.index_name().to_string())),
        }
    }

    /// Get the index/collection name.
    fn index_name(&self) -> &str;
}

/// Errors raised while building a backend from configuration.
#[derive(Debug, thiserror::Error)]
pub enum BackendSetupError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    VectorStore(#[from] VectorStoreError),
}

/// Create a vector store backend based on configuration.
///
/// `dimension` is used when creating the index and must match the embedder.
pub fn create_backend(
    config: &VectorStoreConfig,
    dimension: u64,
) -> Result<Box<dyn VectorStore>, BackendSetupError> {
    match config.driver {
        VectorDriver::Pinecone => {
            let api_key = config
                .api_key
                .as_deref()
                .filter(|k| !k.trim().is_empty())
                .ok_or(ConfigError::MissingCredential(PINECONE_API_KEY_ENV))?;
            Ok(Box::new(PineconeBackend::new(config, api_key, dimension)?))
        }
        VectorDriver::Qdrant => Ok(Box::new(QdrantBackend::new(config, dimension)?)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pinecone_requires_key() {
        let config = VectorStoreConfig::default();
        assert!(matches!(
            create_backend(&config, 1536),
            Err(BackendSetupError::Config(ConfigError::MissingCredential(
                PINECONE_API_KEY_ENV
            )))
        ));
    }

    #[test]
    fn test_pinecone_backend_with_key() {
        let config = VectorStoreConfig {
            api_key: Some("pc-test".to_string()),
            ..Default::default()
        };
        let store = create_backend(&config, 1536).unwrap();
        assert_eq!(store.index_name(), "cve-rag");
    }
}
