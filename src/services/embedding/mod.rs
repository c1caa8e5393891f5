//! Embedding service abstraction.
//!
//! An [`Embedder`] turns an ordered batch of texts into vectors of the same
//! length and order, failing as a single unit.

mod openai;
mod server;

pub use openai::OpenAiEmbedder;
pub use server::{HealthResponse, ServerEmbedder};

use async_trait::async_trait;

use crate::error::{ConfigError, EmbeddingError};
use crate::models::{EmbeddingConfig, EmbeddingDriver, OPENAI_API_KEY_ENV};

#[async_trait]
pub trait Embedder: Send + Sync {
    /// Embed `texts`, returning one vector per input in input order.
    async fn embed(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>, EmbeddingError>;

    /// Expected vector dimensionality.
    fn dimension(&self) -> usize;

    /// Model identifier, for status output.
    fn model(&self) -> &str;
}

/// Errors raised while building an embedder from configuration.
#[derive(Debug, thiserror::Error)]
pub enum EmbedderSetupError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Embedding(#[from] EmbeddingError),
}

/// Create the embedder selected by `config.driver`.
///
/// The OpenAI driver requires an API key; its absence is fatal.
pub fn create_embedder(config: &EmbeddingConfig) -> Result<Box<dyn Embedder>, EmbedderSetupError> {
    match config.driver {
        EmbeddingDriver::OpenAi => {
            let api_key = config
                .api_key
                .as_deref()
                .filter(|k| !k.trim().is_empty())
                .ok_or(ConfigError::MissingCredential(OPENAI_API_KEY_ENV))?;
            Ok(Box::new(OpenAiEmbedder::new(config, api_key)?))
        }
        EmbeddingDriver::Server => Ok(Box::new(ServerEmbedder::new(config)?)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_openai_requires_key() {
        let config = EmbeddingConfig::default();
        let result = create_embedder(&config);
        assert!(matches!(
            result,
            Err(EmbedderSetupError::Config(ConfigError::MissingCredential(
                OPENAI_API_KEY_ENV
            )))
        ));
    }

    #[test]
    fn test_server_needs_no_key() {
        let config = EmbeddingConfig {
            driver: EmbeddingDriver::Server,
            url: "http://localhost:11411".to_string(),
            ..Default::default()
        };
        let embedder = create_embedder(&config).unwrap();
        assert_eq!(embedder.dimension(), 1536);
    }
}
