mod config;
mod format;
mod record;

pub use config::{
    Config, DEFAULT_CORPUS_DIR, DEFAULT_EMBEDDING_DIMENSION, DEFAULT_EMBEDDING_MODEL,
    DEFAULT_INDEX, DEFAULT_LIST_SUFFIX, DEFAULT_MAX_LIST_ITEMS, DEFAULT_OPENAI_URL,
    DEFAULT_PINECONE_URL, EmbeddingConfig, EmbeddingDriver, IngestConfig, Metric,
    OPENAI_API_KEY_ENV, PINECONE_API_KEY_ENV, PROJECT_CONFIG_FILE, QDRANT_API_KEY_ENV,
    ResolvedConfig, SanitizerConfig, VectorDriver, VectorStoreConfig,
};
pub use format::OutputFormat;
pub use record::{
    Field, MetadataValue, PipelineRecord, RawPartition, RawRecord, SanitizedMetadata, UpsertUnit,
    json_kind,
};
