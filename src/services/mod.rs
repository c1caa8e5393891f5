mod batch;
mod embedding;
mod loader;
mod sanitizer;
mod vector_store;

pub use batch::{
    BatchOptions, BatchUploader, NoProgress, UploadProgress, UploadSummary, percent,
};
pub use embedding::{
    Embedder, EmbedderSetupError, HealthResponse, OpenAiEmbedder, ServerEmbedder,
    create_embedder,
};
pub use loader::{CveLoader, Partition, count_records, list_partitions, partition_file};
pub use sanitizer::Sanitizer;
pub use vector_store::{
    BackendSetupError, IndexInfo, PineconeBackend, QdrantBackend, VectorStore, create_backend,
};
