use std::collections::BTreeSet;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

pub const DEFAULT_OPENAI_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-3-small";
pub const DEFAULT_EMBEDDING_DIMENSION: u32 = 1536;
pub const DEFAULT_PINECONE_URL: &str = "https://api.pinecone.io";
pub const DEFAULT_INDEX: &str = "cve-rag";
pub const DEFAULT_CORPUS_DIR: &str = "CVE_List";
pub const DEFAULT_LIST_SUFFIX: &str = "_list";
pub const DEFAULT_MAX_LIST_ITEMS: usize = 50;

pub const PROJECT_CONFIG_FILE: &str = ".cve-ingest.toml";

pub const OPENAI_API_KEY_ENV: &str = "OPENAI_API_KEY";
pub const PINECONE_API_KEY_ENV: &str = "PINECONE_API_KEY";
pub const QDRANT_API_KEY_ENV: &str = "QDRANT_API_KEY";

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub embedding: EmbeddingConfig,

    #[serde(default)]
    pub vector_store: VectorStoreConfig,

    #[serde(default)]
    pub ingest: IngestConfig,

    #[serde(default)]
    pub sanitizer: SanitizerConfig,
}

/// A loaded configuration and the file it came from, if any.
#[derive(Debug, Clone, Default)]
pub struct ResolvedConfig {
    pub config: Config,
    pub path: Option<PathBuf>,
}

impl Config {
    pub fn global_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("cve-ingest").join("config.toml"))
    }

    pub fn project_path() -> Option<PathBuf> {
        std::env::current_dir()
            .ok()
            .map(|cwd| cwd.join(PROJECT_CONFIG_FILE))
    }

    /// The first config file that exists: project file, then global file.
    pub fn find_config() -> Option<PathBuf> {
        [Self::project_path(), Self::global_path()]
            .into_iter()
            .flatten()
            .find(|p| p.exists())
    }

    /// Load configuration and apply credential overrides from the environment.
    pub fn load() -> Result<ResolvedConfig, ConfigError> {
        let path = Self::find_config();
        let mut config = match path {
            Some(ref path) => Self::load_from(path)?,
            None => Self::default(),
        };
        config.apply_env();
        Ok(ResolvedConfig { config, path })
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    fn apply_env(&mut self) {
        if let Ok(key) = std::env::var(OPENAI_API_KEY_ENV)
            && !key.trim().is_empty()
        {
            self.embedding.api_key = Some(key);
        }

        let store_env = match self.vector_store.driver {
            VectorDriver::Pinecone => PINECONE_API_KEY_ENV,
            VectorDriver::Qdrant => QDRANT_API_KEY_ENV,
        };
        if let Ok(key) = std::env::var(store_env)
            && !key.trim().is_empty()
        {
            self.vector_store.api_key = Some(key);
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.embedding.dimension == 0 {
            return Err(ConfigError::ValidationError(
                "embedding.dimension must be greater than 0".to_string(),
            ));
        }
        if self.embedding.batch_size == 0 {
            return Err(ConfigError::ValidationError(
                "embedding.batch_size must be greater than 0".to_string(),
            ));
        }
        if self.vector_store.index.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "vector_store.index must not be empty".to_string(),
            ));
        }
        if self.ingest.embed_batch_size == 0 || self.ingest.upsert_batch_size == 0 {
            return Err(ConfigError::ValidationError(
                "ingest batch sizes must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingDriver {
    /// OpenAI-compatible `/embeddings` API
    #[default]
    OpenAi,
    /// Self-hosted text-embeddings server exposing `/embed`
    Server,
}

impl fmt::Display for EmbeddingDriver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EmbeddingDriver::OpenAi => write!(f, "openai"),
            EmbeddingDriver::Server => write!(f, "server"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    #[serde(default)]
    pub driver: EmbeddingDriver,

    #[serde(default = "default_embedding_url")]
    pub url: String,

    #[serde(default = "default_embedding_model")]
    pub model: String,

    #[serde(default = "default_embedding_dimension")]
    pub dimension: u32,

    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// Request size for the server driver.
    #[serde(default = "default_server_batch_size")]
    pub batch_size: u32,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
}

fn default_embedding_url() -> String {
    DEFAULT_OPENAI_URL.to_string()
}

fn default_embedding_model() -> String {
    DEFAULT_EMBEDDING_MODEL.to_string()
}

fn default_embedding_dimension() -> u32 {
    DEFAULT_EMBEDDING_DIMENSION
}

fn default_timeout() -> u64 {
    120
}

fn default_server_batch_size() -> u32 {
    64
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            driver: EmbeddingDriver::default(),
            url: default_embedding_url(),
            model: default_embedding_model(),
            dimension: default_embedding_dimension(),
            timeout_secs: default_timeout(),
            batch_size: default_server_batch_size(),
            api_key: None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VectorDriver {
    #[default]
    Pinecone,
    Qdrant,
}

impl fmt::Display for VectorDriver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VectorDriver::Pinecone => write!(f, "pinecone"),
            VectorDriver::Qdrant => write!(f, "qdrant"),
        }
    }
}

/// Distance metric used when creating an index.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Metric {
    #[default]
    Cosine,
    Euclidean,
    DotProduct,
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Metric::Cosine => write!(f, "cosine"),
            Metric::Euclidean => write!(f, "euclidean"),
            Metric::DotProduct => write!(f, "dotproduct"),
        }
    }
}

impl FromStr for Metric {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "cosine" => Ok(Metric::Cosine),
            "euclidean" => Ok(Metric::Euclidean),
            "dotproduct" | "dot" => Ok(Metric::DotProduct),
            _ => Err(format!("unknown metric: {}", s)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorStoreConfig {
    #[serde(default)]
    pub driver: VectorDriver,

    /// Pinecone control plane URL, or the Qdrant gRPC URL.
    #[serde(default = "default_vector_url")]
    pub url: String,

    #[serde(default = "default_index")]
    pub index: String,

    #[serde(default)]
    pub metric: Metric,

    #[serde(default = "default_cloud")]
    pub cloud: String,

    #[serde(default = "default_region")]
    pub region: String,

    /// Pinecone data plane host. Resolved from the control plane when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,

    #[serde(default = "default_ready_timeout")]
    pub ready_timeout_secs: u64,

    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
}

fn default_vector_url() -> String {
    DEFAULT_PINECONE_URL.to_string()
}

fn default_index() -> String {
    DEFAULT_INDEX.to_string()
}

fn default_cloud() -> String {
    "aws".to_string()
}

fn default_region() -> String {
    "us-east-1".to_string()
}

fn default_ready_timeout() -> u64 {
    300
}

impl Default for VectorStoreConfig {
    fn default() -> Self {
        Self {
            driver: VectorDriver::default(),
            url: default_vector_url(),
            index: default_index(),
            metric: Metric::default(),
            cloud: default_cloud(),
            region: default_region(),
            host: None,
            namespace: None,
            ready_timeout_secs: default_ready_timeout(),
            timeout_secs: default_timeout(),
            api_key: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestConfig {
    #[serde(default = "default_corpus_dir")]
    pub corpus_dir: PathBuf,

    #[serde(default = "default_embed_batch_size")]
    pub embed_batch_size: usize,

    #[serde(default = "default_upsert_batch_size")]
    pub upsert_batch_size: usize,
}

fn default_corpus_dir() -> PathBuf {
    PathBuf::from(DEFAULT_CORPUS_DIR)
}

fn default_embed_batch_size() -> usize {
    1000
}

fn default_upsert_batch_size() -> usize {
    100
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            corpus_dir: default_corpus_dir(),
            embed_batch_size: default_embed_batch_size(),
            upsert_batch_size: default_upsert_batch_size(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SanitizerConfig {
    /// Fields dropped regardless of value shape.
    #[serde(default = "default_excluded_fields")]
    pub excluded_fields: BTreeSet<String>,

    /// Appended to the key of a list of objects reduced to strings.
    #[serde(default = "default_derived_suffix")]
    pub derived_suffix: String,

    #[serde(default = "default_max_list_items")]
    pub max_list_items: usize,
}

fn default_excluded_fields() -> BTreeSet<String> {
    ["exploits", "metasploitModules", "affectedProducts"]
        .into_iter()
        .map(String::from)
        .collect()
}

fn default_derived_suffix() -> String {
    DEFAULT_LIST_SUFFIX.to_string()
}

fn default_max_list_items() -> usize {
    DEFAULT_MAX_LIST_ITEMS
}

impl Default for SanitizerConfig {
    fn default() -> Self {
        Self {
            excluded_fields: default_excluded_fields(),
            derived_suffix: default_derived_suffix(),
            max_list_items: default_max_list_items(),
        }
    }
}
