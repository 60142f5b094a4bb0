//! Centralized configuration for docpipe
//!
//! One typed configuration tree for the whole pipeline, assembled from
//! environment variables over safe defaults and validated before use:
//! 1. Safe defaults (defined as constants)
//! 2. `DOCPIPE_*` environment variable overrides
//! 3. Runtime validation

pub mod error;
pub mod validation;

pub use error::{ConfigError, ConfigResult};
pub use validation::Validate;

use sqlx::postgres::PgConnectOptions;

// =============================================================================
// SAFE DEFAULTS - Work for any environment (dev, staging, prod, test)
// =============================================================================

// Chunking (token counts; 1 token is approximated as 4 characters)
const DEFAULT_CHUNK_SIZE_TOKENS: usize = 512;
const DEFAULT_CHUNK_OVERLAP_TOKENS: usize = 50;

// Retry policy for stage handlers
const DEFAULT_MAX_RETRIES: u32 = 3;
const DEFAULT_RETRY_BACKOFF_BASE_SECS: f64 = 2.0;
const DEFAULT_RETRY_BACKOFF_CAP_SECS: u64 = 60;

// Worker pools
const DEFAULT_QUEUE_POLL_INTERVAL_MS: u64 = 1000;
const DEFAULT_WORKERS_PER_STAGE: usize = 1;

// Embedding
const DEFAULT_EMBEDDING_MODEL_ID: &str = "BAAI/bge-small-en-v1.5";
const DEFAULT_EMBEDDING_DIMENSION: usize = 384;
const DEFAULT_EMBEDDING_BATCH_SIZE: usize = 100;

// Vector storage
const DEFAULT_QDRANT_URL: &str = "http://localhost:6334";
const DEFAULT_VECTOR_COLLECTION: &str = "document_chunks";

// Database (safe local defaults)
const DEFAULT_DB_HOST: &str = "localhost";
const DEFAULT_DB_PORT: u16 = 5432;
const DEFAULT_DB_NAME: &str = "docpipe";
const DEFAULT_DB_USER: &str = "docpipe";
const DEFAULT_DB_PASSWORD: &str = "localdev123";
const DEFAULT_DB_MAX_CONNECTIONS: u32 = 5;
const DEFAULT_DB_TIMEOUT_SECONDS: u64 = 30;

// Uploads
const DEFAULT_MAX_FILE_SIZE_BYTES: u64 = 100 * 1024 * 1024;
const DEFAULT_BULK_UPLOAD_CAP: usize = 100;

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}

fn env_string(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Top-level configuration for the whole pipeline
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ApplicationConfig {
    /// Ingestion pipeline configuration (chunking, retries, workers)
    pub ingestion: IngestionConfig,

    /// Embedding provider configuration
    pub embedding: EmbeddingConfig,

    /// Vector index configuration
    pub vector_storage: VectorStorageConfig,

    /// Metadata store configuration
    pub database: DatabaseConfig,

    /// Blob store configuration
    pub blob: BlobConfig,

    /// Upload validation configuration
    pub upload: UploadConfig,
}

impl ApplicationConfig {
    /// Load the full configuration from environment variables
    pub fn from_env() -> Self {
        Self {
            ingestion: IngestionConfig::from_env(),
            embedding: EmbeddingConfig::from_env(),
            vector_storage: VectorStorageConfig::from_env(),
            database: DatabaseConfig::from_env(),
            blob: BlobConfig::from_env(),
            upload: UploadConfig::from_env(),
        }
    }
}

impl Validate for ApplicationConfig {
    fn validate(&self) -> ConfigResult<()> {
        self.ingestion.validate()?;
        self.embedding.validate()?;
        self.vector_storage.validate()?;
        self.database.validate()?;
        self.upload.validate()?;

        if self.vector_storage.dimension != self.embedding.dimension {
            return Err(ConfigError::Generic {
                message: format!(
                    "Vector collection dimension ({}) does not match embedding dimension ({})",
                    self.vector_storage.dimension, self.embedding.dimension
                ),
            });
        }

        Ok(())
    }
}

/// Ingestion pipeline configuration
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct IngestionConfig {
    /// Target chunk length in tokens
    pub chunk_size_tokens: usize,

    /// Overlap between consecutive chunks in tokens
    pub chunk_overlap_tokens: usize,

    /// Retries per stage after the first attempt (attempts = value + 1)
    pub max_retries: u32,

    /// Base, in seconds, of the `base^k` retry backoff
    pub retry_backoff_base_secs: f64,

    /// Upper bound on a single backoff sleep
    pub retry_backoff_cap_secs: u64,

    /// Sleep between polls of an empty queue (milliseconds)
    pub queue_poll_interval_ms: u64,

    /// Concurrent workers for the extract stage
    pub extract_workers: usize,

    /// Concurrent workers for the chunk stage
    pub chunk_workers: usize,

    /// Concurrent workers for the embed stage
    pub embed_workers: usize,
}

impl IngestionConfig {
    pub fn from_env() -> Self {
        Self {
            chunk_size_tokens: env_parse("DOCPIPE_CHUNK_SIZE_TOKENS", DEFAULT_CHUNK_SIZE_TOKENS),
            chunk_overlap_tokens: env_parse(
                "DOCPIPE_CHUNK_OVERLAP_TOKENS",
                DEFAULT_CHUNK_OVERLAP_TOKENS,
            ),
            max_retries: env_parse("DOCPIPE_MAX_RETRIES", DEFAULT_MAX_RETRIES),
            retry_backoff_base_secs: env_parse(
                "DOCPIPE_RETRY_BACKOFF_BASE",
                DEFAULT_RETRY_BACKOFF_BASE_SECS,
            ),
            retry_backoff_cap_secs: env_parse(
                "DOCPIPE_RETRY_BACKOFF_CAP",
                DEFAULT_RETRY_BACKOFF_CAP_SECS,
            ),
            queue_poll_interval_ms: env_parse(
                "DOCPIPE_QUEUE_POLL_INTERVAL_MS",
                DEFAULT_QUEUE_POLL_INTERVAL_MS,
            ),
            extract_workers: env_parse("DOCPIPE_EXTRACT_WORKERS", DEFAULT_WORKERS_PER_STAGE),
            chunk_workers: env_parse("DOCPIPE_CHUNK_WORKERS", DEFAULT_WORKERS_PER_STAGE),
            embed_workers: env_parse("DOCPIPE_EMBED_WORKERS", DEFAULT_WORKERS_PER_STAGE),
        }
    }
}

impl Validate for IngestionConfig {
    fn validate(&self) -> ConfigResult<()> {
        validation::validate_range(
            self.chunk_size_tokens as u64,
            1,
            100_000,
            "ingestion.chunk_size_tokens",
        )?;
        validation::validate_range(
            self.chunk_overlap_tokens as u64,
            0,
            self.chunk_size_tokens.saturating_sub(1) as u64,
            "ingestion.chunk_overlap_tokens",
        )?;
        validation::validate_range(u64::from(self.max_retries), 0, 100, "ingestion.max_retries")?;
        if !self.retry_backoff_base_secs.is_finite() || self.retry_backoff_base_secs < 0.0 {
            return Err(ConfigError::Generic {
                message: format!(
                    "ingestion.retry_backoff_base must be a non-negative number, got {}",
                    self.retry_backoff_base_secs
                ),
            });
        }
        validation::validate_range(
            self.queue_poll_interval_ms,
            1,
            60_000,
            "ingestion.queue_poll_interval_ms",
        )?;
        for (workers, field) in [
            (self.extract_workers, "ingestion.extract_workers"),
            (self.chunk_workers, "ingestion.chunk_workers"),
            (self.embed_workers, "ingestion.embed_workers"),
        ] {
            validation::validate_range(workers as u64, 1, 64, field)?;
        }
        Ok(())
    }
}

/// Embedding provider configuration
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct EmbeddingConfig {
    /// Model identifier reported by the provider
    pub model_id: String,

    /// Dimension of every produced vector
    pub dimension: usize,

    /// Maximum texts per provider call
    pub batch_size: usize,

    /// HTTP endpoint of the embedding service; None selects the in-process
    /// deterministic provider (dev and tests)
    pub endpoint: Option<String>,
}

impl EmbeddingConfig {
    pub fn from_env() -> Self {
        Self {
            model_id: env_string("DOCPIPE_EMBEDDING_MODEL", DEFAULT_EMBEDDING_MODEL_ID),
            dimension: env_parse("DOCPIPE_EMBEDDING_DIMENSION", DEFAULT_EMBEDDING_DIMENSION),
            batch_size: env_parse("DOCPIPE_EMBEDDING_BATCH", DEFAULT_EMBEDDING_BATCH_SIZE),
            endpoint: std::env::var("DOCPIPE_EMBEDDING_ENDPOINT").ok(),
        }
    }
}

impl Validate for EmbeddingConfig {
    fn validate(&self) -> ConfigResult<()> {
        validation::validate_non_empty(&self.model_id, "embedding.model_id")?;
        validation::validate_range(self.dimension as u64, 1, 10_000, "embedding.dimension")?;
        validation::validate_range(self.batch_size as u64, 1, 1_000, "embedding.batch_size")?;
        if let Some(endpoint) = &self.endpoint {
            validation::validate_url(endpoint, "embedding.endpoint")?;
        }
        Ok(())
    }
}

/// Vector index configuration
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct VectorStorageConfig {
    /// Qdrant server URL
    pub url: String,

    /// Collection holding every tenant's points (isolation is by payload
    /// filter, not by collection)
    pub collection: String,

    /// Vector dimension of the collection; must match the embedding model
    pub dimension: usize,
}

impl VectorStorageConfig {
    pub fn from_env() -> Self {
        Self {
            url: env_string("DOCPIPE_QDRANT_URL", DEFAULT_QDRANT_URL),
            collection: env_string("DOCPIPE_VECTOR_COLLECTION", DEFAULT_VECTOR_COLLECTION),
            dimension: env_parse("DOCPIPE_EMBEDDING_DIMENSION", DEFAULT_EMBEDDING_DIMENSION),
        }
    }
}

impl Validate for VectorStorageConfig {
    fn validate(&self) -> ConfigResult<()> {
        validation::validate_url(&self.url, "vector_storage.url")?;
        validation::validate_non_empty(&self.collection, "vector_storage.collection")?;
        validation::validate_range(self.dimension as u64, 1, 10_000, "vector_storage.dimension")?;
        Ok(())
    }
}

/// Metadata store configuration
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct DatabaseConfig {
    pub host: String,
    pub port: u16,
    pub database: String,
    pub user: String,
    pub password: String,
    pub max_connections: u32,
    pub connect_timeout_secs: u64,
}

impl DatabaseConfig {
    pub fn from_env() -> Self {
        Self {
            host: env_string("DOCPIPE_DB_HOST", DEFAULT_DB_HOST),
            port: env_parse("DOCPIPE_DB_PORT", DEFAULT_DB_PORT),
            database: env_string("DOCPIPE_DB_NAME", DEFAULT_DB_NAME),
            user: env_string("DOCPIPE_DB_USER", DEFAULT_DB_USER),
            password: env_string("DOCPIPE_DB_PASSWORD", DEFAULT_DB_PASSWORD),
            max_connections: env_parse("DOCPIPE_DB_MAX_CONNECTIONS", DEFAULT_DB_MAX_CONNECTIONS),
            connect_timeout_secs: env_parse("DOCPIPE_DB_TIMEOUT", DEFAULT_DB_TIMEOUT_SECONDS),
        }
    }

    /// Connection options for sqlx
    pub fn connect_options(&self) -> PgConnectOptions {
        PgConnectOptions::new()
            .host(&self.host)
            .port(self.port)
            .database(&self.database)
            .username(&self.user)
            .password(&self.password)
    }
}

impl Validate for DatabaseConfig {
    fn validate(&self) -> ConfigResult<()> {
        validation::validate_non_empty(&self.host, "database.host")?;
        validation::validate_port(self.port, "database.port")?;
        validation::validate_non_empty(&self.database, "database.database")?;
        validation::validate_non_empty(&self.user, "database.user")?;
        validation::validate_range(
            u64::from(self.max_connections),
            1,
            1_000,
            "database.max_connections",
        )?;
        Ok(())
    }
}

/// Blob store backend selection
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub enum BlobBackend {
    /// In-memory store; contents die with the process (dev and tests)
    #[serde(rename = "memory")]
    Memory,

    /// Local filesystem rooted at the given directory
    #[serde(rename = "local")]
    Local { root: String },
}

/// Blob store configuration
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct BlobConfig {
    pub backend: BlobBackend,
}

impl BlobConfig {
    pub fn from_env() -> Self {
        let backend = std::env::var("DOCPIPE_BLOB_ROOT")
            .ok()
            .map_or(BlobBackend::Memory, |root| BlobBackend::Local { root });
        Self { backend }
    }
}

/// Upload validation configuration
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct UploadConfig {
    /// Reject uploads larger than this many bytes
    pub max_file_size_bytes: u64,

    /// Lowercased extensions (with the dot) accepted at ingest
    pub allowed_extensions: Vec<String>,

    /// Maximum items per bulk upload call
    pub bulk_upload_cap: usize,
}

impl UploadConfig {
    pub fn from_env() -> Self {
        let allowed_extensions = std::env::var("DOCPIPE_ALLOWED_EXTENSIONS")
            .map(|s| {
                s.split(',')
                    .map(|ext| ext.trim().to_ascii_lowercase())
                    .filter(|ext| !ext.is_empty())
                    .collect()
            })
            .unwrap_or_else(|_| vec![".pdf".to_string(), ".txt".to_string()]);

        Self {
            max_file_size_bytes: env_parse("DOCPIPE_MAX_FILE_SIZE", DEFAULT_MAX_FILE_SIZE_BYTES),
            allowed_extensions,
            bulk_upload_cap: env_parse("DOCPIPE_BULK_UPLOAD_CAP", DEFAULT_BULK_UPLOAD_CAP),
        }
    }
}

impl Validate for UploadConfig {
    fn validate(&self) -> ConfigResult<()> {
        validation::validate_range(
            self.max_file_size_bytes,
            1,
            10 * 1024 * 1024 * 1024,
            "upload.max_file_size_bytes",
        )?;
        if self.allowed_extensions.is_empty() {
            return Err(ConfigError::MissingField {
                field: "upload.allowed_extensions".to_string(),
            });
        }
        for ext in &self.allowed_extensions {
            if !ext.starts_with('.') {
                return Err(ConfigError::Generic {
                    message: format!("upload.allowed_extensions entries must start with '.', got {ext:?}"),
                });
            }
        }
        validation::validate_range(self.bulk_upload_cap as u64, 1, 10_000, "upload.bulk_upload_cap")?;
        Ok(())
    }
}

impl Default for ApplicationConfig {
    fn default() -> Self {
        Self {
            ingestion: IngestionConfig {
                chunk_size_tokens: DEFAULT_CHUNK_SIZE_TOKENS,
                chunk_overlap_tokens: DEFAULT_CHUNK_OVERLAP_TOKENS,
                max_retries: DEFAULT_MAX_RETRIES,
                retry_backoff_base_secs: DEFAULT_RETRY_BACKOFF_BASE_SECS,
                retry_backoff_cap_secs: DEFAULT_RETRY_BACKOFF_CAP_SECS,
                queue_poll_interval_ms: DEFAULT_QUEUE_POLL_INTERVAL_MS,
                extract_workers: DEFAULT_WORKERS_PER_STAGE,
                chunk_workers: DEFAULT_WORKERS_PER_STAGE,
                embed_workers: DEFAULT_WORKERS_PER_STAGE,
            },
            embedding: EmbeddingConfig {
                model_id: DEFAULT_EMBEDDING_MODEL_ID.to_string(),
                dimension: DEFAULT_EMBEDDING_DIMENSION,
                batch_size: DEFAULT_EMBEDDING_BATCH_SIZE,
                endpoint: None,
            },
            vector_storage: VectorStorageConfig {
                url: DEFAULT_QDRANT_URL.to_string(),
                collection: DEFAULT_VECTOR_COLLECTION.to_string(),
                dimension: DEFAULT_EMBEDDING_DIMENSION,
            },
            database: DatabaseConfig {
                host: DEFAULT_DB_HOST.to_string(),
                port: DEFAULT_DB_PORT,
                database: DEFAULT_DB_NAME.to_string(),
                user: DEFAULT_DB_USER.to_string(),
                password: DEFAULT_DB_PASSWORD.to_string(),
                max_connections: DEFAULT_DB_MAX_CONNECTIONS,
                connect_timeout_secs: DEFAULT_DB_TIMEOUT_SECONDS,
            },
            blob: BlobConfig {
                backend: BlobBackend::Memory,
            },
            upload: UploadConfig {
                max_file_size_bytes: DEFAULT_MAX_FILE_SIZE_BYTES,
                allowed_extensions: vec![".pdf".to_string(), ".txt".to_string()],
                bulk_upload_cap: DEFAULT_BULK_UPLOAD_CAP,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate() {
        let config = ApplicationConfig::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn default_chunking_matches_token_budget() {
        let config = ApplicationConfig::default();
        assert_eq!(config.ingestion.chunk_size_tokens, 512);
        assert_eq!(config.ingestion.chunk_overlap_tokens, 50);
    }

    #[test]
    fn mismatched_dimensions_are_rejected() {
        let mut config = ApplicationConfig::default();
        config.vector_storage.dimension = 768;
        assert!(config.validate().is_err());
    }

    #[test]
    fn overlap_must_be_smaller_than_chunk_size() {
        let mut config = ApplicationConfig::default();
        config.ingestion.chunk_overlap_tokens = config.ingestion.chunk_size_tokens;
        assert!(config.validate().is_err());
    }

    #[test]
    fn extensions_must_carry_a_dot() {
        let mut config = ApplicationConfig::default();
        config.upload.allowed_extensions = vec!["txt".to_string()];
        assert!(config.upload.validate().is_err());
    }
}
