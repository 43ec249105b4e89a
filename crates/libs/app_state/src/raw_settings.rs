use common_types::DEFAULT_EMBEDDING_DIM;
use serde::Deserialize;
use std::path::PathBuf;

#[derive(Debug, Deserialize, Clone)]
pub struct RawSettings {
    pub api: ApiSettings,
    pub logging: LoggingSettings,
    pub database: DatabaseSettings,
    pub worker: WorkerSettings,
    pub matcher: MatcherSettings,
    pub inference: InferenceSettings,
    pub storage: RawStorageSettings,
    pub secrets: SecretSettings,
}

/// Configuration for the API server.
#[derive(Debug, Deserialize, Clone)]
pub struct ApiSettings {
    pub host: String,
    pub port: u16,
    pub allowed_origins: Vec<String>,
    pub public_url: String,
}

/// Logging configuration.
#[derive(Debug, Deserialize, Clone)]
pub struct LoggingSettings {
    pub level: String,
}

/// Database connection pool configuration.
#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseSettings {
    pub max_connections: u32,
    pub min_connections: u32,
    pub max_lifetime: u64,
    pub idle_timeout: u64,
    pub acquire_timeout: u64,
}

/// Tuning for the resolution pipeline worker.
#[derive(Debug, Deserialize, Clone)]
pub struct WorkerSettings {
    /// Attempt budget for transient step failures (storage, inference).
    pub max_attempts: i32,
    /// Per-operation timeout; a stalled fetch or query becomes a step
    /// failure instead of holding the PROCESSING claim forever.
    pub operation_timeout_secs: u64,
    /// Age after which a PROCESSING claim is considered abandoned.
    pub stale_claim_secs: i64,
}

/// Auto-assignment policy for the vector matcher.
#[derive(Debug, Deserialize, Clone)]
pub struct MatcherSettings {
    /// Cosine similarity floor, inclusive: a score exactly at the threshold
    /// still counts as a match.
    pub similarity_threshold: f32,
    #[serde(default = "default_embedding_dim")]
    pub embedding_dim: usize,
}

const fn default_embedding_dim() -> usize {
    DEFAULT_EMBEDDING_DIM
}

/// Where the face detection/embedding sidecar lives.
#[derive(Debug, Deserialize, Clone)]
pub struct InferenceSettings {
    pub url: String,
    pub timeout_secs: u64,
}

/// Media retrieval configuration before validation; `kind` selects which of
/// the optional fields must be present.
#[derive(Debug, Deserialize, Clone)]
pub struct RawStorageSettings {
    pub kind: StorageKind,
    pub media_folder: Option<PathBuf>,
    pub base_url: Option<String>,
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum StorageKind {
    Local,
    Http,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SecretSettings {
    pub database_url: String,
}
