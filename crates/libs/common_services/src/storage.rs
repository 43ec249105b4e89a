//! Media retrieval collaborator.
//!
//! Original images live outside this system; the pipeline only needs
//! "bytes for a storage location". [`LocalMediaStore`] reads from a mounted
//! media folder, [`HttpMediaStore`] fetches from an object-storage HTTP
//! endpoint.

use app_state::StorageSettings;
use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;
use tracing::warn;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("media object not found: {0}")]
    NotFound(String),

    #[error("storage location outside the media root: {0}")]
    InvalidLocation(String),

    #[error("storage io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("storage endpoint error: {0}")]
    Upstream(String),

    #[error("storage request timed out")]
    Timeout,
}

impl StorageError {
    /// Missing objects and traversal attempts are input problems; the rest
    /// is infrastructure and worth a bounded retry.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::Io(_) | Self::Upstream(_) | Self::Timeout)
    }
}

#[async_trait]
pub trait MediaStore: Send + Sync {
    async fn fetch(&self, location: &str) -> Result<Vec<u8>, StorageError>;
}

/// Reads originals from a mounted folder, refusing paths that escape it.
pub struct LocalMediaStore {
    root: PathBuf,
}

impl LocalMediaStore {
    #[must_use]
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }
}

#[async_trait]
impl MediaStore for LocalMediaStore {
    async fn fetch(&self, location: &str) -> Result<Vec<u8>, StorageError> {
        let root_canon = self.root.canonicalize()?;
        let file_path = self.root.join(location);
        let file_canon = match file_path.canonicalize() {
            Ok(path) => path,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(StorageError::NotFound(location.to_owned()));
            }
            Err(e) => return Err(e.into()),
        };

        if !file_canon.starts_with(&root_canon) {
            warn!("Blocked directory traversal attempt for: {location}");
            return Err(StorageError::InvalidLocation(location.to_owned()));
        }

        Ok(tokio::fs::read(&file_canon).await?)
    }
}

/// Fetches originals from an object-storage HTTP endpoint.
pub struct HttpMediaStore {
    client: reqwest::Client,
    base_url: String,
}

impl HttpMediaStore {
    #[must_use]
    pub fn new(client: reqwest::Client, base_url: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_owned(),
        }
    }
}

#[async_trait]
impl MediaStore for HttpMediaStore {
    async fn fetch(&self, location: &str) -> Result<Vec<u8>, StorageError> {
        let url = format!("{}/{}", self.base_url, location.trim_start_matches('/'));
        let response = self.client.get(&url).send().await.map_err(|e| {
            if e.is_timeout() {
                StorageError::Timeout
            } else {
                StorageError::Upstream(e.to_string())
            }
        })?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(StorageError::NotFound(location.to_owned()));
        }
        if !response.status().is_success() {
            return Err(StorageError::Upstream(format!(
                "storage returned {} for {url}",
                response.status()
            )));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| StorageError::Upstream(e.to_string()))?;
        Ok(bytes.to_vec())
    }
}

/// Build the media store configured in settings.
#[must_use]
pub fn media_store_from_settings(storage: &StorageSettings) -> Arc<dyn MediaStore> {
    match storage {
        StorageSettings::Local { media_folder } => {
            Arc::new(LocalMediaStore::new(media_folder.clone()))
        }
        StorageSettings::Http { base_url } => {
            Arc::new(HttpMediaStore::new(reqwest::Client::new(), base_url))
        }
    }
}
