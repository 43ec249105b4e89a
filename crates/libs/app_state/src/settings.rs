use crate::{
    ApiSettings, DatabaseSettings, InferenceSettings, LoggingSettings, MatcherSettings,
    RawSettings, RawStorageSettings, SecretSettings, StorageKind, WorkerSettings,
};
use color_eyre::eyre::{Result, eyre};
use std::path::{PathBuf, absolute};
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct AppSettings {
    pub api: ApiSettings,
    pub logging: LoggingSettings,
    pub database: DatabaseSettings,
    pub worker: WorkerSettings,
    pub matcher: MatcherSettings,
    pub inference: InferenceSettings,
    pub storage: StorageSettings,
    pub secrets: SecretSettings,
}

/// Validated media retrieval configuration.
#[derive(Debug, Clone)]
pub enum StorageSettings {
    /// Read originals from a mounted folder.
    Local { media_folder: PathBuf },
    /// Fetch originals from an object-storage HTTP endpoint.
    Http { base_url: String },
}

impl TryFrom<RawSettings> for AppSettings {
    type Error = color_eyre::Report;

    fn try_from(raw: RawSettings) -> Result<Self> {
        let storage = raw.storage.try_into()?;

        Ok(Self {
            api: raw.api,
            logging: raw.logging,
            database: raw.database,
            worker: raw.worker,
            matcher: raw.matcher,
            inference: raw.inference,
            storage,
            secrets: raw.secrets,
        })
    }
}

impl TryFrom<RawStorageSettings> for StorageSettings {
    type Error = color_eyre::Report;

    fn try_from(raw: RawStorageSettings) -> Result<Self> {
        match raw.kind {
            StorageKind::Local => {
                let media_folder = raw
                    .media_folder
                    .ok_or_else(|| eyre!("storage.media_folder is required for kind = local"))?;
                Ok(Self::Local {
                    media_folder: absolute(&media_folder)?,
                })
            }
            StorageKind::Http => {
                let base_url = raw
                    .base_url
                    .ok_or_else(|| eyre!("storage.base_url is required for kind = http"))?;
                Ok(Self::Http { base_url })
            }
        }
    }
}

impl WorkerSettings {
    #[must_use]
    pub const fn operation_timeout(&self) -> Duration {
        Duration::from_secs(self.operation_timeout_secs)
    }

    #[must_use]
    pub const fn stale_claim_age(&self) -> Duration {
        Duration::from_secs(self.stale_claim_secs as u64)
    }
}
