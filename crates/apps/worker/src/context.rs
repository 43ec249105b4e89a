use app_state::AppSettings;
use color_eyre::Result;
use common_services::database::stores::PgStateStore;
use common_services::events::{EventPublisher, PgEventBus};
use common_services::nice_id;
use common_services::state::StateStore;
use common_services::storage::{MediaStore, media_store_from_settings};
use face_engine::{FaceExtractor, RemoteFaceExtractor};
use sqlx::PgPool;
use std::sync::Arc;
use std::time::Duration;

/// Everything a pipeline pass needs, behind the seams that tests replace:
/// state store, media storage, extractor and event publisher.
pub struct WorkerContext {
    pub worker_id: String,
    pub settings: AppSettings,
    pub store: Arc<dyn StateStore>,
    pub media: Arc<dyn MediaStore>,
    pub extractor: Arc<dyn FaceExtractor>,
    pub events: Arc<dyn EventPublisher>,
}

impl WorkerContext {
    /// Wire up the production implementations.
    pub fn from_pool(pool: PgPool, settings: AppSettings) -> Result<Self> {
        let extractor = RemoteFaceExtractor::new(
            &settings.inference.url,
            Duration::from_secs(settings.inference.timeout_secs),
            settings.matcher.embedding_dim,
        )?;

        Ok(Self {
            worker_id: nice_id(8),
            media: media_store_from_settings(&settings.storage),
            store: Arc::new(PgStateStore::new(pool.clone())),
            events: Arc::new(PgEventBus::new(pool)),
            extractor: Arc::new(extractor),
            settings,
        })
    }
}
