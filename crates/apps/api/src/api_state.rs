use app_state::AppSettings;
use axum::extract::FromRef;
use common_services::database::stores::PgStateStore;
use common_services::events::PgEventBus;
use sqlx::PgPool;

#[derive(Clone)]
pub struct ApiContext {
    pub pool: PgPool,
    pub store: PgStateStore,
    pub events: PgEventBus,
    pub settings: AppSettings,
}

// These impls let Axum extract the parts of the state that a handler or
// middleware actually needs.
impl FromRef<ApiContext> for PgPool {
    fn from_ref(state: &ApiContext) -> Self {
        state.pool.clone()
    }
}

impl FromRef<ApiContext> for PgStateStore {
    fn from_ref(state: &ApiContext) -> Self {
        state.store.clone()
    }
}

impl FromRef<ApiContext> for PgEventBus {
    fn from_ref(state: &ApiContext) -> Self {
        state.events.clone()
    }
}

impl FromRef<ApiContext> for AppSettings {
    fn from_ref(state: &ApiContext) -> Self {
        state.settings.clone()
    }
}
