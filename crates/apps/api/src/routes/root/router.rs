use crate::api_state::ApiContext;
use crate::routes::root::handlers::{health_check, root};
use axum::Router;
use axum::routing::get;

pub fn root_router() -> Router<ApiContext> {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health_check))
}
