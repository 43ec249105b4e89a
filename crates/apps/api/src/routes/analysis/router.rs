use crate::api_state::ApiContext;
use crate::routes::analysis::handlers::get_analysis_handler;
use axum::Router;
use axum::routing::get;

pub fn analysis_router() -> Router<ApiContext> {
    Router::new().route("/analysis/{media_id}", get(get_analysis_handler))
}
