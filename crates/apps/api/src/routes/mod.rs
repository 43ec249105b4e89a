pub mod analysis;
mod api_doc;
pub mod faces;
mod owner;
pub mod person;
pub mod root;

use crate::api_state::ApiContext;
use crate::routes::api_doc::ApiDoc;
use axum::Router;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

pub use owner::Owner;

// --- Router Construction ---
pub fn create_router(api_state: ApiContext) -> Router {
    Router::new()
        .merge(SwaggerUi::new("/docs").url("/openapi.json", ApiDoc::openapi()))
        .merge(root::router::root_router())
        .merge(person::router::person_router())
        .merge(faces::router::faces_router())
        .merge(analysis::router::analysis_router())
        .with_state(api_state)
}
