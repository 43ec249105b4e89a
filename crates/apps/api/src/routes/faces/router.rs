use crate::api_state::ApiContext;
use crate::routes::faces::handlers::{
    assign_face_handler, ignore_face_handler, list_unassigned_handler, unassign_face_handler,
};
use axum::routing::{get, post};
use axum::Router;

pub fn faces_router() -> Router<ApiContext> {
    Router::new()
        .route("/faces/unassigned", get(list_unassigned_handler))
        .route("/faces/{face_id}/assign", post(assign_face_handler))
        .route("/faces/{face_id}/unassign", post(unassign_face_handler))
        .route("/faces/{face_id}/ignore", post(ignore_face_handler))
}
