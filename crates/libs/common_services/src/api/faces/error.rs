use crate::state::StoreError;
use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum FaceError {
    #[error("database error")]
    Store(#[from] StoreError),

    #[error("Face not found: {0}")]
    FaceNotFound(Uuid),

    #[error("Person not found: {0}")]
    PersonNotFound(Uuid),

    #[error("Face and person belong to different owners.")]
    CrossOwner,

    #[error("Face is already assigned to another person; unassign it first.")]
    AlreadyAssigned,
}

impl IntoResponse for FaceError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            Self::Store(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "A database error occurred.".to_string(),
            ),
            Self::FaceNotFound(_) | Self::PersonNotFound(_) => {
                (StatusCode::NOT_FOUND, self.to_string())
            }
            Self::CrossOwner => (StatusCode::FORBIDDEN, self.to_string()),
            Self::AlreadyAssigned => (StatusCode::CONFLICT, self.to_string()),
        };

        let body = Json(json!({ "error": error_message }));
        (status, body).into_response()
    }
}
