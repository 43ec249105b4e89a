use axum::Json;
use axum::extract::FromRequestParts;
use axum::http::StatusCode;
use axum::http::request::Parts;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use uuid::Uuid;

/// The requesting user, taken from the `X-User-Id` header.
///
/// Authentication itself lives in front of this service; every scoped
/// handler extracts the owner this way so no query can forget the owner
/// filter.
pub struct Owner(pub Uuid);

pub enum OwnerRejection {
    Missing,
    Invalid,
}

impl IntoResponse for OwnerRejection {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            Self::Missing => (StatusCode::UNAUTHORIZED, "Missing X-User-Id header."),
            Self::Invalid => (StatusCode::BAD_REQUEST, "X-User-Id must be a UUID."),
        };
        (status, Json(json!({ "error": error_message }))).into_response()
    }
}

impl<S> FromRequestParts<S> for Owner
where
    S: Send + Sync,
{
    type Rejection = OwnerRejection;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get("x-user-id")
            .ok_or(OwnerRejection::Missing)?;
        let value = header.to_str().map_err(|_| OwnerRejection::Invalid)?;
        Uuid::parse_str(value)
            .map(Owner)
            .map_err(|_| OwnerRejection::Invalid)
    }
}
