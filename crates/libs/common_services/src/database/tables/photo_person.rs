use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

/// A photo-to-person binding (the Assignment entity). At most one row per
/// `(media_id, person_id)`; `confirmed` distinguishes a human decision from
/// an automatic suggestion. The backing face is a weak link: deleting the
/// face keeps the assignment.
#[derive(Debug, Clone, FromRow, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PhotoPerson {
    pub id: Uuid,
    pub media_id: Uuid,
    pub person_id: Uuid,
    pub face_embedding_id: Option<Uuid>,
    pub confirmed: bool,
    pub created_at: DateTime<Utc>,
}
