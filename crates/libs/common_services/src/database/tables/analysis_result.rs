use chrono::{DateTime, Utc};
use common_types::AnalysisStatus;
use serde::Serialize;
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

/// The authoritative per-photo processing record: exactly one row per
/// `media_id`.
#[derive(Debug, Clone, FromRow, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    pub id: Uuid,
    pub media_id: Uuid,
    pub owner_id: Uuid,
    pub status: AnalysisStatus,
    pub face_count: i32,
    pub taken_at: Option<DateTime<Utc>>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub camera_make: Option<String>,
    pub camera_model: Option<String>,
    /// Human-readable failure reason, set only while status is FAILED.
    pub error_message: Option<String>,
    pub claimed_at: Option<DateTime<Utc>>,
    pub analyzed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
