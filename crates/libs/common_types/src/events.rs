use crate::AnalysisStatus;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const CHANNEL_PHOTO_UPLOADED: &str = "photo:uploaded";
pub const CHANNEL_PHOTO_DELETED: &str = "photo:deleted";
pub const CHANNEL_PHOTO_ANALYZED: &str = "photo:analyzed";
pub const CHANNEL_PHOTO_REINDEX: &str = "photo:reindex";

/// Inbound notification that a new photo landed in object storage.
/// Delivery is at-least-once; the pipeline's claim step absorbs duplicates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PhotoUploaded {
    pub photo_id: Uuid,
    pub owner_id: Uuid,
    pub storage_location: String,
}

/// Inbound notification that a photo was removed; its derived analysis
/// records should be removed as well.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PhotoDeleted {
    pub photo_id: Uuid,
}

/// Outbound notification emitted once per terminal transition, whether the
/// analysis completed or failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PhotoAnalyzed {
    pub photo_id: Uuid,
    pub face_count: i32,
    pub status: AnalysisStatus,
}

/// Outbound notification telling the search indexer that a photo's derived
/// data changed and must be recomputed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PhotoReindex {
    pub photo_id: Uuid,
}
