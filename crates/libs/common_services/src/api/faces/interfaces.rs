use crate::state::Pagination;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AssignFaceRequest {
    pub person_id: Uuid,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AssignFaceResponse {
    pub face_id: Uuid,
    pub person_id: Uuid,
    pub photo_id: Uuid,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UnassignFaceResponse {
    pub face_id: Uuid,
    pub photo_id: Uuid,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct IgnoreFaceResponse {
    pub face_id: Uuid,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
pub struct UnassignedFacesParams {
    /// Page size, capped server-side.
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl From<UnassignedFacesParams> for Pagination {
    fn from(params: UnassignedFacesParams) -> Self {
        let defaults = Self::default();
        Self {
            limit: params.limit.unwrap_or(defaults.limit),
            offset: params.offset.unwrap_or(defaults.offset),
        }
        .clamped()
    }
}
