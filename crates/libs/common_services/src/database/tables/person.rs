use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

/// A human identity the operator recognizes, scoped to its owning user.
#[derive(Debug, Clone, FromRow, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Person {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub name: String,
    pub relationship: Option<String>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Person plus how many photos it is linked to, for listings.
#[derive(Debug, Clone, FromRow, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PersonWithPhotoCount {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub person: Person,
    pub photo_count: i64,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreatePerson {
    pub name: String,
    pub relationship: Option<String>,
    pub notes: Option<String>,
}

/// Partial update; omitted fields keep their current values.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePerson {
    pub name: Option<String>,
    pub relationship: Option<String>,
    pub notes: Option<String>,
}
