//! The analysis state store seam.
//!
//! Everything the resolution pipeline and the assignment service need from
//! persistence sits behind [`StateStore`], so their logic runs unchanged
//! against Postgres in production and against the in-memory store in tests.

use crate::database::tables::{AnalysisResult, UnassignedFace};
use crate::matching::MatchCandidate;
use crate::metadata::MediaMetadata;
use async_trait::async_trait;
use common_types::DetectedFace;
use std::time::Duration;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A concurrent writer got there first (e.g. the claim was lost while a
    /// pass was in flight).
    #[error("conflicting concurrent write: {0}")]
    Conflict(String),
}

impl StoreError {
    /// Database and conflict errors are worth one more try; they come from
    /// infrastructure, not from the input.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::Database(_) | Self::Conflict(_))
    }
}

/// One detected face plus the matcher's verdict for it.
#[derive(Debug, Clone)]
pub struct ResolvedFace {
    pub detection: DetectedFace,
    /// Advisory person link from automatic matching; `None` leaves the face
    /// in the unassigned queue.
    pub person_id: Option<Uuid>,
    pub similarity: Option<f64>,
}

/// Everything a successful pipeline pass persists in one transaction.
#[derive(Debug, Clone, Default)]
pub struct AnalysisOutcome {
    pub faces: Vec<ResolvedFace>,
    pub metadata: MediaMetadata,
}

/// Identity and ownership of one stored face. A face's owner is the owner
/// of the photo it was detected in.
#[derive(Debug, Clone, Copy)]
pub struct FaceRef {
    pub id: Uuid,
    pub media_id: Uuid,
    pub owner_id: Uuid,
    pub person_id: Option<Uuid>,
}

#[derive(Debug, Clone, Copy)]
pub struct Pagination {
    pub limit: i64,
    pub offset: i64,
}

impl Pagination {
    pub const MAX_LIMIT: i64 = 200;

    #[must_use]
    pub fn clamped(self) -> Self {
        Self {
            limit: self.limit.clamp(1, Self::MAX_LIMIT),
            offset: self.offset.max(0),
        }
    }
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            limit: 50,
            offset: 0,
        }
    }
}

/// Transactional persistence contract for per-photo analysis state.
///
/// Invariants every implementation upholds:
/// * exactly one analysis row per `media_id`;
/// * status only moves along the transition table in
///   [`common_types::AnalysisStatus::can_transition`], with the stale-claim
///   re-claim folded into the claim predicate;
/// * `record_completion` is all-or-nothing: faces, assignments, metadata
///   and the COMPLETE transition land in one transaction, and a retried
///   pass never duplicates face rows.
#[async_trait]
pub trait StateStore: Send + Sync {
    /// Create the PENDING analysis row if absent. Duplicate upload events
    /// hit the unique constraint and do nothing; an existing row keeps its
    /// current status.
    async fn ensure_pending(&self, media_id: Uuid, owner_id: Uuid) -> Result<(), StoreError>;

    /// Atomically take PENDING/FAILED (or overdue PROCESSING) to
    /// PROCESSING. Returns whether this caller won the claim; this is the
    /// sole synchronization primitive between concurrent workers.
    async fn claim_for_processing(
        &self,
        media_id: Uuid,
        stale_after: Duration,
    ) -> Result<bool, StoreError>;

    /// Persist a successful pass and transition to COMPLETE.
    async fn record_completion(
        &self,
        media_id: Uuid,
        outcome: &AnalysisOutcome,
    ) -> Result<(), StoreError>;

    /// Transition PROCESSING → FAILED with a human-readable reason.
    async fn record_failure(&self, media_id: Uuid, message: &str) -> Result<(), StoreError>;

    async fn analysis_by_media(
        &self,
        media_id: Uuid,
        owner_id: Uuid,
    ) -> Result<Option<AnalysisResult>, StoreError>;

    /// Nearest person-linked face for the embedding, restricted to persons
    /// owned by `owner_id`. Threshold policy is applied by the caller.
    async fn nearest_assigned_face(
        &self,
        owner_id: Uuid,
        embedding: &[f32],
    ) -> Result<Option<MatchCandidate>, StoreError>;

    async fn face_ref(&self, face_id: Uuid) -> Result<Option<FaceRef>, StoreError>;

    async fn person_owner(&self, person_id: Uuid) -> Result<Option<Uuid>, StoreError>;

    /// Confirm a face-to-person binding: upsert the assignment as
    /// confirmed, point it at this face, set the face's person link, and
    /// drop any ignore marker — one transaction.
    async fn confirm_assignment(&self, face: &FaceRef, person_id: Uuid) -> Result<(), StoreError>;

    /// Clear the face's person link. Assignment history stays untouched.
    async fn clear_face_person(&self, face_id: Uuid) -> Result<(), StoreError>;

    /// Hide a face from the unassigned queue and drop unconfirmed
    /// suggestions pointing at it.
    async fn ignore_face(&self, owner_id: Uuid, face_id: Uuid) -> Result<(), StoreError>;

    /// Unassigned (and not ignored) faces for an owner, newest first.
    async fn unassigned_faces(
        &self,
        owner_id: Uuid,
        page: Pagination,
    ) -> Result<Vec<UnassignedFace>, StoreError>;

    /// Remove all derived records for a deleted photo.
    async fn delete_media_records(&self, media_id: Uuid) -> Result<(), StoreError>;

    /// Fail PROCESSING rows whose claim is older than `stale_after`,
    /// returning how many were released. Run at worker startup so crashed
    /// claims become visible and retryable.
    async fn release_stale_claims(&self, stale_after: Duration) -> Result<u64, StoreError>;
}
