//! The resolution pipeline: one upload event in, one terminal analysis
//! state out.
//!
//! Steps are fenced by the atomic claim in the state store, so any number
//! of workers can consume the same at-least-once event stream. Step
//! failures are caught at the step boundary and recorded on the analysis
//! row; they never take the worker down.

use crate::context::WorkerContext;
use crate::retry::backoff_seconds;
use app_state::WorkerSettings;
use common_services::events::publish_event;
use common_services::matching::resolve_match;
use common_services::metadata::extract_metadata;
use common_services::state::{AnalysisOutcome, ResolvedFace, StoreError};
use common_types::{AnalysisStatus, CHANNEL_PHOTO_ANALYZED, PhotoAnalyzed, PhotoUploaded};
use face_engine::ExtractionError;
use std::time::Duration;
use thiserror::Error;
use tokio::time::{sleep, timeout};
use tracing::{info, warn};
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("storage retrieval failed: {0}")]
    Storage(#[from] common_services::storage::StorageError),

    #[error("face extraction failed: {0}")]
    Extraction(#[from] ExtractionError),

    #[error("similarity query failed: {0}")]
    MatchQuery(StoreError),

    #[error("persisting analysis failed: {0}")]
    Persistence(StoreError),

    #[error("{step} timed out")]
    Timeout { step: &'static str },
}

impl PipelineError {
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        match self {
            Self::Storage(e) => e.is_transient(),
            Self::Extraction(e) => e.is_transient(),
            Self::MatchQuery(e) | Self::Persistence(e) => e.is_transient(),
            Self::Timeout { .. } => true,
        }
    }
}

/// What a pipeline pass did with an upload event.
#[derive(Debug, PartialEq, Eq)]
pub enum UploadOutcome {
    /// Analysis persisted and COMPLETE.
    Completed { face_count: i32 },
    /// Someone else holds the claim (or the photo is already done);
    /// the duplicate delivery was dropped.
    Discarded,
    /// Terminal failure, recorded on the analysis row.
    Failed { message: String },
}

/// Process one `photo:uploaded` event end to end.
///
/// Store errors on the claim bookkeeping itself bubble up; the event stays
/// claimable and redelivery will retry it.
pub async fn process_upload(
    ctx: &WorkerContext,
    event: &PhotoUploaded,
) -> Result<UploadOutcome, StoreError> {
    let media_id = event.photo_id;

    ctx.store.ensure_pending(media_id, event.owner_id).await?;

    let stale_after = ctx.settings.worker.stale_claim_age();
    if !ctx.store.claim_for_processing(media_id, stale_after).await? {
        info!("Discarding event for {media_id}: already claimed or complete");
        return Ok(UploadOutcome::Discarded);
    }

    match run_analysis(ctx, event).await {
        Ok(outcome) => match persist(ctx, media_id, &outcome).await {
            Ok(()) => {
                let face_count = i32::try_from(outcome.faces.len()).unwrap_or(i32::MAX);
                info!("Completed analysis of {media_id}: {face_count} face(s)");
                emit_analyzed(ctx, media_id, face_count, AnalysisStatus::Complete).await;
                Ok(UploadOutcome::Completed { face_count })
            }
            Err(e) => fail(ctx, media_id, &e.to_string()).await,
        },
        Err(e) => fail(ctx, media_id, &e.to_string()).await,
    }
}

/// Steps 3–5: fetch, extract, parse metadata, match. No writes happen here.
async fn run_analysis(
    ctx: &WorkerContext,
    event: &PhotoUploaded,
) -> Result<AnalysisOutcome, PipelineError> {
    let worker = &ctx.settings.worker;
    let op_timeout = worker.operation_timeout();

    let image = with_retries(worker, "storage retrieval", || {
        bounded(
            op_timeout,
            "storage retrieval",
            ctx.media.fetch(&event.storage_location),
            PipelineError::Storage,
        )
    })
    .await?;

    let detections = with_retries(worker, "face extraction", || {
        bounded(
            op_timeout,
            "face extraction",
            ctx.extractor.extract_faces(&image),
            PipelineError::Extraction,
        )
    })
    .await?;

    let metadata = extract_metadata(&image);

    let threshold = ctx.settings.matcher.similarity_threshold;
    let mut faces = Vec::with_capacity(detections.len());
    for detection in detections {
        // The detection's own row is not persisted yet, so it can only
        // match against other, already-registered faces.
        let candidate = with_retries(worker, "similarity query", || {
            bounded(
                op_timeout,
                "similarity query",
                ctx.store
                    .nearest_assigned_face(event.owner_id, &detection.embedding),
                PipelineError::MatchQuery,
            )
        })
        .await?;

        let accepted = resolve_match(candidate, threshold);
        faces.push(ResolvedFace {
            person_id: accepted.as_ref().map(|m| m.person_id),
            similarity: accepted.as_ref().map(|m| m.similarity),
            detection,
        });
    }

    Ok(AnalysisOutcome { faces, metadata })
}

/// Step 6: one transaction; a transient failure gets a single immediate
/// retry before the photo is failed.
async fn persist(
    ctx: &WorkerContext,
    media_id: Uuid,
    outcome: &AnalysisOutcome,
) -> Result<(), PipelineError> {
    match ctx.store.record_completion(media_id, outcome).await {
        Ok(()) => Ok(()),
        Err(e) if e.is_transient() => {
            warn!("Persisting analysis of {media_id} failed, retrying once: {e}");
            ctx.store
                .record_completion(media_id, outcome)
                .await
                .map_err(PipelineError::Persistence)
        }
        Err(e) => Err(PipelineError::Persistence(e)),
    }
}

async fn fail(
    ctx: &WorkerContext,
    media_id: Uuid,
    message: &str,
) -> Result<UploadOutcome, StoreError> {
    warn!("Analysis of {media_id} failed: {message}");
    ctx.store.record_failure(media_id, message).await?;
    emit_analyzed(ctx, media_id, 0, AnalysisStatus::Failed).await;
    Ok(UploadOutcome::Failed {
        message: message.to_owned(),
    })
}

/// Step 7: every terminal transition is announced, failures included. A
/// lost notification only delays downstream consumers, so it is logged and
/// swallowed.
async fn emit_analyzed(
    ctx: &WorkerContext,
    media_id: Uuid,
    face_count: i32,
    status: AnalysisStatus,
) {
    let event = PhotoAnalyzed {
        photo_id: media_id,
        face_count,
        status,
    };
    if let Err(e) = publish_event(ctx.events.as_ref(), CHANNEL_PHOTO_ANALYZED, &event).await {
        warn!("Failed to publish analyzed event for {media_id}: {e}");
    }
}

/// Cancel an operation that outlives its budget; a stalled collaborator
/// must not hold the PROCESSING claim indefinitely.
async fn bounded<T, E, F>(
    limit: Duration,
    step: &'static str,
    fut: F,
    wrap: impl FnOnce(E) -> PipelineError,
) -> Result<T, PipelineError>
where
    F: Future<Output = Result<T, E>>,
{
    match timeout(limit, fut).await {
        Ok(result) => result.map_err(wrap),
        Err(_) => Err(PipelineError::Timeout { step }),
    }
}

/// Bounded retries with exponential backoff for possibly-transient step
/// failures; anything non-transient (a corrupt image, a traversal attempt)
/// fails immediately.
async fn with_retries<T, F, Fut>(
    worker: &WorkerSettings,
    step: &'static str,
    mut op: F,
) -> Result<T, PipelineError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, PipelineError>>,
{
    let mut attempt = 0;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) if e.is_transient() && attempt + 1 < worker.max_attempts => {
                let delay = backoff_seconds(attempt);
                warn!(
                    "{step} failed (attempt {}/{}): {e}; retrying in {delay}s",
                    attempt + 1,
                    worker.max_attempts
                );
                #[allow(clippy::cast_sign_loss)]
                sleep(Duration::from_secs(delay as u64)).await;
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}
