//! Per-channel event handlers.

use crate::context::WorkerContext;
use crate::pipeline::process_upload;
use common_services::events::IncomingEvent;
use common_types::{
    CHANNEL_PHOTO_DELETED, CHANNEL_PHOTO_UPLOADED, PhotoDeleted, PhotoUploaded,
};
use tracing::{error, info, warn};

/// Dispatch one notification. Handler errors are logged, never propagated:
/// a bad event must not take the consumer loop down, and at-least-once
/// delivery means a redelivery can still succeed later.
pub async fn handle_event(ctx: &WorkerContext, event: IncomingEvent) {
    match event.channel.as_str() {
        CHANNEL_PHOTO_UPLOADED => match serde_json::from_str::<PhotoUploaded>(&event.payload) {
            Ok(uploaded) => handle_uploaded(ctx, &uploaded).await,
            Err(e) => warn!("Ignoring malformed {CHANNEL_PHOTO_UPLOADED} payload: {e}"),
        },
        CHANNEL_PHOTO_DELETED => match serde_json::from_str::<PhotoDeleted>(&event.payload) {
            Ok(deleted) => handle_deleted(ctx, &deleted).await,
            Err(e) => warn!("Ignoring malformed {CHANNEL_PHOTO_DELETED} payload: {e}"),
        },
        other => warn!("Ignoring notification on unexpected channel {other}"),
    }
}

async fn handle_uploaded(ctx: &WorkerContext, event: &PhotoUploaded) {
    info!("Processing upload of {}", event.photo_id);
    if let Err(e) = process_upload(ctx, event).await {
        // Claim bookkeeping itself failed; the claim was not consumed and
        // a redelivered event will retry.
        error!("Could not process upload of {}: {e}", event.photo_id);
    }
}

async fn handle_deleted(ctx: &WorkerContext, event: &PhotoDeleted) {
    info!("Deleting analysis records of {}", event.photo_id);
    if let Err(e) = ctx.store.delete_media_records(event.photo_id).await {
        error!("Could not delete records of {}: {e}", event.photo_id);
    }
}
