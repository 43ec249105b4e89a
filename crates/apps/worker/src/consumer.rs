use crate::context::WorkerContext;
use crate::handlers::handle_event;
use color_eyre::Result;
use common_services::events::{EventError, EventSource};
use std::sync::Arc;
use tracing::info;

/// Consume notifications until the source closes.
///
/// Events are handled one at a time; concurrency comes from running more
/// worker processes, serialized per photo by the claim in the state store.
pub async fn run_event_loop<S>(ctx: Arc<WorkerContext>, mut source: S) -> Result<()>
where
    S: EventSource,
{
    info!("🛠️ [Worker ID: {}] Listening for photo events.", ctx.worker_id);

    loop {
        match source.recv().await {
            Ok(event) => handle_event(&ctx, event).await,
            Err(EventError::Closed) => {
                info!("Event source closed, shutting down.");
                return Ok(());
            }
            Err(e) => return Err(e.into()),
        }
    }
}
