use clap::Parser;
use color_eyre::Result;
use common_services::database::get_db_pool;
use common_services::database::stores::PgStateStore;
use common_services::events::PgEventSource;
use common_services::state::StateStore;
use common_types::{CHANNEL_PHOTO_DELETED, CHANNEL_PHOTO_UPLOADED};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;
use worker::consumer::run_event_loop;
use worker::context::WorkerContext;

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Release stale PROCESSING claims and exit without consuming events.
    #[clap(long, default_value_t = false, action)]
    sweep_only: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let args = Args::parse();

    let settings = app_state::load_app_settings()?;
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(settings.logging.level.clone())),
        )
        .init();

    let pool = get_db_pool(&settings, true).await?;

    // Claims orphaned by a crashed worker become visible FAILED rows,
    // eligible for re-claim.
    let store = PgStateStore::new(pool.clone());
    let released = store
        .release_stale_claims(settings.worker.stale_claim_age())
        .await?;
    if released > 0 {
        info!("Released {released} stale claim(s).");
    }
    if args.sweep_only {
        return Ok(());
    }

    let source =
        PgEventSource::connect(&pool, &[CHANNEL_PHOTO_UPLOADED, CHANNEL_PHOTO_DELETED]).await?;
    let context = WorkerContext::from_pool(pool, settings)?;

    run_event_loop(Arc::new(context), source).await
}
