use color_eyre::Result;
use common_services::database::get_db_pool;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    let settings = app_state::load_app_settings()?;
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(settings.logging.level.clone())),
        )
        .init();

    let pool = get_db_pool(&settings, true).await?;
    api::serve(pool, settings).await
}
