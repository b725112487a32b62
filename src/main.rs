use academy_bot::{
    bot,
    config::{Settings, database},
    errors::Result,
};
use dotenvy::dotenv;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // 1. Initialize tracing (as early as possible)
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // 2. Load .env file; variables may also be set externally
    if dotenv().is_ok() {
        info!("Loaded .env file.");
    }

    // 3. Load settings; a missing token or bad value ends the process here
    let settings = Settings::load()
        .inspect_err(|e| error!("Failed to load settings: {}", e))
        .map(Arc::new)?;

    // 4. Open the link store
    let db = database::create_connection(&settings.database_url)
        .await
        .inspect_err(|e| error!("Failed to connect to database: {}", e))?;
    database::create_tables(&db)
        .await
        .inspect(|()| info!("Database initialized successfully."))
        .inspect_err(|e| error!("Failed to initialize database: {}", e))?;

    // 5. Run the bot until it disconnects or a restart is requested
    bot::run_bot(settings, db).await?;

    info!("Exiting; the supervisor is expected to relaunch the bot.");
    Ok(())
}
