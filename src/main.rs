use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tracing::info;
use tracing_subscriber::EnvFilter;

use sqlscout::database::{DatabaseMode, SqlDatabase};
use sqlscout::error::Result;
use sqlscout::llm::LlmClient;
use sqlscout::server::{router, AppState};
use sqlscout::settings::Settings;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let settings = Settings::load()?;
    let search = settings.search_config()?;

    // Backend unavailability here is a fatal configuration error; the
    // search core itself never sees a database it cannot introspect.
    let db = SqlDatabase::open(DatabaseMode::File(PathBuf::from(&settings.database.path)))?;
    let schema = db.introspect_schema()?;
    info!(
        database = %settings.database.path,
        tables = schema.len(),
        "schema introspected"
    );

    let llm = LlmClient::new(
        settings.llm.endpoint.clone(),
        settings.llm.model.clone(),
        Duration::from_secs(settings.llm.timeout_secs),
    );

    let state = Arc::new(AppState {
        db: Arc::new(db),
        llm: Arc::new(llm),
        schema,
        search,
    });

    let app = router(state);
    let listener = tokio::net::TcpListener::bind(&settings.server.bind)
        .await
        .map_err(|e| sqlscout::error::ScoutError::Config(format!("bind failed: {e}")))?;
    info!(bind = %settings.server.bind, "listening");
    axum::serve(listener, app)
        .await
        .map_err(|e| sqlscout::error::ScoutError::Config(format!("server error: {e}")))?;
    Ok(())
}
