use std::sync::Arc;

use vendas_core::{Config, DriveClient, GeminiClient, SheetStore};

mod routes;

use routes::AppState;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let config = Config::from_env();

    let drive = DriveClient::new(config.drive_token.clone(), config.drive_folder_id.clone());
    if !drive.is_configured() {
        log::warn!("drive credentials not configured; starting with an empty spreadsheet set");
    }
    let store = Arc::new(SheetStore::new(drive));

    let gateway = config
        .gemini_api_key
        .as_deref()
        .map(|key| GeminiClient::new(key, &config.gemini_model, config.request_timeout));
    if gateway.is_none() {
        log::warn!("GEMINI_API_KEY not set; analyze requests will fail until it is configured");
    }

    let state = AppState {
        store,
        llm: gateway,
        policy: config.context_policy,
        max_context_bytes: config.max_context_bytes,
    };

    let app = routes::router(state, &config.allowed_origins);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    log::info!("listening on http://{}", config.bind_addr);
    axum::serve(listener, app).await?;

    Ok(())
}
