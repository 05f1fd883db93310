use anyhow::Result;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{info, warn};

use calc_assist_server::config::Settings;
use calc_assist_server::services::LlmService;
use calc_assist_server::{build_router, logging, AppState};

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration
    let settings = Settings::load()?;

    // Initialize logging
    let _log_guard = logging::init(&settings.logging);
    info!("🚀 Starting calculator assist server...");

    if settings.llm.api_key.is_none() {
        warn!("No LLM API key configured (llm.api_key / OPENAI_API_KEY)");
    }

    let llm = Arc::new(LlmService::new(settings.llm.clone()));
    let state = AppState::new(settings.clone(), llm);

    state.firmware_store.ensure_dir().await?;
    info!("✅ Firmware directory ready at {}", state.firmware_store.directory().display());

    // Surface a broken store file early; every request reloads it anyway
    match state.sessions.store().load().await {
        Ok(()) => info!(
            "✅ Session store loaded ({} sessions)",
            state.sessions.active_sessions()
        ),
        Err(e) => warn!("Session store not readable at startup: {}", e),
    }

    let app = build_router(state);

    let addr = SocketAddr::from((
        settings.server.host.parse::<std::net::IpAddr>()?,
        settings.server.port,
    ));

    info!("🎯 Server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
