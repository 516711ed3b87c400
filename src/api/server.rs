//! Server lifecycle: binds the configured address, mounts the form
//! router, and runs until a shutdown signal arrives.

use std::sync::Arc;

use crate::api::router::{app_router, AppState};
use crate::config::AppConfig;
use crate::diagnosis::GeminiClient;

/// Run the form server to completion.
///
/// The vision client is built here, from the validated config, and
/// injected into the handlers; the credential never lives in global
/// state.
pub async fn serve(config: AppConfig) -> Result<(), String> {
    let vision = Arc::new(GeminiClient::new(&config.api_key, &config.model));
    let state = AppState::new(&config, vision);

    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .map_err(|e| format!("Failed to bind {}: {e}", config.bind_addr))?;
    let addr = listener
        .local_addr()
        .map_err(|e| format!("Failed to get server address: {e}"))?;

    tracing::info!(%addr, model = %config.model, "Foliar listening");

    axum::serve(listener, app_router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| format!("Server error: {e}"))
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_err() {
        tracing::warn!("Cannot listen for the shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
