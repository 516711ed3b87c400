pub mod api;
pub mod config;
pub mod diagnosis;
pub mod feedback;
pub mod pipeline;
pub mod session;

use tracing_subscriber::EnvFilter;

pub fn run() {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .init();

    tracing::info!("Foliar starting v{}", config::APP_VERSION);

    let config = match config::AppConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("Configuration error: {e}");
            std::process::exit(1);
        }
    };

    if let Err(e) = config.ensure_directories() {
        tracing::error!("Cannot create data directories: {e}");
        std::process::exit(1);
    }

    let runtime = tokio::runtime::Runtime::new().expect("Failed to start async runtime");
    if let Err(e) = runtime.block_on(api::server::serve(config)) {
        tracing::error!("Server error: {e}");
        std::process::exit(1);
    }
}
