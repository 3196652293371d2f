//! Session Timer - A tab-safe countdown/overtime timer service
//!
//! This is the main entry point for the session-timer application.

use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;

use session_timer::{
    api::create_router,
    config::Config,
    services::SessionClient,
    state::AppState,
    storage::{FileStorage, MemoryStorage, Storage},
    timer::SystemClock,
    utils::shutdown_signal,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::parse();

    // Initialize tracing with appropriate log level
    tracing_subscriber::fmt()
        .with_env_filter(format!("session_timer={},tower_http=info", config.log_level()))
        .init();

    info!("Starting session-timer server v{}", env!("CARGO_PKG_VERSION"));
    info!(
        "Configuration: host={}, port={}, default={}min",
        config.host, config.port, config.default_minutes
    );

    let storage: Arc<dyn Storage> = match &config.storage_dir {
        Some(dir) => {
            info!("Persisting timers under {}", dir.display());
            Arc::new(FileStorage::open(dir)?)
        }
        None => {
            info!("No storage directory given, timers live in memory");
            Arc::new(MemoryStorage::new())
        }
    };

    let session_client = config.session_base_url.as_deref().map(SessionClient::new);
    if session_client.is_none() {
        info!("No session site configured, end-session will navigate only");
    }

    // Create application state
    let state = Arc::new(AppState::new(
        storage,
        Arc::new(SystemClock),
        config.default_minutes,
        session_client,
    ));

    // Create HTTP router with all endpoints
    let app = create_router(state);

    // Bind to the specified address
    let addr = config.address();
    let listener = TcpListener::bind(&addr).await?;

    info!("Server running on http://{}", addr);
    info!("Endpoints:");
    info!("  POST   /tabs                       - Mount a timer for a tab");
    info!("  GET    /tabs/:id                   - Current timer snapshot");
    info!("  DELETE /tabs/:id                   - Unmount a tab");
    info!("  POST   /tabs/:id/start|pause|reset - Timer controls");
    info!("  GET    /status                     - Server status");
    info!("  GET    /health                     - Health check");

    // Setup graceful shutdown
    let server = axum::serve(listener, app);

    tokio::select! {
        result = server => {
            if let Err(e) = result {
                tracing::error!("Server error: {}", e);
            }
        }
        _ = shutdown_signal() => {
            info!("Shutdown signal received");
        }
    }

    info!("Server shutdown complete");
    Ok(())
}
