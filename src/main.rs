use std::fs::OpenOptions;
use std::sync::{Arc, Mutex};

use anyhow::Context;
use scoring_api::config::Config;
use scoring_api::handlers::AppState;
use scoring_api::methods::MethodRouter;
use scoring_api::scoring::MemoryStore;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Main entry point for the application.
///
/// This function initializes the application, including:
/// - Configuration loading.
/// - Logging and tracing (stderr, or `LOG_FILE` when set).
/// - The in-memory store and its score cache.
/// - HTTP routes and middleware.
///
/// It then starts the Axum server and stops it on Ctrl-C.
///
/// # Returns
///
/// * `anyhow::Result<()>` - Ok if the server runs successfully, or an error if initialization fails.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    let config = Config::from_env()?;

    // Initialize tracing
    init_tracing(&config)?;
    tracing::info!("Configuration loaded successfully");
    tracing::debug!(
        "Store timeout: {:?}, score cache TTL: {:?}",
        config.store_timeout,
        config.score_cache_ttl
    );

    // Score cache plus optional interests seed
    let mut store = MemoryStore::new(config.score_cache_ttl);
    if let Some(ref path) = config.interests_file {
        let interests = MemoryStore::load_interests(path).await?;
        tracing::info!(
            "Loaded interests for {} client(s) from {}",
            interests.len(),
            path.display()
        );
        store = store.with_interests(interests);
    }

    // Build application state
    let app_state = Arc::new(AppState {
        methods: MethodRouter::new(Arc::new(store), config.store_timeout),
        config: config.clone(),
    });

    let app = scoring_api::app(app_state);

    // Start server
    let addr = config.bind_address();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    tracing::info!("Starting server at {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

fn init_tracing(config: &Config) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "scoring_api=debug,tower_http=debug".into());
    let registry = tracing_subscriber::registry().with(filter);

    match config.log_file {
        Some(ref path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file {}", path.display()))?;
            registry
                .with(
                    tracing_subscriber::fmt::layer()
                        .with_ansi(false)
                        .with_writer(Mutex::new(file)),
                )
                .init();
        }
        None => registry.with(tracing_subscriber::fmt::layer()).init(),
    }

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
}
