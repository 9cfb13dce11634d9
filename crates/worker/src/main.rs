use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::signal;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use preprocessing_core::{
    read_config, ActivityRegistry, BagCreateActivity, HistoryStore, InMemoryHistoryStore,
    PreprocessingWorkflow, SqliteHistoryStore, Worker,
};
use preprocessing_worker::{api::create_router, logging, state::AppState};

/// Application version
const VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        // The subscriber may not be installed yet.
        eprintln!("Fatal error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    // Explicit config file, otherwise search the default locations
    let config_path = std::env::var_os("PREPROCESSING_CONFIG").map(PathBuf::from);
    let loaded = read_config(config_path.as_deref()).context("Failed to load configuration")?;
    let config = loaded.config;

    // Initialize logging
    tracing_subscriber::registry()
        .with(logging::env_filter(config.debug, config.verbosity))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!(version = VERSION, path = %loaded.path.display(), "Configuration loaded");
    info!(
        namespace = %config.temporal.namespace,
        task_queue = %config.temporal.task_queue,
        workflow = %config.temporal.workflow_name,
        "Serving workflow"
    );

    // Activities
    let bag_create = BagCreateActivity::from_config(&config.bagit);
    info!(algorithm = %bag_create.algorithm(), "Bag creation activity registered");
    let mut registry = ActivityRegistry::new();
    registry.register(bag_create);

    // Run history
    let history: Arc<dyn HistoryStore> = match &config.worker.history_path {
        Some(path) => {
            info!("History database: {:?}", path);
            Arc::new(SqliteHistoryStore::new(path).context("Failed to open history database")?)
        }
        None => {
            info!("No history path configured, keeping run history in memory");
            Arc::new(InMemoryHistoryStore::new())
        }
    };

    let max_sessions = usize::try_from(config.worker.max_concurrent_sessions)
        .context("Invalid maxConcurrentSessions")?;
    let worker = Arc::new(Worker::new(
        PreprocessingWorkflow::new(&config.shared_path),
        registry,
        history,
        max_sessions,
    ));
    info!(max_sessions, shared_path = %config.shared_path, "Worker started");

    let address = config.temporal.address.clone();
    let state = Arc::new(AppState::new(config, Arc::clone(&worker)));
    let app = create_router(state);

    info!("Starting server on {}", address);
    let listener = tokio::net::TcpListener::bind(&address)
        .await
        .with_context(|| format!("Failed to bind to {}", address))?;

    // Run server with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    worker.shutdown();
    info!("Worker stopped");

    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}
