//! Serve command - Starts the HTTP server and the stats poller.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::api::{create_router, AppState};
use crate::cli::args::ServeArgs;
use crate::config::Config;
use crate::errors::{AppError, AppResult};
use crate::infra::Database;

/// Execute the serve command
pub async fn execute(args: ServeArgs, mut config: Config) -> AppResult<()> {
    if let Some(host) = args.host {
        config.server_host = host;
    }
    if let Some(port) = args.port {
        config.server_port = port;
    }

    tracing::info!("Starting server...");

    let db = Arc::new(Database::connect(&config).await?);
    tracing::info!("Database connected");

    let (app_state, services) = AppState::from_config(db, &config)?;

    let shutdown = CancellationToken::new();
    let poller = if args.no_poller {
        tracing::warn!("Stats poller disabled; gateway load will not be refreshed");
        None
    } else {
        Some(services.stats_poller().spawn(shutdown.clone()))
    };

    let app = create_router(app_state);

    let addr = config.server_addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| AppError::internal(format!("Failed to bind to {}: {}", addr, e)))?;

    tracing::info!("Server running on http://{}", addr);

    let served = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(shutdown.clone()))
        .await
        .map_err(|e| AppError::internal(format!("Server error: {}", e)));

    // Stop the poller even when the server exits with an error
    shutdown.cancel();
    if let Some(handle) = poller {
        if let Err(e) = handle.await {
            tracing::error!(error = %e, "Stats poller task failed");
        }
    }

    tracing::info!("Server stopped");
    served
}

/// Resolves on Ctrl-C or when `shutdown` is cancelled elsewhere.
async fn shutdown_signal(shutdown: CancellationToken) {
    tokio::select! {
        result = tokio::signal::ctrl_c() => {
            if let Err(e) = result {
                tracing::error!(error = %e, "Failed to listen for Ctrl-C");
                // Without a signal handler, wait for an explicit cancel
                shutdown.cancelled().await;
            }
            tracing::info!("Received shutdown signal");
        }
        _ = shutdown.cancelled() => {}
    }
}
