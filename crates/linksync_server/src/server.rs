//! Router assembly and server lifecycle.

use crate::error::{ServerError, ServerResult};
use crate::handler;
use crate::state::AppState;
use axum::routing::{get, post};
use axum::Router;
use linksync_sync_engine::{LoadOutcome, SyncScheduler};
use std::future::Future;
use tokio::net::TcpListener;
use tracing::{info, warn};

/// Builds the router with every route bound to `state`.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handler::health))
        .route("/links", get(handler::list_links).post(handler::create_link))
        .route("/links/reorder", post(handler::reorder_links))
        .route(
            "/links/{id}",
            get(handler::get_link)
                .put(handler::update_link)
                .delete(handler::delete_link),
        )
        .route("/sync", post(handler::trigger_sync))
        .route("/sync/reload", post(handler::reload_from_remote))
        .route("/sync/status", get(handler::sync_status))
        .route("/sync/stats", get(handler::sync_stats))
        .route(
            "/sync/logs",
            get(handler::list_logs).delete(handler::clear_logs),
        )
        .route("/sync/last-change", get(handler::last_change))
        .fallback(handler::not_found)
        .with_state(state)
}

/// Loads the remote collection, starts the periodic sync, and serves HTTP
/// until `shutdown` resolves.
///
/// # Errors
///
/// Returns an error if the listener cannot bind, the initial load fails to
/// persist, or the server fails.
pub async fn serve(
    state: AppState,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> ServerResult<()> {
    let engine = state.engine.clone();
    let loaded = tokio::task::spawn_blocking(move || engine.initialize_from_remote())
        .await
        .map_err(|e| ServerError::Internal(format!("initial load task failed: {e}")))??;
    match loaded {
        LoadOutcome::Loaded { records } => info!(records, "initialized from remote store"),
        LoadOutcome::Degraded { local_records } => {
            warn!(local_records, "remote store unreachable, running local-only")
        }
        LoadOutcome::Skipped { .. } => {}
    }

    let scheduler = state
        .config
        .sync
        .sync_interval
        .map(|period| SyncScheduler::spawn(state.engine.clone(), period));

    let addr = state.config.bind_addr;
    let listener = TcpListener::bind(addr).await?;
    info!("Server running on {addr}");

    let result = axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown)
        .await;

    if let Some(scheduler) = scheduler {
        scheduler.shutdown().await;
    }
    info!("Server stopped");
    result.map_err(ServerError::from)
}

/// Resolves on Ctrl-C or SIGTERM.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
        info!("Received Ctrl+C, shutting down");
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                info!("Received terminate signal, shutting down");
            }
            Err(e) => {
                warn!(error = %e, "failed to install SIGTERM handler");
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
}
