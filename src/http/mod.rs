/*!
 * HTTP Query Surface
 * Entries API consumed by the dashboard and by remote live-tail sources
 */

mod error;
pub mod handlers;
mod params;

pub use error::ApiError;
pub use handlers::AppState;

use crate::store::SharedStore;
use axum::routing::{delete, get, patch, post};
use axum::Router;
use handlers::*;
use std::future::Future;
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tokio::signal;
use tracing::{info, warn};

/// Build the entries API router over `store`
pub fn router(store: SharedStore) -> Router {
    Router::new()
        .route("/entries", delete(handle_clear))
        .route("/entries/cursor", get(handle_cursor))
        .route("/entries/latest-sequence", get(handle_latest_sequence))
        .route("/entries/check-new", get(handle_check_new))
        .route("/entries/:id/resolve", patch(handle_resolve))
        .route("/entries/:id/unresolve", patch(handle_unresolve))
        .route("/tags/entry/:id", post(handle_add_tags).delete(handle_remove_tags))
        .route("/-/healthy", get(handle_healthy))
        .with_state(AppState::new(store))
}

/// Serve `app` on `addr` until `shutdown` resolves
pub async fn serve(
    addr: SocketAddr,
    app: Router,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> std::io::Result<()> {
    let listener = TcpListener::bind(addr).await?;
    info!(addr = %listener.local_addr()?, "Entries API listening");
    axum::serve(listener, app).with_graceful_shutdown(shutdown).await?;
    info!("Entries API shut down gracefully");
    Ok(())
}

/// Resolves on SIGINT or SIGTERM
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "Failed to install Ctrl+C handler");
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
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received SIGINT, starting graceful shutdown"),
        _ = terminate => info!("Received SIGTERM, starting graceful shutdown"),
    }
}
