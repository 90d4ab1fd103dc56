//! Observer API server startup.

use std::sync::Arc;

use tracing::info;

use crate::router::build_router;
use crate::state::AppState;

/// Errors that can occur starting the server.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// The bind address could not be claimed.
    #[error("failed to bind {addr}: {source}")]
    Bind {
        /// The requested address.
        addr: String,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// The server loop terminated with an error.
    #[error("server error: {0}")]
    Serve(std::io::Error),
}

/// Bind and serve the Observer API until the process ends.
///
/// Runs as a background task beside the simulation loop; the engine
/// pushes into `state` after every committed day.
///
/// # Errors
///
/// Returns [`ServerError`] if binding or serving fails.
pub async fn serve(addr: &str, state: Arc<AppState>) -> Result<(), ServerError> {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|source| ServerError::Bind {
            addr: addr.to_owned(),
            source,
        })?;
    info!(addr, "observer API listening");
    axum::serve(listener, build_router(state))
        .await
        .map_err(ServerError::Serve)
}
