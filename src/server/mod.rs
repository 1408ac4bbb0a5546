//! HTTP surface: document submission and the benefit read path.

mod routes;
mod state;

use anyhow::{Context, Result};
use tokio_util::sync::CancellationToken;
use tracing::info;

pub use routes::router;
pub use state::ServerState;

/// Bind and serve until the shutdown token is cancelled.
pub async fn run_server(state: ServerState, port: u16, shutdown: CancellationToken) -> Result<()> {
    let app = router(state);
    let listener = tokio::net::TcpListener::bind(("0.0.0.0", port))
        .await
        .with_context(|| format!("Failed to bind port {}", port))?;

    info!("Serving on port {}", port);
    axum::serve(listener, app)
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await
        .context("Server error")
}
