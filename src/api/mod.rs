//! Embedded HTTP control surface.
//!
//! A thin adapter over [`SessionManager`]: validation and response shaping
//! live here, every device effect goes through the ADB core. The surface is
//! deliberately unauthenticated and should only ever listen on interfaces
//! the operator controls.

mod control;
mod envelope;
mod system;
mod ui;

#[cfg(test)]
mod tests;

pub use envelope::{codes, Envelope};

use crate::connection::SessionManager;
use crate::error::AdbLinkError;
use axum::routing::{get, post};
use axum::Router;
use std::sync::Arc;

/// Shared state for route handlers.
pub(crate) type AppState = Arc<SessionManager>;

/// Build the API router over a session manager.
#[must_use]
pub fn router(manager: Arc<SessionManager>) -> Router {
    Router::new()
        .route("/v1/health", get(system::health))
        .route("/v1/system/info", get(system::info))
        .route("/v1/control/click", post(control::click))
        .route("/v1/control/swipe", post(control::swipe))
        .route("/v1/control/input", post(control::input))
        .route("/v1/ui/xml", post(ui::dump_xml))
        .route("/v1/ui/screenshot", post(ui::screenshot))
        .with_state(manager)
}

/// The HTTP server wrapping the router.
pub struct ApiServer {
    manager: Arc<SessionManager>,
    port: u16,
}

impl ApiServer {
    /// Create a server for the configured port.
    #[must_use]
    pub fn new(manager: Arc<SessionManager>, port: u16) -> Self {
        Self { manager, port }
    }

    /// Bind and serve until the process exits.
    ///
    /// # Errors
    ///
    /// Returns `Network` when the listen socket cannot be bound.
    pub async fn serve(self) -> Result<(), AdbLinkError> {
        let listener = tokio::net::TcpListener::bind(("0.0.0.0", self.port)).await?;
        tracing::info!("API listening on {}", listener.local_addr()?);

        axum::serve(listener, router(self.manager))
            .await
            .map_err(|e| AdbLinkError::Network {
                message: e.to_string(),
                source: Some(Box::new(e)),
            })
    }
}
