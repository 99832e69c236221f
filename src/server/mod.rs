//! # HTTP API
//!
//! JSON endpoints over the matching pipeline and the renderer.
//!
//! ## Usage
//!
//! ```bash
//! memesmith serve --listen 0.0.0.0:8080
//! ```
//!
//! | Method | Path | Response |
//! |--------|------|----------|
//! | GET | `/api/templates` | `{ fetchedAt, templates }` |
//! | POST | `/api/match` | `MatchResult` |
//! | POST | `/api/render` | `image/png` |
//! | GET | `/api/templates/:id/thumbnail?top=&bottom=` | `image/png` (300×300) |
//! | POST | `/api/caption` | `{ url, pageUrl }` |
//!
//! Errors come back as `{ "success": false, "error": "..." }`.

mod handlers;
mod state;

pub use state::AppState;

use axum::{
    Router,
    routing::{get, post},
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::error::MemeError;

/// Build the API router over shared state.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/templates", get(handlers::templates::list))
        .route(
            "/api/templates/:id/thumbnail",
            get(handlers::templates::thumbnail),
        )
        .route("/api/match", post(handlers::matching::run))
        .route("/api/render", post(handlers::render::render))
        .route("/api/caption", post(handlers::caption::caption))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Start the HTTP server.
///
/// ## Example
///
/// ```no_run
/// use std::sync::Arc;
/// use memesmith::{config::Config, server::{serve, AppState}};
///
/// # async fn example() -> Result<(), memesmith::error::MemeError> {
/// let config = Config::from_env()?;
/// let state = Arc::new(AppState::from_config(&config)?);
/// serve(state, &config.listen_addr).await?;
/// # Ok(())
/// # }
/// ```
pub async fn serve(state: Arc<AppState>, listen_addr: &str) -> Result<(), MemeError> {
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(listen_addr)
        .await
        .map_err(|e| MemeError::Transport(format!("Failed to bind to {}: {}", listen_addr, e)))?;
    tracing::info!(%listen_addr, "memesmith HTTP server listening");

    axum::serve(listener, app)
        .await
        .map_err(|e| MemeError::Transport(format!("Server error: {}", e)))?;

    Ok(())
}
