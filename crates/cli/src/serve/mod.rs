//! `upline serve` -- HTTP JSON API over a live hierarchy snapshot.
//!
//! Loads a contact file at startup, resolves it once, and serves the
//! result using `axum` + `tokio`. Mutations rebuild from scratch on a
//! copy of the contact list and swap the finished snapshot in, so readers
//! always see a complete build.
//!
//! Endpoints:
//! - GET  /health                 - Server status
//! - GET  /snapshot               - Emitted snapshot with ETag / If-None-Match
//! - GET  /issues                 - Issues report
//! - GET  /stats                  - Aggregate stats
//! - GET  /nodes/{id}             - One node plus its upline chain
//! - POST /contacts/{id}/upline   - Rewrite an upline reference and rebuild
//! - POST /refresh                - Replace the contact list and rebuild
//!
//! All responses use Content-Type: application/json.

mod handlers;
mod state;

use std::path::PathBuf;
use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::http::{Method, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use self::handlers::{
    handle_health, handle_issues, handle_node, handle_not_found, handle_refresh,
    handle_snapshot, handle_stats, handle_update_upline,
};
use self::state::AppState;
use crate::input::{self, ConfigArgs};

/// Maximum request body size: 10 MB.
const MAX_BODY_SIZE: usize = 10 * 1024 * 1024;

/// Construct a JSON error response with the given status code and message.
fn json_error(status: StatusCode, message: &str) -> impl IntoResponse {
    (status, Json(serde_json::json!({"error": message})))
}

fn build_router(state: Arc<AppState>) -> Router {
    // Permissive CORS; the UI is served from another origin.
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers(Any);

    Router::new()
        .route("/health", get(handle_health))
        .route("/snapshot", get(handle_snapshot))
        .route("/issues", get(handle_issues))
        .route("/stats", get(handle_stats))
        .route("/nodes/{id}", get(handle_node))
        .route("/contacts/{id}/upline", post(handle_update_upline))
        .route("/refresh", post(handle_refresh))
        .fallback(handle_not_found)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(DefaultBodyLimit::max(MAX_BODY_SIZE))
        .with_state(state)
}

/// Load `contacts_path`, build the first snapshot, and serve on `port`.
pub async fn start_server(
    port: u16,
    contacts_path: PathBuf,
    config_args: ConfigArgs,
) -> Result<(), Box<dyn std::error::Error>> {
    let file = input::read_contacts(&contacts_path)?;
    let config = input::load_config(&config_args)?;
    let snapshot = upline_core::build_snapshot(&file.contacts, &config)?;
    info!(
        path = %contacts_path.display(),
        contacts = snapshot.stats.total_contacts,
        "contacts loaded"
    );

    let state = Arc::new(AppState::new(config, file.contacts, snapshot));
    let app = build_router(state);

    let addr = format!("0.0.0.0:{}", port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("upline server listening on http://{}", addr);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("server shut down");
    Ok(())
}

/// Wait for a shutdown signal (Ctrl+C).
async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_err() {
        // No signal handler available; run until killed.
        std::future::pending::<()>().await;
    }
    info!("received shutdown signal");
}
