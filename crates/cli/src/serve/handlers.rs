//! HTTP route handlers.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;
use tracing::info;
use upline_core::{
    build_snapshot, emit, update_upline, ContactRecord, EmitOptions, UpdateError, UplineField,
};

use super::json_error;
use super::state::AppState;
use crate::manifest::compute_etag;

/// Fallback handler for unmatched routes.
pub(crate) async fn handle_not_found() -> impl IntoResponse {
    json_error(StatusCode::NOT_FOUND, "not found")
}

/// GET /health
pub(crate) async fn handle_health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let snapshot = state.snapshot().await;
    let response = serde_json::json!({
        "status": "ok",
        "format_version": upline_core::SNAPSHOT_FORMAT_VERSION,
        "contacts": snapshot.stats.total_contacts,
    });
    (StatusCode::OK, Json(response))
}

/// GET /snapshot?layout=tree|flat&synthetic=inline|flatten&omit_pipeline=bool
///
/// Sets an ETag over the emitted body and answers a matching
/// If-None-Match with 304.
pub(crate) async fn handle_snapshot(
    State(state): State<Arc<AppState>>,
    Query(options): Query<EmitOptions>,
    headers: HeaderMap,
) -> Response {
    let snapshot = state.snapshot().await;
    let rendered = tokio::task::spawn_blocking(move || {
        let body = emit(&snapshot, &options);
        compute_etag(&body).map(|etag| (body, etag))
    })
    .await;

    let (body, etag) = match rendered {
        Ok(Ok(pair)) => pair,
        Ok(Err(e)) => {
            return json_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                &format!("serialization error: {}", e),
            )
            .into_response()
        }
        Err(e) => return join_error(e),
    };
    let etag_quoted = format!("\"{}\"", etag);

    if let Some(inm) = headers.get(header::IF_NONE_MATCH) {
        if let Ok(inm_str) = inm.to_str() {
            if inm_str == etag_quoted || inm_str == etag {
                return StatusCode::NOT_MODIFIED.into_response();
            }
        }
    }

    let mut response = Json(body).into_response();
    if let Ok(val) = etag_quoted.parse() {
        response.headers_mut().insert(header::ETAG, val);
    }
    response
}

/// GET /issues
pub(crate) async fn handle_issues(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let snapshot = state.snapshot().await;
    let response = serde_json::json!({
        "issues": snapshot.issues.to_json(),
        "total": snapshot.issues.total(),
    });
    (StatusCode::OK, Json(response))
}

/// GET /stats
pub(crate) async fn handle_stats(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let snapshot = state.snapshot().await;
    (StatusCode::OK, Json(snapshot.stats))
}

/// GET /nodes/{id}
pub(crate) async fn handle_node(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Response {
    let snapshot = state.snapshot().await;
    let (Some(node), Some(chain)) = (snapshot.get(&id), snapshot.upline_chain(&id)) else {
        return json_error(StatusCode::NOT_FOUND, &format!("node '{}' not found", id))
            .into_response();
    };
    let response = serde_json::json!({
        "node": node,
        "upline_chain": chain,
    });
    (StatusCode::OK, Json(response)).into_response()
}

#[derive(Debug, Deserialize)]
pub(crate) struct UplineUpdateRequest {
    field: UplineField,
    /// `null` or blank clears the reference.
    #[serde(default)]
    value: Option<String>,
}

/// POST /contacts/{id}/upline
///
/// Rewrites one upline reference, rebuilds, and returns the new snapshot.
pub(crate) async fn handle_update_upline(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<UplineUpdateRequest>,
) -> Response {
    let _guard = state.rebuild.lock().await;
    let contacts = state.contacts().await;
    let value = req.value.filter(|v| !v.trim().is_empty());
    let field = req.field;

    let worker = Arc::clone(&state);
    let contact_id = id.clone();
    let result = tokio::task::spawn_blocking(move || {
        update_upline(
            &contacts,
            &contact_id,
            field,
            value.as_deref(),
            &worker.config,
        )
        .map(|(updated, snapshot)| {
            let body = emit(&snapshot, &EmitOptions::default());
            (updated, snapshot, body)
        })
    })
    .await;

    match result {
        Ok(Ok((updated, snapshot, body))) => {
            info!(contact = %id, field = field.as_str(), "upline reference updated");
            state.publish(updated, snapshot).await;
            (StatusCode::OK, Json(body)).into_response()
        }
        Ok(Err(UpdateError::UnknownContact(id))) => {
            json_error(StatusCode::NOT_FOUND, &format!("contact '{}' not found", id))
                .into_response()
        }
        Ok(Err(e)) => json_error(StatusCode::BAD_REQUEST, &e.to_string()).into_response(),
        Err(e) => join_error(e),
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct RefreshRequest {
    contacts: Vec<ContactRecord>,
}

/// POST /refresh
///
/// Replaces the whole contact list and rebuilds.
pub(crate) async fn handle_refresh(
    State(state): State<Arc<AppState>>,
    Json(req): Json<RefreshRequest>,
) -> Response {
    let _guard = state.rebuild.lock().await;
    let worker = Arc::clone(&state);
    let result = tokio::task::spawn_blocking(move || {
        build_snapshot(&req.contacts, &worker.config).map(|snapshot| (req.contacts, snapshot))
    })
    .await;

    match result {
        Ok(Ok((contacts, snapshot))) => {
            let snapshot = state.publish(contacts, snapshot).await;
            let response = serde_json::json!({
                "stats": snapshot.stats,
                "issues": snapshot.issues.counts(),
            });
            (StatusCode::OK, Json(response)).into_response()
        }
        Ok(Err(e)) => json_error(StatusCode::BAD_REQUEST, &e.to_string()).into_response(),
        Err(e) => join_error(e),
    }
}

/// A rebuild task panicked or was cancelled.
fn join_error(e: tokio::task::JoinError) -> Response {
    json_error(
        StatusCode::INTERNAL_SERVER_ERROR,
        &format!("task join error: {}", e),
    )
    .into_response()
}
