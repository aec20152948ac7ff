// GET handlers: version, stored snapshots, long-poll middleware

use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::{IntoResponse, Response},
};
use bytes::Bytes;
use std::time::Duration;

use super::AppState;
use crate::store::{StoreKey, WaitOutcome};
use crate::version::{NAME, VERSION};

/// GET /v0/version: service name and version (from Cargo.toml at build time).
pub(super) async fn version_handler() -> impl IntoResponse {
    axum::Json(serde_json::json!({
        "name": NAME,
        "version": VERSION,
    }))
}

/// Stored JSON for `key` as is; `{}` until the first value is written.
pub(super) async fn snapshot_handler(State(state): State<AppState>, key: StoreKey) -> Response {
    let body = state
        .store
        .get(key)
        .unwrap_or_else(|| Bytes::from_static(b"{}"));
    ([(header::CONTENT_TYPE, "application/json")], body).into_response()
}

/// Hold the request until the store is updated or the long-polling timeout elapses.
pub(super) async fn long_poll(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let timeout = Duration::from_secs(state.config.server.long_polling_timeout_secs);
    let outcome = state.store.wait(timeout).await;
    if outcome == WaitOutcome::TimedOut {
        tracing::trace!(uri = %request.uri(), "long poll timed out");
    }
    next.run(request).await
}
