//! Timetables endpoint
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET` | `/api/timetables` | Latest snapshot, or 503 before the first refresh |
//!
//! Handlers only ever read the [`SnapshotStore`]; they never reach the
//! upstream.

use std::sync::Arc;

use axum::extract::State;
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;

use crate::cache::SnapshotStore;

/// Route of the snapshot endpoint
pub const TIMETABLES_PATH: &str = "/api/timetables";

/// Non-success responses of the API
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// No refresh has succeeded since the process started
    #[error("Data not available yet")]
    NotReady,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match self {
            Self::NotReady => StatusCode::SERVICE_UNAVAILABLE,
        };

        let body = serde_json::json!({ "error": self.to_string() });

        (status, Json(body)).into_response()
    }
}

/// `GET /api/timetables`
///
/// Responds `200 {"timestamp", "data"}` with the current snapshot, or
/// `503 {"error"}` while the store is still empty. Both carry
/// `Cache-Control: no-store`.
pub async fn get_timetables(State(store): State<Arc<SnapshotStore>>) -> Response {
    let mut response = match store.read() {
        Some(snapshot) => Json(&*snapshot).into_response(),
        None => ApiError::NotReady.into_response(),
    };

    // Freshness is governed by the refresh interval, not by HTTP caches
    response
        .headers_mut()
        .insert(header::CACHE_CONTROL, HeaderValue::from_static("no-store"));
    response
}
