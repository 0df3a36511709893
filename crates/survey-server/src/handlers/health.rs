//! Liveness probe that also checks the storage engine answers.

use axum::{
  Json,
  extract::State,
  http::StatusCode,
  response::{IntoResponse, Response},
};
use serde_json::json;
use survey_core::store::RecordBackend;

use crate::AppState;

/// `GET /health`
pub async fn handler<B>(State(state): State<AppState<B>>) -> Response
where
  B: RecordBackend + Clone + 'static,
{
  match state.store.ping().await {
    Ok(()) => (StatusCode::OK, Json(json!({ "status": "ok" }))).into_response(),
    Err(e) => {
      tracing::error!(error = %e, "health check failed");
      (
        StatusCode::SERVICE_UNAVAILABLE,
        Json(json!({ "status": "unavailable" })),
      )
        .into_response()
    }
  }
}
