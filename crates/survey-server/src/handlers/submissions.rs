//! Public handlers used by the intake form.

use axum::{
  Json,
  extract::{Path, State, rejection::JsonRejection},
  http::StatusCode,
  response::IntoResponse,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use survey_core::{
  record::{Submission, Submitted, SurveyFields, SurveyRecord},
  store::RecordBackend,
};

use crate::{AppState, client::ClientMeta, error::ApiError};

// ─── Submit ───────────────────────────────────────────────────────────────────

/// JSON body accepted by `POST /api/survey`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitBody {
  /// Missing or `null` is treated like blank and rejected by the store.
  #[serde(default)]
  pub store_identifier: Option<String>,
  #[serde(flatten)]
  pub fields:           SurveyFields,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitResponse {
  pub status:            &'static str,
  pub id:                i64,
  pub timestamp:         DateTime<Utc>,
  pub update_count:      i64,
  pub remaining_updates: i64,
}

/// `POST /api/survey`: 201 when a record is created, 200 when revised.
pub async fn submit<B>(
  State(state): State<AppState<B>>,
  ClientMeta(meta): ClientMeta,
  body: Result<Json<SubmitBody>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError>
where
  B: RecordBackend + Clone + 'static,
{
  let Json(body) = body?;
  let submission =
    Submission::new(body.store_identifier.unwrap_or_default(), body.fields).with_meta(meta);
  let outcome = state.store.submit(submission).await?;
  let receipt = *outcome.receipt();

  let (status, label) = match outcome {
    Submitted::Created(_) => (StatusCode::CREATED, "created"),
    Submitted::Updated(_) => (StatusCode::OK, "updated"),
  };
  tracing::info!(
    id = receipt.id,
    update_count = receipt.update_count,
    "survey {label}"
  );

  Ok((
    status,
    Json(SubmitResponse {
      status:            label,
      id:                receipt.id,
      timestamp:         receipt.timestamp,
      update_count:      receipt.update_count,
      remaining_updates: receipt.remaining_updates(),
    }),
  ))
}

// ─── Status ───────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusResponse {
  pub exists:            bool,
  pub update_count:      i64,
  pub remaining_updates: i64,
}

/// `GET /api/survey/{identifier}/status`
pub async fn status<B>(
  State(state): State<AppState<B>>,
  Path(identifier): Path<String>,
) -> Result<Json<StatusResponse>, ApiError>
where
  B: RecordBackend + Clone + 'static,
{
  let status = state.store.status(&identifier).await?;
  Ok(Json(StatusResponse {
    exists:            status.exists,
    update_count:      status.update_count,
    remaining_updates: status.remaining_updates(),
  }))
}

// ─── Pre-fill ─────────────────────────────────────────────────────────────────

/// What a returning submitter sees: their answers, without audit metadata.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PrefillView {
  pub store_identifier:  String,
  pub update_count:      i64,
  pub remaining_updates: i64,
  pub timestamp:         DateTime<Utc>,
  #[serde(flatten)]
  pub fields:            SurveyFields,
}

impl From<SurveyRecord> for PrefillView {
  fn from(r: SurveyRecord) -> Self {
    Self {
      remaining_updates: (survey_core::record::MAX_UPDATES - r.update_count).max(0),
      store_identifier:  r.store_identifier,
      update_count:      r.update_count,
      timestamp:         r.timestamp,
      fields:            r.fields,
    }
  }
}

/// `GET /api/survey/{identifier}`: 404 if the store never submitted.
pub async fn prefill<B>(
  State(state): State<AppState<B>>,
  Path(identifier): Path<String>,
) -> Result<Json<PrefillView>, ApiError>
where
  B: RecordBackend + Clone + 'static,
{
  let record = state.store.fetch(&identifier).await?;
  Ok(Json(PrefillView::from(record)))
}
