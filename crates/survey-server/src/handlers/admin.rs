//! Admin-only read and export handlers.

use axum::{
  Json,
  extract::{Path, Query, State},
  http::header,
  response::IntoResponse,
};
use chrono::Utc;
use serde::Deserialize;
use survey_core::{
  record::SurveyRecord,
  store::{Page, PageRequest, RecordBackend},
};

use crate::{AppState, auth::Admin, error::ApiError, export};

// ─── List ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize, Default)]
pub struct ListParams {
  /// Clamped to `1..=1000`; defaults to 100.
  pub limit:  Option<i64>,
  /// Negative values are treated as 0.
  pub offset: Option<i64>,
}

/// `GET /api/admin/surveys[?limit=...][&offset=...]`, most recent first.
pub async fn list<B>(
  _admin: Admin,
  State(state): State<AppState<B>>,
  Query(params): Query<ListParams>,
) -> Result<Json<Page>, ApiError>
where
  B: RecordBackend + Clone + 'static,
{
  let page = state
    .store
    .list(PageRequest::clamped(params.limit, params.offset))
    .await?;
  Ok(Json(page))
}

// ─── Get one ──────────────────────────────────────────────────────────────────

/// `GET /api/admin/surveys/{identifier}`: full record including metadata.
pub async fn get_one<B>(
  _admin: Admin,
  State(state): State<AppState<B>>,
  Path(identifier): Path<String>,
) -> Result<Json<SurveyRecord>, ApiError>
where
  B: RecordBackend + Clone + 'static,
{
  Ok(Json(state.store.fetch(&identifier).await?))
}

// ─── Export ───────────────────────────────────────────────────────────────────

/// `GET /api/admin/export`: every record as a CSV attachment, oldest first.
pub async fn export<B>(
  _admin: Admin,
  State(state): State<AppState<B>>,
) -> Result<impl IntoResponse, ApiError>
where
  B: RecordBackend + Clone + 'static,
{
  let records = state.store.list_all().await?;
  let body = export::to_csv(&records)?;
  tracing::info!(rows = records.len(), "survey export");

  let disposition = format!(
    "attachment; filename=\"survey-export-{}.csv\"",
    Utc::now().format("%Y%m%d-%H%M%S")
  );
  Ok((
    [
      (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_owned()),
      (header::CONTENT_DISPOSITION, disposition),
    ],
    body,
  ))
}
