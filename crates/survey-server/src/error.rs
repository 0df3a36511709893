//! API error type and [`axum::response::IntoResponse`] implementation.

use axum::{
  Json,
  extract::rejection::JsonRejection,
  http::{HeaderValue, StatusCode, header},
  response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

/// An error returned by an API handler.
#[derive(Debug, Error)]
pub enum ApiError {
  #[error(transparent)]
  Survey(#[from] survey_core::Error),

  #[error("invalid request body: {0}")]
  BadRequest(String),

  #[error("unauthorized")]
  Unauthorized,

  #[error("too many requests")]
  TooManyRequests,

  #[error("export failed: {0}")]
  Export(#[from] csv::Error),
}

impl ApiError {
  pub fn status(&self) -> StatusCode {
    use survey_core::Error as E;
    match self {
      ApiError::Survey(E::Validation(_)) => StatusCode::BAD_REQUEST,
      ApiError::Survey(E::LimitReached { .. }) => StatusCode::FORBIDDEN,
      ApiError::Survey(E::DuplicateIdentifier(_)) => StatusCode::CONFLICT,
      ApiError::Survey(E::NotFound(_)) => StatusCode::NOT_FOUND,
      ApiError::Survey(E::StorageUnavailable(_)) => StatusCode::SERVICE_UNAVAILABLE,
      ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
      ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
      ApiError::TooManyRequests => StatusCode::TOO_MANY_REQUESTS,
      ApiError::Export(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
  }
}

impl From<JsonRejection> for ApiError {
  fn from(rejection: JsonRejection) -> Self { ApiError::BadRequest(rejection.body_text()) }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let status = self.status();
    if status.is_server_error() {
      tracing::error!(error = %self, "request failed");
    } else if let ApiError::Survey(
      survey_core::Error::LimitReached { .. } | survey_core::Error::DuplicateIdentifier(_),
    ) = &self
    {
      tracing::warn!(error = %self, "submission rejected");
    }

    // Storage details stay in the log.
    let message = match &self {
      ApiError::Survey(survey_core::Error::StorageUnavailable(_)) => {
        "storage unavailable, try again later".to_owned()
      }
      other => other.to_string(),
    };

    let mut res = (status, Json(json!({ "error": message }))).into_response();
    if let ApiError::Unauthorized = self {
      res.headers_mut().insert(
        header::WWW_AUTHENTICATE,
        HeaderValue::from_static("Basic realm=\"survey-admin\""),
      );
    }
    res
  }
}
