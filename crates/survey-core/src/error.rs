//! Error types for `survey-core`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  /// Malformed input; the caller must correct it before retrying.
  #[error("invalid submission: {0}")]
  Validation(String),

  /// The record has used up its revisions. Terminal for this identifier.
  #[error("store {identifier} has already been updated {update_count} times")]
  LimitReached {
    identifier:   String,
    update_count: i64,
  },

  /// The storage engine's uniqueness constraint rejected an insert.
  #[error("store identifier {0} already exists")]
  DuplicateIdentifier(String),

  #[error("no survey found for store {0}")]
  NotFound(String),

  /// Any storage failure other than a uniqueness violation.
  #[error("storage unavailable: {0}")]
  StorageUnavailable(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl Error {
  pub(crate) fn storage<E>(err: E) -> Self
  where
    E: std::error::Error + Send + Sync + 'static,
  {
    Self::StorageUnavailable(Box::new(err))
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
