//! The `RecordBackend` trait and the plain data it exchanges.
//!
//! The trait is implemented by storage engines (e.g. `survey-store-sqlite`).
//! [`crate::intake::SurveyStore`] owns the business rules and talks to storage
//! only through this abstraction.

use std::future::Future;

use chrono::{DateTime, Utc};

use crate::record::{Receipt, RequestMeta, StoreIdentifier, SurveyFields, SurveyRecord};

/// Largest page [`PageRequest`] will ever ask for.
pub const MAX_PAGE_LIMIT: i64 = 1000;

/// Page size used when the caller does not specify one.
pub const DEFAULT_PAGE_LIMIT: i64 = 100;

// ─── Paging ──────────────────────────────────────────────────────────────────

/// A clamped `LIMIT`/`OFFSET` pair. Construct with [`PageRequest::clamped`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
  limit:  i64,
  offset: i64,
}

impl PageRequest {
  /// Clamp `limit` to `1..=MAX_PAGE_LIMIT` (defaulting when absent) and
  /// `offset` to non-negative.
  pub fn clamped(limit: Option<i64>, offset: Option<i64>) -> Self {
    Self {
      limit:  limit.unwrap_or(DEFAULT_PAGE_LIMIT).clamp(1, MAX_PAGE_LIMIT),
      offset: offset.unwrap_or(0).max(0),
    }
  }

  pub fn limit(&self) -> i64 { self.limit }

  pub fn offset(&self) -> i64 { self.offset }
}

impl Default for PageRequest {
  fn default() -> Self { Self::clamped(None, None) }
}

/// One page of records, most recent first.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct Page {
  pub rows:   Vec<SurveyRecord>,
  /// Number of records in the whole table.
  pub total:  i64,
  /// Number of records in `rows`.
  pub count:  usize,
  pub limit:  i64,
  pub offset: i64,
}

// ─── Write inputs ────────────────────────────────────────────────────────────

/// The part of an existing row the upsert decision needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Existing {
  pub id:           i64,
  pub update_count: i64,
  pub timestamp:    DateTime<Utc>,
}

/// A first-time record. `update_count` is always zero on insert.
#[derive(Debug, Clone)]
pub struct NewRecord {
  pub identifier: StoreIdentifier,
  pub fields:     SurveyFields,
  pub meta:       RequestMeta,
  pub timestamp:  DateTime<Utc>,
}

/// A full replace of every metric field and the request metadata.
#[derive(Debug, Clone)]
pub struct Replacement {
  pub identifier:   StoreIdentifier,
  pub fields:       SurveyFields,
  pub meta:         RequestMeta,
  pub update_count: i64,
  pub timestamp:    DateTime<Utc>,
}

/// Result of [`RecordBackend::insert`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
  Inserted(Receipt),
  /// The uniqueness constraint on the identifier rejected the row.
  IdentifierTaken,
}

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Abstraction over the durable storage engine.
///
/// Every write is a single statement. Implementations must enforce uniqueness
/// of the identifier themselves and report a collision as
/// [`InsertOutcome::IdentifierTaken`] rather than as an error.
///
/// All methods return `Send` futures so the trait can be used in multi-threaded
/// async runtimes (e.g. tokio with `axum`).
pub trait RecordBackend: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Id, revision count, and last write time for `identifier`, if stored.
  fn lookup<'a>(
    &'a self,
    identifier: &'a StoreIdentifier,
  ) -> impl Future<Output = Result<Option<Existing>, Self::Error>> + Send + 'a;

  /// Insert a new row and return its generated fields.
  fn insert(
    &self,
    record: NewRecord,
  ) -> impl Future<Output = Result<InsertOutcome, Self::Error>> + Send + '_;

  /// Overwrite the row for `replacement.identifier`. Returns `None` when no
  /// row matched.
  fn replace(
    &self,
    replacement: Replacement,
  ) -> impl Future<Output = Result<Option<Receipt>, Self::Error>> + Send + '_;

  /// The full record for `identifier`, if stored.
  fn get<'a>(
    &'a self,
    identifier: &'a StoreIdentifier,
  ) -> impl Future<Output = Result<Option<SurveyRecord>, Self::Error>> + Send + 'a;

  /// One page ordered by descending id, plus the total row count.
  fn page(
    &self,
    page: PageRequest,
  ) -> impl Future<Output = Result<(Vec<SurveyRecord>, i64), Self::Error>> + Send + '_;

  /// Every record ordered by ascending id.
  fn all(
    &self,
  ) -> impl Future<Output = Result<Vec<SurveyRecord>, Self::Error>> + Send + '_;

  /// A trivial round-trip proving the engine answers.
  fn ping(&self) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn page_request_clamps_limit_and_offset() {
    let page = PageRequest::clamped(Some(5000), Some(-1));
    assert_eq!(page.limit(), MAX_PAGE_LIMIT);
    assert_eq!(page.offset(), 0);

    let page = PageRequest::clamped(Some(1000), Some(-1));
    assert_eq!((page.limit(), page.offset()), (1000, 0));
  }

  #[test]
  fn page_request_defaults() {
    let page = PageRequest::default();
    assert_eq!(page.limit(), DEFAULT_PAGE_LIMIT);
    assert_eq!(page.offset(), 0);

    let page = PageRequest::clamped(Some(0), Some(20));
    assert_eq!((page.limit(), page.offset()), (1, 20));
  }
}
