//! The [`SurveyStore`] service: create, bounded update, lookup, and listing of
//! survey records keyed by store identifier.
//!
//! A submission is an explicit two-step upsert: look the identifier up, then
//! insert or replace. The two steps are not atomic. The backend's uniqueness
//! constraint is what guarantees a single row per identifier; a first-time
//! submission that loses the race to a concurrent one surfaces as
//! [`Error::DuplicateIdentifier`].
//!
//! # Known gap
//!
//! Two concurrent *updates* to the same existing identifier can both read the
//! same `update_count` and both write `update_count + 1`, so under racing
//! updates a record may accept one more revision than [`MAX_UPDATES`] allows
//! for. Sequential submissions always respect the cap exactly.

use chrono::Utc;

use crate::{
  Error, Result,
  record::{MAX_UPDATES, Status, StoreIdentifier, Submission, Submitted, SurveyRecord},
  store::{InsertOutcome, NewRecord, Page, PageRequest, RecordBackend, Replacement},
};

/// The survey record store. Stateless apart from the injected backend handle,
/// so any number of instances may run against the same storage.
#[derive(Debug, Clone)]
pub struct SurveyStore<B> {
  backend: B,
}

impl<B: RecordBackend> SurveyStore<B> {
  pub fn new(backend: B) -> Self { Self { backend } }

  /// Create the record for a fresh identifier, or revise an existing one if
  /// it still has revisions left.
  pub async fn submit(&self, submission: Submission) -> Result<Submitted> {
    let identifier = StoreIdentifier::parse(&submission.identifier)?;
    let fields = submission.fields.normalized();
    fields.validate()?;

    let existing = self
      .backend
      .lookup(&identifier)
      .await
      .map_err(Error::storage)?;

    let Some(existing) = existing else {
      let record = NewRecord {
        identifier: identifier.clone(),
        fields,
        meta: submission.meta,
        timestamp: Utc::now(),
      };
      return match self.backend.insert(record).await.map_err(Error::storage)? {
        InsertOutcome::Inserted(receipt) => Ok(Submitted::Created(receipt)),
        InsertOutcome::IdentifierTaken => {
          Err(Error::DuplicateIdentifier(identifier.into_string()))
        }
      };
    };

    if existing.update_count >= MAX_UPDATES {
      return Err(Error::LimitReached {
        identifier:   identifier.into_string(),
        update_count: existing.update_count,
      });
    }

    let replacement = Replacement {
      identifier: identifier.clone(),
      fields,
      meta: submission.meta,
      update_count: existing.update_count + 1,
      // Never stamp a write earlier than the one it replaces.
      timestamp: Utc::now().max(existing.timestamp),
    };

    self
      .backend
      .replace(replacement)
      .await
      .map_err(Error::storage)?
      .map(Submitted::Updated)
      .ok_or_else(|| Error::NotFound(identifier.into_string()))
  }

  /// Whether a record exists for `identifier` and how often it was revised.
  pub async fn status(&self, identifier: &str) -> Result<Status> {
    let identifier = StoreIdentifier::parse(identifier)?;
    let existing = self
      .backend
      .lookup(&identifier)
      .await
      .map_err(Error::storage)?;

    Ok(match existing {
      Some(e) => Status { exists: true, update_count: e.update_count },
      None => Status { exists: false, update_count: 0 },
    })
  }

  /// The full record for `identifier`.
  pub async fn fetch(&self, identifier: &str) -> Result<SurveyRecord> {
    let identifier = StoreIdentifier::parse(identifier)?;
    self
      .backend
      .get(&identifier)
      .await
      .map_err(Error::storage)?
      .ok_or_else(|| Error::NotFound(identifier.into_string()))
  }

  /// One page of records, most recent first.
  pub async fn list(&self, page: PageRequest) -> Result<Page> {
    let (rows, total) = self.backend.page(page).await.map_err(Error::storage)?;
    Ok(Page {
      count: rows.len(),
      rows,
      total,
      limit: page.limit(),
      offset: page.offset(),
    })
  }

  /// Every record in ascending id order, for export.
  pub async fn list_all(&self) -> Result<Vec<SurveyRecord>> {
    self.backend.all().await.map_err(Error::storage)
  }

  /// Check that the storage engine answers.
  pub async fn ping(&self) -> Result<()> {
    self.backend.ping().await.map_err(Error::storage)
  }
}

#[cfg(test)]
mod tests {
  use std::sync::{
    Arc, Mutex,
    atomic::{AtomicBool, Ordering},
  };

  use chrono::{DateTime, Duration};

  use super::*;
  use crate::{
    record::{Receipt, RequestMeta, SurveyFields},
    store::Existing,
  };

  // ─── In-memory backend ─────────────────────────────────────────────────────

  #[derive(Debug, thiserror::Error)]
  #[error("backend offline")]
  struct Offline;

  /// A vector-backed backend. `blind_lookups` makes `lookup` report nothing,
  /// reproducing a submission that lost the race between lookup and insert.
  #[derive(Clone, Default)]
  struct MemoryBackend {
    rows:          Arc<Mutex<Vec<SurveyRecord>>>,
    blind_lookups: Arc<AtomicBool>,
    offline:       Arc<AtomicBool>,
  }

  impl MemoryBackend {
    fn check(&self) -> Result<(), Offline> {
      if self.offline.load(Ordering::SeqCst) { Err(Offline) } else { Ok(()) }
    }

    fn force_timestamp(&self, identifier: &str, at: DateTime<Utc>) {
      let mut rows = self.rows.lock().unwrap();
      let row = rows
        .iter_mut()
        .find(|r| r.store_identifier == identifier)
        .unwrap();
      row.timestamp = at;
    }

    fn row_count(&self) -> usize { self.rows.lock().unwrap().len() }
  }

  impl RecordBackend for MemoryBackend {
    type Error = Offline;

    async fn lookup(&self, identifier: &StoreIdentifier) -> Result<Option<Existing>, Offline> {
      self.check()?;
      if self.blind_lookups.load(Ordering::SeqCst) {
        return Ok(None);
      }
      let rows = self.rows.lock().unwrap();
      Ok(
        rows
          .iter()
          .find(|r| r.store_identifier == identifier.as_str())
          .map(|r| Existing {
            id:           r.id,
            update_count: r.update_count,
            timestamp:    r.timestamp,
          }),
      )
    }

    async fn insert(&self, record: NewRecord) -> Result<InsertOutcome, Offline> {
      self.check()?;
      let mut rows = self.rows.lock().unwrap();
      if rows.iter().any(|r| r.store_identifier == record.identifier.as_str()) {
        return Ok(InsertOutcome::IdentifierTaken);
      }
      let id = rows.len() as i64 + 1;
      rows.push(SurveyRecord {
        id,
        store_identifier: record.identifier.into_string(),
        update_count: 0,
        timestamp: record.timestamp,
        fields: record.fields,
        user_agent: record.meta.user_agent,
        ip: record.meta.ip,
      });
      Ok(InsertOutcome::Inserted(Receipt {
        id,
        timestamp: record.timestamp,
        update_count: 0,
      }))
    }

    async fn replace(&self, replacement: Replacement) -> Result<Option<Receipt>, Offline> {
      self.check()?;
      let mut rows = self.rows.lock().unwrap();
      let Some(row) = rows
        .iter_mut()
        .find(|r| r.store_identifier == replacement.identifier.as_str())
      else {
        return Ok(None);
      };
      row.fields = replacement.fields;
      row.update_count = replacement.update_count;
      row.timestamp = replacement.timestamp;
      row.user_agent = replacement.meta.user_agent;
      row.ip = replacement.meta.ip;
      Ok(Some(Receipt {
        id:           row.id,
        timestamp:    row.timestamp,
        update_count: row.update_count,
      }))
    }

    async fn get(&self, identifier: &StoreIdentifier) -> Result<Option<SurveyRecord>, Offline> {
      self.check()?;
      let rows = self.rows.lock().unwrap();
      Ok(
        rows
          .iter()
          .find(|r| r.store_identifier == identifier.as_str())
          .cloned(),
      )
    }

    async fn page(&self, page: PageRequest) -> Result<(Vec<SurveyRecord>, i64), Offline> {
      self.check()?;
      let rows = self.rows.lock().unwrap();
      let slice = rows
        .iter()
        .rev()
        .skip(page.offset() as usize)
        .take(page.limit() as usize)
        .cloned()
        .collect();
      Ok((slice, rows.len() as i64))
    }

    async fn all(&self) -> Result<Vec<SurveyRecord>, Offline> {
      self.check()?;
      Ok(self.rows.lock().unwrap().clone())
    }

    async fn ping(&self) -> Result<(), Offline> { self.check() }
  }

  fn store() -> (SurveyStore<MemoryBackend>, MemoryBackend) {
    let backend = MemoryBackend::default();
    (SurveyStore::new(backend.clone()), backend)
  }

  fn revenue(identifier: &str, amount: i64) -> Submission {
    Submission::new(
      identifier,
      SurveyFields { monthly_revenue: Some(amount), ..Default::default() },
    )
  }

  // ─── Create ────────────────────────────────────────────────────────────────

  #[tokio::test]
  async fn first_submission_creates_record_with_zero_updates() {
    let (s, backend) = store();

    let outcome = s.submit(revenue("S1", 50_000)).await.unwrap();
    assert!(outcome.is_created());
    assert_eq!(outcome.receipt().update_count, 0);
    assert_eq!(backend.row_count(), 1);

    let record = s.fetch("S1").await.unwrap();
    assert_eq!(record.id, outcome.receipt().id);
    assert_eq!(record.update_count, 0);
    assert_eq!(record.fields.monthly_revenue, Some(50_000));
  }

  #[tokio::test]
  async fn identifier_is_trimmed_before_lookup() {
    let (s, backend) = store();

    s.submit(revenue("  S1  ", 1)).await.unwrap();
    let second = s.submit(revenue("S1", 2)).await.unwrap();

    assert!(!second.is_created());
    assert_eq!(backend.row_count(), 1);
    assert_eq!(s.fetch("S1").await.unwrap().store_identifier, "S1");
  }

  #[tokio::test]
  async fn blank_identifier_is_a_validation_error() {
    let (s, backend) = store();
    let err = s.submit(revenue("   ", 1)).await.unwrap_err();
    assert!(matches!(err, Error::Validation(_)));
    assert_eq!(backend.row_count(), 0);
  }

  #[tokio::test]
  async fn invalid_metric_is_rejected_before_any_write() {
    let (s, backend) = store();
    let err = s.submit(revenue("S1", -5)).await.unwrap_err();
    assert!(matches!(err, Error::Validation(_)));
    assert_eq!(backend.row_count(), 0);
  }

  // ─── Bounded update ────────────────────────────────────────────────────────

  #[tokio::test]
  async fn sequential_updates_stop_at_the_cap() {
    let (s, _) = store();

    let created = s.submit(revenue("S1", 50_000)).await.unwrap();
    let id = created.receipt().id;

    for (expected, amount) in [(1, 52_000), (2, 53_000), (3, 54_000)] {
      let outcome = s.submit(revenue("S1", amount)).await.unwrap();
      assert!(matches!(outcome, Submitted::Updated(_)));
      assert_eq!(outcome.receipt().update_count, expected);
      assert_eq!(outcome.receipt().id, id);
    }

    let err = s.submit(revenue("S1", 99_999)).await.unwrap_err();
    assert!(matches!(
      err,
      Error::LimitReached { ref identifier, update_count: 3 } if identifier == "S1"
    ));

    let record = s.fetch("S1").await.unwrap();
    assert_eq!(record.update_count, 3);
    assert_eq!(record.fields.monthly_revenue, Some(54_000));
  }

  #[tokio::test]
  async fn update_is_a_full_replace() {
    let (s, _) = store();

    let first = SurveyFields {
      restaurant_name: Some("Luigi's".into()),
      monthly_revenue: Some(50_000),
      google_rating: Some(4.4),
      ..Default::default()
    };
    s.submit(Submission::new("S1", first)).await.unwrap();

    let second = SurveyFields { monthly_revenue: Some(0), ..Default::default() };
    s.submit(Submission::new("S1", second)).await.unwrap();

    let record = s.fetch("S1").await.unwrap();
    assert_eq!(record.fields.restaurant_name, None);
    assert_eq!(record.fields.google_rating, None);
    assert_eq!(record.fields.monthly_revenue, Some(0));
  }

  #[tokio::test]
  async fn update_overwrites_request_meta() {
    let (s, _) = store();
    let meta = |ua: &str| RequestMeta {
      user_agent: Some(ua.into()),
      ip:         Some("10.0.0.1".into()),
    };

    s.submit(revenue("S1", 1).with_meta(meta("first"))).await.unwrap();
    s.submit(revenue("S1", 2).with_meta(meta("second"))).await.unwrap();

    let record = s.fetch("S1").await.unwrap();
    assert_eq!(record.user_agent.as_deref(), Some("second"));
  }

  #[tokio::test]
  async fn update_timestamp_never_moves_backwards() {
    let (s, backend) = store();
    s.submit(revenue("S1", 1)).await.unwrap();

    let future = Utc::now() + Duration::hours(1);
    backend.force_timestamp("S1", future);

    let outcome = s.submit(revenue("S1", 2)).await.unwrap();
    assert!(outcome.receipt().timestamp >= future);
  }

  // ─── Races ─────────────────────────────────────────────────────────────────

  #[tokio::test]
  async fn lost_insert_race_is_a_duplicate() {
    let (s, backend) = store();
    s.submit(revenue("S2", 1)).await.unwrap();

    // The second submitter looked the identifier up before the first insert
    // landed, so it tries to insert too.
    backend.blind_lookups.store(true, Ordering::SeqCst);
    let err = s.submit(revenue("S2", 2)).await.unwrap_err();

    assert!(matches!(err, Error::DuplicateIdentifier(ref id) if id == "S2"));
    assert_eq!(backend.row_count(), 1);
  }

  // ─── Reads ─────────────────────────────────────────────────────────────────

  #[tokio::test]
  async fn status_of_unknown_identifier() {
    let (s, _) = store();
    let status = s.status("nope").await.unwrap();
    assert_eq!(status, Status { exists: false, update_count: 0 });
    assert_eq!(status.remaining_updates(), MAX_UPDATES);
  }

  #[tokio::test]
  async fn status_reports_count_without_mutating() {
    let (s, _) = store();
    s.submit(revenue("S1", 1)).await.unwrap();
    s.submit(revenue("S1", 2)).await.unwrap();

    for _ in 0..3 {
      let status = s.status("S1").await.unwrap();
      assert_eq!(status, Status { exists: true, update_count: 1 });
    }
    assert_eq!(s.fetch("S1").await.unwrap().update_count, 1);
  }

  #[tokio::test]
  async fn fetch_unknown_is_not_found() {
    let (s, _) = store();
    assert!(matches!(s.fetch("ghost").await, Err(Error::NotFound(_))));
  }

  #[tokio::test]
  async fn list_reports_total_and_clamped_window() {
    let (s, _) = store();
    for id in ["A", "B", "C"] {
      s.submit(revenue(id, 1)).await.unwrap();
    }

    let page = s.list(PageRequest::clamped(Some(2), Some(-3))).await.unwrap();
    assert_eq!(page.total, 3);
    assert_eq!(page.count, 2);
    assert_eq!((page.limit, page.offset), (2, 0));
    assert_eq!(page.rows[0].store_identifier, "C");

    let all = s.list_all().await.unwrap();
    let ids: Vec<_> = all.iter().map(|r| r.store_identifier.as_str()).collect();
    assert_eq!(ids, ["A", "B", "C"]);
  }

  // ─── Storage failures ──────────────────────────────────────────────────────

  #[tokio::test]
  async fn backend_failure_is_storage_unavailable() {
    let (s, backend) = store();
    backend.offline.store(true, Ordering::SeqCst);

    assert!(matches!(
      s.submit(revenue("S1", 1)).await,
      Err(Error::StorageUnavailable(_))
    ));
    assert!(matches!(s.status("S1").await, Err(Error::StorageUnavailable(_))));
    assert!(matches!(s.ping().await, Err(Error::StorageUnavailable(_))));
  }
}
