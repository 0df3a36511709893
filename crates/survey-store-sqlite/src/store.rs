//! [`SqliteBackend`], the SQLite implementation of [`RecordBackend`].

use std::path::Path;

use rusqlite::{OptionalExtension as _, ffi, params_from_iter, types::Value};

use survey_core::{
  record::{Receipt, StoreIdentifier, SurveyRecord},
  store::{Existing, InsertOutcome, NewRecord, PageRequest, RecordBackend, Replacement},
};

use crate::{
  Result,
  encode::{
    RawRecord, decode_dt, encode_dt, encode_payload, payload_columns, placeholders,
    record_columns,
  },
  schema::SCHEMA,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// Survey storage backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteBackend {
  conn: tokio_rusqlite::Connection,
}

impl SqliteBackend {
  /// Open (or create) a database at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory database, useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Close the connection, waiting for queued statements to finish.
  pub async fn close(self) -> Result<()> {
    self.conn.close().await?;
    Ok(())
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// Run a full-record `SELECT` and decode every row.
  async fn select_records(
    &self,
    sql: String,
    params: Vec<Value>,
  ) -> Result<Vec<SurveyRecord>> {
    let raws: Vec<RawRecord> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(params_from_iter(params), RawRecord::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawRecord::into_record).collect()
  }
}

/// Whether `err` is SQLite rejecting a row because of a `UNIQUE` constraint.
fn is_unique_violation(err: &rusqlite::Error) -> bool {
  matches!(
    err,
    rusqlite::Error::SqliteFailure(e, _)
      if e.code == rusqlite::ErrorCode::ConstraintViolation
        && e.extended_code == ffi::SQLITE_CONSTRAINT_UNIQUE
  )
}

// ─── RecordBackend impl ──────────────────────────────────────────────────────

impl RecordBackend for SqliteBackend {
  type Error = crate::Error;

  async fn lookup(&self, identifier: &StoreIdentifier) -> Result<Option<Existing>> {
    let id_str = identifier.as_str().to_owned();

    let raw: Option<(i64, i64, String)> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT id, update_count, timestamp
               FROM survey_responses WHERE store_identifier = ?1",
              rusqlite::params![id_str],
              |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )
            .optional()?,
        )
      })
      .await?;

    raw
      .map(|(id, update_count, at)| {
        Ok(Existing { id, update_count, timestamp: decode_dt(&at)? })
      })
      .transpose()
  }

  async fn insert(&self, record: NewRecord) -> Result<InsertOutcome> {
    let mut params: Vec<Value> = vec![
      record.identifier.into_string().into(),
      encode_dt(record.timestamp).into(),
    ];
    params.extend(encode_payload(&record.fields, &record.meta));

    let sql = format!(
      "INSERT INTO survey_responses (store_identifier, timestamp, {})
       VALUES ({})
       RETURNING id",
      payload_columns(),
      placeholders(1, params.len()),
    );

    let inserted: Option<i64> = self
      .conn
      .call(move |conn| {
        match conn.query_row(&sql, params_from_iter(params), |row| row.get(0)) {
          Ok(id) => Ok(Some(id)),
          Err(e) if is_unique_violation(&e) => Ok(None),
          Err(e) => Err(e.into()),
        }
      })
      .await?;

    Ok(match inserted {
      Some(id) => InsertOutcome::Inserted(Receipt {
        id,
        timestamp: record.timestamp,
        update_count: 0,
      }),
      None => InsertOutcome::IdentifierTaken,
    })
  }

  async fn replace(&self, replacement: Replacement) -> Result<Option<Receipt>> {
    let payload = encode_payload(&replacement.fields, &replacement.meta);
    let assignments = payload_columns()
      .split(", ")
      .enumerate()
      .map(|(i, column)| format!("{column} = ?{}", i + 4))
      .collect::<Vec<_>>()
      .join(", ");

    let sql = format!(
      "UPDATE survey_responses
       SET update_count = ?2, timestamp = ?3, {assignments}
       WHERE store_identifier = ?1
       RETURNING id"
    );

    let mut params: Vec<Value> = vec![
      replacement.identifier.into_string().into(),
      replacement.update_count.into(),
      encode_dt(replacement.timestamp).into(),
    ];
    params.extend(payload);

    let id: Option<i64> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(&sql, params_from_iter(params), |row| row.get(0))
            .optional()?,
        )
      })
      .await?;

    Ok(id.map(|id| Receipt {
      id,
      timestamp: replacement.timestamp,
      update_count: replacement.update_count,
    }))
  }

  async fn get(&self, identifier: &StoreIdentifier) -> Result<Option<SurveyRecord>> {
    let sql = format!(
      "SELECT {} FROM survey_responses WHERE store_identifier = ?1",
      record_columns()
    );
    let records = self
      .select_records(sql, vec![identifier.as_str().to_owned().into()])
      .await?;
    Ok(records.into_iter().next())
  }

  async fn page(&self, page: PageRequest) -> Result<(Vec<SurveyRecord>, i64)> {
    let sql = format!(
      "SELECT {} FROM survey_responses ORDER BY id DESC LIMIT ?1 OFFSET ?2",
      record_columns()
    );
    let (limit, offset) = (page.limit(), page.offset());

    // One read transaction so `total` and `rows` see the same snapshot.
    let (raws, total): (Vec<RawRecord>, i64) = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let rows = {
          let mut stmt = tx.prepare(&sql)?;
          stmt
            .query_map(rusqlite::params![limit, offset], RawRecord::from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?
        };
        let total =
          tx.query_row("SELECT COUNT(*) FROM survey_responses", [], |row| row.get(0))?;
        tx.commit()?;
        Ok((rows, total))
      })
      .await?;

    let rows = raws
      .into_iter()
      .map(RawRecord::into_record)
      .collect::<Result<Vec<_>>>()?;
    Ok((rows, total))
  }

  async fn all(&self) -> Result<Vec<SurveyRecord>> {
    let sql = format!(
      "SELECT {} FROM survey_responses ORDER BY id ASC",
      record_columns()
    );
    self.select_records(sql, Vec::new()).await
  }

  async fn ping(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.query_row("SELECT 1", [], |_| Ok(()))?;
        Ok(())
      })
      .await?;
    Ok(())
  }
}
