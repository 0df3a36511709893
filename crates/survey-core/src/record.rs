//! Survey record types: the single row shape the intake form produces.
//!
//! Every metric is independently optional. `None` means "not reported" and is
//! stored as a true SQL `NULL`; it is never coerced to zero or an empty string.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Maximum number of revisions a record accepts after its creation.
pub const MAX_UPDATES: i64 = 3;

/// Longest accepted store identifier, in characters, after trimming.
pub const MAX_IDENTIFIER_LEN: usize = 128;

// ─── Identity ────────────────────────────────────────────────────────────────

/// A trimmed, non-empty, caller-supplied store identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StoreIdentifier(String);

impl StoreIdentifier {
  /// Normalise a raw identifier. Surrounding whitespace is dropped; an empty or
  /// oversized result is a validation error.
  pub fn parse(raw: &str) -> Result<Self> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
      return Err(Error::Validation("storeIdentifier is required".to_owned()));
    }
    if trimmed.chars().count() > MAX_IDENTIFIER_LEN {
      return Err(Error::Validation(format!(
        "storeIdentifier must be at most {MAX_IDENTIFIER_LEN} characters"
      )));
    }
    Ok(Self(trimmed.to_owned()))
  }

  pub fn as_str(&self) -> &str { &self.0 }

  pub fn into_string(self) -> String { self.0 }
}

impl std::fmt::Display for StoreIdentifier {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.write_str(&self.0)
  }
}

// ─── Metrics ─────────────────────────────────────────────────────────────────

/// The business metrics a restaurant operator reports.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SurveyFields {
  // ── Profile ─────────────────────────────────────────────────────────────
  pub restaurant_name:         Option<String>,
  pub city:                    Option<String>,
  pub cuisine_type:            Option<String>,
  pub pos_system:              Option<String>,
  pub seating_capacity:        Option<i64>,
  pub years_in_operation:      Option<i64>,

  // ── Money, per month ────────────────────────────────────────────────────
  pub monthly_revenue:         Option<i64>,
  pub monthly_food_cost:       Option<i64>,
  pub monthly_labor_cost:      Option<i64>,
  pub monthly_rent:            Option<i64>,
  pub monthly_marketing_spend: Option<i64>,
  pub average_ticket_size:     Option<f64>,

  // ── Traffic ─────────────────────────────────────────────────────────────
  pub daily_customers:         Option<i64>,
  pub weekday_customers:       Option<i64>,
  pub weekend_customers:       Option<i64>,
  /// Share of orders placed through delivery platforms, 0–100.
  pub delivery_share_percent:  Option<f64>,

  // ── Reputation ──────────────────────────────────────────────────────────
  pub google_rating:           Option<f64>,
  pub google_review_count:     Option<i64>,
  pub yelp_rating:             Option<f64>,
  pub yelp_review_count:       Option<i64>,
  pub social_followers:        Option<i64>,

  pub notes:                   Option<String>,
}

/// Column names of the metric fields, in the order [`SurveyFields::values`]
/// yields them. Shared by the storage schema and the CSV export.
pub const METRIC_COLUMNS: [&str; 22] = [
  "restaurant_name",
  "city",
  "cuisine_type",
  "pos_system",
  "seating_capacity",
  "years_in_operation",
  "monthly_revenue",
  "monthly_food_cost",
  "monthly_labor_cost",
  "monthly_rent",
  "monthly_marketing_spend",
  "average_ticket_size",
  "daily_customers",
  "weekday_customers",
  "weekend_customers",
  "delivery_share_percent",
  "google_rating",
  "google_review_count",
  "yelp_rating",
  "yelp_review_count",
  "social_followers",
  "notes",
];

/// A borrowed, typed view of one metric value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MetricValue<'a> {
  Integer(Option<i64>),
  Real(Option<f64>),
  Text(Option<&'a str>),
}

impl MetricValue<'_> {
  pub fn is_null(&self) -> bool {
    matches!(
      self,
      Self::Integer(None) | Self::Real(None) | Self::Text(None)
    )
  }
}

impl SurveyFields {
  /// All metric values, aligned with [`METRIC_COLUMNS`].
  pub fn values(&self) -> [MetricValue<'_>; 22] {
    use MetricValue::{Integer, Real, Text};
    [
      Text(self.restaurant_name.as_deref()),
      Text(self.city.as_deref()),
      Text(self.cuisine_type.as_deref()),
      Text(self.pos_system.as_deref()),
      Integer(self.seating_capacity),
      Integer(self.years_in_operation),
      Integer(self.monthly_revenue),
      Integer(self.monthly_food_cost),
      Integer(self.monthly_labor_cost),
      Integer(self.monthly_rent),
      Integer(self.monthly_marketing_spend),
      Real(self.average_ticket_size),
      Integer(self.daily_customers),
      Integer(self.weekday_customers),
      Integer(self.weekend_customers),
      Real(self.delivery_share_percent),
      Real(self.google_rating),
      Integer(self.google_review_count),
      Real(self.yelp_rating),
      Integer(self.yelp_review_count),
      Integer(self.social_followers),
      Text(self.notes.as_deref()),
    ]
  }

  /// Trim text fields, turning blank text into `None`. Numbers pass through
  /// untouched so that a reported zero stays zero.
  pub fn normalized(mut self) -> Self {
    for text in [
      &mut self.restaurant_name,
      &mut self.city,
      &mut self.cuisine_type,
      &mut self.pos_system,
      &mut self.notes,
    ] {
      *text = text
        .take()
        .map(|s| s.trim().to_owned())
        .filter(|s| !s.is_empty());
    }
    self
  }

  /// Range checks on the numeric metrics.
  pub fn validate(&self) -> Result<()> {
    for (column, value) in METRIC_COLUMNS.iter().zip(self.values()) {
      match value {
        MetricValue::Integer(Some(n)) if n < 0 => {
          return Err(Error::Validation(format!("{column} must not be negative")));
        }
        MetricValue::Real(Some(x)) if !x.is_finite() || x < 0.0 => {
          return Err(Error::Validation(format!(
            "{column} must be a non-negative number"
          )));
        }
        _ => {}
      }
    }

    for (column, rating) in [
      ("google_rating", self.google_rating),
      ("yelp_rating", self.yelp_rating),
    ] {
      if rating.is_some_and(|r| r > 5.0) {
        return Err(Error::Validation(format!("{column} must be between 0 and 5")));
      }
    }

    if self.delivery_share_percent.is_some_and(|p| p > 100.0) {
      return Err(Error::Validation(
        "delivery_share_percent must be between 0 and 100".to_owned(),
      ));
    }

    Ok(())
  }
}

// ─── Request metadata ────────────────────────────────────────────────────────

/// Audit data captured from the request that produced a write.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestMeta {
  pub user_agent: Option<String>,
  pub ip:         Option<String>,
}

// ─── Record ──────────────────────────────────────────────────────────────────

/// A stored survey response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SurveyRecord {
  pub id:               i64,
  pub store_identifier: String,
  pub update_count:     i64,
  /// Time of the most recent successful write.
  pub timestamp:        DateTime<Utc>,
  #[serde(flatten)]
  pub fields:           SurveyFields,
  pub user_agent:       Option<String>,
  pub ip:               Option<String>,
}

// ─── Submission ──────────────────────────────────────────────────────────────

/// Input to [`crate::intake::SurveyStore::submit`]. The identifier is raw; the
/// store normalises and validates it.
#[derive(Debug, Clone)]
pub struct Submission {
  pub identifier: String,
  pub fields:     SurveyFields,
  pub meta:       RequestMeta,
}

impl Submission {
  pub fn new(identifier: impl Into<String>, fields: SurveyFields) -> Self {
    Self {
      identifier: identifier.into(),
      fields,
      meta: RequestMeta::default(),
    }
  }

  pub fn with_meta(mut self, meta: RequestMeta) -> Self {
    self.meta = meta;
    self
  }
}

/// What a successful write hands back to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Receipt {
  pub id:           i64,
  pub timestamp:    DateTime<Utc>,
  pub update_count: i64,
}

impl Receipt {
  /// Revisions still available after this write.
  pub fn remaining_updates(&self) -> i64 {
    (MAX_UPDATES - self.update_count).max(0)
  }
}

/// Which branch of the upsert a submission took.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Submitted {
  Created(Receipt),
  Updated(Receipt),
}

impl Submitted {
  pub fn receipt(&self) -> &Receipt {
    match self {
      Self::Created(r) | Self::Updated(r) => r,
    }
  }

  pub fn is_created(&self) -> bool { matches!(self, Self::Created(_)) }
}

/// Result of [`crate::intake::SurveyStore::status`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Status {
  pub exists:       bool,
  pub update_count: i64,
}

impl Status {
  pub fn remaining_updates(&self) -> i64 {
    (MAX_UPDATES - self.update_count).max(0)
  }
}
