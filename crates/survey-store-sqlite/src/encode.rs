//! Encoding and decoding helpers between survey domain types and the values
//! stored in SQLite columns.
//!
//! Timestamps are stored as RFC 3339 strings. Metric fields map onto native
//! `INTEGER`, `REAL`, and `TEXT` columns, with `None` stored as `NULL`.

use chrono::{DateTime, Utc};
use rusqlite::types::Value;
use survey_core::record::{
  METRIC_COLUMNS, MetricValue, RequestMeta, SurveyFields, SurveyRecord,
};

use crate::{Error, Result};

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

// ─── Metrics ─────────────────────────────────────────────────────────────────

fn metric_value(v: MetricValue<'_>) -> Value {
  match v {
    MetricValue::Integer(n) => n.into(),
    MetricValue::Real(x) => x.into(),
    MetricValue::Text(s) => s.map(str::to_owned).into(),
  }
}

/// Owned SQL values for every metric column, followed by the request
/// metadata columns.
pub fn encode_payload(fields: &SurveyFields, meta: &RequestMeta) -> Vec<Value> {
  let mut values: Vec<Value> =
    fields.values().into_iter().map(metric_value).collect();
  values.push(meta.user_agent.clone().into());
  values.push(meta.ip.clone().into());
  values
}

/// Comma-separated metric columns followed by `user_agent, ip`, in the order
/// [`encode_payload`] produces values.
pub fn payload_columns() -> String {
  let mut columns = METRIC_COLUMNS.to_vec();
  columns.extend(["user_agent", "ip"]);
  columns.join(", ")
}

/// `?{first}, ?{first + 1}, …` for `count` parameters.
pub fn placeholders(first: usize, count: usize) -> String {
  (first..first + count)
    .map(|i| format!("?{i}"))
    .collect::<Vec<_>>()
    .join(", ")
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// Column list selected by every full-record query.
pub fn record_columns() -> String {
  format!("id, store_identifier, update_count, timestamp, {}", payload_columns())
}

/// A `survey_responses` row with the timestamp still in its stored form.
pub struct RawRecord {
  pub id:               i64,
  pub store_identifier: String,
  pub update_count:     i64,
  pub timestamp:        String,
  pub fields:           SurveyFields,
  pub user_agent:       Option<String>,
  pub ip:               Option<String>,
}

impl RawRecord {
  /// Read a row selected with [`record_columns`].
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:               row.get("id")?,
      store_identifier: row.get("store_identifier")?,
      update_count:     row.get("update_count")?,
      timestamp:        row.get("timestamp")?,
      fields:           SurveyFields {
        restaurant_name:         row.get("restaurant_name")?,
        city:                    row.get("city")?,
        cuisine_type:            row.get("cuisine_type")?,
        pos_system:              row.get("pos_system")?,
        seating_capacity:        row.get("seating_capacity")?,
        years_in_operation:      row.get("years_in_operation")?,
        monthly_revenue:         row.get("monthly_revenue")?,
        monthly_food_cost:       row.get("monthly_food_cost")?,
        monthly_labor_cost:      row.get("monthly_labor_cost")?,
        monthly_rent:            row.get("monthly_rent")?,
        monthly_marketing_spend: row.get("monthly_marketing_spend")?,
        average_ticket_size:     row.get("average_ticket_size")?,
        daily_customers:         row.get("daily_customers")?,
        weekday_customers:       row.get("weekday_customers")?,
        weekend_customers:       row.get("weekend_customers")?,
        delivery_share_percent:  row.get("delivery_share_percent")?,
        google_rating:           row.get("google_rating")?,
        google_review_count:     row.get("google_review_count")?,
        yelp_rating:             row.get("yelp_rating")?,
        yelp_review_count:       row.get("yelp_review_count")?,
        social_followers:        row.get("social_followers")?,
        notes:                   row.get("notes")?,
      },
      user_agent:       row.get("user_agent")?,
      ip:               row.get("ip")?,
    })
  }

  pub fn into_record(self) -> Result<SurveyRecord> {
    Ok(SurveyRecord {
      id:               self.id,
      store_identifier: self.store_identifier,
      update_count:     self.update_count,
      timestamp:        decode_dt(&self.timestamp)?,
      fields:           self.fields,
      user_agent:       self.user_agent,
      ip:               self.ip,
    })
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn placeholders_are_numbered_from_first() {
    assert_eq!(placeholders(3, 3), "?3, ?4, ?5");
  }

  #[test]
  fn payload_lines_up_with_columns() {
    let fields = SurveyFields { monthly_revenue: Some(0), ..Default::default() };
    let meta = RequestMeta { user_agent: Some("curl/8".into()), ip: None };

    let values = encode_payload(&fields, &meta);
    let columns = payload_columns();
    let columns: Vec<&str> = columns.split(", ").collect();
    assert_eq!(values.len(), columns.len());

    let revenue = columns.iter().position(|c| *c == "monthly_revenue").unwrap();
    assert_eq!(values[revenue], Value::Integer(0));
    assert_eq!(values[columns.len() - 2], Value::Text("curl/8".into()));
    assert_eq!(values[columns.len() - 1], Value::Null);
  }

  #[test]
  fn dt_roundtrip() {
    let now = Utc::now();
    assert_eq!(decode_dt(&encode_dt(now)).unwrap(), now);
  }
}
