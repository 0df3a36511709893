//! CSV rendering of survey records for the admin export.

use survey_core::record::{METRIC_COLUMNS, MetricValue, SurveyRecord};

/// Render `records` as CSV: identity columns, every metric column, then the
/// request metadata. `NULL` becomes an empty cell; zero stays `0`.
///
/// Free-text answers and the user agent are neutralised against formula
/// injection. `store_identifier` is written verbatim so it matches the stored
/// key.
pub fn to_csv(records: &[SurveyRecord]) -> Result<Vec<u8>, csv::Error> {
  let mut output = Vec::new();

  {
    let mut writer = csv::Writer::from_writer(&mut output);

    let mut header = vec!["id", "store_identifier", "update_count", "timestamp"];
    header.extend(METRIC_COLUMNS);
    header.extend(["user_agent", "ip"]);
    writer.write_record(&header)?;

    for record in records {
      let mut row = vec![
        record.id.to_string(),
        record.store_identifier.clone(),
        record.update_count.to_string(),
        record.timestamp.to_rfc3339(),
      ];
      row.extend(record.fields.values().into_iter().map(cell));
      row.push(record.user_agent.as_deref().map(sanitize).unwrap_or_default());
      row.push(record.ip.clone().unwrap_or_default());
      writer.write_record(&row)?;
    }

    writer.flush()?;
  }

  Ok(output)
}

fn cell(value: MetricValue<'_>) -> String {
  match value {
    MetricValue::Integer(n) => n.map(|n| n.to_string()).unwrap_or_default(),
    MetricValue::Real(x) => x.map(|x| x.to_string()).unwrap_or_default(),
    MetricValue::Text(s) => s.map(sanitize).unwrap_or_default(),
  }
}

/// Prefix free text that a spreadsheet would evaluate as a formula.
fn sanitize(text: &str) -> String {
  if text.starts_with(['=', '+', '-', '@']) {
    format!("'{text}")
  } else {
    text.to_owned()
  }
}

#[cfg(test)]
mod tests {
  use chrono::Utc;
  use survey_core::record::SurveyFields;

  use super::*;

  fn record(id: i64, fields: SurveyFields) -> SurveyRecord {
    SurveyRecord {
      id,
      store_identifier: format!("S{id}"),
      update_count: 0,
      timestamp: Utc::now(),
      fields,
      user_agent: None,
      ip: Some("203.0.113.9".into()),
    }
  }

  fn parse(bytes: &[u8]) -> Vec<csv::StringRecord> {
    csv::Reader::from_reader(bytes)
      .records()
      .collect::<Result<_, _>>()
      .unwrap()
  }

  #[test]
  fn header_lists_every_column() {
    let bytes = to_csv(&[]).unwrap();
    let mut reader = csv::Reader::from_reader(bytes.as_slice());
    let header = reader.headers().unwrap().clone();
    assert_eq!(header.len(), 4 + METRIC_COLUMNS.len() + 2);
    assert_eq!(&header[0], "id");
    assert_eq!(&header[4], "restaurant_name");
    assert_eq!(&header[header.len() - 1], "ip");
  }

  #[test]
  fn null_is_empty_and_zero_is_zero() {
    let fields = SurveyFields {
      monthly_revenue: Some(0),
      google_rating: Some(4.5),
      notes: Some("Patio, seasonal".into()),
      ..Default::default()
    };
    let bytes = to_csv(&[record(1, fields)]).unwrap();
    let rows = parse(&bytes);
    assert_eq!(rows.len(), 1);

    let column = |name: &str| 4 + METRIC_COLUMNS.iter().position(|c| *c == name).unwrap();
    let row = &rows[0];
    assert_eq!(&row[0], "1");
    assert_eq!(&row[1], "S1");
    assert_eq!(&row[column("monthly_revenue")], "0");
    assert_eq!(&row[column("monthly_rent")], "");
    assert_eq!(&row[column("google_rating")], "4.5");
    assert_eq!(&row[column("notes")], "Patio, seasonal");
    assert_eq!(&row[row.len() - 2], "");
    assert_eq!(&row[row.len() - 1], "203.0.113.9");
  }

  #[test]
  fn formula_like_text_is_neutralised() {
    let fields = SurveyFields {
      restaurant_name: Some("=HYPERLINK(\"x\")".into()),
      ..Default::default()
    };
    let bytes = to_csv(&[record(7, fields)]).unwrap();
    let rows = parse(&bytes);
    assert_eq!(&rows[0][4], "'=HYPERLINK(\"x\")");
  }

  #[test]
  fn store_identifier_is_written_verbatim() {
    let mut r = record(3, SurveyFields {
      city: Some("-Lisbon".into()),
      ..Default::default()
    });
    r.store_identifier = "-S1".into();
    let bytes = to_csv(&[r]).unwrap();
    let rows = parse(&bytes);
    assert_eq!(&rows[0][1], "-S1");
    let city = 4 + METRIC_COLUMNS.iter().position(|c| *c == "city").unwrap();
    assert_eq!(&rows[0][city], "'-Lisbon");
  }
}
