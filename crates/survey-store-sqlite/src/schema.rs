//! SQL schema for the survey SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
///
/// Metric columns must match `survey_core::record::METRIC_COLUMNS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA busy_timeout = 5000;

-- One row per store. No DELETE is ever issued against this table.
CREATE TABLE IF NOT EXISTS survey_responses (
    id                      INTEGER PRIMARY KEY AUTOINCREMENT,
    store_identifier        TEXT    NOT NULL UNIQUE,
    update_count            INTEGER NOT NULL DEFAULT 0,
    timestamp               TEXT    NOT NULL,   -- RFC 3339 UTC; last write

    restaurant_name         TEXT,
    city                    TEXT,
    cuisine_type            TEXT,
    pos_system              TEXT,
    seating_capacity        INTEGER,
    years_in_operation      INTEGER,

    monthly_revenue         INTEGER,
    monthly_food_cost       INTEGER,
    monthly_labor_cost      INTEGER,
    monthly_rent            INTEGER,
    monthly_marketing_spend INTEGER,
    average_ticket_size     REAL,

    daily_customers         INTEGER,
    weekday_customers       INTEGER,
    weekend_customers       INTEGER,
    delivery_share_percent  REAL,

    google_rating           REAL,
    google_review_count     INTEGER,
    yelp_rating             REAL,
    yelp_review_count       INTEGER,
    social_followers        INTEGER,

    notes                   TEXT,

    user_agent              TEXT,       -- captured at write time
    ip                      TEXT
);

PRAGMA user_version = 1;
";
