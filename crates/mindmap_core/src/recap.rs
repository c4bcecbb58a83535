use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Inclusive date window a recap covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

/// A persisted weekly recap. One row per `(user_uid, start, end)`, written
/// exactly once; a duplicate insert loses the race and re-fetches instead.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Recap {
    pub id: i64,
    pub user_uid: String,
    pub date_range_start: NaiveDate,
    pub date_range_end: NaiveDate,
    pub weekly_summary: String,
    /// Comma-separated mood words.
    pub mood: String,
    pub feeling: String,
    pub contributing: String,
    pub moments: String,
    pub cope: String,
    pub remember: String,
    pub created_at: DateTime<Utc>,
}

/// A recap ready to be inserted (everything but the row id and timestamp).
#[derive(Debug, Clone)]
pub struct NewRecap {
    pub user_uid: String,
    pub range: DateRange,
    pub weekly_summary: String,
    pub mood: String,
    pub feeling: String,
    pub contributing: String,
    pub moments: String,
    pub cope: String,
    pub remember: String,
}
