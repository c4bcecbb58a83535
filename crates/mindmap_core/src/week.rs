//! Calendar math for the recap window.

use crate::recap::DateRange;
use chrono::{Datelike, Duration, NaiveDate, Utc};

/// The most recently completed Sunday-Saturday week.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecapWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl RecapWindow {
    /// Window relative to the current UTC date.
    pub fn current() -> Self {
        Self::last_completed(Utc::now().date_naive())
    }

    /// The last fully completed week before `today`'s week.
    ///
    /// On a Sunday this is the seven days ending yesterday; on any other day
    /// it ends on the Saturday before the current week began.
    pub fn last_completed(today: NaiveDate) -> Self {
        let days_back = today.weekday().num_days_from_sunday() as i64 + 7;
        let start = today - Duration::days(days_back);
        Self {
            start,
            end: start + Duration::days(6),
        }
    }

    pub fn range(&self) -> DateRange {
        DateRange {
            start: self.start,
            end: self.end,
        }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }
}
