//! The statistics aggregation procedure.
//!
//! Recomputes a user's `user_stats` row from the raw journal tables. The
//! badge evaluator invokes this before every evaluation, under a hard 30s
//! timeout; content fields are decrypted in-process because word counts
//! cannot be taken over sealed columns.

use chrono::{Duration, NaiveDate, Utc};
use mindmap_core::{content_word_count, InsightError, Result, UserStats};
use sqlx::Row;
use std::collections::{BTreeSet, HashMap};

use crate::sqlite::{db_err, SqliteStore};

impl SqliteStore {
    /// Recompute and persist the user's aggregate stats.
    pub async fn refresh_user_stats(&self, user_uid: &str) -> Result<UserStats> {
        self.refresh_user_stats_at(user_uid, Utc::now().date_naive())
            .await
    }

    /// As [`refresh_user_stats`](Self::refresh_user_stats), with the streak
    /// anchor date injected so tests can pin "today".
    pub async fn refresh_user_stats_at(
        &self,
        user_uid: &str,
        today: NaiveDate,
    ) -> Result<UserStats> {
        let previous = self.load_user_stats(user_uid).await?;

        let freeform = sqlx::query(
            "SELECT content, date_created FROM freeform_journals WHERE user_uid = ?",
        )
        .bind(user_uid)
        .fetch_all(self.pool())
        .await
        .map_err(db_err("aggregate freeform journals"))?;

        let guided = sqlx::query(
            "SELECT theme_id, category_id, date_created FROM guided_journals WHERE user_uid = ?",
        )
        .bind(user_uid)
        .fetch_all(self.pool())
        .await
        .map_err(db_err("aggregate guided journals"))?;

        let mut dates: BTreeSet<NaiveDate> = BTreeSet::new();
        let mut longest_entry_words = 0u32;
        for row in &freeform {
            let sealed: String = row.get("content");
            let content: serde_json::Value = serde_json::from_str(&self.cipher().open(&sealed)?)
                .map_err(|e| InsightError::store("decode journal content", e))?;
            longest_entry_words = longest_entry_words.max(content_word_count(&content));
            dates.insert(parse_date(row.get("date_created"))?);
        }

        let mut theme_counts: HashMap<String, u32> = HashMap::new();
        let mut category_counts: HashMap<String, u32> = HashMap::new();
        for row in &guided {
            *theme_counts.entry(row.get("theme_id")).or_default() += 1;
            *category_counts.entry(row.get("category_id")).or_default() += 1;
            dates.insert(parse_date(row.get("date_created"))?);
        }

        let (current_streak, best_run) = streak_lengths(&dates, today);
        let stats = UserStats {
            user_uid: user_uid.to_string(),
            current_streak,
            all_time_high_streak: previous.all_time_high_streak.max(best_run),
            total_entries: (freeform.len() + guided.len()) as u32,
            freeform_entries: freeform.len() as u32,
            guided_entries: guided.len() as u32,
            theme_counts,
            category_counts,
            longest_entry_words,
        };

        self.upsert_user_stats(&stats).await?;
        Ok(stats)
    }
}

fn parse_date(s: String) -> Result<NaiveDate> {
    s.parse()
        .map_err(|e| InsightError::store("decode date_created", e))
}

/// `(current, best)` consecutive-day runs over a set of journaling dates.
///
/// The current streak is the run ending today or yesterday; a run that ended
/// two days ago counts as zero.
pub(crate) fn streak_lengths(dates: &BTreeSet<NaiveDate>, today: NaiveDate) -> (u32, u32) {
    let anchor = if dates.contains(&today) {
        Some(today)
    } else if dates.contains(&(today - Duration::days(1))) {
        Some(today - Duration::days(1))
    } else {
        None
    };

    let mut current = 0u32;
    if let Some(mut day) = anchor {
        while dates.contains(&day) {
            current += 1;
            day -= Duration::days(1);
        }
    }

    let mut best = 0u32;
    let mut run = 0u32;
    let mut prev: Option<NaiveDate> = None;
    for &date in dates {
        run = match prev {
            Some(p) if date - p == Duration::days(1) => run + 1,
            _ => 1,
        };
        best = best.max(run);
        prev = Some(date);
    }

    (current, best)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn set(days: &[NaiveDate]) -> BTreeSet<NaiveDate> {
        days.iter().copied().collect()
    }

    #[test]
    fn empty_date_set_has_no_streaks() {
        assert_eq!(streak_lengths(&BTreeSet::new(), date(2024, 6, 12)), (0, 0));
    }

    #[test]
    fn run_ending_today_counts() {
        let dates = set(&[date(2024, 6, 10), date(2024, 6, 11), date(2024, 6, 12)]);
        assert_eq!(streak_lengths(&dates, date(2024, 6, 12)), (3, 3));
    }

    #[test]
    fn run_ending_yesterday_still_counts() {
        let dates = set(&[date(2024, 6, 10), date(2024, 6, 11)]);
        assert_eq!(streak_lengths(&dates, date(2024, 6, 12)), (2, 2));
    }

    #[test]
    fn run_ending_two_days_ago_is_broken() {
        let dates = set(&[date(2024, 6, 9), date(2024, 6, 10)]);
        let (current, best) = streak_lengths(&dates, date(2024, 6, 12));
        assert_eq!(current, 0);
        assert_eq!(best, 2);
    }

    #[test]
    fn best_run_can_be_historical() {
        let dates = set(&[
            date(2024, 5, 1),
            date(2024, 5, 2),
            date(2024, 5, 3),
            date(2024, 5, 4),
            date(2024, 6, 12),
        ]);
        assert_eq!(streak_lengths(&dates, date(2024, 6, 12)), (1, 4));
    }

    #[test]
    fn gaps_reset_the_run() {
        let dates = set(&[date(2024, 6, 8), date(2024, 6, 10), date(2024, 6, 12)]);
        assert_eq!(streak_lengths(&dates, date(2024, 6, 12)), (1, 1));
    }
}
