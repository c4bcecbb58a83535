//! The user-scoped store tier.
//!
//! Every query issued through [`UserStore`] carries the owning `user_uid`
//! filter; nothing reachable from here can name another user's rows.

use chrono::{DateTime, Utc};
use mindmap_core::{
    DateRange, InsightError, JournalKind, JournalSummaryEntry, NewRecap, Recap, Result,
};
use sqlx::Row;
use uuid::Uuid;

use crate::sqlite::{db_err, SqliteStore};

#[derive(Clone)]
pub struct UserStore {
    store: SqliteStore,
    user_uid: String,
}

/// Outcome of a race-tolerant recap insert.
#[derive(Debug)]
pub enum RecapInsert {
    Inserted(Recap),
    /// Another writer won the `(user, window)` uniqueness race; this is the
    /// row that got there first.
    AlreadyExists(Recap),
}

impl UserStore {
    pub(crate) fn new(store: SqliteStore, user_uid: &str) -> Self {
        Self {
            store,
            user_uid: user_uid.to_string(),
        }
    }

    pub fn user_uid(&self) -> &str {
        &self.user_uid
    }

    /// All of this user's journal summaries inside the window, both tables
    /// merged, most recent first. Entries without a summary are skipped.
    pub async fn journal_summaries(&self, range: DateRange) -> Result<Vec<JournalSummaryEntry>> {
        let mut entries = Vec::new();
        for (table, kind) in [
            ("freeform_journals", JournalKind::Freeform),
            ("guided_journals", JournalKind::Guided),
        ] {
            let rows = sqlx::query(&format!(
                "SELECT id, summary, date_created, time_created FROM {table}
                 WHERE user_uid = ? AND summary IS NOT NULL
                   AND date_created >= ? AND date_created <= ?"
            ))
            .bind(&self.user_uid)
            .bind(range.start.to_string())
            .bind(range.end.to_string())
            .fetch_all(self.store.pool())
            .await
            .map_err(db_err("load journal summaries"))?;

            for row in rows {
                let id: String = row.get("id");
                let sealed: String = row.get("summary");
                let date: String = row.get("date_created");
                let time: String = row.get("time_created");
                entries.push(JournalSummaryEntry {
                    journal_id: Uuid::parse_str(&id)
                        .map_err(|e| InsightError::store("decode journal id", e))?,
                    journal_summary: self.store.cipher().open(&sealed)?,
                    date_created: date
                        .parse()
                        .map_err(|e| InsightError::store("decode date_created", e))?,
                    time_created: time
                        .parse()
                        .map_err(|e| InsightError::store("decode time_created", e))?,
                    journal_type: kind,
                });
            }
        }

        entries.sort_by(|a, b| {
            (b.date_created, b.time_created).cmp(&(a.date_created, a.time_created))
        });
        Ok(entries)
    }

    pub async fn find_recap(&self, range: DateRange) -> Result<Option<Recap>> {
        let row = sqlx::query(
            "SELECT id, user_uid, date_range_start, date_range_end, weekly_summary, mood,
                    feeling, contributing, moments, cope, remember, created_at
             FROM recaps WHERE user_uid = ? AND date_range_start = ? AND date_range_end = ?",
        )
        .bind(&self.user_uid)
        .bind(range.start.to_string())
        .bind(range.end.to_string())
        .fetch_optional(self.store.pool())
        .await
        .map_err(db_err("find recap"))?;

        row.map(recap_from_row).transpose()
    }

    /// Insert a recap exactly once per window.
    ///
    /// Two concurrent callers can both pass the pre-insert existence check;
    /// the uniqueness constraint on `(user_uid, start, end)` decides the
    /// winner and the loser re-fetches the winning row.
    pub async fn insert_recap(&self, new: &NewRecap) -> Result<RecapInsert> {
        if new.user_uid != self.user_uid {
            return Err(InsightError::Validation(
                "recap user does not match the scoped store".to_string(),
            ));
        }

        let created_at = Utc::now().timestamp();
        let inserted = sqlx::query(
            r#"
            INSERT INTO recaps (user_uid, date_range_start, date_range_end, weekly_summary,
                mood, feeling, contributing, moments, cope, remember, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&new.user_uid)
        .bind(new.range.start.to_string())
        .bind(new.range.end.to_string())
        .bind(&new.weekly_summary)
        .bind(&new.mood)
        .bind(&new.feeling)
        .bind(&new.contributing)
        .bind(&new.moments)
        .bind(&new.cope)
        .bind(&new.remember)
        .bind(created_at)
        .execute(self.store.pool())
        .await;

        match inserted {
            Ok(result) => Ok(RecapInsert::Inserted(Recap {
                id: result.last_insert_rowid(),
                user_uid: new.user_uid.clone(),
                date_range_start: new.range.start,
                date_range_end: new.range.end,
                weekly_summary: new.weekly_summary.clone(),
                mood: new.mood.clone(),
                feeling: new.feeling.clone(),
                contributing: new.contributing.clone(),
                moments: new.moments.clone(),
                cope: new.cope.clone(),
                remember: new.remember.clone(),
                created_at: timestamp_to_utc(created_at),
            })),
            Err(e) if is_unique_violation(&e) => {
                tracing::debug!(user = %self.user_uid, "recap insert lost the race, re-fetching");
                match self.find_recap(new.range).await? {
                    Some(existing) => Ok(RecapInsert::AlreadyExists(existing)),
                    None => Err(InsightError::store("insert recap", e)),
                }
            }
            Err(e) => Err(InsightError::store("insert recap", e)),
        }
    }
}

fn is_unique_violation(e: &sqlx::Error) -> bool {
    match e {
        sqlx::Error::Database(db) => {
            matches!(db.kind(), sqlx::error::ErrorKind::UniqueViolation)
        }
        _ => false,
    }
}

fn timestamp_to_utc(secs: i64) -> DateTime<Utc> {
    DateTime::from_timestamp(secs, 0).unwrap_or(DateTime::UNIX_EPOCH)
}

fn recap_from_row(row: sqlx::sqlite::SqliteRow) -> Result<Recap> {
    let start: String = row.get("date_range_start");
    let end: String = row.get("date_range_end");
    Ok(Recap {
        id: row.get("id"),
        user_uid: row.get("user_uid"),
        date_range_start: start
            .parse()
            .map_err(|e| InsightError::store("decode date_range_start", e))?,
        date_range_end: end
            .parse()
            .map_err(|e| InsightError::store("decode date_range_end", e))?,
        weekly_summary: row.get("weekly_summary"),
        mood: row.get("mood"),
        feeling: row.get("feeling"),
        contributing: row.get("contributing"),
        moments: row.get("moments"),
        cope: row.get("cope"),
        remember: row.get("remember"),
        created_at: timestamp_to_utc(row.get("created_at")),
    })
}
