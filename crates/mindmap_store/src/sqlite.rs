use chrono::{NaiveDate, NaiveTime, Utc};
use mindmap_core::{Badge, BadgeKind, FieldCipher, InsightError, Result, UserBadge, UserStats};
use serde_json::Value;
use sqlx::{sqlite::SqlitePoolOptions, Pool, Row, Sqlite};
use std::collections::HashSet;
use std::path::Path;
use uuid::Uuid;

use crate::scoped::UserStore;

/// The administrative store tier.
///
/// Sees every row: badge catalog, cross-user stats, unlock records, and the
/// raw journal tables. User-facing reads and writes go through
/// [`SqliteStore::for_user`], which scopes every query to one `user_uid`.
#[derive(Clone)]
pub struct SqliteStore {
    pool: Pool<Sqlite>,
    cipher: FieldCipher,
}

pub(crate) fn db_err(op: &'static str) -> impl FnOnce(sqlx::Error) -> InsightError {
    move |e| InsightError::store(op, e)
}

impl SqliteStore {
    pub async fn new<P: AsRef<Path>>(db_path: P, cipher: FieldCipher) -> Result<Self> {
        let db_url = format!("sqlite://{}?mode=rwc", db_path.as_ref().display());
        let pool = SqlitePoolOptions::new()
            .after_connect(|conn, _meta| {
                Box::pin(async move {
                    sqlx::query("PRAGMA foreign_keys = ON").execute(conn).await?;
                    Ok(())
                })
            })
            .connect(&db_url)
            .await
            .map_err(db_err("connect"))?;

        let store = Self { pool, cipher };
        store.migrate().await?;
        Ok(store)
    }

    pub(crate) fn pool(&self) -> &Pool<Sqlite> {
        &self.pool
    }

    pub(crate) fn cipher(&self) -> &FieldCipher {
        &self.cipher
    }

    /// Scope a view of the store to one user's rows.
    pub fn for_user(&self, user_uid: &str) -> UserStore {
        UserStore::new(self.clone(), user_uid)
    }

    async fn migrate(&self) -> Result<()> {
        let statements = [
            r#"
            CREATE TABLE IF NOT EXISTS user_stats (
                user_uid TEXT PRIMARY KEY,
                current_streak INTEGER NOT NULL DEFAULT 0,
                all_time_high_streak INTEGER NOT NULL DEFAULT 0,
                total_entries INTEGER NOT NULL DEFAULT 0,
                freeform_entries INTEGER NOT NULL DEFAULT 0,
                guided_entries INTEGER NOT NULL DEFAULT 0,
                theme_counts TEXT NOT NULL DEFAULT '{}',
                category_counts TEXT NOT NULL DEFAULT '{}',
                longest_entry_words INTEGER NOT NULL DEFAULT 0,
                updated_at INTEGER NOT NULL DEFAULT 0
            );
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS badges (
                badge_id INTEGER PRIMARY KEY,
                name TEXT NOT NULL UNIQUE,
                badge_type TEXT NOT NULL,
                required_value INTEGER NOT NULL DEFAULT 0,
                required_themes TEXT NOT NULL DEFAULT '[]'
            );
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS user_badges (
                user_uid TEXT NOT NULL,
                badge_id INTEGER NOT NULL,
                unlocked_at INTEGER NOT NULL,
                PRIMARY KEY (user_uid, badge_id),
                FOREIGN KEY (badge_id) REFERENCES badges(badge_id)
            );
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS freeform_journals (
                id TEXT PRIMARY KEY,
                user_uid TEXT NOT NULL,
                content TEXT NOT NULL,
                summary TEXT,
                date_created TEXT NOT NULL,
                time_created TEXT NOT NULL
            );
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS guided_journals (
                id TEXT PRIMARY KEY,
                user_uid TEXT NOT NULL,
                theme_id TEXT NOT NULL,
                category_id TEXT NOT NULL,
                content TEXT NOT NULL,
                summary TEXT,
                date_created TEXT NOT NULL,
                time_created TEXT NOT NULL
            );
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS theme_categories (
                theme_id TEXT NOT NULL,
                category_id TEXT NOT NULL,
                PRIMARY KEY (theme_id, category_id)
            );
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS recaps (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_uid TEXT NOT NULL,
                date_range_start TEXT NOT NULL,
                date_range_end TEXT NOT NULL,
                weekly_summary TEXT NOT NULL,
                mood TEXT NOT NULL,
                feeling TEXT NOT NULL,
                contributing TEXT NOT NULL,
                moments TEXT NOT NULL,
                cope TEXT NOT NULL,
                remember TEXT NOT NULL,
                created_at INTEGER NOT NULL,
                UNIQUE (user_uid, date_range_start, date_range_end)
            );
            "#,
            "CREATE INDEX IF NOT EXISTS idx_freeform_user_date
             ON freeform_journals(user_uid, date_created)",
            "CREATE INDEX IF NOT EXISTS idx_guided_user_date
             ON guided_journals(user_uid, date_created)",
        ];

        for statement in statements {
            sqlx::query(statement)
                .execute(&self.pool)
                .await
                .map_err(db_err("migrate"))?;
        }
        Ok(())
    }

    // ========================================================================
    // User stats
    // ========================================================================

    /// Insert a zeroed stats row for the user if one doesn't exist yet.
    pub async fn ensure_user_stats(&self, user_uid: &str) -> Result<()> {
        sqlx::query("INSERT OR IGNORE INTO user_stats (user_uid, updated_at) VALUES (?, ?)")
            .bind(user_uid)
            .bind(Utc::now().timestamp())
            .execute(&self.pool)
            .await
            .map_err(db_err("ensure user_stats"))?;
        Ok(())
    }

    pub async fn load_user_stats(&self, user_uid: &str) -> Result<UserStats> {
        let row = sqlx::query(
            "SELECT current_streak, all_time_high_streak, total_entries, freeform_entries,
                    guided_entries, theme_counts, category_counts, longest_entry_words
             FROM user_stats WHERE user_uid = ?",
        )
        .bind(user_uid)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err("load user_stats"))?;

        let Some(row) = row else {
            return Ok(UserStats::zeroed(user_uid));
        };

        let theme_counts: String = row.get("theme_counts");
        let category_counts: String = row.get("category_counts");
        Ok(UserStats {
            user_uid: user_uid.to_string(),
            current_streak: row.get::<i64, _>("current_streak") as u32,
            all_time_high_streak: row.get::<i64, _>("all_time_high_streak") as u32,
            total_entries: row.get::<i64, _>("total_entries") as u32,
            freeform_entries: row.get::<i64, _>("freeform_entries") as u32,
            guided_entries: row.get::<i64, _>("guided_entries") as u32,
            theme_counts: serde_json::from_str(&theme_counts)
                .map_err(|e| InsightError::store("decode theme_counts", e))?,
            category_counts: serde_json::from_str(&category_counts)
                .map_err(|e| InsightError::store("decode category_counts", e))?,
            longest_entry_words: row.get::<i64, _>("longest_entry_words") as u32,
        })
    }

    pub async fn upsert_user_stats(&self, stats: &UserStats) -> Result<()> {
        let theme_counts = serde_json::to_string(&stats.theme_counts)
            .map_err(|e| InsightError::store("encode theme_counts", e))?;
        let category_counts = serde_json::to_string(&stats.category_counts)
            .map_err(|e| InsightError::store("encode category_counts", e))?;
        sqlx::query(
            r#"
            INSERT INTO user_stats (user_uid, current_streak, all_time_high_streak,
                total_entries, freeform_entries, guided_entries,
                theme_counts, category_counts, longest_entry_words, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(user_uid) DO UPDATE SET
                current_streak = excluded.current_streak,
                all_time_high_streak = excluded.all_time_high_streak,
                total_entries = excluded.total_entries,
                freeform_entries = excluded.freeform_entries,
                guided_entries = excluded.guided_entries,
                theme_counts = excluded.theme_counts,
                category_counts = excluded.category_counts,
                longest_entry_words = excluded.longest_entry_words,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(&stats.user_uid)
        .bind(stats.current_streak as i64)
        .bind(stats.all_time_high_streak as i64)
        .bind(stats.total_entries as i64)
        .bind(stats.freeform_entries as i64)
        .bind(stats.guided_entries as i64)
        .bind(theme_counts)
        .bind(category_counts)
        .bind(stats.longest_entry_words as i64)
        .bind(Utc::now().timestamp())
        .execute(&self.pool)
        .await
        .map_err(db_err("upsert user_stats"))?;
        Ok(())
    }

    // ========================================================================
    // Badge catalog & unlocks
    // ========================================================================

    /// The full catalog in ascending `badge_id` order. Rows whose
    /// `badge_type` doesn't decode into [`BadgeKind`] are logged and skipped.
    pub async fn badge_catalog(&self) -> Result<Vec<Badge>> {
        let rows = sqlx::query(
            "SELECT badge_id, name, badge_type, required_value, required_themes
             FROM badges ORDER BY badge_id ASC",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(db_err("load badge catalog"))?;

        let mut catalog = Vec::with_capacity(rows.len());
        for row in rows {
            let badge_type: String = row.get("badge_type");
            let name: String = row.get("name");
            let Some(kind) = BadgeKind::parse_str(&badge_type) else {
                tracing::warn!(badge = %name, badge_type = %badge_type, "unknown badge type, skipping");
                continue;
            };
            let themes: String = row.get("required_themes");
            catalog.push(Badge {
                badge_id: row.get("badge_id"),
                name,
                kind,
                required_value: row.get::<i64, _>("required_value") as u32,
                required_themes: serde_json::from_str(&themes)
                    .map_err(|e| InsightError::store("decode required_themes", e))?,
            });
        }
        Ok(catalog)
    }

    pub async fn insert_badge(&self, badge: &Badge) -> Result<()> {
        let themes = serde_json::to_string(&badge.required_themes)
            .map_err(|e| InsightError::store("encode required_themes", e))?;
        sqlx::query(
            "INSERT INTO badges (badge_id, name, badge_type, required_value, required_themes)
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(badge.badge_id)
        .bind(&badge.name)
        .bind(badge.kind.as_str())
        .bind(badge.required_value as i64)
        .bind(themes)
        .execute(&self.pool)
        .await
        .map_err(db_err("insert badge"))?;
        Ok(())
    }

    pub async fn unlocked_badge_ids(&self, user_uid: &str) -> Result<HashSet<i64>> {
        let rows = sqlx::query("SELECT badge_id FROM user_badges WHERE user_uid = ?")
            .bind(user_uid)
            .fetch_all(&self.pool)
            .await
            .map_err(db_err("load unlocked badges"))?;
        Ok(rows.into_iter().map(|r| r.get::<i64, _>("badge_id")).collect())
    }

    /// Record an unlock. The `(user_uid, badge_id)` primary key makes this
    /// insert-once; a conflicting insert surfaces as a store error the
    /// evaluator isolates per badge.
    pub async fn record_unlock(&self, user_uid: &str, badge_id: i64) -> Result<UserBadge> {
        let unlocked_at = Utc::now();
        sqlx::query("INSERT INTO user_badges (user_uid, badge_id, unlocked_at) VALUES (?, ?, ?)")
            .bind(user_uid)
            .bind(badge_id)
            .bind(unlocked_at.timestamp())
            .execute(&self.pool)
            .await
            .map_err(db_err("record unlock"))?;
        Ok(UserBadge {
            user_uid: user_uid.to_string(),
            badge_id,
            unlocked_at,
        })
    }

    // ========================================================================
    // Theme taxonomy
    // ========================================================================

    pub async fn add_theme_category(&self, theme_id: &str, category_id: &str) -> Result<()> {
        sqlx::query("INSERT OR IGNORE INTO theme_categories (theme_id, category_id) VALUES (?, ?)")
            .bind(theme_id)
            .bind(category_id)
            .execute(&self.pool)
            .await
            .map_err(db_err("add theme category"))?;
        Ok(())
    }

    pub async fn theme_category_ids(&self, theme_id: &str) -> Result<Vec<String>> {
        let rows = sqlx::query("SELECT category_id FROM theme_categories WHERE theme_id = ?")
            .bind(theme_id)
            .fetch_all(&self.pool)
            .await
            .map_err(db_err("load theme categories"))?;
        Ok(rows.into_iter().map(|r| r.get("category_id")).collect())
    }

    // ========================================================================
    // Journal rows
    // ========================================================================

    pub async fn insert_freeform_entry(
        &self,
        user_uid: &str,
        content: &Value,
        summary: Option<&str>,
        date_created: NaiveDate,
        time_created: NaiveTime,
    ) -> Result<Uuid> {
        let id = Uuid::new_v4();
        let sealed_content = self.cipher.seal(&content.to_string())?;
        let sealed_summary = summary.map(|s| self.cipher.seal(s)).transpose()?;
        sqlx::query(
            "INSERT INTO freeform_journals (id, user_uid, content, summary, date_created, time_created)
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(id.to_string())
        .bind(user_uid)
        .bind(sealed_content)
        .bind(sealed_summary)
        .bind(date_created.to_string())
        .bind(time_created.format("%H:%M:%S").to_string())
        .execute(&self.pool)
        .await
        .map_err(db_err("insert freeform entry"))?;
        Ok(id)
    }

    #[allow(clippy::too_many_arguments)]
    pub async fn insert_guided_entry(
        &self,
        user_uid: &str,
        theme_id: &str,
        category_id: &str,
        content: &Value,
        summary: Option<&str>,
        date_created: NaiveDate,
        time_created: NaiveTime,
    ) -> Result<Uuid> {
        let id = Uuid::new_v4();
        let sealed_content = self.cipher.seal(&content.to_string())?;
        let sealed_summary = summary.map(|s| self.cipher.seal(s)).transpose()?;
        sqlx::query(
            "INSERT INTO guided_journals
                (id, user_uid, theme_id, category_id, content, summary, date_created, time_created)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(id.to_string())
        .bind(user_uid)
        .bind(theme_id)
        .bind(category_id)
        .bind(sealed_content)
        .bind(sealed_summary)
        .bind(date_created.to_string())
        .bind(time_created.format("%H:%M:%S").to_string())
        .execute(&self.pool)
        .await
        .map_err(db_err("insert guided entry"))?;
        Ok(id)
    }

    /// Decrypted structured content of every freeform entry for a user.
    /// Used by the Inner Voyager fallback scan.
    pub async fn freeform_contents(&self, user_uid: &str) -> Result<Vec<Value>> {
        let rows = sqlx::query("SELECT content FROM freeform_journals WHERE user_uid = ?")
            .bind(user_uid)
            .fetch_all(&self.pool)
            .await
            .map_err(db_err("load freeform contents"))?;

        let mut contents = Vec::with_capacity(rows.len());
        for row in rows {
            let sealed: String = row.get("content");
            let plain = self.cipher.open(&sealed)?;
            contents.push(
                serde_json::from_str(&plain)
                    .map_err(|e| InsightError::store("decode journal content", e))?,
            );
        }
        Ok(contents)
    }

    /// `(date_created, theme_id)` of the N most recent guided entries.
    /// Used by the Reflection Star consecutive-day check.
    pub async fn recent_guided_theme_days(
        &self,
        user_uid: &str,
        limit: u32,
    ) -> Result<Vec<(NaiveDate, String)>> {
        let rows = sqlx::query(
            "SELECT date_created, theme_id FROM guided_journals
             WHERE user_uid = ?
             ORDER BY date_created DESC, time_created DESC
             LIMIT ?",
        )
        .bind(user_uid)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err("load recent guided entries"))?;

        let mut days = Vec::with_capacity(rows.len());
        for row in rows {
            let date_str: String = row.get("date_created");
            let date = date_str
                .parse::<NaiveDate>()
                .map_err(|e| InsightError::store("decode date_created", e))?;
            days.push((date, row.get("theme_id")));
        }
        Ok(days)
    }
}
