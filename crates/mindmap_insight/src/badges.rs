//! The badge unlock evaluator.
//!
//! Stateless per invocation: refreshes the user's aggregate stats, walks the
//! catalog in ascending `badge_id` order, and records every unlock whose
//! criterion newly holds. A badge already unlocked is skipped before
//! dispatch; one badge's failure never aborts the rest.

use chrono::{Duration, NaiveDate};
use mindmap_core::{
    content_word_count, Badge, BadgeKind, BadgeUnlockEvent, InsightError, Result, UnlockNotifier,
    UserStats,
};
use mindmap_store::SqliteStore;
use std::collections::{BTreeMap, HashSet};

/// Word threshold for the "Inner Voyager" long-entry badge.
const LONG_ENTRY_WORDS: u32 = 500;
/// How many recent guided entries "Reflection Star" looks at.
const REFLECTION_STAR_ENTRIES: u32 = 10;
/// Consecutive days and distinct themes "Reflection Star" requires.
const REFLECTION_STAR_DAYS: usize = 3;
const REFLECTION_STAR_THEMES: usize = 3;
/// Hard ceiling on the stats aggregation; hitting it fails the whole request.
const STATS_REFRESH_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(30);

#[derive(Debug, Clone)]
pub struct EvaluationOutcome {
    pub newly_unlocked: Vec<Badge>,
    pub stats: UserStats,
    pub total_badges: usize,
    pub already_unlocked: usize,
    /// Badges actually dispatched this pass (catalog minus already unlocked).
    pub evaluated: usize,
}

pub struct BadgeEvaluator {
    store: SqliteStore,
    notifier: UnlockNotifier,
}

impl BadgeEvaluator {
    pub fn new(store: SqliteStore, notifier: UnlockNotifier) -> Self {
        Self { store, notifier }
    }

    pub async fn evaluate(&self, user_uid: &str) -> Result<EvaluationOutcome> {
        self.store.ensure_user_stats(user_uid).await?;

        let mut stats = tokio::time::timeout(
            STATS_REFRESH_TIMEOUT,
            self.store.refresh_user_stats(user_uid),
        )
        .await
        .map_err(|_| InsightError::StatsTimeout)??;

        let catalog = self.store.badge_catalog().await?;
        let unlocked = self.store.unlocked_badge_ids(user_uid).await?;
        let total_badges = catalog.len();
        let already_unlocked = unlocked.len();

        let mut newly_unlocked = Vec::new();
        let mut evaluated = 0usize;
        for badge in catalog {
            if unlocked.contains(&badge.badge_id) {
                continue;
            }
            evaluated += 1;

            let satisfied = match self.badge_satisfied(&badge, &mut stats, user_uid).await {
                Ok(satisfied) => satisfied,
                Err(e) => {
                    tracing::warn!(badge = %badge.name, error = %e, "badge check failed, skipping");
                    continue;
                }
            };
            if !satisfied {
                continue;
            }

            let record = match self.store.record_unlock(user_uid, badge.badge_id).await {
                Ok(record) => record,
                Err(e) => {
                    tracing::warn!(badge = %badge.name, error = %e, "unlock insert failed, skipping");
                    continue;
                }
            };
            tracing::info!(
                user = %user_uid,
                badge = %badge.name,
                at = %record.unlocked_at,
                "badge unlocked"
            );
            self.notifier.notify(BadgeUnlockEvent {
                user_uid: user_uid.to_string(),
                badge_id: badge.badge_id,
                name: badge.name.clone(),
            });
            newly_unlocked.push(badge);
        }

        Ok(EvaluationOutcome {
            newly_unlocked,
            stats,
            total_badges,
            already_unlocked,
            evaluated,
        })
    }

    async fn badge_satisfied(
        &self,
        badge: &Badge,
        stats: &mut UserStats,
        user_uid: &str,
    ) -> Result<bool> {
        Ok(match badge.kind {
            BadgeKind::Streak => stats.current_streak >= badge.required_value,
            BadgeKind::Count => stats.total_entries >= badge.required_value,
            BadgeKind::ThemeSpecific => match badge.required_themes.first() {
                Some(theme) => {
                    stats.theme_counts.get(theme).copied().unwrap_or(0) >= badge.required_value
                }
                // A themed badge without themes is never unlockable.
                None => false,
            },
            BadgeKind::ThemeVariety => stats.distinct_themes() as u32 >= badge.required_value,
            BadgeKind::ThemeComplete => self.required_themes_complete(badge, stats).await?,
            BadgeKind::Special => match badge.name.as_str() {
                "Inner Voyager" => self.inner_voyager_satisfied(stats, user_uid).await?,
                "Reflection Star" => self.reflection_star_satisfied(user_uid).await?,
                other => {
                    tracing::warn!(badge = %other, "special badge has no rule, skipping");
                    false
                }
            },
        })
    }

    /// A theme is complete when at least 2 of its catalog categories have a
    /// non-zero count; themes with fewer than 2 catalog categories never
    /// count. All required themes must be complete.
    async fn required_themes_complete(&self, badge: &Badge, stats: &UserStats) -> Result<bool> {
        if badge.required_themes.is_empty() {
            return Ok(false);
        }
        for theme in &badge.required_themes {
            let categories = self.store.theme_category_ids(theme).await?;
            if categories.len() < 2 {
                return Ok(false);
            }
            let active = categories
                .iter()
                .filter(|c| stats.category_counts.get(*c).copied().unwrap_or(0) > 0)
                .count();
            if active < 2 {
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Long-entry check with a fallback for a stale cached stat: when the
    /// cache misses, the freeform entries are scanned directly, and a hit
    /// re-runs the aggregation so the cache catches up.
    async fn inner_voyager_satisfied(
        &self,
        stats: &mut UserStats,
        user_uid: &str,
    ) -> Result<bool> {
        if stats.longest_entry_words >= LONG_ENTRY_WORDS {
            return Ok(true);
        }

        let contents = self.store.freeform_contents(user_uid).await?;
        let found = contents
            .iter()
            .any(|content| content_word_count(content) >= LONG_ENTRY_WORDS);
        if found {
            match self.store.refresh_user_stats(user_uid).await {
                Ok(fresh) => *stats = fresh,
                Err(e) => {
                    tracing::warn!(error = %e, "stats reconciliation after long-entry scan failed")
                }
            }
        }
        Ok(found)
    }

    /// 3 calendar-consecutive days among the 10 most recent guided entries
    /// whose union of themes spans at least 3 distinct themes.
    async fn reflection_star_satisfied(&self, user_uid: &str) -> Result<bool> {
        let rows = self
            .store
            .recent_guided_theme_days(user_uid, REFLECTION_STAR_ENTRIES)
            .await?;

        let mut themes_by_day: BTreeMap<NaiveDate, HashSet<String>> = BTreeMap::new();
        for (date, theme) in rows {
            themes_by_day.entry(date).or_default().insert(theme);
        }

        let days: Vec<_> = themes_by_day.iter().collect();
        for window in days.windows(REFLECTION_STAR_DAYS) {
            let consecutive = window
                .windows(2)
                .all(|pair| *pair[1].0 - *pair[0].0 == Duration::days(1));
            if !consecutive {
                continue;
            }
            let union: HashSet<&str> = window
                .iter()
                .flat_map(|(_, themes)| themes.iter().map(String::as_str))
                .collect();
            if union.len() >= REFLECTION_STAR_THEMES {
                return Ok(true);
            }
        }
        Ok(false)
    }
}
