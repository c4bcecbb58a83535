//! Default badge catalog and theme taxonomy seed data.

use mindmap_core::{Badge, BadgeKind, Result};
use sqlx::Row;

use crate::sqlite::{db_err, SqliteStore};

fn badge(badge_id: i64, name: &str, kind: BadgeKind, required_value: u32) -> Badge {
    Badge {
        badge_id,
        name: name.to_string(),
        kind,
        required_value,
        required_themes: Vec::new(),
    }
}

fn themed_badge(
    badge_id: i64,
    name: &str,
    kind: BadgeKind,
    required_value: u32,
    themes: &[&str],
) -> Badge {
    Badge {
        required_themes: themes.iter().map(|t| t.to_string()).collect(),
        ..badge(badge_id, name, kind, required_value)
    }
}

pub fn default_badges() -> Vec<Badge> {
    vec![
        badge(1, "First Steps", BadgeKind::Count, 1),
        badge(2, "Week Writer", BadgeKind::Streak, 7),
        badge(3, "Devoted Diarist", BadgeKind::Streak, 30),
        badge(4, "Ten Pages In", BadgeKind::Count, 10),
        badge(5, "Prolific Journaler", BadgeKind::Count, 50),
        themed_badge(6, "Gratitude Guide", BadgeKind::ThemeSpecific, 5, &["gratitude"]),
        badge(7, "Theme Explorer", BadgeKind::ThemeVariety, 3),
        badge(8, "Theme Collector", BadgeKind::ThemeVariety, 6),
        themed_badge(
            9,
            "Balanced Mind",
            BadgeKind::ThemeComplete,
            0,
            &["gratitude", "stress"],
        ),
        badge(10, "Inner Voyager", BadgeKind::Special, 0),
        badge(11, "Reflection Star", BadgeKind::Special, 0),
    ]
}

/// `(theme_id, category_id)` pairs for the default two-level taxonomy.
pub fn default_taxonomy() -> Vec<(&'static str, &'static str)> {
    vec![
        ("gratitude", "people"),
        ("gratitude", "moments"),
        ("gratitude", "growth"),
        ("stress", "triggers"),
        ("stress", "coping"),
        ("self-discovery", "values"),
        ("self-discovery", "strengths"),
        ("relationships", "family"),
        ("relationships", "friends"),
        // Single-category theme: never eligible for theme_complete.
        ("sleep", "quality"),
    ]
}

impl SqliteStore {
    /// Seed the default catalog and taxonomy if the badges table is empty.
    /// Returns whether seeding happened.
    pub async fn seed_defaults(&self) -> Result<bool> {
        let count: i64 = sqlx::query("SELECT COUNT(*) AS n FROM badges")
            .fetch_one(self.pool())
            .await
            .map_err(db_err("count badges"))?
            .get("n");
        if count > 0 {
            return Ok(false);
        }

        for badge in default_badges() {
            self.insert_badge(&badge).await?;
        }
        for (theme, category) in default_taxonomy() {
            self.add_theme_category(theme, category).await?;
        }
        tracing::info!("seeded default badge catalog and theme taxonomy");
        Ok(true)
    }
}
