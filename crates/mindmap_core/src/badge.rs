use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// How a badge's unlock criterion is judged.
///
/// A closed enum: a catalog row whose `badge_type` does not name one of
/// these variants never reaches the evaluator (the store logs and skips it).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BadgeKind {
    Streak,
    Count,
    ThemeSpecific,
    ThemeVariety,
    ThemeComplete,
    Special,
}

impl BadgeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            BadgeKind::Streak => "streak",
            BadgeKind::Count => "count",
            BadgeKind::ThemeSpecific => "theme_specific",
            BadgeKind::ThemeVariety => "theme_variety",
            BadgeKind::ThemeComplete => "theme_complete",
            BadgeKind::Special => "special",
        }
    }

    pub fn parse_str(s: &str) -> Option<Self> {
        match s {
            "streak" => Some(BadgeKind::Streak),
            "count" => Some(BadgeKind::Count),
            "theme_specific" => Some(BadgeKind::ThemeSpecific),
            "theme_variety" => Some(BadgeKind::ThemeVariety),
            "theme_complete" => Some(BadgeKind::ThemeComplete),
            "special" => Some(BadgeKind::Special),
            _ => None,
        }
    }
}

/// One row of the read-only badge catalog.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Badge {
    pub badge_id: i64,
    pub name: String,
    pub kind: BadgeKind,
    /// Numeric threshold; meaning depends on `kind`.
    pub required_value: u32,
    /// Ordered theme list for `ThemeSpecific` / `ThemeComplete`. A badge of
    /// either kind with an empty list is never unlockable.
    pub required_themes: Vec<String>,
}

/// A permanent unlock record. Unique per `(user_uid, badge_id)`; once
/// written it is never re-evaluated or revoked.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserBadge {
    pub user_uid: String,
    pub badge_id: i64,
    pub unlocked_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_round_trips_through_strings() {
        for kind in [
            BadgeKind::Streak,
            BadgeKind::Count,
            BadgeKind::ThemeSpecific,
            BadgeKind::ThemeVariety,
            BadgeKind::ThemeComplete,
            BadgeKind::Special,
        ] {
            assert_eq!(BadgeKind::parse_str(kind.as_str()), Some(kind));
        }
    }

    #[test]
    fn unknown_kind_does_not_parse() {
        assert_eq!(BadgeKind::parse_str("weekly_champion"), None);
        assert_eq!(BadgeKind::parse_str(""), None);
    }
}
