use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Aggregate journaling statistics, one row per user.
///
/// Created zeroed on first evaluation, refreshed from the journal tables by
/// the store's aggregation procedure, never deleted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserStats {
    pub user_uid: String,
    /// Consecutive-day journaling run ending today or yesterday.
    pub current_streak: u32,
    /// Longest consecutive-day run ever observed.
    pub all_time_high_streak: u32,
    pub total_entries: u32,
    pub freeform_entries: u32,
    pub guided_entries: u32,
    /// Theme identifier -> number of guided entries tagged with it.
    pub theme_counts: HashMap<String, u32>,
    /// Category identifier -> number of guided entries tagged with it.
    pub category_counts: HashMap<String, u32>,
    /// Max word count seen across freeform entries.
    pub longest_entry_words: u32,
}

impl UserStats {
    pub fn zeroed(user_uid: &str) -> Self {
        Self {
            user_uid: user_uid.to_string(),
            ..Self::default()
        }
    }

    /// Number of distinct themes the user has journaled on.
    pub fn distinct_themes(&self) -> usize {
        self.theme_counts.len()
    }
}
