pub mod badge;
pub mod config;
pub mod crypto;
pub mod error;
pub mod events;
pub mod journal;
pub mod recap;
pub mod stats;
pub mod week;

pub use badge::{Badge, BadgeKind, UserBadge};
pub use config::MindmapConfig;
pub use crypto::FieldCipher;
pub use error::{InsightError, Result};
pub use events::{BadgeUnlockEvent, UnlockNotifier};
pub use journal::{content_word_count, JournalKind, JournalSummaryEntry};
pub use recap::{DateRange, NewRecap, Recap};
pub use stats::UserStats;
pub use week::RecapWindow;
