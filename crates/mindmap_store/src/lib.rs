pub mod catalog;
pub mod scoped;
pub mod sqlite;
pub mod stats;

pub use scoped::{RecapInsert, UserStore};
pub use sqlite::SqliteStore;
