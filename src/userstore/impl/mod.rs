//! UserStore implementations

mod sqlite;

pub use sqlite::SQLiteUserStore;
