// Re-export the Database struct and other public items
pub mod core;
mod event;
mod news;
mod schema;

// Re-export Database and essential traits
pub use self::core::{parse_db_timestamp, to_db_timestamp, Database, DbLockErrorExt};
pub use self::event::SYSTEM_USER_ID;
