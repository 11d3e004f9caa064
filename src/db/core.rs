use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};
use sqlx::{
    sqlite::{
        SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteRow, SqliteSynchronous,
    },
    Pool, Row, Sqlite,
};
use std::path::Path;
use std::str::FromStr;
use tokio::time::Duration;
use tracing::{info, instrument, warn};

use crate::TARGET_DB;

#[derive(Clone, Debug)]
pub struct Database {
    pool: Pool<Sqlite>,
}

impl Database {
    /// Get access to the database pool
    pub fn pool(&self) -> &Pool<Sqlite> {
        &self.pool
    }
}

// Helper method to check if an sqlx error is a database lock error
pub trait DbLockErrorExt {
    fn is_database_lock_error(&self) -> bool;
}

impl DbLockErrorExt for sqlx::Error {
    fn is_database_lock_error(&self) -> bool {
        match self {
            // SQLITE_BUSY (5) and SQLITE_LOCKED (6)
            sqlx::Error::Database(err) => err.code().map_or(false, |c| c == "5" || c == "6"),
            _ => false,
        }
    }
}

impl Database {
    #[instrument(target = "db", level = "info")]
    pub async fn new(database_path: &str) -> Result<Self, sqlx::Error> {
        info!(target: TARGET_DB, "Creating database pool for: {}", database_path);

        if !Path::new(database_path).exists() {
            return Err(sqlx::Error::Configuration(
                format!("Database file '{}' does not exist", database_path).into(),
            ));
        }

        let connect_options =
            SqliteConnectOptions::from_str(&format!("sqlite://{}", database_path))?
                .journal_mode(SqliteJournalMode::Wal)
                .busy_timeout(Duration::from_secs(5))
                .synchronous(SqliteSynchronous::Normal)
                .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(connect_options)
            .await?;

        info!(target: TARGET_DB, "Database pool created");

        let db = Database { pool };
        db.initialize_schema().await?;

        Ok(db)
    }

    /// A private in-memory database. Limited to one connection, since every
    /// SQLite memory connection is its own database.
    pub async fn in_memory() -> Result<Self, sqlx::Error> {
        let connect_options = SqliteConnectOptions::from_str("sqlite::memory:")?.foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(connect_options)
            .await?;

        let db = Database { pool };
        db.initialize_schema().await?;

        Ok(db)
    }
}

/// Formats a timestamp the way every time column is stored: RFC 3339, UTC,
/// second precision. Rows written elsewhere may use other layouts, so queries
/// compare time columns through SQLite's `datetime()` rather than as text.
pub fn to_db_timestamp(value: DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Naive layouts written by other services, read as UTC. `%.f` makes the
/// fractional seconds optional.
const NAIVE_TIMESTAMP_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"];

/// Parses a stored timestamp. Accepts RFC 3339 and SQLite's
/// `YYYY-MM-DD HH:MM:SS[.SSS]`, with either a space or `T` separator.
pub fn parse_db_timestamp(value: &str) -> Result<DateTime<Utc>, sqlx::Error> {
    let value = value.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(value) {
        return Ok(parsed.with_timezone(&Utc));
    }

    let mut last_error = None;
    for format in NAIVE_TIMESTAMP_FORMATS {
        match NaiveDateTime::parse_from_str(value, format) {
            Ok(naive) => return Ok(naive.and_utc()),
            Err(e) => last_error = Some(e),
        }
    }

    Err(match last_error {
        Some(e) => sqlx::Error::Decode(Box::new(e)),
        None => sqlx::Error::Decode(format!("Unrecognized timestamp '{}'", value).into()),
    })
}

/// Decodes rows one at a time, logging and dropping the ones that fail, so a
/// single malformed row written elsewhere cannot hide the rest.
pub(crate) fn decode_rows<T>(
    rows: &[SqliteRow],
    table: &str,
    decode: impl Fn(&SqliteRow) -> Result<T, sqlx::Error>,
) -> Vec<T> {
    rows.iter()
        .filter_map(|row| match decode(row) {
            Ok(value) => Some(value),
            Err(e) => {
                let id: Option<i64> = row.try_get("id").ok();
                warn!(target: TARGET_DB, "Skipping undecodable {} row {:?}: {}", table, id, e);
                None
            }
        })
        .collect()
}

/// Decodes a string-list column. Stored as a JSON array; older rows may hold
/// a comma separated list instead.
pub(crate) fn decode_string_list(raw: &str) -> Vec<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Vec::new();
    }

    serde_json::from_str::<Vec<String>>(trimmed).unwrap_or_else(|_| {
        trimmed
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect()
    })
}

pub(crate) fn encode_string_list(values: &[String]) -> String {
    serde_json::to_string(values).unwrap_or_else(|_| "[]".to_string())
}
