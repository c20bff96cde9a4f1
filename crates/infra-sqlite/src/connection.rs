// SQLite Connection Pool Setup

use crate::error::map_sqlx_error;
use hrtrack_core::error::{AppError, Result};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use std::str::FromStr;
use std::time::Duration;
use tracing::debug;

/// Default pool size
pub const DEFAULT_MAX_CONNECTIONS: u32 = 5;

/// How long a transaction waits for the database write lock
pub const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// How long `acquire` waits for a free pooled connection
pub const ACQUIRE_TIMEOUT: Duration = Duration::from_secs(30);

/// Create SQLite connection pool with WAL mode and foreign keys enforced
///
/// `sqlite::memory:` gets a single connection that is never recycled:
/// every new in-memory connection would otherwise open an empty database.
pub async fn create_pool(database_url: &str, max_connections: u32) -> Result<SqlitePool> {
    if max_connections == 0 {
        return Err(AppError::Config(
            "max_connections must be at least 1".to_string(),
        ));
    }

    let options = SqliteConnectOptions::from_str(database_url)
        .map_err(|e| AppError::Config(format!("invalid database url {}: {}", database_url, e)))?
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(BUSY_TIMEOUT)
        .foreign_keys(true)
        .create_if_missing(true);

    let in_memory = database_url.contains(":memory:");
    let mut pool_options = SqlitePoolOptions::new().acquire_timeout(ACQUIRE_TIMEOUT);
    pool_options = if in_memory {
        pool_options
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
    } else {
        pool_options.max_connections(max_connections)
    };

    let pool = pool_options
        .connect_with(options)
        .await
        .map_err(map_sqlx_error)?;

    debug!(database_url, in_memory, max_connections, "Connection pool created");
    Ok(pool)
}
