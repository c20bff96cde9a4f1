// sqlx::Error -> AppError
//
// Orphan rules prevent `From<sqlx::Error> for AppError` here, so adapters
// call `map_sqlx_error` explicitly.

use hrtrack_core::error::AppError;

/// Convert sqlx::Error to AppError with SQLite result-code classification
pub(crate) fn map_sqlx_error(err: sqlx::Error) -> AppError {
    match &err {
        sqlx::Error::Database(db_err) => {
            if let Some(code) = db_err.code() {
                let code_str = code.as_ref();

                // SQLite error codes: https://www.sqlite.org/rescode.html
                match code_str {
                    "2067" | "1555" => AppError::Database(format!(
                        "Unique constraint violation: {} ({})",
                        db_err.message(),
                        code_str
                    )),
                    "787" | "3850" => AppError::Database(format!(
                        "Foreign key constraint violation: {} ({})",
                        db_err.message(),
                        code_str
                    )),
                    "275" => AppError::Database(format!(
                        "Check constraint violation: {} ({})",
                        db_err.message(),
                        code_str
                    )),
                    "5" | "517" => AppError::Database(format!(
                        "Database locked (SQLITE_BUSY): {}",
                        db_err.message()
                    )),
                    "13" => AppError::Database(format!("Database full: {}", db_err.message())),
                    _ => AppError::Database(format!(
                        "Database error [{}]: {}",
                        code_str,
                        db_err.message()
                    )),
                }
            } else {
                AppError::Database(format!("Database error: {}", db_err.message()))
            }
        }
        sqlx::Error::RowNotFound => AppError::Database("Row not found".to_string()),
        sqlx::Error::ColumnNotFound(col) => AppError::Database(format!("Column not found: {}", col)),
        sqlx::Error::ColumnDecode { index, source } => {
            AppError::Database(format!("Failed to decode column {}: {}", index, source))
        }
        // Connection, pool, protocol errors
        _ => AppError::Database(err.to_string()),
    }
}

/// Failures while obtaining a connection from the pool
pub(crate) fn map_acquire_error(err: sqlx::Error) -> AppError {
    match err {
        sqlx::Error::PoolTimedOut => {
            AppError::AcquireFailed("timed out waiting for a pooled connection".to_string())
        }
        sqlx::Error::PoolClosed => AppError::AcquireFailed("connection pool is closed".to_string()),
        other => AppError::AcquireFailed(other.to_string()),
    }
}
