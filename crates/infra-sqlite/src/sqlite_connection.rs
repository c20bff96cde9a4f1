// SQLite Connection Port Implementation
//
// Transactions are driven with plain BEGIN IMMEDIATE / COMMIT / ROLLBACK
// so that the coordinator in core owns the transaction lifecycle.

use crate::error::{map_acquire_error, map_sqlx_error};
use async_trait::async_trait;
use hrtrack_core::error::{AppError, Result};
use hrtrack_core::port::{Connection, ConnectionProvider, Row, SqlValue};
use sqlx::pool::PoolConnection;
use sqlx::sqlite::{SqliteArguments, SqliteRow};
use sqlx::{Row as _, Sqlite, SqlitePool, TypeInfo, ValueRef};
use tracing::{debug, warn};

type SqliteQuery<'q> = sqlx::query::Query<'q, Sqlite, SqliteArguments<'q>>;

/// Hands out pooled SQLite connections
#[derive(Clone)]
pub struct SqliteConnectionProvider {
    pool: SqlitePool,
}

impl SqliteConnectionProvider {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

#[async_trait]
impl ConnectionProvider for SqliteConnectionProvider {
    async fn acquire(&self) -> Result<Box<dyn Connection>> {
        let conn = self.pool.acquire().await.map_err(map_acquire_error)?;
        Ok(Box::new(PooledSqliteConnection {
            conn,
            in_transaction: false,
        }))
    }
}

/// One pooled connection
///
/// Dropped while a transaction is still open, the underlying connection is
/// closed instead of returned to the pool, which discards the transaction.
pub struct PooledSqliteConnection {
    conn: PoolConnection<Sqlite>,
    in_transaction: bool,
}

impl PooledSqliteConnection {
    async fn control(&mut self, statement: &str) -> Result<()> {
        sqlx::query(statement)
            .execute(&mut *self.conn)
            .await
            .map_err(map_sqlx_error)?;
        Ok(())
    }
}

#[async_trait]
impl Connection for PooledSqliteConnection {
    async fn begin(&mut self) -> Result<()> {
        if self.in_transaction {
            return Err(AppError::InvalidState(
                "transaction already open on this connection".to_string(),
            ));
        }
        // IMMEDIATE takes the write lock up front, so concurrent writers
        // wait on busy_timeout instead of failing a later lock upgrade.
        self.control("BEGIN IMMEDIATE").await?;
        self.in_transaction = true;
        Ok(())
    }

    async fn execute(&mut self, statement: &str, params: &[SqlValue]) -> Result<u64> {
        let result = bind_params(sqlx::query(statement), params)
            .execute(&mut *self.conn)
            .await
            .map_err(map_sqlx_error)?;
        Ok(result.rows_affected())
    }

    async fn query(&mut self, statement: &str, params: &[SqlValue]) -> Result<Vec<Row>> {
        let rows = bind_params(sqlx::query(statement), params)
            .fetch_all(&mut *self.conn)
            .await
            .map_err(map_sqlx_error)?;
        rows.iter().map(decode_row).collect()
    }

    async fn commit(&mut self) -> Result<()> {
        self.control("COMMIT").await?;
        self.in_transaction = false;
        Ok(())
    }

    async fn rollback(&mut self) -> Result<()> {
        self.control("ROLLBACK").await?;
        self.in_transaction = false;
        Ok(())
    }

    async fn close(self: Box<Self>) -> Result<()> {
        if self.in_transaction {
            debug!("Closing connection with an open transaction");
        }
        // Drop returns the connection to the pool (or closes it, see Drop)
        drop(self);
        Ok(())
    }
}

impl Drop for PooledSqliteConnection {
    fn drop(&mut self) {
        if self.in_transaction {
            warn!("Discarding pooled connection with an uncommitted transaction");
            self.conn.close_on_drop();
        }
    }
}

fn bind_params<'q>(mut query: SqliteQuery<'q>, params: &'q [SqlValue]) -> SqliteQuery<'q> {
    for param in params {
        query = match param {
            SqlValue::Null => query.bind(None::<String>),
            SqlValue::Integer(v) => query.bind(*v),
            SqlValue::Real(v) => query.bind(*v),
            SqlValue::Text(v) => query.bind(v.as_str()),
        };
    }
    query
}

fn decode_row(row: &SqliteRow) -> Result<Row> {
    let mut values = Vec::with_capacity(row.len());
    for idx in 0..row.len() {
        let raw = row.try_get_raw(idx).map_err(map_sqlx_error)?;
        let value = if raw.is_null() {
            SqlValue::Null
        } else {
            match raw.type_info().name() {
                "INTEGER" | "BOOLEAN" => SqlValue::Integer(row.try_get(idx).map_err(map_sqlx_error)?),
                "REAL" | "NUMERIC" => SqlValue::Real(row.try_get(idx).map_err(map_sqlx_error)?),
                "TEXT" | "DATE" | "TIME" | "DATETIME" => {
                    SqlValue::Text(row.try_get(idx).map_err(map_sqlx_error)?)
                }
                other => {
                    return Err(AppError::Database(format!(
                        "Unsupported column type {} at index {}",
                        other, idx
                    )))
                }
            }
        };
        values.push(value);
    }
    Ok(Row::new(values))
}
