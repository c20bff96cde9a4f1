// Connection Port - the store as seen by the transaction coordinator

use crate::error::{AppError, Result};
use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};

/// Storage format for calendar dates
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Storage format for timestamps
pub const DATE_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Statement parameter / result column value
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
}

impl From<i64> for SqlValue {
    fn from(v: i64) -> Self {
        SqlValue::Integer(v)
    }
}

impl From<i32> for SqlValue {
    fn from(v: i32) -> Self {
        SqlValue::Integer(v as i64)
    }
}

impl From<&str> for SqlValue {
    fn from(v: &str) -> Self {
        SqlValue::Text(v.to_string())
    }
}

impl From<String> for SqlValue {
    fn from(v: String) -> Self {
        SqlValue::Text(v)
    }
}

impl From<&String> for SqlValue {
    fn from(v: &String) -> Self {
        SqlValue::Text(v.clone())
    }
}

impl<T: Into<SqlValue>> From<Option<T>> for SqlValue {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(SqlValue::Null)
    }
}

impl From<NaiveDate> for SqlValue {
    fn from(v: NaiveDate) -> Self {
        SqlValue::Text(v.format(DATE_FORMAT).to_string())
    }
}

impl From<NaiveDateTime> for SqlValue {
    fn from(v: NaiveDateTime) -> Self {
        SqlValue::Text(v.format(DATE_TIME_FORMAT).to_string())
    }
}

/// One result row, columns in SELECT order
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Row {
    values: Vec<SqlValue>,
}

impl Row {
    pub fn new(values: Vec<SqlValue>) -> Self {
        Self { values }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn get(&self, idx: usize) -> Result<&SqlValue> {
        self.values
            .get(idx)
            .ok_or_else(|| AppError::Database(format!("Column index out of range: {}", idx)))
    }

    pub fn get_i64(&self, idx: usize) -> Result<i64> {
        match self.get(idx)? {
            SqlValue::Integer(v) => Ok(*v),
            other => Err(AppError::Database(format!(
                "Column {} is not an integer: {:?}",
                idx, other
            ))),
        }
    }

    pub fn get_str(&self, idx: usize) -> Result<&str> {
        match self.get(idx)? {
            SqlValue::Text(v) => Ok(v.as_str()),
            other => Err(AppError::Database(format!(
                "Column {} is not text: {:?}",
                idx, other
            ))),
        }
    }
}

/// A live connection to the store
///
/// Statements issued on one connection execute in order. Between `begin`
/// and `commit`/`rollback` their effects are invisible to other connections.
#[async_trait]
pub trait Connection: Send {
    /// Disable auto-commit: open a transaction on this connection
    async fn begin(&mut self) -> Result<()>;

    /// Execute a data-mutating statement, returning rows affected
    async fn execute(&mut self, statement: &str, params: &[SqlValue]) -> Result<u64>;

    /// Run a query, returning all rows
    async fn query(&mut self, statement: &str, params: &[SqlValue]) -> Result<Vec<Row>>;

    async fn commit(&mut self) -> Result<()>;

    async fn rollback(&mut self) -> Result<()>;

    /// Release the connection back to its provider
    async fn close(self: Box<Self>) -> Result<()>;
}

/// Hands out connections (may block when the store limits concurrency)
#[async_trait]
pub trait ConnectionProvider: Send + Sync {
    /// Fails with `AppError::AcquireFailed`
    async fn acquire(&self) -> Result<Box<dyn Connection>>;
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;
    use std::sync::{Arc, Mutex};

    /// Everything a scripted connection was asked to do, in order
    #[derive(Debug, Clone, PartialEq)]
    pub enum ConnectionEvent {
        Acquire,
        Begin,
        Execute(String),
        Query(String),
        Commit,
        Rollback,
        Close,
    }

    #[derive(Default)]
    struct Script {
        fail_acquire: Option<String>,
        fail_begin: Option<String>,
        fail_commit: Option<String>,
        fail_rollback: Option<String>,
        /// (statement fragment, error message)
        fail_statements: Vec<(String, String)>,
        /// (statement fragment, rows affected)
        rows_affected: Vec<(String, u64)>,
        /// (statement fragment, rows)
        query_results: Vec<(String, Vec<Row>)>,
    }

    /// Connection provider whose connections record every call and fail on cue
    #[derive(Clone, Default)]
    pub struct ScriptedConnectionProvider {
        script: Arc<Mutex<Script>>,
        journal: Arc<Mutex<Vec<ConnectionEvent>>>,
    }

    impl ScriptedConnectionProvider {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn fail_acquire(self, message: impl Into<String>) -> Self {
            self.script.lock().unwrap().fail_acquire = Some(message.into());
            self
        }

        pub fn fail_begin(self, message: impl Into<String>) -> Self {
            self.script.lock().unwrap().fail_begin = Some(message.into());
            self
        }

        pub fn fail_commit(self, message: impl Into<String>) -> Self {
            self.script.lock().unwrap().fail_commit = Some(message.into());
            self
        }

        pub fn fail_rollback(self, message: impl Into<String>) -> Self {
            self.script.lock().unwrap().fail_rollback = Some(message.into());
            self
        }

        /// Fail any statement containing `fragment`
        pub fn fail_statement(self, fragment: impl Into<String>, message: impl Into<String>) -> Self {
            self.script
                .lock()
                .unwrap()
                .fail_statements
                .push((fragment.into(), message.into()));
            self
        }

        pub fn with_rows_affected(self, fragment: impl Into<String>, rows: u64) -> Self {
            self.script
                .lock()
                .unwrap()
                .rows_affected
                .push((fragment.into(), rows));
            self
        }

        pub fn with_query_result(self, fragment: impl Into<String>, rows: Vec<Row>) -> Self {
            self.script
                .lock()
                .unwrap()
                .query_results
                .push((fragment.into(), rows));
            self
        }

        pub fn journal(&self) -> Vec<ConnectionEvent> {
            self.journal.lock().unwrap().clone()
        }

        pub fn count(&self, event: &ConnectionEvent) -> usize {
            self.journal.lock().unwrap().iter().filter(|e| *e == event).count()
        }

        /// Statements executed (not queried), in order
        pub fn executed(&self) -> Vec<String> {
            self.journal
                .lock()
                .unwrap()
                .iter()
                .filter_map(|e| match e {
                    ConnectionEvent::Execute(sql) => Some(sql.clone()),
                    _ => None,
                })
                .collect()
        }

        fn record(&self, event: ConnectionEvent) {
            self.journal.lock().unwrap().push(event);
        }
    }

    #[async_trait]
    impl ConnectionProvider for ScriptedConnectionProvider {
        async fn acquire(&self) -> Result<Box<dyn Connection>> {
            self.record(ConnectionEvent::Acquire);
            if let Some(msg) = self.script.lock().unwrap().fail_acquire.clone() {
                return Err(AppError::AcquireFailed(msg));
            }
            Ok(Box::new(ScriptedConnection {
                provider: self.clone(),
            }))
        }
    }

    pub struct ScriptedConnection {
        provider: ScriptedConnectionProvider,
    }

    impl ScriptedConnection {
        fn check_statement(&self, statement: &str) -> Result<()> {
            let script = self.provider.script.lock().unwrap();
            match script
                .fail_statements
                .iter()
                .find(|(fragment, _)| statement.contains(fragment.as_str()))
            {
                Some((_, msg)) => Err(AppError::Database(msg.clone())),
                None => Ok(()),
            }
        }
    }

    #[async_trait]
    impl Connection for ScriptedConnection {
        async fn begin(&mut self) -> Result<()> {
            self.provider.record(ConnectionEvent::Begin);
            match self.provider.script.lock().unwrap().fail_begin.clone() {
                Some(msg) => Err(AppError::Database(msg)),
                None => Ok(()),
            }
        }

        async fn execute(&mut self, statement: &str, _params: &[SqlValue]) -> Result<u64> {
            self.provider
                .record(ConnectionEvent::Execute(statement.to_string()));
            self.check_statement(statement)?;
            let script = self.provider.script.lock().unwrap();
            Ok(script
                .rows_affected
                .iter()
                .find(|(fragment, _)| statement.contains(fragment.as_str()))
                .map(|(_, rows)| *rows)
                .unwrap_or(0))
        }

        async fn query(&mut self, statement: &str, _params: &[SqlValue]) -> Result<Vec<Row>> {
            self.provider
                .record(ConnectionEvent::Query(statement.to_string()));
            self.check_statement(statement)?;
            let script = self.provider.script.lock().unwrap();
            Ok(script
                .query_results
                .iter()
                .find(|(fragment, _)| statement.contains(fragment.as_str()))
                .map(|(_, rows)| rows.clone())
                .unwrap_or_default())
        }

        async fn commit(&mut self) -> Result<()> {
            self.provider.record(ConnectionEvent::Commit);
            match self.provider.script.lock().unwrap().fail_commit.clone() {
                Some(msg) => Err(AppError::Database(msg)),
                None => Ok(()),
            }
        }

        async fn rollback(&mut self) -> Result<()> {
            self.provider.record(ConnectionEvent::Rollback);
            match self.provider.script.lock().unwrap().fail_rollback.clone() {
                Some(msg) => Err(AppError::Database(msg)),
                None => Ok(()),
            }
        }

        async fn close(self: Box<Self>) -> Result<()> {
            self.provider.record(ConnectionEvent::Close);
            Ok(())
        }
    }
}
