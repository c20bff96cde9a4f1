// hrtrack Infrastructure - SQLite Adapter
// Implements: ConnectionProvider / Connection, RecruitmentIdSource, RecruitmentReader

mod connection;
mod error;
mod migration;
mod recruitment_repository;
mod sqlite_connection;

pub use connection::{create_pool, ACQUIRE_TIMEOUT, BUSY_TIMEOUT, DEFAULT_MAX_CONNECTIONS};
pub use migration::{current_version, run_migrations};
pub use recruitment_repository::SqliteRecruitmentRepository;
pub use sqlite_connection::{PooledSqliteConnection, SqliteConnectionProvider};

// Note: sqlx::Error conversion is handled by `error::map_sqlx_error`
// due to Rust's orphan rules (cannot implement From<sqlx::Error> for AppError here)
