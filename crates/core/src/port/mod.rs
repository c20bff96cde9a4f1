// Port Layer - Interfaces for external dependencies

pub mod connection;
pub mod id_provider; // For deterministic testing
pub mod recruitment_repository;
pub mod time_provider;

// Re-exports
pub use connection::{Connection, ConnectionProvider, Row, SqlValue};
pub use id_provider::IdProvider;
pub use recruitment_repository::{RecruitmentIdSource, RecruitmentReader};
pub use time_provider::TimeProvider;
