// Domain Error Types

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("Malformed recruitment id: {0:?}")]
    MalformedRecruitmentId(String),

    #[error("Year out of range for recruitment id: {0}")]
    YearOutOfRange(i32),

    #[error("Unknown recruitment status: {0}")]
    UnknownRecruitmentStatus(String),

    #[error("Unknown interview status: {0}")]
    UnknownInterviewStatus(String),

    #[error("Invalid rank: {0}")]
    InvalidRank(i32),

    #[error("Validation error: {0}")]
    ValidationError(String),
}

pub type Result<T> = std::result::Result<T, DomainError>;
