// Interview Domain Model

use crate::domain::error::DomainError;
use crate::domain::{ApplicantId, RecruitmentId};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Interview ID (`INT-xxxxxxxx`)
pub type InterviewId = String;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InterviewStatus {
    Scheduled,
    Rescheduled,
    Completed,
    Cancelled,
}

impl std::fmt::Display for InterviewStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InterviewStatus::Scheduled => write!(f, "SCHEDULED"),
            InterviewStatus::Rescheduled => write!(f, "RESCHEDULED"),
            InterviewStatus::Completed => write!(f, "COMPLETED"),
            InterviewStatus::Cancelled => write!(f, "CANCELLED"),
        }
    }
}

impl FromStr for InterviewStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "SCHEDULED" => Ok(InterviewStatus::Scheduled),
            "RESCHEDULED" => Ok(InterviewStatus::Rescheduled),
            "COMPLETED" => Ok(InterviewStatus::Completed),
            "CANCELLED" => Ok(InterviewStatus::Cancelled),
            _ => Err(DomainError::UnknownInterviewStatus(s.to_string())),
        }
    }
}

/// Interview Entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Interview {
    pub id: InterviewId,
    pub recruitment_id: RecruitmentId,
    pub applicant_id: ApplicantId,
    pub date_time: NaiveDateTime,
    pub location: Option<String>,
    pub interviewer: Option<String>,
    pub status: InterviewStatus,
    pub notes: String,
}
