// Recruitment Domain Model

use crate::domain::error::DomainError;
use crate::domain::{RecruitmentId, RoleId};
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Recruitment lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RecruitmentStatus {
    Open,
    Interviewing,
    InProgress,
    OfferPhase,
    Completed,
    Filled,
    Closed,
    Cancelled,
}

impl RecruitmentStatus {
    /// Stored form (e.g. `OFFER_PHASE`)
    pub fn as_str(&self) -> &'static str {
        match self {
            RecruitmentStatus::Open => "OPEN",
            RecruitmentStatus::Interviewing => "INTERVIEWING",
            RecruitmentStatus::InProgress => "IN_PROGRESS",
            RecruitmentStatus::OfferPhase => "OFFER_PHASE",
            RecruitmentStatus::Completed => "COMPLETED",
            RecruitmentStatus::Filled => "FILLED",
            RecruitmentStatus::Closed => "CLOSED",
            RecruitmentStatus::Cancelled => "CANCELLED",
        }
    }

    /// Whether the recruitment still counts as ongoing for its role
    pub fn is_ongoing(&self) -> bool {
        matches!(
            self,
            RecruitmentStatus::Open
                | RecruitmentStatus::Interviewing
                | RecruitmentStatus::InProgress
                | RecruitmentStatus::OfferPhase
        )
    }
}

// Display form uses spaces ("OFFER PHASE"), matching what users see.
impl std::fmt::Display for RecruitmentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str().replace('_', " "))
    }
}

impl FromStr for RecruitmentStatus {
    type Err = DomainError;

    /// Accepts both the stored and the display form, case-insensitive.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_uppercase().replace(' ', "_");
        match normalized.as_str() {
            "OPEN" => Ok(RecruitmentStatus::Open),
            "INTERVIEWING" => Ok(RecruitmentStatus::Interviewing),
            "IN_PROGRESS" => Ok(RecruitmentStatus::InProgress),
            "OFFER_PHASE" => Ok(RecruitmentStatus::OfferPhase),
            "COMPLETED" => Ok(RecruitmentStatus::Completed),
            "FILLED" => Ok(RecruitmentStatus::Filled),
            "CLOSED" => Ok(RecruitmentStatus::Closed),
            "CANCELLED" => Ok(RecruitmentStatus::Cancelled),
            _ => Err(DomainError::UnknownRecruitmentStatus(s.to_string())),
        }
    }
}

/// Recruitment Entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recruitment {
    pub id: RecruitmentId,
    pub role_id: RoleId,
    pub application_deadline: NaiveDate,
    pub posting_date: NaiveDateTime,
    pub offer_acceptance_date: Option<NaiveDateTime>,
    pub status: RecruitmentStatus,
}

impl Recruitment {
    /// Create a new OPEN recruitment
    ///
    /// # Arguments
    ///
    /// * `id` - Allocated recruitment id (never constructed ad hoc)
    /// * `role_id` - Role this recruitment is for
    /// * `application_deadline` - Last day applications are accepted
    /// * `posting_date` - Posting timestamp (injected, not system time)
    pub fn new(
        id: RecruitmentId,
        role_id: impl Into<String>,
        application_deadline: NaiveDate,
        posting_date: NaiveDateTime,
    ) -> Self {
        Self {
            id,
            role_id: role_id.into(),
            application_deadline,
            posting_date,
            offer_acceptance_date: None,
            status: RecruitmentStatus::Open,
        }
    }

    /// Whole days between posting and offer acceptance (0 if not accepted)
    pub fn days_to_acceptance(&self) -> i64 {
        self.offer_acceptance_date
            .map(|accepted| (accepted - self.posting_date).num_days())
            .unwrap_or(0)
    }
}
