// Role & Applicant Domain Models

use crate::domain::error::DomainError;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Role ID (`ROLE-xxxxxxxx`)
pub type RoleId = String;

/// Applicant ID (`APP-xxxxxxxx`)
pub type ApplicantId = String;

/// Highest rank an applicant can be given
pub const MAX_RANK: i32 = 10;

/// Role (job posting template)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Role {
    pub id: RoleId,
    pub title: String,
    pub description: Option<String>,
    pub department: Option<String>,
}

/// Applicant
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Applicant {
    pub id: ApplicantId,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub application_date: NaiveDate,
    /// 0 = unranked
    pub rank: i32,
}

impl Applicant {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    pub fn is_ranked(&self) -> bool {
        self.rank > 0
    }

    /// Set rank, 0 clears it
    pub fn update_rank(&mut self, rank: i32) -> Result<(), DomainError> {
        if !(0..=MAX_RANK).contains(&rank) {
            return Err(DomainError::InvalidRank(rank));
        }
        self.rank = rank;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn applicant() -> Applicant {
        Applicant {
            id: "APP-1".into(),
            first_name: "Ada".into(),
            last_name: "Lovelace".into(),
            email: "ada@example.com".into(),
            phone: None,
            application_date: NaiveDate::from_ymd_opt(2024, 1, 2).unwrap(),
            rank: 0,
        }
    }

    #[test]
    fn test_update_rank_bounds() {
        let mut a = applicant();
        assert!(!a.is_ranked());

        a.update_rank(3).unwrap();
        assert!(a.is_ranked());

        assert_eq!(a.update_rank(-1), Err(DomainError::InvalidRank(-1)));
        assert_eq!(a.update_rank(11), Err(DomainError::InvalidRank(11)));
        assert_eq!(a.rank, 3);
    }

    #[test]
    fn test_full_name() {
        assert_eq!(applicant().full_name(), "Ada Lovelace");
    }
}
