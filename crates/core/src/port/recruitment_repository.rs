// Recruitment Read-side Port (Interface)

use crate::domain::{Applicant, Interview, Recruitment, RecruitmentId};
use crate::error::Result;
use async_trait::async_trait;

/// Source of persisted recruitment ids, scanned once at startup
#[async_trait]
pub trait RecruitmentIdSource: Send + Sync {
    /// Raw id column values, malformed ones included
    async fn load_recruitment_ids(&self) -> Result<Vec<String>>;
}

/// Read-only lookups (outside of any transaction)
#[async_trait]
pub trait RecruitmentReader: Send + Sync {
    /// Find recruitment by ID
    async fn find_recruitment(&self, id: &RecruitmentId) -> Result<Option<Recruitment>>;

    /// All recruitments with a well-formed id, ordered by id
    async fn list_recruitments(&self) -> Result<Vec<Recruitment>>;

    /// Applicants linked to a recruitment
    async fn find_applicants(&self, id: &RecruitmentId) -> Result<Vec<Applicant>>;

    /// Interviews belonging to a recruitment
    async fn find_interviews(&self, id: &RecruitmentId) -> Result<Vec<Interview>>;
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;
    use std::sync::Mutex;

    /// In-memory read side, filled directly by tests
    #[derive(Default)]
    pub struct InMemoryRecruitments {
        pub raw_ids: Mutex<Vec<String>>,
        pub recruitments: Mutex<Vec<Recruitment>>,
        pub applicants: Mutex<Vec<(RecruitmentId, Applicant)>>,
        pub interviews: Mutex<Vec<Interview>>,
    }

    impl InMemoryRecruitments {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn with_ids<I, S>(ids: I) -> Self
        where
            I: IntoIterator<Item = S>,
            S: Into<String>,
        {
            let source = Self::default();
            source
                .raw_ids
                .lock()
                .unwrap()
                .extend(ids.into_iter().map(Into::into));
            source
        }

        pub fn insert(&self, recruitment: Recruitment) {
            self.raw_ids.lock().unwrap().push(recruitment.id.to_string());
            self.recruitments.lock().unwrap().push(recruitment);
        }
    }

    #[async_trait]
    impl RecruitmentIdSource for InMemoryRecruitments {
        async fn load_recruitment_ids(&self) -> Result<Vec<String>> {
            Ok(self.raw_ids.lock().unwrap().clone())
        }
    }

    #[async_trait]
    impl RecruitmentReader for InMemoryRecruitments {
        async fn find_recruitment(&self, id: &RecruitmentId) -> Result<Option<Recruitment>> {
            Ok(self
                .recruitments
                .lock()
                .unwrap()
                .iter()
                .find(|r| r.id == *id)
                .cloned())
        }

        async fn list_recruitments(&self) -> Result<Vec<Recruitment>> {
            let mut all = self.recruitments.lock().unwrap().clone();
            all.sort_by_key(|r| r.id);
            Ok(all)
        }

        async fn find_applicants(&self, id: &RecruitmentId) -> Result<Vec<Applicant>> {
            Ok(self
                .applicants
                .lock()
                .unwrap()
                .iter()
                .filter(|(rid, _)| rid == id)
                .map(|(_, a)| a.clone())
                .collect())
        }

        async fn find_interviews(&self, id: &RecruitmentId) -> Result<Vec<Interview>> {
            Ok(self
                .interviews
                .lock()
                .unwrap()
                .iter()
                .filter(|i| i.recruitment_id == *id)
                .cloned()
                .collect())
        }
    }
}
