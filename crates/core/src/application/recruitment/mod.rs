// Recruitment Service - transactional use cases over recruitments

pub mod applications;
pub mod create;
pub mod updates;

pub use applications::{NewApplicant, NewInterview, RemovalSummary};
pub use create::{NewRecruitment, NewRole};
pub use updates::RecruitmentUpdate;

use crate::application::cascade_delete::{CascadingDelete, DeleteOutcome};
use crate::application::sequence::SequenceAllocator;
use crate::application::transaction::{TransactionCoordinator, TxContext};
use crate::domain::{Applicant, Interview, Recruitment, RecruitmentId};
use crate::error::{AppError, Result};
use crate::port::{IdProvider, RecruitmentReader, TimeProvider};
use std::sync::Arc;

/// Surrogate id prefixes
pub const ROLE_ID_PREFIX: &str = "ROLE";
pub const APPLICANT_ID_PREFIX: &str = "APP";
pub const INTERVIEW_ID_PREFIX: &str = "INT";

/// A recruitment with the rows referencing it
#[derive(Debug, Clone)]
pub struct RecruitmentDetails {
    pub recruitment: Recruitment,
    pub applicants: Vec<Applicant>,
    pub interviews: Vec<Interview>,
}

/// Recruitment Service
///
/// Every mutating use case is one `TransactionCoordinator::run` on the
/// caller's context, so use cases compose: calling one from inside an
/// already open transaction joins it.
#[derive(Clone)]
pub struct RecruitmentService {
    coordinator: Arc<TransactionCoordinator>,
    allocator: Arc<SequenceAllocator>,
    cascade: CascadingDelete,
    reader: Arc<dyn RecruitmentReader>,
    id_provider: Arc<dyn IdProvider>,
    time_provider: Arc<dyn TimeProvider>,
}

impl RecruitmentService {
    pub fn new(
        coordinator: Arc<TransactionCoordinator>,
        allocator: Arc<SequenceAllocator>,
        reader: Arc<dyn RecruitmentReader>,
        id_provider: Arc<dyn IdProvider>,
        time_provider: Arc<dyn TimeProvider>,
    ) -> Self {
        Self {
            cascade: CascadingDelete::new(coordinator.clone()),
            coordinator,
            allocator,
            reader,
            id_provider,
            time_provider,
        }
    }

    pub fn coordinator(&self) -> &Arc<TransactionCoordinator> {
        &self.coordinator
    }

    pub fn allocator(&self) -> &Arc<SequenceAllocator> {
        &self.allocator
    }

    /// Delete a recruitment with its interviews and application links
    pub async fn delete_recruitment(
        &self,
        ctx: &mut TxContext,
        id: RecruitmentId,
    ) -> Result<DeleteOutcome> {
        self.cascade.delete_recruitment(ctx, id).await
    }

    pub async fn find_recruitment(&self, id: &RecruitmentId) -> Result<Option<Recruitment>> {
        self.reader.find_recruitment(id).await
    }

    pub async fn list_recruitments(&self) -> Result<Vec<Recruitment>> {
        self.reader.list_recruitments().await
    }

    /// Ranked applicants of a recruitment, highest rank first
    pub async fn ranked_applicants(&self, id: &RecruitmentId) -> Result<Vec<Applicant>> {
        let mut ranked: Vec<Applicant> = self
            .reader
            .find_applicants(id)
            .await?
            .into_iter()
            .filter(|a| a.is_ranked())
            .collect();
        ranked.sort_by(|a, b| b.rank.cmp(&a.rank));
        Ok(ranked)
    }

    pub async fn unranked_applicants(&self, id: &RecruitmentId) -> Result<Vec<Applicant>> {
        Ok(self
            .reader
            .find_applicants(id)
            .await?
            .into_iter()
            .filter(|a| !a.is_ranked())
            .collect())
    }

    /// Recruitment plus its applicants and interviews
    pub async fn recruitment_details(&self, id: &RecruitmentId) -> Result<RecruitmentDetails> {
        let recruitment = self
            .reader
            .find_recruitment(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("recruitment {}", id)))?;

        Ok(RecruitmentDetails {
            recruitment,
            applicants: self.reader.find_applicants(id).await?,
            interviews: self.reader.find_interviews(id).await?,
        })
    }
}
