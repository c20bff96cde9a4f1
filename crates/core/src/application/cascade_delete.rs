// Cascading Delete - a recruitment together with everything referencing it

use crate::application::statements::*;
use crate::application::transaction::{TransactionCoordinator, TxContext};
use crate::domain::{ApplicantId, InterviewId, RecruitmentId};
use crate::error::{AppError, Result};
use crate::port::SqlValue;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// A recruitment and the rows that reference it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CascadeSet {
    pub root: RecruitmentId,
    pub interview_ids: Vec<InterviewId>,
    /// Applicants linked through the applications table
    pub applicant_ids: Vec<ApplicantId>,
}

/// Rows removed by a cascade (the root row itself is always exactly one)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CascadeSummary {
    pub interviews: u64,
    pub applications: u64,
}

impl CascadeSummary {
    pub fn total_rows(&self) -> u64 {
        self.interviews + self.applications + 1
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    Deleted(CascadeSummary),
    NotFound,
}

/// Deletes recruitments with their interviews and application links as one unit
#[derive(Clone)]
pub struct CascadingDelete {
    coordinator: Arc<TransactionCoordinator>,
}

impl CascadingDelete {
    pub fn new(coordinator: Arc<TransactionCoordinator>) -> Self {
        Self { coordinator }
    }

    /// Delete `id` and its dependents, children before parent
    ///
    /// A missing recruitment is reported as `DeleteOutcome::NotFound` and
    /// nothing is modified. Any failure rolls the whole cascade back.
    pub async fn delete_recruitment(
        &self,
        ctx: &mut TxContext,
        id: RecruitmentId,
    ) -> Result<DeleteOutcome> {
        let this = self.clone();
        self.coordinator
            .run(ctx, move |ctx| {
                Box::pin(async move {
                    let Some(cascade) = this.resolve(ctx, id).await? else {
                        debug!(recruitment_id = %id, "Recruitment not found, nothing to delete");
                        return Ok(DeleteOutcome::NotFound);
                    };

                    let interviews = this.delete_interviews(ctx, id).await?;
                    let applications = this.delete_application_links(ctx, id).await?;

                    let removed = ctx
                        .connection()?
                        .execute(DELETE_RECRUITMENT, &[SqlValue::from(id.to_string())])
                        .await?;
                    if removed != 1 {
                        return Err(AppError::InvalidState(format!(
                            "expected to delete one recruitment row for {}, deleted {}",
                            id, removed
                        )));
                    }

                    if interviews != cascade.interview_ids.len() as u64
                        || applications != cascade.applicant_ids.len() as u64
                    {
                        warn!(
                            recruitment_id = %id,
                            resolved_interviews = cascade.interview_ids.len(),
                            deleted_interviews = interviews,
                            resolved_applications = cascade.applicant_ids.len(),
                            deleted_applications = applications,
                            "Cascade changed between resolution and delete"
                        );
                    }

                    let summary = CascadeSummary {
                        interviews,
                        applications,
                    };
                    info!(
                        recruitment_id = %id,
                        interviews,
                        applications,
                        total_rows = summary.total_rows(),
                        "Recruitment deleted with dependents"
                    );
                    Ok::<_, AppError>(DeleteOutcome::Deleted(summary))
                })
            })
            .await
    }

    /// Compute the cascade set of `id` (None if the recruitment does not exist)
    pub async fn resolve(&self, ctx: &mut TxContext, id: RecruitmentId) -> Result<Option<CascadeSet>> {
        self.coordinator
            .run(ctx, move |ctx| {
                Box::pin(async move {
                    let key = SqlValue::from(id.to_string());
                    let conn = ctx.connection()?;

                    if conn
                        .query(SELECT_RECRUITMENT_EXISTS, std::slice::from_ref(&key))
                        .await?
                        .is_empty()
                    {
                        return Ok(None);
                    }

                    let interview_ids = conn
                        .query(SELECT_INTERVIEW_IDS_BY_RECRUITMENT, std::slice::from_ref(&key))
                        .await?
                        .iter()
                        .map(|row| row.get_str(0).map(str::to_string))
                        .collect::<Result<Vec<_>>>()?;

                    let applicant_ids = conn
                        .query(SELECT_APPLICANT_IDS_BY_RECRUITMENT, std::slice::from_ref(&key))
                        .await?
                        .iter()
                        .map(|row| row.get_str(0).map(str::to_string))
                        .collect::<Result<Vec<_>>>()?;

                    Ok::<_, AppError>(Some(CascadeSet {
                        root: id,
                        interview_ids,
                        applicant_ids,
                    }))
                })
            })
            .await
    }

    /// Delete every interview of `id`
    pub async fn delete_interviews(&self, ctx: &mut TxContext, id: RecruitmentId) -> Result<u64> {
        self.coordinator
            .run(ctx, move |ctx| {
                Box::pin(async move {
                    ctx.connection()?
                        .execute(
                            DELETE_INTERVIEWS_BY_RECRUITMENT,
                            &[SqlValue::from(id.to_string())],
                        )
                        .await
                })
            })
            .await
    }

    /// Delete every application link of `id`
    pub async fn delete_application_links(
        &self,
        ctx: &mut TxContext,
        id: RecruitmentId,
    ) -> Result<u64> {
        self.coordinator
            .run(ctx, move |ctx| {
                Box::pin(async move {
                    ctx.connection()?
                        .execute(
                            DELETE_APPLICATIONS_BY_RECRUITMENT,
                            &[SqlValue::from(id.to_string())],
                        )
                        .await
                })
            })
            .await
    }
}
