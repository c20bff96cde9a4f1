// Update Use Cases - recruitment status, applicant rank, interview changes

use super::RecruitmentService;
use crate::application::statements::*;
use crate::application::transaction::TxContext;
use crate::domain::people::MAX_RANK;
use crate::domain::{
    ApplicantId, DomainError, InterviewId, InterviewStatus, RecruitmentId, RecruitmentStatus,
};
use crate::error::{AppError, Result};
use crate::port::SqlValue;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use tracing::info;

/// Fields of a recruitment that may change after creation (None = keep)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RecruitmentUpdate {
    #[serde(default)]
    pub status: Option<RecruitmentStatus>,

    #[serde(default)]
    pub offer_acceptance_date: Option<NaiveDateTime>,
}

impl RecruitmentUpdate {
    fn is_empty(&self) -> bool {
        self.status.is_none() && self.offer_acceptance_date.is_none()
    }
}

impl RecruitmentService {
    /// Change the status and/or offer acceptance date of a recruitment
    pub async fn update_recruitment(
        &self,
        ctx: &mut TxContext,
        id: RecruitmentId,
        update: RecruitmentUpdate,
    ) -> Result<()> {
        if update.is_empty() {
            return Err(AppError::Validation(format!(
                "no changes given for recruitment {}",
                id
            )));
        }

        let status = update.status;
        self.coordinator
            .run(ctx, move |ctx| {
                Box::pin(async move {
                    let rows = ctx
                        .connection()?
                        .execute(
                            UPDATE_RECRUITMENT,
                            &[
                                SqlValue::from(update.status.map(|s| s.as_str())),
                                SqlValue::from(update.offer_acceptance_date),
                                SqlValue::from(id.to_string()),
                            ],
                        )
                        .await?;
                    if rows == 0 {
                        return Err(AppError::NotFound(format!("recruitment {}", id)));
                    }
                    Ok::<_, AppError>(())
                })
            })
            .await?;

        info!(recruitment_id = %id, status = ?status, "Recruitment updated");
        Ok(())
    }

    /// Set an applicant's rank (0 = unranked)
    pub async fn update_applicant_rank(
        &self,
        ctx: &mut TxContext,
        applicant_id: ApplicantId,
        rank: i32,
    ) -> Result<()> {
        if !(0..=MAX_RANK).contains(&rank) {
            return Err(DomainError::InvalidRank(rank).into());
        }

        let log_applicant = applicant_id.clone();
        self.coordinator
            .run(ctx, move |ctx| {
                Box::pin(async move {
                    let rows = ctx
                        .connection()?
                        .execute(
                            UPDATE_APPLICANT_RANK,
                            &[SqlValue::from(rank), SqlValue::from(&applicant_id)],
                        )
                        .await?;
                    if rows == 0 {
                        return Err(AppError::NotFound(format!("applicant {}", applicant_id)));
                    }
                    Ok::<_, AppError>(())
                })
            })
            .await?;

        info!(applicant_id = %log_applicant, rank, "Applicant rank updated");
        Ok(())
    }

    /// Move an interview to `date_time` and mark it RESCHEDULED
    pub async fn reschedule_interview(
        &self,
        ctx: &mut TxContext,
        interview_id: InterviewId,
        date_time: NaiveDateTime,
    ) -> Result<()> {
        let log_interview = interview_id.clone();
        self.coordinator
            .run(ctx, move |ctx| {
                Box::pin(async move {
                    ensure_interview_open(ctx, &interview_id).await?;
                    ctx.connection()?
                        .execute(
                            UPDATE_INTERVIEW_SCHEDULE,
                            &[
                                SqlValue::from(date_time),
                                SqlValue::from(InterviewStatus::Rescheduled.to_string()),
                                SqlValue::from(&interview_id),
                            ],
                        )
                        .await?;
                    Ok::<_, AppError>(())
                })
            })
            .await?;

        info!(interview_id = %log_interview, at = %date_time, "Interview rescheduled");
        Ok(())
    }

    /// Mark an interview CANCELLED
    pub async fn cancel_interview(&self, ctx: &mut TxContext, interview_id: InterviewId) -> Result<()> {
        let log_interview = interview_id.clone();
        self.coordinator
            .run(ctx, move |ctx| {
                Box::pin(async move {
                    ensure_interview_open(ctx, &interview_id).await?;
                    ctx.connection()?
                        .execute(
                            UPDATE_INTERVIEW_STATUS,
                            &[
                                SqlValue::from(InterviewStatus::Cancelled.to_string()),
                                SqlValue::from(&interview_id),
                            ],
                        )
                        .await?;
                    Ok::<_, AppError>(())
                })
            })
            .await?;

        info!(interview_id = %log_interview, "Interview cancelled");
        Ok(())
    }
}

/// Status of an interview that may still change
///
/// Completed and cancelled interviews are final.
async fn ensure_interview_open(
    ctx: &mut TxContext,
    interview_id: &InterviewId,
) -> Result<InterviewStatus> {
    let rows = ctx
        .connection()?
        .query(SELECT_INTERVIEW_STATUS, &[SqlValue::from(interview_id)])
        .await?;
    let Some(row) = rows.first() else {
        return Err(AppError::NotFound(format!("interview {}", interview_id)));
    };

    let status: InterviewStatus = row.get_str(0)?.parse()?;
    match status {
        InterviewStatus::Completed | InterviewStatus::Cancelled => Err(AppError::Validation(
            format!("interview {} is {} and can no longer change", interview_id, status),
        )),
        open => Ok(open),
    }
}
