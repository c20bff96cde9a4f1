// Application Use Cases - applicants, application links and interviews

use super::{RecruitmentService, APPLICANT_ID_PREFIX, INTERVIEW_ID_PREFIX};
use crate::application::statements::*;
use crate::application::transaction::TxContext;
use crate::domain::{Applicant, ApplicantId, Interview, InterviewStatus, RecruitmentId};
use crate::error::{AppError, Result};
use crate::port::SqlValue;
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewApplicant {
    pub first_name: String,
    pub last_name: String,
    pub email: String,

    #[serde(default)]
    pub phone: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewInterview {
    pub recruitment_id: RecruitmentId,
    pub applicant_id: ApplicantId,
    pub date_time: NaiveDateTime,

    #[serde(default)]
    pub location: Option<String>,

    #[serde(default)]
    pub interviewer: Option<String>,
}

/// What `remove_applicant_from_recruitment` deleted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RemovalSummary {
    pub interviews: u64,
    pub link_removed: bool,
}

impl RecruitmentService {
    /// Store a new unranked applicant
    pub async fn register_applicant(
        &self,
        ctx: &mut TxContext,
        req: NewApplicant,
    ) -> Result<Applicant> {
        let first_name = req.first_name.trim().to_string();
        let last_name = req.last_name.trim().to_string();
        let email = req.email.trim().to_string();
        if first_name.is_empty() || last_name.is_empty() {
            return Err(AppError::Validation(
                "applicant first and last name are required".to_string(),
            ));
        }
        if !email.contains('@') {
            return Err(AppError::Validation(format!("invalid email address: {}", email)));
        }

        let applicant = Applicant {
            id: self.id_provider.generate_id(APPLICANT_ID_PREFIX),
            first_name,
            last_name,
            email,
            phone: req.phone,
            application_date: self.time_provider.now().date(),
            rank: 0,
        };

        self.ensure_applicant(ctx, applicant.clone()).await?;
        info!(applicant_id = %applicant.id, "Applicant registered");
        Ok(applicant)
    }

    /// Link `applicant` to a recruitment, storing the applicant first if needed
    ///
    /// Idempotent: returns false when the link already existed.
    pub async fn add_applicant_to_recruitment(
        &self,
        ctx: &mut TxContext,
        applicant: Applicant,
        recruitment_id: RecruitmentId,
    ) -> Result<bool> {
        let this = self.clone();
        let applicant_id = applicant.id.clone();

        let linked = self
            .coordinator
            .run(ctx, move |ctx| {
                Box::pin(async move {
                    let rid = SqlValue::from(recruitment_id.to_string());
                    let recruitment_exists = !ctx
                        .connection()?
                        .query(SELECT_RECRUITMENT_EXISTS, std::slice::from_ref(&rid))
                        .await?
                        .is_empty();
                    if !recruitment_exists {
                        return Err(AppError::NotFound(format!("recruitment {}", recruitment_id)));
                    }

                    let application_date = applicant.application_date;
                    let applicant_id = applicant.id.clone();
                    this.ensure_applicant(ctx, applicant).await?;
                    this.link_applicant(ctx, applicant_id, recruitment_id, application_date)
                        .await
                })
            })
            .await?;

        if linked {
            info!(
                applicant_id = %applicant_id,
                recruitment_id = %recruitment_id,
                "Applicant linked to recruitment"
            );
        } else {
            debug!(
                applicant_id = %applicant_id,
                recruitment_id = %recruitment_id,
                "Applicant already linked"
            );
        }
        Ok(linked)
    }

    /// Delete the applicant's interviews for the recruitment, then the link
    pub async fn remove_applicant_from_recruitment(
        &self,
        ctx: &mut TxContext,
        applicant_id: ApplicantId,
        recruitment_id: RecruitmentId,
    ) -> Result<RemovalSummary> {
        let log_applicant = applicant_id.clone();

        let summary = self
            .coordinator
            .run(ctx, move |ctx| {
                Box::pin(async move {
                    let key = [
                        SqlValue::from(applicant_id),
                        SqlValue::from(recruitment_id.to_string()),
                    ];
                    let conn = ctx.connection()?;
                    let interviews = conn.execute(DELETE_INTERVIEWS_BY_APPLICANT, &key).await?;
                    let links = conn.execute(DELETE_APPLICATION, &key).await?;
                    Ok::<_, AppError>(RemovalSummary {
                        interviews,
                        link_removed: links > 0,
                    })
                })
            })
            .await?;

        info!(
            applicant_id = %log_applicant,
            recruitment_id = %recruitment_id,
            interviews = summary.interviews,
            link_removed = summary.link_removed,
            "Applicant removed from recruitment"
        );
        Ok(summary)
    }

    /// Schedule an interview, linking the applicant to the recruitment first
    /// if it has not applied yet
    pub async fn schedule_interview(
        &self,
        ctx: &mut TxContext,
        req: NewInterview,
    ) -> Result<Interview> {
        let interview = Interview {
            id: self.id_provider.generate_id(INTERVIEW_ID_PREFIX),
            recruitment_id: req.recruitment_id,
            applicant_id: req.applicant_id,
            date_time: req.date_time,
            location: req.location,
            interviewer: req.interviewer,
            status: InterviewStatus::Scheduled,
            notes: String::new(),
        };

        let row = interview.clone();
        let this = self.clone();
        let today = self.time_provider.now().date();
        self.coordinator
            .run(ctx, move |ctx| {
                Box::pin(async move {
                    let key = [
                        SqlValue::from(&row.applicant_id),
                        SqlValue::from(row.recruitment_id.to_string()),
                    ];
                    let conn = ctx.connection()?;
                    if conn.query(SELECT_APPLICATION_EXISTS, &key).await?.is_empty() {
                        if conn
                            .query(SELECT_APPLICANT_EXISTS, &key[..1])
                            .await?
                            .is_empty()
                        {
                            return Err(AppError::NotFound(format!("applicant {}", row.applicant_id)));
                        }
                        if conn
                            .query(SELECT_RECRUITMENT_EXISTS, &key[1..])
                            .await?
                            .is_empty()
                        {
                            return Err(AppError::NotFound(format!(
                                "recruitment {}",
                                row.recruitment_id
                            )));
                        }
                        this.link_applicant(ctx, row.applicant_id.clone(), row.recruitment_id, today)
                            .await?;
                    }

                    let [applicant_id, recruitment_id] = key;
                    ctx.connection()?.execute(
                        INSERT_INTERVIEW,
                        &[
                            SqlValue::from(&row.id),
                            recruitment_id,
                            applicant_id,
                            SqlValue::from(row.date_time),
                            SqlValue::from(row.location),
                            SqlValue::from(row.interviewer),
                            SqlValue::from(row.status.to_string()),
                            SqlValue::from(row.notes),
                        ],
                    )
                    .await?;
                    Ok::<_, AppError>(())
                })
            })
            .await?;

        info!(
            interview_id = %interview.id,
            recruitment_id = %interview.recruitment_id,
            applicant_id = %interview.applicant_id,
            at = %interview.date_time,
            "Interview scheduled"
        );
        Ok(interview)
    }

    /// Insert the application link unless it exists; true if inserted
    async fn link_applicant(
        &self,
        ctx: &mut TxContext,
        applicant_id: ApplicantId,
        recruitment_id: RecruitmentId,
        application_date: NaiveDate,
    ) -> Result<bool> {
        self.coordinator
            .run(ctx, move |ctx| {
                Box::pin(async move {
                    let conn = ctx.connection()?;
                    let key = [
                        SqlValue::from(applicant_id),
                        SqlValue::from(recruitment_id.to_string()),
                    ];
                    if !conn.query(SELECT_APPLICATION_EXISTS, &key).await?.is_empty() {
                        return Ok(false);
                    }

                    let [aid, rid] = key;
                    conn.execute(
                        INSERT_APPLICATION,
                        &[aid, rid, SqlValue::from(application_date)],
                    )
                    .await?;
                    Ok::<_, AppError>(true)
                })
            })
            .await
    }

    /// Insert the applicant unless a row with its id exists; true if inserted
    async fn ensure_applicant(&self, ctx: &mut TxContext, applicant: Applicant) -> Result<bool> {
        self.coordinator
            .run(ctx, move |ctx| {
                Box::pin(async move {
                    let conn = ctx.connection()?;
                    let id = SqlValue::from(&applicant.id);
                    if !conn
                        .query(SELECT_APPLICANT_EXISTS, std::slice::from_ref(&id))
                        .await?
                        .is_empty()
                    {
                        return Ok(false);
                    }

                    conn.execute(
                        INSERT_APPLICANT,
                        &[
                            id,
                            SqlValue::from(applicant.first_name),
                            SqlValue::from(applicant.last_name),
                            SqlValue::from(applicant.email),
                            SqlValue::from(applicant.phone),
                            SqlValue::from(applicant.application_date),
                            SqlValue::from(applicant.rank),
                        ],
                    )
                    .await?;
                    Ok::<_, AppError>(true)
                })
            })
            .await
    }
}
