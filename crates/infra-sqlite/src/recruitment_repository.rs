// SQLite Recruitment Read-side Implementation

use crate::error::map_sqlx_error;
use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};
use hrtrack_core::domain::{Applicant, Interview, Recruitment, RecruitmentId};
use hrtrack_core::error::Result;
use hrtrack_core::port::{RecruitmentIdSource, RecruitmentReader};
use sqlx::SqlitePool;
use tracing::warn;

/// Reads recruitments straight from the pool (auto-commit, outside any
/// coordinated transaction)
#[derive(Clone)]
pub struct SqliteRecruitmentRepository {
    pool: SqlitePool,
}

impl SqliteRecruitmentRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RecruitmentIdSource for SqliteRecruitmentRepository {
    async fn load_recruitment_ids(&self) -> Result<Vec<String>> {
        sqlx::query_scalar("SELECT id FROM recruitments")
            .fetch_all(&self.pool)
            .await
            .map_err(map_sqlx_error)
    }
}

#[async_trait]
impl RecruitmentReader for SqliteRecruitmentRepository {
    async fn find_recruitment(&self, id: &RecruitmentId) -> Result<Option<Recruitment>> {
        let row: Option<RecruitmentRow> =
            sqlx::query_as(&format!("{} WHERE id = ?", SELECT_RECRUITMENT))
                .bind(id.to_string())
                .fetch_optional(&self.pool)
                .await
                .map_err(map_sqlx_error)?;

        row.map(RecruitmentRow::into_recruitment).transpose()
    }

    async fn list_recruitments(&self) -> Result<Vec<Recruitment>> {
        let rows: Vec<RecruitmentRow> = sqlx::query_as(SELECT_RECRUITMENT)
            .fetch_all(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        let mut recruitments: Vec<Recruitment> = rows
            .into_iter()
            .filter_map(|row| {
                let raw_id = row.id.clone();
                match row.into_recruitment() {
                    Ok(recruitment) => Some(recruitment),
                    Err(e) => {
                        warn!(id = %raw_id, error = %e, "Skipping unreadable recruitment row");
                        None
                    }
                }
            })
            .collect();

        // Numeric order: "HR 2024/10" after "HR 2024/9"
        recruitments.sort_by_key(|r| r.id);
        Ok(recruitments)
    }

    async fn find_applicants(&self, id: &RecruitmentId) -> Result<Vec<Applicant>> {
        let rows: Vec<ApplicantRow> = sqlx::query_as(
            r#"
            SELECT a.id, a.first_name, a.last_name, a.email, a.phone,
                   a.application_date, a.rank
            FROM applicants a
            JOIN applications ap ON ap.applicant_id = a.id
            WHERE ap.recruitment_id = ?
            ORDER BY a.rank = 0, a.rank, a.last_name, a.first_name
            "#,
        )
        .bind(id.to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        Ok(rows.into_iter().map(ApplicantRow::into_applicant).collect())
    }

    async fn find_interviews(&self, id: &RecruitmentId) -> Result<Vec<Interview>> {
        let rows: Vec<InterviewRow> = sqlx::query_as(
            r#"
            SELECT id, recruitment_id, applicant_id, date_time, location,
                   interviewer, status, notes
            FROM interviews
            WHERE recruitment_id = ?
            ORDER BY date_time, id
            "#,
        )
        .bind(id.to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        rows.into_iter().map(InterviewRow::into_interview).collect()
    }
}

const SELECT_RECRUITMENT: &str = r#"
    SELECT id, role_id, application_deadline, posting_date,
           offer_acceptance_date, status
    FROM recruitments
"#;

#[derive(Debug, sqlx::FromRow)]
struct RecruitmentRow {
    id: String,
    role_id: String,
    application_deadline: NaiveDate,
    posting_date: NaiveDateTime,
    offer_acceptance_date: Option<NaiveDateTime>,
    status: String,
}

impl RecruitmentRow {
    fn into_recruitment(self) -> Result<Recruitment> {
        Ok(Recruitment {
            id: self.id.parse()?,
            role_id: self.role_id,
            application_deadline: self.application_deadline,
            posting_date: self.posting_date,
            offer_acceptance_date: self.offer_acceptance_date,
            status: self.status.parse()?,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct ApplicantRow {
    id: String,
    first_name: String,
    last_name: String,
    email: String,
    phone: Option<String>,
    application_date: NaiveDate,
    rank: i32,
}

impl ApplicantRow {
    fn into_applicant(self) -> Applicant {
        Applicant {
            id: self.id,
            first_name: self.first_name,
            last_name: self.last_name,
            email: self.email,
            phone: self.phone,
            application_date: self.application_date,
            rank: self.rank,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct InterviewRow {
    id: String,
    recruitment_id: String,
    applicant_id: String,
    date_time: NaiveDateTime,
    location: Option<String>,
    interviewer: Option<String>,
    status: String,
    notes: String,
}

impl InterviewRow {
    fn into_interview(self) -> Result<Interview> {
        Ok(Interview {
            id: self.id,
            recruitment_id: self.recruitment_id.parse()?,
            applicant_id: self.applicant_id,
            date_time: self.date_time,
            location: self.location,
            interviewer: self.interviewer,
            status: self.status.parse()?,
            notes: self.notes,
        })
    }
}
