// Create Use Cases - roles and recruitments

use super::{RecruitmentService, ROLE_ID_PREFIX};
use crate::application::statements::{INSERT_RECRUITMENT, INSERT_ROLE, SELECT_ROLE_EXISTS};
use crate::application::transaction::TxContext;
use crate::domain::{Recruitment, Role, RoleId};
use crate::error::{AppError, Result};
use crate::port::SqlValue;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::info;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewRole {
    pub title: String,

    #[serde(default)]
    pub description: Option<String>,

    #[serde(default)]
    pub department: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewRecruitment {
    pub role_id: RoleId,
    pub application_deadline: NaiveDate,
}

impl RecruitmentService {
    pub async fn create_role(&self, ctx: &mut TxContext, req: NewRole) -> Result<Role> {
        let title = req.title.trim().to_string();
        if title.is_empty() {
            return Err(AppError::Validation("role title must not be empty".to_string()));
        }

        let role = Role {
            id: self.id_provider.generate_id(ROLE_ID_PREFIX),
            title,
            description: req.description,
            department: req.department,
        };

        let row = role.clone();
        self.coordinator
            .run(ctx, move |ctx| {
                Box::pin(async move {
                    ctx.connection()?
                        .execute(
                            INSERT_ROLE,
                            &[
                                SqlValue::from(&row.id),
                                SqlValue::from(&row.title),
                                SqlValue::from(row.description),
                                SqlValue::from(row.department),
                            ],
                        )
                        .await?;
                    Ok::<_, AppError>(())
                })
            })
            .await?;

        info!(role_id = %role.id, title = %role.title, "Role created");
        Ok(role)
    }

    /// Create an OPEN recruitment with the next id of the current year
    ///
    /// The id number is published only when the outermost transaction
    /// commits, so a failed creation never leaves a gap in the sequence.
    pub async fn create_recruitment(
        &self,
        ctx: &mut TxContext,
        req: NewRecruitment,
    ) -> Result<Recruitment> {
        let posting_date = self.time_provider.now();
        let year = self.time_provider.current_year();
        let allocator = self.allocator.clone();

        let recruitment = self
            .coordinator
            .run(ctx, move |ctx| {
                Box::pin(async move {
                    let role_exists = !ctx
                        .connection()?
                        .query(SELECT_ROLE_EXISTS, &[SqlValue::from(&req.role_id)])
                        .await?
                        .is_empty();
                    if !role_exists {
                        return Err(AppError::NotFound(format!("role {}", req.role_id)));
                    }

                    let id = allocator.allocate_in(ctx, year).await?;
                    let recruitment =
                        Recruitment::new(id, req.role_id, req.application_deadline, posting_date);

                    ctx.connection()?
                        .execute(
                            INSERT_RECRUITMENT,
                            &[
                                SqlValue::from(recruitment.id.to_string()),
                                SqlValue::from(&recruitment.role_id),
                                SqlValue::from(recruitment.application_deadline),
                                SqlValue::from(recruitment.posting_date),
                                SqlValue::from(recruitment.offer_acceptance_date),
                                SqlValue::from(recruitment.status.as_str()),
                            ],
                        )
                        .await?;
                    Ok::<_, AppError>(recruitment)
                })
            })
            .await?;

        info!(
            recruitment_id = %recruitment.id,
            role_id = %recruitment.role_id,
            deadline = %recruitment.application_deadline,
            "Recruitment created"
        );
        Ok(recruitment)
    }
}
