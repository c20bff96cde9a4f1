//! Shared harness: a temp-file SQLite store wired like the CLI does it,
//! plus a fault-injecting connection provider.

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};
use hrtrack_core::application::{
    NewApplicant, NewInterview, NewRecruitment, NewRole, RecruitmentService, SequenceAllocator,
    TransactionCoordinator, TxContext,
};
use hrtrack_core::domain::{Applicant, RecruitmentId};
use hrtrack_core::error::{AppError, Result};
use hrtrack_core::port::id_provider::UuidProvider;
use hrtrack_core::port::time_provider::FixedTimeProvider;
use hrtrack_core::port::{Connection, ConnectionProvider, Row, SqlValue};
use hrtrack_infra_sqlite::{
    create_pool, run_migrations, SqliteConnectionProvider, SqliteRecruitmentRepository,
};
use sqlx::SqlitePool;
use std::path::{Path, PathBuf};
use std::sync::Arc;

pub fn at(year: i32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(year, 3, 14)
        .unwrap()
        .and_hms_opt(9, 30, 0)
        .unwrap()
}

pub struct TestStore {
    pub pool: SqlitePool,
    pub provider: SqliteConnectionProvider,
    pub repository: Arc<SqliteRecruitmentRepository>,
    pub allocator: Arc<SequenceAllocator>,
    pub service: RecruitmentService,
}

impl TestStore {
    /// Open (or reopen) the store at `path` and run sequence recovery
    pub async fn open(path: &Path) -> Self {
        let url = format!("sqlite://{}", path.display());
        let pool = create_pool(&url, 5).await.unwrap();
        run_migrations(&pool).await.unwrap();

        let repository = Arc::new(SqliteRecruitmentRepository::new(pool.clone()));
        let allocator = Arc::new(SequenceAllocator::new());
        allocator.recover_from(repository.as_ref()).await.unwrap();

        let provider = SqliteConnectionProvider::new(pool.clone());
        let service = service_with(
            Arc::new(provider.clone()),
            allocator.clone(),
            repository.clone(),
            2024,
        );

        Self {
            pool,
            provider,
            repository,
            allocator,
            service,
        }
    }

    /// Another service over the same store and allocator, through `provider`
    pub fn service_via(&self, provider: Arc<dyn ConnectionProvider>) -> RecruitmentService {
        service_with(provider, self.allocator.clone(), self.repository.clone(), 2024)
    }

    /// Same store and allocator, clock set to `year`
    pub fn service_in_year(&self, year: i32) -> RecruitmentService {
        service_with(
            Arc::new(self.provider.clone()),
            self.allocator.clone(),
            self.repository.clone(),
            year,
        )
    }

    pub async fn count(&self, table: &str) -> i64 {
        sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {}", table))
            .fetch_one(&self.pool)
            .await
            .unwrap()
    }

    pub async fn count_for(&self, table: &str, id: RecruitmentId) -> i64 {
        let column = if table == "recruitments" {
            "id"
        } else {
            "recruitment_id"
        };
        sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {} WHERE {} = ?", table, column))
            .bind(id.to_string())
            .fetch_one(&self.pool)
            .await
            .unwrap()
    }

    pub async fn close(self) {
        self.pool.close().await;
    }
}

pub fn db_path(dir: &tempfile::TempDir) -> PathBuf {
    dir.path().join("recruitment.db")
}

fn service_with(
    provider: Arc<dyn ConnectionProvider>,
    allocator: Arc<SequenceAllocator>,
    repository: Arc<SqliteRecruitmentRepository>,
    year: i32,
) -> RecruitmentService {
    RecruitmentService::new(
        Arc::new(TransactionCoordinator::new(provider)),
        allocator,
        repository,
        Arc::new(UuidProvider),
        Arc::new(FixedTimeProvider(at(year))),
    )
}

pub async fn create_role(service: &RecruitmentService) -> String {
    let mut ctx = TxContext::new();
    service
        .create_role(
            &mut ctx,
            NewRole {
                title: "Backend Engineer".into(),
                description: None,
                department: Some("Platform".into()),
            },
        )
        .await
        .unwrap()
        .id
}

pub async fn create_recruitment(service: &RecruitmentService, role_id: &str) -> RecruitmentId {
    let mut ctx = TxContext::new();
    service
        .create_recruitment(
            &mut ctx,
            NewRecruitment {
                role_id: role_id.to_string(),
                application_deadline: NaiveDate::from_ymd_opt(2024, 6, 30).unwrap(),
            },
        )
        .await
        .unwrap()
        .id
}

pub async fn add_applicant(
    service: &RecruitmentService,
    recruitment: RecruitmentId,
    first_name: &str,
) -> Applicant {
    let mut ctx = TxContext::new();
    let applicant = service
        .register_applicant(
            &mut ctx,
            NewApplicant {
                first_name: first_name.into(),
                last_name: "Tester".into(),
                email: format!("{}@example.com", first_name.to_lowercase()),
                phone: None,
            },
        )
        .await
        .unwrap();
    service
        .add_applicant_to_recruitment(&mut ctx, applicant.clone(), recruitment)
        .await
        .unwrap();
    applicant
}

pub async fn schedule(service: &RecruitmentService, recruitment: RecruitmentId, applicant: &str) {
    let mut ctx = TxContext::new();
    service
        .schedule_interview(
            &mut ctx,
            NewInterview {
                recruitment_id: recruitment,
                applicant_id: applicant.to_string(),
                date_time: at(2024),
                location: Some("Room 4".into()),
                interviewer: None,
            },
        )
        .await
        .unwrap();
}

/// Recruitment with three applications and two interviews (six rows in all)
pub async fn seed_recruitment(service: &RecruitmentService, role_id: &str) -> RecruitmentId {
    let id = create_recruitment(service, role_id).await;
    let ada = add_applicant(service, id, "Ada").await;
    let grace = add_applicant(service, id, "Grace").await;
    add_applicant(service, id, "Linus").await;
    schedule(service, id, &ada.id).await;
    schedule(service, id, &grace.id).await;
    id
}

// ============================================================================
// Fault injection
// ============================================================================

/// Wraps a real provider; any executed statement containing `fail_on` fails
pub struct FaultyProvider {
    inner: Arc<dyn ConnectionProvider>,
    fail_on: String,
}

impl FaultyProvider {
    pub fn new(inner: Arc<dyn ConnectionProvider>, fail_on: impl Into<String>) -> Self {
        Self {
            inner,
            fail_on: fail_on.into(),
        }
    }
}

#[async_trait]
impl ConnectionProvider for FaultyProvider {
    async fn acquire(&self) -> Result<Box<dyn Connection>> {
        Ok(Box::new(FaultyConnection {
            inner: self.inner.acquire().await?,
            fail_on: self.fail_on.clone(),
        }))
    }
}

struct FaultyConnection {
    inner: Box<dyn Connection>,
    fail_on: String,
}

#[async_trait]
impl Connection for FaultyConnection {
    async fn begin(&mut self) -> Result<()> {
        self.inner.begin().await
    }

    async fn execute(&mut self, statement: &str, params: &[SqlValue]) -> Result<u64> {
        if statement.contains(self.fail_on.as_str()) {
            return Err(AppError::Database(format!(
                "injected failure on: {}",
                self.fail_on
            )));
        }
        self.inner.execute(statement, params).await
    }

    async fn query(&mut self, statement: &str, params: &[SqlValue]) -> Result<Vec<Row>> {
        self.inner.query(statement, params).await
    }

    async fn commit(&mut self) -> Result<()> {
        self.inner.commit().await
    }

    async fn rollback(&mut self) -> Result<()> {
        self.inner.rollback().await
    }

    async fn close(self: Box<Self>) -> Result<()> {
        self.inner.close().await
    }
}
