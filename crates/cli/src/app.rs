// Composition Root - pool, migrations, sequence recovery, service wiring

use anyhow::{Context, Result};
use hrtrack_core::application::{RecruitmentService, SequenceAllocator, TransactionCoordinator};
use hrtrack_core::port::id_provider::UuidProvider;
use hrtrack_core::port::time_provider::SystemTimeProvider;
use hrtrack_infra_sqlite::{
    create_pool, run_migrations, SqliteConnectionProvider, SqliteRecruitmentRepository,
};
use std::path::Path;
use std::sync::Arc;
use tracing::{error, info};

pub struct Settings {
    /// File path, or `:memory:`
    pub db_path: String,
    pub max_connections: u32,
}

impl Settings {
    fn database_url(&self) -> Result<String> {
        if self.db_path == ":memory:" {
            return Ok("sqlite::memory:".to_string());
        }

        let path = shellexpand::tilde(&self.db_path).into_owned();
        if let Some(parent) = Path::new(&path).parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).with_context(|| {
                    format!("Failed to create database directory {}", parent.display())
                })?;
            }
        }
        Ok(format!("sqlite://{}", path))
    }
}

pub struct App {
    pub service: RecruitmentService,
    provider: SqliteConnectionProvider,
}

impl App {
    pub async fn bootstrap(settings: &Settings) -> Result<Self> {
        let database_url = settings.database_url()?;
        info!(db = %database_url, "Initializing database...");

        let pool = create_pool(&database_url, settings.max_connections)
            .await
            .context("DB pool creation failed")?;
        run_migrations(&pool).await.context("Migration failed")?;

        let repository = Arc::new(SqliteRecruitmentRepository::new(pool.clone()));
        let provider = SqliteConnectionProvider::new(pool);

        // Recovery must run before any id is handed out
        let allocator = Arc::new(SequenceAllocator::new());
        match allocator.recover_from(repository.as_ref()).await {
            Ok(report) => info!(
                recovered = report.recovered,
                skipped = report.skipped.len(),
                "Sequence recovery completed"
            ),
            // Creation stays unavailable; reads and deletes still work
            Err(e) => error!(error = %e, "Sequence recovery failed"),
        }

        let coordinator = Arc::new(TransactionCoordinator::new(Arc::new(provider.clone())));
        let service = RecruitmentService::new(
            coordinator,
            allocator,
            repository,
            Arc::new(UuidProvider),
            Arc::new(SystemTimeProvider),
        );

        Ok(Self { service, provider })
    }

    pub async fn shutdown(self) {
        if let Ok(snapshot) = self.service.allocator().snapshot().await {
            info!(?snapshot, "Sequence state at shutdown");
        }
        self.provider.pool().close().await;
    }
}
