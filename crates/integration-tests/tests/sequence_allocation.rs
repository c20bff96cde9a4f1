//! Recruitment id allocation against a real SQLite store
//!
//! Ids are `HR <year>/<n>`, dense from 1 within a year, unique under
//! concurrent creation, and recovered from the store on restart.

mod common;

use chrono::NaiveDate;
use common::*;
use hrtrack_core::application::{NewRecruitment, SequenceAllocator, TxContext};
use hrtrack_core::error::AppError;
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

#[tokio::test]
async fn test_concurrent_creation_yields_dense_unique_ids() {
    let dir = tempfile::tempdir().unwrap();
    let store = TestStore::open(&db_path(&dir)).await;
    let role = create_role(&store.service).await;

    let mut handles = Vec::new();
    for _ in 0..20 {
        let service = store.service.clone();
        let role = role.clone();
        handles.push(tokio::spawn(async move {
            let mut ctx = TxContext::new();
            service
                .create_recruitment(
                    &mut ctx,
                    NewRecruitment {
                        role_id: role,
                        application_deadline: NaiveDate::from_ymd_opt(2024, 6, 30).unwrap(),
                    },
                )
                .await
                .map(|r| r.id.number())
        }));
    }

    let mut numbers = BTreeSet::new();
    for handle in handles {
        assert!(numbers.insert(handle.await.unwrap().unwrap()));
    }

    assert_eq!(numbers, (1..=20).collect::<BTreeSet<u32>>());
    assert_eq!(store.count("recruitments").await, 20);

    println!("✅ 20 concurrent creations got HR 2024/1..20");
}

#[tokio::test]
async fn test_numbering_continues_after_restart() {
    let dir = tempfile::tempdir().unwrap();
    let path = db_path(&dir);

    let role = {
        let store = TestStore::open(&path).await;
        let role = create_role(&store.service).await;
        for expected in 1..=3 {
            let id = create_recruitment(&store.service, &role).await;
            assert_eq!(id.to_string(), format!("HR 2024/{}", expected));
        }
        store.close().await;
        role
    };

    let store = TestStore::open(&path).await;
    let id = create_recruitment(&store.service, &role).await;
    assert_eq!(id.to_string(), "HR 2024/4");
}

#[tokio::test]
async fn test_recovery_takes_maximum_and_skips_malformed_ids() {
    let dir = tempfile::tempdir().unwrap();
    let store = TestStore::open(&db_path(&dir)).await;
    let role = create_role(&store.service).await;

    for raw in ["HR 2024/5", "HR 2024/2", "legacy-17", "HR 2023/8"] {
        sqlx::query(
            r#"
            INSERT INTO recruitments (id, role_id, application_deadline, posting_date, status)
            VALUES (?, ?, '2024-06-30', '2024-03-14 09:30:00', 'OPEN')
            "#,
        )
        .bind(raw)
        .bind(&role)
        .execute(&store.pool)
        .await
        .unwrap();
    }

    let allocator = SequenceAllocator::new();
    let report = allocator
        .recover_from(store.repository.as_ref())
        .await
        .unwrap();

    assert_eq!(report.recovered, 3);
    assert_eq!(report.skipped, vec!["legacy-17".to_string()]);
    assert_eq!(report.last_issued.get(&2024), Some(&5));
    assert_eq!(report.last_issued.get(&2023), Some(&8));
    assert_eq!(allocator.allocate_id(2024).await.unwrap().to_string(), "HR 2024/6");
    assert_eq!(allocator.allocate_id(2025).await.unwrap().to_string(), "HR 2025/1");
}

#[tokio::test]
async fn test_failed_creation_does_not_consume_a_number() {
    let dir = tempfile::tempdir().unwrap();
    let store = TestStore::open(&db_path(&dir)).await;
    let role = create_role(&store.service).await;

    let faulty = store.service_via(Arc::new(FaultyProvider::new(
        Arc::new(store.provider.clone()),
        "INSERT INTO recruitments",
    )));
    let mut ctx = TxContext::new();
    let result = faulty
        .create_recruitment(
            &mut ctx,
            NewRecruitment {
                role_id: role.clone(),
                application_deadline: NaiveDate::from_ymd_opt(2024, 6, 30).unwrap(),
            },
        )
        .await;
    assert!(matches!(result, Err(AppError::Database(_))));

    // Unknown role: refused before any number is drawn
    let mut ctx = TxContext::new();
    let result = store
        .service
        .create_recruitment(
            &mut ctx,
            NewRecruitment {
                role_id: "ROLE-missing".into(),
                application_deadline: NaiveDate::from_ymd_opt(2024, 6, 30).unwrap(),
            },
        )
        .await;
    assert!(matches!(result, Err(AppError::NotFound(_))));

    let id = create_recruitment(&store.service, &role).await;
    assert_eq!(id.to_string(), "HR 2024/1");
    assert_eq!(store.count("recruitments").await, 1);
}

#[tokio::test]
async fn test_years_are_numbered_independently() {
    let dir = tempfile::tempdir().unwrap();
    let store = TestStore::open(&db_path(&dir)).await;
    let role = create_role(&store.service).await;

    assert_eq!(
        create_recruitment(&store.service, &role).await.to_string(),
        "HR 2024/1"
    );
    let next_year = store.service_in_year(2025);
    assert_eq!(
        create_recruitment(&next_year, &role).await.to_string(),
        "HR 2025/1"
    );
    assert_eq!(
        create_recruitment(&store.service, &role).await.to_string(),
        "HR 2024/2"
    );

    let snapshot = store.allocator.snapshot().await.unwrap();
    assert_eq!(snapshot.get(&2024), Some(&2));
    assert_eq!(snapshot.get(&2025), Some(&1));
}

#[tokio::test]
async fn test_failed_nested_creation_leaves_no_gap_when_outer_commits() {
    let dir = tempfile::tempdir().unwrap();
    let store = TestStore::open(&db_path(&dir)).await;
    let role = create_role(&store.service).await;

    let faulty = store.service_via(Arc::new(FaultyProvider::new(
        Arc::new(store.provider.clone()),
        "INSERT INTO recruitments",
    )));
    let inner = faulty.clone();
    let role_id = role.clone();
    let mut ctx = TxContext::new();
    faulty
        .coordinator()
        .run(&mut ctx, move |ctx| {
            Box::pin(async move {
                let result = inner
                    .create_recruitment(
                        ctx,
                        NewRecruitment {
                            role_id,
                            application_deadline: NaiveDate::from_ymd_opt(2024, 6, 30).unwrap(),
                        },
                    )
                    .await;
                assert!(matches!(result, Err(AppError::Database(_))));
                Ok::<_, AppError>(())
            })
        })
        .await
        .unwrap();

    assert_eq!(store.allocator.snapshot().await.unwrap().get(&2024), Some(&0));
    let id = create_recruitment(&store.service, &role).await;
    assert_eq!(id.to_string(), "HR 2024/1");
}

#[tokio::test]
async fn test_abandoned_creation_releases_the_year() {
    let dir = tempfile::tempdir().unwrap();
    let store = TestStore::open(&db_path(&dir)).await;
    let role = create_role(&store.service).await;

    let service = store.service.clone();
    let role_id = role.clone();
    let mut ctx = TxContext::new();
    let timed_out = tokio::time::timeout(
        Duration::from_millis(100),
        store.service.coordinator().run(&mut ctx, move |ctx| {
            Box::pin(async move {
                service
                    .create_recruitment(
                        ctx,
                        NewRecruitment {
                            role_id,
                            application_deadline: NaiveDate::from_ymd_opt(2024, 6, 30).unwrap(),
                        },
                    )
                    .await?;
                std::future::pending::<()>().await;
                Ok::<_, AppError>(())
            })
        }),
    )
    .await;
    assert!(timed_out.is_err());
    assert!(!ctx.in_transaction());

    let id = tokio::time::timeout(
        Duration::from_secs(10),
        create_recruitment(&store.service, &role),
    )
    .await
    .expect("year stayed locked after the abandoned transaction");
    assert_eq!(id.to_string(), "HR 2024/1");
    assert_eq!(store.count("recruitments").await, 1);
}
