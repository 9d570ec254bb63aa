//! Tests for the PostgreSQL version ledger.
//!
//! Require a reachable database in `DATABASE_URL`; run with
//! `cargo test -p genvault_ledger --features database -- --ignored`.

#![cfg(feature = "database")]

use genvault_core::ProjectId;
use genvault_error::{GenvaultErrorKind, LedgerErrorKind};
use genvault_ledger::{
    Completion, GenerationDraft, PostgresVersionLedger, VersionLedger, establish_connection,
    run_migrations,
};

fn ledger() -> PostgresVersionLedger {
    let mut conn = establish_connection(None).expect("DATABASE_URL must point at a test database");
    run_migrations(&mut conn).unwrap();
    PostgresVersionLedger::new(conn)
}

#[tokio::test]
#[ignore = "requires DATABASE_URL"]
async fn test_postgres_versions_and_activation() {
    let ledger = ledger();
    let project = ProjectId::new();

    let first = ledger.next_version(GenerationDraft::new(project)).await.unwrap();
    let second = ledger.next_version(GenerationDraft::new(project)).await.unwrap();
    assert_eq!((first.version, second.version), (1, 2));

    for id in [first.id, second.id] {
        ledger
            .mark_completed(
                id,
                Completion {
                    storage_path: format!("/tmp/{id}"),
                    file_count: 1,
                    total_size_bytes: 1,
                    ..Completion::default()
                },
            )
            .await
            .unwrap();
    }

    ledger.activate(project, first.id).await.unwrap();
    ledger.activate(project, second.id).await.unwrap();
    let active: Vec<_> = ledger
        .list_generations(project)
        .await
        .unwrap()
        .into_iter()
        .filter(|g| g.is_active)
        .collect();
    assert_eq!(active.len(), 1);
    assert_eq!(active[0].id, second.id);

    let err = ledger.delete(second.id).await.unwrap_err();
    match err.kind() {
        GenvaultErrorKind::Ledger(e) => {
            assert!(matches!(e.kind, LedgerErrorKind::ActiveGenerationProtected(_)))
        }
        other => panic!("unexpected error {other}"),
    }
    ledger.delete(first.id).await.unwrap();
    assert_eq!(ledger.get_project(project).await.unwrap().latest_version, 2);
}
