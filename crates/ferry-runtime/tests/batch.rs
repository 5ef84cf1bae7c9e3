//! Batch driver behavior against in-memory provider and store fakes.
//!
//! Time is paused so the inter-record delay and token age are driven by the
//! tokio clock instead of the wall clock.

mod common;

use common::{FakeProvider, MemoryStore, record};
use ferry_audit::{AuditAction, AuditEvent, AuditStatus, MemoryAuditSink};
use ferry_core::{BatchConfig, MigrationProfile};
use ferry_runtime::{BatchDriver, CsvSnapshot, RunError, RunOutcome, write_snapshot};
use std::time::Duration;
use pretty_assertions::assert_eq;

#[tokio::test(start_paused = true)]
async fn test_two_record_scenario() {
    let provider = FakeProvider::with_roles(&["ADMIN", "USER"]);
    let store = MemoryStore::with_records(vec![
        record("1", "a@x.com", Some("5551234"), Some("ADMIN,USER")),
        record("2", "b@x.com", None, None),
    ]);
    let audit = MemoryAuditSink::new();
    let profile = MigrationProfile::users();
    let batch = BatchConfig::default();

    let report = BatchDriver::new(&provider, &store, &audit, &profile, &batch)
        .run_pending(&store)
        .await
        .unwrap();

    {
        let calls = provider.calls();
        assert_eq!(calls.created.len(), 2);
        assert_eq!(calls.created[0].username, "5551234");
        assert_eq!(calls.created[0].attributes["phoneNumber"], vec!["15551234"]);
        assert_eq!(calls.created[1].username, "b@x.com");
        assert!(calls.created[1].attributes.is_empty());
        assert_eq!(
            calls.role_mappings,
            vec![(
                "kc-1".to_string(),
                vec!["ADMIN".to_string(), "USER".to_string()]
            )]
        );
        assert!(calls.passwords.is_empty());
    }

    assert_eq!(store.identity_of("1").as_deref(), Some("kc-1"));
    assert_eq!(store.identity_of("2").as_deref(), Some("kc-2"));

    assert_eq!(audit.count(AuditStatus::Success), 2);
    assert_eq!(audit.count_for(AuditStatus::Success, AuditAction::CreateUser), 2);
    assert_eq!(audit.count_for(AuditStatus::Warning, AuditAction::CreateUser), 1);
    assert_eq!(audit.count(AuditStatus::Error), 0);

    assert_eq!(report.created, 2);
    assert_eq!(report.persisted, 2);
    assert_eq!(report.username_fallbacks, 1);
    assert_eq!(report.outcome(), RunOutcome::Clean);
}

#[tokio::test(start_paused = true)]
async fn test_second_run_finds_nothing_to_do() {
    let provider = FakeProvider::with_roles(&["USER"]);
    let store = MemoryStore::with_records(vec![
        record("1", "a@x.com", Some("5551234"), Some("USER")),
        record("2", "b@x.com", Some("5555678"), None),
    ]);
    let profile = MigrationProfile::users();
    let batch = BatchConfig::default();

    let first_audit = MemoryAuditSink::new();
    let first = BatchDriver::new(&provider, &store, &first_audit, &profile, &batch)
        .run_pending(&store)
        .await
        .unwrap();
    assert_eq!(first.created, 2);

    let second_audit = MemoryAuditSink::new();
    let second = BatchDriver::new(&provider, &store, &second_audit, &profile, &batch)
        .run_pending(&store)
        .await
        .unwrap();

    assert_eq!(second.attempted, 0);
    assert_eq!(provider.calls().created.len(), 2);
    assert!(second_audit.entries().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_blank_role_lists_make_no_role_calls() {
    let provider = FakeProvider::with_roles(&["USER"]);
    let store = MemoryStore::with_records(vec![
        record("1", "a@x.com", Some("1"), None),
        record("2", "b@x.com", Some("2"), Some("")),
        record("3", "c@x.com", Some("3"), Some("   ")),
        record("4", "d@x.com", Some("4"), Some("null")),
        record("5", "e@x.com", Some("5"), Some(" , ,")),
    ]);
    let audit = MemoryAuditSink::new();
    let profile = MigrationProfile::users();
    let batch = BatchConfig::default();

    let report = BatchDriver::new(&provider, &store, &audit, &profile, &batch)
        .run_pending(&store)
        .await
        .unwrap();

    let calls = provider.calls();
    assert!(calls.role_lookups.is_empty());
    assert!(calls.role_mappings.is_empty());
    assert_eq!(audit.count(AuditStatus::Error), 0);
    assert_eq!(report.outcome(), RunOutcome::Clean);
}

#[tokio::test(start_paused = true)]
async fn test_unknown_role_is_skipped_and_the_rest_assigned() {
    let provider = FakeProvider::with_roles(&["ADMIN"]);
    let store = MemoryStore::with_records(vec![record(
        "1",
        "a@x.com",
        Some("5551234"),
        Some("ADMIN, GHOST"),
    )]);
    let audit = MemoryAuditSink::new();
    let profile = MigrationProfile::users();
    let batch = BatchConfig::default();

    let report = BatchDriver::new(&provider, &store, &audit, &profile, &batch)
        .run_pending(&store)
        .await
        .unwrap();

    assert_eq!(
        provider.calls().role_mappings,
        vec![("kc-1".to_string(), vec!["ADMIN".to_string()])]
    );
    assert_eq!(audit.count_for(AuditStatus::Error, AuditAction::AssignRole), 1);
    assert_eq!(audit.count(AuditStatus::Error), 1);
    assert_eq!(report.role_errors, 1);
    assert_eq!(report.outcome(), RunOutcome::WithErrors(1));
    assert_eq!(report.outcome().exit_code(), 2);
    assert_eq!(store.identity_of("1").as_deref(), Some("kc-1"));
}

#[tokio::test(start_paused = true)]
async fn test_only_unknown_roles_means_no_mapping_call() {
    let provider = FakeProvider::with_roles(&[]);
    let store = MemoryStore::with_records(vec![record("1", "a@x.com", Some("1"), Some("X,Y"))]);
    let audit = MemoryAuditSink::new();
    let profile = MigrationProfile::users();
    let batch = BatchConfig::default();

    let report = BatchDriver::new(&provider, &store, &audit, &profile, &batch)
        .run_pending(&store)
        .await
        .unwrap();

    assert!(provider.calls().role_mappings.is_empty());
    assert_eq!(report.role_errors, 2);
}

#[tokio::test(start_paused = true)]
async fn test_failed_mapping_call_is_one_error() {
    let mut provider = FakeProvider::with_roles(&["ADMIN", "USER"]);
    provider.fail_role_mapping = true;
    let store = MemoryStore::with_records(vec![record("1", "a@x.com", Some("1"), Some("ADMIN,USER"))]);
    let audit = MemoryAuditSink::new();
    let profile = MigrationProfile::users();
    let batch = BatchConfig::default();

    let report = BatchDriver::new(&provider, &store, &audit, &profile, &batch)
        .run_pending(&store)
        .await
        .unwrap();

    assert_eq!(report.role_errors, 1);
    assert_eq!(audit.count_for(AuditStatus::Error, AuditAction::AssignRole), 1);
    assert_eq!(report.persisted, 1);
}

#[tokio::test(start_paused = true)]
async fn test_token_is_refreshed_when_it_gets_old() {
    let provider = FakeProvider::with_roles(&[]);
    let records = (1..=10)
        .map(|i| {
            let phone = format!("555{}", i);
            record(&i.to_string(), &format!("u{}@x.com", i), Some(phone.as_str()), None)
        })
        .collect();
    let store = MemoryStore::with_records(records);
    let audit = MemoryAuditSink::new();
    let profile = MigrationProfile::users();
    let batch = BatchConfig {
        delay_ms: 300,
        token_refresh_secs: 1,
        ..BatchConfig::default()
    };

    let report = BatchDriver::new(&provider, &store, &audit, &profile, &batch)
        .run_pending(&store)
        .await
        .unwrap();

    // Records start at 0.0s, 0.3s ... 2.7s; the token passes 1s of age at
    // 1.2s and again at 2.4s.
    assert_eq!(report.token_refreshes, 2);
    assert_eq!(provider.calls().tokens, 3);
    assert_eq!(report.created, 10);
}

#[tokio::test(start_paused = true)]
async fn test_token_is_not_refreshed_inside_the_threshold() {
    let provider = FakeProvider::with_roles(&[]);
    let records = (1..=20)
        .map(|i| record(&i.to_string(), &format!("u{}@x.com", i), Some("1"), None))
        .collect();
    let store = MemoryStore::with_records(records);
    let audit = MemoryAuditSink::new();
    let profile = MigrationProfile::users();
    let batch = BatchConfig::default();

    let report = BatchDriver::new(&provider, &store, &audit, &profile, &batch)
        .run_pending(&store)
        .await
        .unwrap();

    assert_eq!(report.token_refreshes, 0);
    assert_eq!(provider.calls().tokens, 1);
}

#[tokio::test(start_paused = true)]
async fn test_rejected_user_stays_eligible() {
    let provider = FakeProvider::with_roles(&["USER"]).reject_username("5551234");
    let store = MemoryStore::with_records(vec![
        record("1", "a@x.com", Some("5551234"), Some("USER")),
        record("2", "b@x.com", Some("5559999"), Some("USER")),
    ]);
    let audit = MemoryAuditSink::new();
    let profile = MigrationProfile::users();
    let batch = BatchConfig::default();

    let report = BatchDriver::new(&provider, &store, &audit, &profile, &batch)
        .run_pending(&store)
        .await
        .unwrap();

    assert_eq!(report.create_errors, 1);
    assert_eq!(report.created, 1);
    assert_eq!(audit.count_for(AuditStatus::Error, AuditAction::CreateUser), 1);
    assert_eq!(store.identity_of("1"), None);
    assert_eq!(store.identity_of("2").as_deref(), Some("kc-1"));
    assert_eq!(provider.calls().role_mappings.len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_mapping_write_failure_keeps_going() {
    let provider = FakeProvider::with_roles(&[]);
    let mut store = MemoryStore::with_records(vec![
        record("1", "a@x.com", Some("1"), None),
        record("2", "b@x.com", Some("2"), None),
    ]);
    store.fail_writes_for.insert("1".to_string());
    let audit = MemoryAuditSink::new();
    let profile = MigrationProfile::users();
    let batch = BatchConfig::default();

    let report = BatchDriver::new(&provider, &store, &audit, &profile, &batch)
        .run_pending(&store)
        .await
        .unwrap();

    assert_eq!(report.persistence_errors, 1);
    assert_eq!(report.persisted, 1);
    assert_eq!(audit.count_for(AuditStatus::Error, AuditAction::UpdateDb), 1);
    assert_eq!(store.identity_of("1"), None);
    assert_eq!(store.identity_of("2").as_deref(), Some("kc-2"));
}

#[tokio::test(start_paused = true)]
async fn test_customer_profile_creates_role_assigns_it_and_sets_passwords() {
    let provider = FakeProvider::with_roles(&["CUSTOMER_USER"]);
    let store = MemoryStore::with_records(vec![
        record("10", "c1@x.com", Some("5551111"), None),
        record("11", "c2@x.com", None, None),
    ]);
    let audit = MemoryAuditSink::new();
    let profile = MigrationProfile::customers();
    let batch = BatchConfig::default();

    let report = BatchDriver::new(&provider, &store, &audit, &profile, &batch)
        .run_pending(&store)
        .await
        .unwrap();

    {
        let calls = provider.calls();
        assert_eq!(calls.roles_created, vec!["CUSTOMER_USER".to_string()]);
        assert_eq!(calls.created[0].username, "c1@x.com");
        assert_eq!(calls.created[1].username, "c2@x.com");
        assert_eq!(calls.role_mappings.len(), 2);
        assert!(calls.role_mappings.iter().all(|(_, roles)| roles == &["CUSTOMER_USER"]));
        assert_eq!(calls.passwords.len(), 2);
        // resolved once, then served from the run's cache
        assert_eq!(calls.role_lookups, vec!["CUSTOMER_USER".to_string()]);
    }

    assert_eq!(audit.count(AuditStatus::Warning), 0);
    assert_eq!(audit.count_for(AuditStatus::Success, AuditAction::CreateRole), 1);
    assert_eq!(audit.count_for(AuditStatus::Success, AuditAction::SetPassword), 2);
    let issued: Vec<String> = audit
        .entries()
        .into_iter()
        .filter_map(|e| match e.event {
            AuditEvent::SetPassword(detail) => detail.temp_password,
            _ => None,
        })
        .collect();
    assert_eq!(issued.len(), 2);
    assert!(issued.iter().all(|pw| pw.len() == 16));
    assert_eq!(report.roles_ensured, 1);
    assert_eq!(report.outcome(), RunOutcome::Clean);
}

#[tokio::test(start_paused = true)]
async fn test_role_cache_can_be_disabled() {
    let provider = FakeProvider::with_roles(&["USER"]);
    let store = MemoryStore::with_records(vec![
        record("1", "a@x.com", Some("1"), Some("USER")),
        record("2", "b@x.com", Some("2"), Some("USER")),
    ]);
    let audit = MemoryAuditSink::new();
    let profile = MigrationProfile::users();
    let batch = BatchConfig {
        cache_roles: false,
        ..BatchConfig::default()
    };

    BatchDriver::new(&provider, &store, &audit, &profile, &batch)
        .run_pending(&store)
        .await
        .unwrap();

    assert_eq!(provider.calls().role_lookups.len(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_token_failure_aborts_the_run() {
    let mut provider = FakeProvider::with_roles(&[]);
    provider.fail_token = true;
    let store = MemoryStore::with_records(vec![record("1", "a@x.com", Some("1"), None)]);
    let audit = MemoryAuditSink::new();
    let profile = MigrationProfile::users();
    let batch = BatchConfig::default();

    let err = BatchDriver::new(&provider, &store, &audit, &profile, &batch)
        .run_pending(&store)
        .await
        .unwrap_err();

    assert!(matches!(err, RunError::Auth(_)));
    assert_eq!(audit.count_for(AuditStatus::Error, AuditAction::Migration), 1);
    assert!(provider.calls().created.is_empty());
    assert_eq!(store.identity_of("1"), None);
}

#[tokio::test(start_paused = true)]
async fn test_rerun_from_the_same_snapshot_creates_nothing() {
    let provider = FakeProvider::with_roles(&["USER"]);
    let rows = vec![
        record("1", "a@x.com", Some("5551234"), Some("USER")),
        record("2", "b@x.com", None, None),
    ];
    let store = MemoryStore::with_records(rows.clone());
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("users_with_roles.csv");
    write_snapshot(&path, &rows).unwrap();
    let snapshot = CsvSnapshot::new(&path);
    let profile = MigrationProfile::users();
    let batch = BatchConfig::default();

    let first_audit = MemoryAuditSink::new();
    let first = BatchDriver::new(&provider, &store, &first_audit, &profile, &batch)
        .run_pending(&snapshot)
        .await
        .unwrap();
    assert_eq!(first.created, 2);
    assert_eq!(store.identity_of("1").as_deref(), Some("kc-1"));

    // The file still lists both rows as unmapped.
    let second_audit = MemoryAuditSink::new();
    let second = BatchDriver::new(&provider, &store, &second_audit, &profile, &batch)
        .run_pending(&snapshot)
        .await
        .unwrap();

    assert_eq!(second.attempted, 0);
    assert_eq!(second.skipped, 2);
    assert_eq!(provider.calls().created.len(), 2);
    assert_eq!(store.identity_of("1").as_deref(), Some("kc-1"));
    assert_eq!(store.identity_of("2").as_deref(), Some("kc-2"));
    assert!(second_audit.entries().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_snapshot_rows_unknown_to_the_store_are_dropped() {
    let provider = FakeProvider::with_roles(&[]);
    let store = MemoryStore::with_records(vec![record("1", "a@x.com", Some("1"), None)]);
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("snapshot.csv");
    write_snapshot(
        &path,
        &[
            record("1", "a@x.com", Some("1"), None),
            record("404", "gone@x.com", Some("2"), None),
        ],
    )
    .unwrap();
    let audit = MemoryAuditSink::new();
    let profile = MigrationProfile::users();
    let batch = BatchConfig::default();

    let report = BatchDriver::new(&provider, &store, &audit, &profile, &batch)
        .run_pending(&CsvSnapshot::new(&path))
        .await
        .unwrap();

    assert_eq!(report.created, 1);
    assert_eq!(report.skipped, 1);
    assert_eq!(provider.calls().created.len(), 1);
    assert_eq!(report.outcome(), RunOutcome::Clean);
}

#[tokio::test(start_paused = true)]
async fn test_existing_mapping_is_not_overwritten() {
    let provider = FakeProvider::with_roles(&[]);
    let mut mapped = record("1", "a@x.com", Some("1"), None);
    mapped.identity_ref = Some("kc-original".to_string());
    let store = MemoryStore::with_records(vec![mapped]);
    let audit = MemoryAuditSink::new();
    let profile = MigrationProfile::users();
    let batch = BatchConfig::default();

    // Handed over directly, as a stale source would.
    let report = BatchDriver::new(&provider, &store, &audit, &profile, &batch)
        .run(vec![record("1", "a@x.com", Some("1"), None)])
        .await
        .unwrap();

    assert_eq!(report.persistence_errors, 1);
    assert_eq!(audit.count_for(AuditStatus::Error, AuditAction::UpdateDb), 1);
    assert_eq!(store.identity_of("1").as_deref(), Some("kc-original"));
    assert_eq!(report.outcome().exit_code(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_skipped_records_do_not_wait() {
    let provider = FakeProvider::with_roles(&[]);
    let store = MemoryStore::default();
    let audit = MemoryAuditSink::new();
    let profile = MigrationProfile::users();
    let batch = BatchConfig {
        delay_ms: 1000,
        ..BatchConfig::default()
    };
    let migrated = |id: &str| {
        let mut r = record(id, &format!("{}@x.com", id), Some(id), None);
        r.identity_ref = Some(format!("kc-{}", id));
        r
    };

    let started = tokio::time::Instant::now();
    let report = BatchDriver::new(&provider, &store, &audit, &profile, &batch)
        .run(vec![migrated("1"), migrated("2"), migrated("3")])
        .await
        .unwrap();

    assert_eq!(report.skipped, 3);
    assert!(started.elapsed() < Duration::from_millis(1000));
}

#[tokio::test(start_paused = true)]
async fn test_delay_applies_between_attempted_records_only() {
    let provider = FakeProvider::with_roles(&[]);
    let store = MemoryStore::with_records(vec![
        record("1", "a@x.com", Some("1"), None),
        record("3", "c@x.com", Some("3"), None),
    ]);
    let audit = MemoryAuditSink::new();
    let profile = MigrationProfile::users();
    let batch = BatchConfig {
        delay_ms: 1000,
        ..BatchConfig::default()
    };
    let mut migrated = record("2", "b@x.com", Some("2"), None);
    migrated.identity_ref = Some("kc-2".to_string());

    let started = tokio::time::Instant::now();
    let report = BatchDriver::new(&provider, &store, &audit, &profile, &batch)
        .run(vec![
            record("1", "a@x.com", Some("1"), None),
            migrated,
            record("3", "c@x.com", Some("3"), None),
        ])
        .await
        .unwrap();

    assert_eq!(report.attempted, 2);
    assert_eq!(report.skipped, 1);
    let elapsed = started.elapsed();
    assert!(elapsed >= Duration::from_secs(1));
    assert!(elapsed < Duration::from_secs(2));
}

#[tokio::test(start_paused = true)]
async fn test_refresh_failure_before_role_creation_is_audited() {
    let mut provider = FakeProvider::with_roles(&[]);
    provider.token_limit = Some(1);
    provider.issued_token_age = Duration::from_secs(30);
    let store = MemoryStore::with_records(vec![record("1", "c@x.com", None, None)]);
    let audit = MemoryAuditSink::new();
    let profile = MigrationProfile::customers();
    let batch = BatchConfig {
        token_refresh_secs: 1,
        ..BatchConfig::default()
    };

    let err = BatchDriver::new(&provider, &store, &audit, &profile, &batch)
        .run_pending(&store)
        .await
        .unwrap_err();

    assert!(matches!(err, RunError::Auth(_)));
    assert_eq!(audit.count_for(AuditStatus::Error, AuditAction::Migration), 1);
    let calls = provider.calls();
    assert!(calls.roles_created.is_empty());
    assert!(calls.created.is_empty());
}
