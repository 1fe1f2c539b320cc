//! CLI command tests
//!
//! This module contains all tests for the CLI commands.

use centime_core::db::Database;
use centime_core::import::{run_import, ImportRequest};
use centime_core::models::StagedStatus;

use crate::commands::{self, truncate};

const BOURSORAMA: &str = "dateOp;dateVal;label;category;amount\n\
    2024-03-05;2024-03-05;CARTE 04/03 NETFLIX.COM;Loisirs;-13,49\n\
    2024-03-04;2024-03-04;VIR SEPA SALAIRE ACME;Revenus;2.100,00";

fn setup_test_db() -> Database {
    Database::in_memory().unwrap()
}

/// Import a small statement and return (batch_id, staged ids)
fn stage_batch(db: &Database) -> (i64, Vec<i64>) {
    let account = db.upsert_account("local-dev", "Checking").unwrap();
    let request = ImportRequest {
        user_id: "local-dev".to_string(),
        account_id: account.id,
        file_name: Some("march.csv".to_string()),
        content: BOURSORAMA.to_string(),
        source_override: None,
    };
    let outcome = run_import(db, &request).unwrap();
    let ids = db
        .list_staged_by_batch("local-dev", outcome.batch_id, None)
        .unwrap()
        .iter()
        .map(|s| s.id)
        .collect();
    (outcome.batch_id, ids)
}

// ========== Account Command Tests ==========

#[test]
fn test_cmd_accounts_add_and_list() {
    let db = setup_test_db();
    assert!(commands::cmd_accounts_add(&db, "local-dev", "Checking").is_ok());
    assert!(commands::cmd_accounts_list(&db, "local-dev").is_ok());
    assert_eq!(db.list_accounts("local-dev").unwrap().len(), 1);
}

// ========== Import Command Tests ==========

#[test]
fn test_cmd_batches_after_import() {
    let db = setup_test_db();
    stage_batch(&db);
    assert!(commands::cmd_batches(&db, "local-dev", 20).is_ok());
    assert_eq!(db.list_batches("local-dev", 20).unwrap().len(), 1);
}

// ========== Review Command Tests ==========

#[test]
fn test_cmd_review_lists_staged_rows() {
    let db = setup_test_db();
    let (batch_id, ids) = stage_batch(&db);
    assert_eq!(ids.len(), 2);
    assert!(commands::cmd_review(&db, "local-dev", batch_id).is_ok());
}

#[test]
fn test_cmd_review_unknown_batch_fails() {
    let db = setup_test_db();
    assert!(commands::cmd_review(&db, "local-dev", 42).is_err());
}

#[test]
fn test_cmd_validate_with_category_override() {
    let db = setup_test_db();
    let (_, ids) = stage_batch(&db);

    let overrides = vec![format!("{}=Streaming", ids[0])];
    commands::cmd_validate(&db, "local-dev", &ids, &overrides).unwrap();

    for id in &ids {
        let row = db.get_staged("local-dev", *id).unwrap().unwrap();
        assert_eq!(row.status, StagedStatus::Converted);
    }
    let netflix = db.get_staged("local-dev", ids[0]).unwrap().unwrap();
    assert_eq!(netflix.final_category.as_deref(), Some("Streaming"));
}

#[test]
fn test_cmd_validate_malformed_override_fails() {
    let db = setup_test_db();
    let (_, ids) = stage_batch(&db);

    let overrides = vec!["notanumber=Streaming".to_string()];
    assert!(commands::cmd_validate(&db, "local-dev", &ids, &overrides).is_err());
}

#[test]
fn test_cmd_reject_marks_rows() {
    let db = setup_test_db();
    let (_, ids) = stage_batch(&db);

    commands::cmd_reject(&db, "local-dev", &ids).unwrap();
    for id in &ids {
        let row = db.get_staged("local-dev", *id).unwrap().unwrap();
        assert_eq!(row.status, StagedStatus::Rejected);
    }
}

// ========== Utility Tests ==========

#[test]
fn test_truncate() {
    assert_eq!(truncate("short", 10), "short");
    assert_eq!(truncate("a very long label indeed", 10), "a very ...");
}
