//! Database layer tests

use chrono::NaiveDate;

use super::*;
use crate::models::{
    dedup_digest, BankSource, BatchStatus, NewStagedTransaction, ParsedTransaction,
    RecurrenceHint, StagedStatus,
};

fn parsed(label: &str, amount: f64, day: u32) -> ParsedTransaction {
    ParsedTransaction {
        date: NaiveDate::from_ymd_opt(2024, 3, day).unwrap(),
        label: label.to_string(),
        amount,
        raw_data: None,
    }
}

fn staged(user_id: &str, account_id: i64, label: &str, amount: f64, day: u32) -> NewStagedTransaction {
    NewStagedTransaction::from_parsed(
        user_id,
        account_id,
        BankSource::Generic,
        &parsed(label, amount, day),
        None,
        RecurrenceHint::None,
    )
}

#[test]
fn test_upsert_account_is_idempotent_per_user() {
    let db = Database::in_memory().unwrap();

    let a = db.upsert_account("u1", "Checking").unwrap();
    let b = db.upsert_account("u1", "Checking").unwrap();
    assert_eq!(a.id, b.id);

    // Same name under another user is a distinct account
    let c = db.upsert_account("u2", "Checking").unwrap();
    assert_ne!(a.id, c.id);
}

#[test]
fn test_account_listing_is_scoped() {
    let db = Database::in_memory().unwrap();
    db.upsert_account("u1", "Checking").unwrap();
    db.upsert_account("u1", "Savings").unwrap();
    let other = db.upsert_account("u2", "Checking").unwrap();

    let accounts = db.list_accounts("u1").unwrap();
    assert_eq!(accounts.len(), 2);
    assert!(db.get_account("u1", other.id).unwrap().is_none());
}

#[test]
fn test_empty_account_name_rejected() {
    let db = Database::in_memory().unwrap();
    assert!(db.upsert_account("u1", "   ").is_err());
}

#[test]
fn test_batch_lifecycle() {
    let db = Database::in_memory().unwrap();
    let account = db.upsert_account("u1", "Checking").unwrap();

    let batch_id = db
        .create_batch("u1", account.id, BankSource::Boursorama, Some("march.csv"))
        .unwrap();

    let batch = db.get_batch("u1", batch_id).unwrap().unwrap();
    assert_eq!(batch.status, BatchStatus::Processing);
    assert!(batch.completed_at.is_none());

    db.finalize_batch(batch_id, 10, 8, 1, 1, BatchStatus::Completed, Some("Row 4: bad"))
        .unwrap();

    let batch = db.get_batch("u1", batch_id).unwrap().unwrap();
    assert_eq!(batch.status, BatchStatus::Completed);
    assert_eq!(batch.total_rows, 10);
    assert_eq!(batch.imported_rows, 8);
    assert_eq!(batch.error_summary.as_deref(), Some("Row 4: bad"));
    assert!(batch.completed_at.is_some());

    // Scoping: another user cannot see it
    assert!(db.get_batch("u2", batch_id).unwrap().is_none());
}

#[test]
fn test_staged_insert_dedup_tri_state() {
    let db = Database::in_memory().unwrap();
    let account = db.upsert_account("u1", "Checking").unwrap();
    let batch_id = db
        .create_batch("u1", account.id, BankSource::Generic, None)
        .unwrap();

    let tx = staged("u1", account.id, "NETFLIX", -13.49, 5);
    let first = db.insert_staged("u1", account.id, batch_id, &tx).unwrap();
    let StagedInsertResult::Inserted(id) = first else {
        panic!("expected insert");
    };

    let second = db.insert_staged("u1", account.id, batch_id, &tx).unwrap();
    match second {
        StagedInsertResult::Duplicate(existing) => assert_eq!(existing, id),
        StagedInsertResult::Inserted(_) => panic!("expected duplicate"),
    }

    // A different account changes the digest, so the row stages again
    let other_account = db.upsert_account("u1", "Savings").unwrap();
    let tx2 = staged("u1", other_account.id, "NETFLIX", -13.49, 5);
    assert!(matches!(
        db.insert_staged("u1", other_account.id, batch_id, &tx2).unwrap(),
        StagedInsertResult::Inserted(_)
    ));
}

#[test]
fn test_staged_round_trip_preserves_fields() {
    let db = Database::in_memory().unwrap();
    let account = db.upsert_account("u1", "Checking").unwrap();
    let batch_id = db
        .create_batch("u1", account.id, BankSource::N26, None)
        .unwrap();

    let tx = NewStagedTransaction::from_parsed(
        "u1",
        account.id,
        BankSource::N26,
        &parsed("SPOTIFY AB", -10.99, 5),
        Some("Entertainment".to_string()),
        RecurrenceHint::Subscription,
    );
    db.insert_staged("u1", account.id, batch_id, &tx).unwrap();

    let rows = db.list_staged_by_batch("u1", batch_id, None).unwrap();
    assert_eq!(rows.len(), 1);
    let row = &rows[0];
    assert_eq!(row.label, "SPOTIFY AB");
    assert_eq!(row.amount, -10.99);
    assert_eq!(row.source, BankSource::N26);
    assert_eq!(row.suggested_category.as_deref(), Some("Entertainment"));
    assert_eq!(row.recurrence, RecurrenceHint::Subscription);
    assert_eq!(row.date, NaiveDate::from_ymd_opt(2024, 3, 5).unwrap());
}

#[test]
fn test_find_or_create_category_prefers_user_over_default() {
    let db = Database::in_memory().unwrap();

    // "Groceries" exists as a seeded default
    let default_id = db.find_or_create_category("u1", "Groceries").unwrap();

    // Creating a user-owned category with the same name shadows it
    let conn = db.conn().unwrap();
    conn.execute(
        "INSERT INTO categories (user_id, name, color, icon) VALUES ('u1', 'Groceries', '#fff', 'cart')",
        [],
    )
    .unwrap();
    let user_id = db.find_or_create_category("u1", "groceries").unwrap();
    assert_ne!(default_id, user_id);

    // Other users still resolve to the global default
    assert_eq!(db.find_or_create_category("u2", "Groceries").unwrap(), default_id);
}

#[test]
fn test_find_or_create_category_creates_missing() {
    let db = Database::in_memory().unwrap();
    let a = db.find_or_create_category("u1", "Gardening").unwrap();
    let b = db.find_or_create_category("u1", "GARDENING").unwrap();
    assert_eq!(a, b);

    let categories = db.list_categories("u1").unwrap();
    assert!(categories.iter().any(|c| c.name == "Gardening" && c.user_id.as_deref() == Some("u1")));
}

#[test]
fn test_subscription_lookup_is_case_insensitive_and_scoped() {
    let db = Database::in_memory().unwrap();
    let id = db.create_subscription("u1", "Netflix", 13.49, 5).unwrap();

    assert_eq!(db.find_active_subscription("u1", "NETFLIX").unwrap(), Some(id));
    assert_eq!(db.find_active_subscription("u2", "Netflix").unwrap(), None);
}

#[test]
fn test_category_feedback_latest_wins() {
    let db = Database::in_memory().unwrap();
    db.record_category_feedback(
        "u1",
        "CARREFOUR CITY",
        Some("Groceries"),
        "Snacks",
        RecurrenceHint::None,
    )
    .unwrap();
    db.record_category_feedback(
        "u1",
        "CARREFOUR CITY",
        Some("Snacks"),
        "Groceries",
        RecurrenceHint::None,
    )
    .unwrap();

    assert_eq!(
        db.lookup_category_feedback("u1", "carrefour city").unwrap(),
        Some("Groceries".to_string())
    );
}

#[test]
fn test_staged_listing_filters_by_status() {
    let db = Database::in_memory().unwrap();
    let account = db.upsert_account("u1", "Checking").unwrap();
    let batch_id = db
        .create_batch("u1", account.id, BankSource::Generic, None)
        .unwrap();

    let a = staged("u1", account.id, "NETFLIX", -13.49, 5);
    let b = staged("u1", account.id, "CARREFOUR", -42.10, 6);
    db.insert_staged("u1", account.id, batch_id, &a).unwrap();
    let StagedInsertResult::Inserted(b_id) =
        db.insert_staged("u1", account.id, batch_id, &b).unwrap()
    else {
        panic!("expected insert");
    };
    db.mark_staged_rejected(b_id).unwrap();

    let pending = db
        .list_staged_by_batch("u1", batch_id, Some(StagedStatus::Pending))
        .unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].label, "NETFLIX");

    let all = db.list_staged_by_batch("u1", batch_id, None).unwrap();
    assert_eq!(all.len(), 2);
}

#[test]
fn test_dedup_digest_matches_model_helper() {
    let date = NaiveDate::from_ymd_opt(2024, 3, 5).unwrap();
    let tx = staged("u1", 1, "NETFLIX", -13.49, 5);
    assert_eq!(
        tx.dedup_digest,
        dedup_digest("u1", 1, "NETFLIX", -13.49, &date, BankSource::Generic)
    );
}
