//! Review step: staged transactions become ledger records
//!
//! Conversion routes by sign (credits become incomes, debits become
//! expenses stored as positive magnitudes), resolves the expense
//! category with a find-or-create, promotes recurring debits to
//! subscriptions, and notifies the [`CategoryLearner`] when the user's
//! final choice differs from the suggestion.

use chrono::Datelike;
use tracing::{info, warn};

use crate::categorize::CategoryLearner;
use crate::db::Database;
use crate::error::{Error, Result};
use crate::models::{RecurrenceHint, StagedStatus, StagedTransaction};

/// What a staged transaction was converted into
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConvertedKind {
    Income,
    Expense,
}

/// Outcome of converting one staged transaction
#[derive(Debug, Clone)]
pub struct ConversionSummary {
    pub staged_id: i64,
    pub kind: ConvertedKind,
    pub ledger_record_id: i64,
    /// Category the expense was filed under (incomes carry none)
    pub category: Option<String>,
    /// Subscription created by promotion, if any
    pub subscription_id: Option<i64>,
}

fn require_pending(staged: &StagedTransaction) -> Result<()> {
    if staged.status != StagedStatus::Pending {
        return Err(Error::InvalidData(format!(
            "Staged transaction {} is already {}",
            staged.id, staged.status
        )));
    }
    Ok(())
}

/// Convert a pending staged transaction into a ledger record
///
/// `final_category` overrides the suggestion; when neither exists the
/// expense falls back to `Other`. Conversion is terminal: converting the
/// same row twice is an error.
pub fn convert_staged(
    db: &Database,
    learner: &dyn CategoryLearner,
    user_id: &str,
    staged_id: i64,
    final_category: Option<&str>,
) -> Result<ConversionSummary> {
    let staged = db
        .get_staged(user_id, staged_id)?
        .ok_or_else(|| Error::NotFound(format!("Staged transaction {} not found", staged_id)))?;
    require_pending(&staged)?;

    let summary = if staged.amount >= 0.0 {
        let income_id = db.create_income(
            user_id,
            staged.account_id,
            &staged.label,
            staged.amount,
            staged.date,
        )?;
        db.mark_staged_converted(staged.id, income_id, None)?;
        ConversionSummary {
            staged_id: staged.id,
            kind: ConvertedKind::Income,
            ledger_record_id: income_id,
            category: None,
            subscription_id: None,
        }
    } else {
        let category_name = final_category
            .map(str::to_string)
            .or_else(|| staged.suggested_category.clone())
            .unwrap_or_else(|| "Other".to_string());
        let category_id = db.find_or_create_category(user_id, &category_name)?;

        let expense_id = db.create_expense(
            user_id,
            staged.account_id,
            &staged.label,
            staged.amount.abs(),
            staged.date,
            category_id,
        )?;
        db.mark_staged_converted(staged.id, expense_id, Some(&category_name))?;

        // An explicit choice that differs from the suggestion is a
        // correction worth learning. Learning is best-effort: a failed
        // notification must not undo the conversion.
        if let Some(chosen) = final_category {
            if staged.suggested_category.as_deref() != Some(chosen) {
                if let Err(e) = learner.observe_correction(
                    user_id,
                    &staged.label,
                    staged.suggested_category.as_deref(),
                    chosen,
                    staged.recurrence,
                ) {
                    warn!(error = %e, label = %staged.label, "Failed to record category correction");
                }
            }
        }

        let subscription_id = if staged.recurrence == RecurrenceHint::Subscription {
            promote_subscription(db, user_id, &staged)?
        } else {
            None
        };

        ConversionSummary {
            staged_id: staged.id,
            kind: ConvertedKind::Expense,
            ledger_record_id: expense_id,
            category: Some(category_name),
            subscription_id,
        }
    };

    info!(
        staged_id = summary.staged_id,
        ledger_record_id = summary.ledger_record_id,
        kind = ?summary.kind,
        "Converted staged transaction"
    );
    Ok(summary)
}

/// Create a subscription for a recurring debit unless an active one
/// with the same name already exists
fn promote_subscription(
    db: &Database,
    user_id: &str,
    staged: &StagedTransaction,
) -> Result<Option<i64>> {
    if db.find_active_subscription(user_id, &staged.label)?.is_some() {
        return Ok(None);
    }
    let id = db.create_subscription(
        user_id,
        &staged.label,
        staged.amount.abs(),
        staged.date.day(),
    )?;
    info!(subscription_id = id, name = %staged.label, "Promoted subscription");
    Ok(Some(id))
}

/// Reject a pending staged transaction
///
/// The row stays in place for audit; only its status changes, so the
/// dedup digest keeps guarding against re-import.
pub fn reject_staged(db: &Database, user_id: &str, staged_id: i64) -> Result<()> {
    let staged = db
        .get_staged(user_id, staged_id)?
        .ok_or_else(|| Error::NotFound(format!("Staged transaction {} not found", staged_id)))?;
    require_pending(&staged)?;

    db.mark_staged_rejected(staged.id)?;
    info!(staged_id, "Rejected staged transaction");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::import::{run_import, ImportRequest};
    use crate::models::SubscriptionStatus;
    use rusqlite::params;

    const BOURSORAMA: &str = "dateOp;dateVal;label;category;amount\n\
        2024-03-05;2024-03-05;CARTE 04/03 NETFLIX.COM;Loisirs;-13,49\n\
        2024-03-04;2024-03-04;VIR SEPA SALAIRE ACME;Revenus;2.100,00\n\
        2024-03-03;2024-03-03;CARTE 02/03 CARREFOUR CITY;Courses;-42,10";

    fn staged_batch(db: &Database) -> Vec<StagedTransaction> {
        let account = db.upsert_account("u1", "Checking").unwrap();
        let req = ImportRequest {
            user_id: "u1".to_string(),
            account_id: account.id,
            file_name: None,
            content: BOURSORAMA.to_string(),
            source_override: None,
        };
        let outcome = run_import(db, &req).unwrap();
        db.list_staged_by_batch("u1", outcome.batch_id, None).unwrap()
    }

    fn subscription_status(db: &Database, id: i64) -> SubscriptionStatus {
        let conn = db.conn().unwrap();
        let status: String = conn
            .query_row(
                "SELECT status FROM subscriptions WHERE id = ?",
                params![id],
                |row| row.get(0),
            )
            .unwrap();
        status.parse().unwrap()
    }

    #[test]
    fn test_convert_credit_to_income() {
        let db = Database::in_memory().unwrap();
        let staged = staged_batch(&db);
        let salary = staged.iter().find(|s| s.amount > 0.0).unwrap();

        let summary = convert_staged(&db, &db, "u1", salary.id, None).unwrap();
        assert_eq!(summary.kind, ConvertedKind::Income);
        assert_eq!(summary.category, None);

        let row = db.get_staged("u1", salary.id).unwrap().unwrap();
        assert_eq!(row.status, StagedStatus::Converted);
        assert_eq!(row.ledger_record_id, Some(summary.ledger_record_id));
    }

    #[test]
    fn test_convert_debit_to_expense_with_positive_magnitude() {
        let db = Database::in_memory().unwrap();
        let staged = staged_batch(&db);
        let groceries = staged.iter().find(|s| s.label.contains("CARREFOUR")).unwrap();

        let summary = convert_staged(&db, &db, "u1", groceries.id, None).unwrap();
        assert_eq!(summary.kind, ConvertedKind::Expense);
        assert_eq!(summary.category.as_deref(), Some("Groceries"));

        let conn = db.conn().unwrap();
        let amount: f64 = conn
            .query_row(
                "SELECT amount FROM expenses WHERE id = ?",
                params![summary.ledger_record_id],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(amount, 42.10);
    }

    #[test]
    fn test_convert_promotes_subscription_once() {
        let db = Database::in_memory().unwrap();
        let staged = staged_batch(&db);
        let netflix = staged.iter().find(|s| s.label.contains("NETFLIX")).unwrap();

        let summary = convert_staged(&db, &db, "u1", netflix.id, None).unwrap();
        let subscription_id = summary.subscription_id.unwrap();
        assert_eq!(subscription_status(&db, subscription_id), SubscriptionStatus::Active);

        // Same merchant next month: already covered by the active subscription
        assert_eq!(
            db.find_active_subscription("u1", &netflix.label).unwrap(),
            Some(subscription_id)
        );
    }

    #[test]
    fn test_category_override_feeds_learner() {
        let db = Database::in_memory().unwrap();
        let staged = staged_batch(&db);
        let groceries = staged.iter().find(|s| s.label.contains("CARREFOUR")).unwrap();

        let summary = convert_staged(&db, &db, "u1", groceries.id, Some("Snacks")).unwrap();
        assert_eq!(summary.category.as_deref(), Some("Snacks"));

        assert_eq!(
            db.lookup_category_feedback("u1", &groceries.label).unwrap(),
            Some("Snacks".to_string())
        );
    }

    #[test]
    fn test_override_carries_recurrence_hint_to_learner() {
        let db = Database::in_memory().unwrap();
        let staged = staged_batch(&db);
        let netflix = staged.iter().find(|s| s.label.contains("NETFLIX")).unwrap();
        assert_eq!(netflix.recurrence, RecurrenceHint::Subscription);

        convert_staged(&db, &db, "u1", netflix.id, Some("Streaming")).unwrap();

        let conn = db.conn().unwrap();
        let recurrence: String = conn
            .query_row(
                "SELECT recurrence FROM category_feedback WHERE user_id = 'u1' AND label_pattern = ?",
                params![netflix.label],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(recurrence, "subscription");
    }

    #[test]
    fn test_convert_twice_is_an_error() {
        let db = Database::in_memory().unwrap();
        let staged = staged_batch(&db);
        let first = &staged[0];

        convert_staged(&db, &db, "u1", first.id, None).unwrap();
        let err = convert_staged(&db, &db, "u1", first.id, None).unwrap_err();
        assert!(matches!(err, Error::InvalidData(_)));
    }

    #[test]
    fn test_reject_is_terminal_and_keeps_dedup() {
        let db = Database::in_memory().unwrap();
        let staged = staged_batch(&db);
        let first = &staged[0];

        reject_staged(&db, "u1", first.id).unwrap();
        let row = db.get_staged("u1", first.id).unwrap().unwrap();
        assert_eq!(row.status, StagedStatus::Rejected);

        // Rejected rows cannot be converted
        assert!(convert_staged(&db, &db, "u1", first.id, None).is_err());

        // Re-importing the same file still skips the rejected row
        let req = ImportRequest {
            user_id: "u1".to_string(),
            account_id: first.account_id,
            file_name: None,
            content: BOURSORAMA.to_string(),
            source_override: None,
        };
        let second = run_import(&db, &req).unwrap();
        assert_eq!(second.imported_rows, 0);
        assert_eq!(second.skipped_rows, 3);
    }

    #[test]
    fn test_other_users_cannot_touch_staged_rows() {
        let db = Database::in_memory().unwrap();
        let staged = staged_batch(&db);
        let first = &staged[0];

        let err = convert_staged(&db, &db, "intruder", first.id, None).unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
        assert!(reject_staged(&db, "intruder", first.id).is_err());
    }
}
