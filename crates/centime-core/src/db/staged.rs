//! Staged transaction insertion and review state

use rusqlite::{params, OptionalExtension, Row};

use super::{parse_date, parse_datetime, Database};
use crate::error::Result;
use crate::models::{BankSource, NewStagedTransaction, StagedStatus, StagedTransaction};

/// Result of inserting a staged transaction
#[derive(Debug, Clone)]
pub enum StagedInsertResult {
    /// Row was inserted, contains the new staged transaction id
    Inserted(i64),
    /// Row matched an existing dedup digest, contains the existing id
    Duplicate(i64),
}

fn staged_from_row(row: &Row<'_>) -> rusqlite::Result<StagedTransaction> {
    let date: String = row.get(4)?;
    let source: String = row.get(7)?;
    let recurrence: String = row.get(9)?;
    let status: String = row.get(10)?;
    let created_at: String = row.get(13)?;

    Ok(StagedTransaction {
        id: row.get(0)?,
        user_id: row.get(1)?,
        account_id: row.get(2)?,
        batch_id: row.get(3)?,
        date: parse_date(&date),
        label: row.get(5)?,
        amount: row.get(6)?,
        source: source.parse().unwrap_or(BankSource::Generic),
        suggested_category: row.get(8)?,
        recurrence: recurrence.parse().unwrap_or_default(),
        status: status.parse().unwrap_or_default(),
        ledger_record_id: row.get(11)?,
        final_category: row.get(12)?,
        created_at: parse_datetime(&created_at),
    })
}

const STAGED_COLUMNS: &str = "id, user_id, account_id, batch_id, date, label, amount, source, \
    suggested_category, recurrence, status, ledger_record_id, final_category, created_at";

impl Database {
    /// Insert a staged transaction, detecting duplicates via the dedup
    /// digest
    ///
    /// The digest column carries a UNIQUE constraint, so a concurrent
    /// insert of the same row loses cleanly rather than double-staging.
    pub fn insert_staged(
        &self,
        user_id: &str,
        account_id: i64,
        batch_id: i64,
        tx: &NewStagedTransaction,
    ) -> Result<StagedInsertResult> {
        let conn = self.conn()?;

        let existing: Option<i64> = conn
            .query_row(
                "SELECT id FROM staged_transactions WHERE dedup_digest = ?",
                params![tx.dedup_digest],
                |row| row.get(0),
            )
            .optional()?;

        if let Some(existing_id) = existing {
            return Ok(StagedInsertResult::Duplicate(existing_id));
        }

        conn.execute(
            r#"
            INSERT INTO staged_transactions
                (user_id, account_id, batch_id, date, label, amount, source,
                 suggested_category, recurrence, raw_data, dedup_digest)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
            params![
                user_id,
                account_id,
                batch_id,
                tx.date.to_string(),
                tx.label,
                tx.amount,
                tx.source.as_str(),
                tx.suggested_category,
                tx.recurrence.as_str(),
                tx.raw_data,
                tx.dedup_digest,
            ],
        )?;

        Ok(StagedInsertResult::Inserted(conn.last_insert_rowid()))
    }

    /// Get a staged transaction by id, scoped to its owner
    pub fn get_staged(&self, user_id: &str, id: i64) -> Result<Option<StagedTransaction>> {
        let conn = self.conn()?;
        let sql = format!(
            "SELECT {} FROM staged_transactions WHERE id = ? AND user_id = ?",
            STAGED_COLUMNS
        );
        let staged = conn
            .query_row(&sql, params![id, user_id], staged_from_row)
            .optional()?;
        Ok(staged)
    }

    /// List the staged transactions of one batch, in statement order,
    /// optionally restricted to one review status
    pub fn list_staged_by_batch(
        &self,
        user_id: &str,
        batch_id: i64,
        status: Option<StagedStatus>,
    ) -> Result<Vec<StagedTransaction>> {
        let conn = self.conn()?;
        let sql = format!(
            "SELECT {} FROM staged_transactions \
             WHERE batch_id = ?1 AND user_id = ?2 AND (?3 IS NULL OR status = ?3) \
             ORDER BY id",
            STAGED_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let staged = stmt
            .query_map(
                params![batch_id, user_id, status.map(|s| s.as_str())],
                staged_from_row,
            )?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(staged)
    }

    /// Mark a staged transaction as converted, recording the ledger
    /// record it became and the category it was filed under
    pub fn mark_staged_converted(
        &self,
        id: i64,
        ledger_record_id: i64,
        final_category: Option<&str>,
    ) -> Result<()> {
        let conn = self.conn()?;
        conn.execute(
            "UPDATE staged_transactions SET status = ?, ledger_record_id = ?, final_category = ? WHERE id = ?",
            params![
                StagedStatus::Converted.as_str(),
                ledger_record_id,
                final_category,
                id,
            ],
        )?;
        Ok(())
    }

    /// Change the suggested category of a row still awaiting review
    pub fn update_staged_category(
        &self,
        user_id: &str,
        id: i64,
        category: Option<&str>,
    ) -> Result<bool> {
        let conn = self.conn()?;
        let changed = conn.execute(
            r#"
            UPDATE staged_transactions SET suggested_category = ?
            WHERE id = ? AND user_id = ? AND status = 'pending'
            "#,
            params![category, id, user_id],
        )?;
        Ok(changed > 0)
    }

    /// Mark a staged transaction as rejected
    pub fn mark_staged_rejected(&self, id: i64) -> Result<()> {
        let conn = self.conn()?;
        conn.execute(
            "UPDATE staged_transactions SET status = ? WHERE id = ?",
            params![StagedStatus::Rejected.as_str(), id],
        )?;
        Ok(())
    }
}
