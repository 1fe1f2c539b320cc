//! Import batch lifecycle and counters

use rusqlite::{params, OptionalExtension, Row};

use super::{parse_datetime, Database};
use crate::error::Result;
use crate::models::{BankSource, BatchStatus, ImportBatch};

fn batch_from_row(row: &Row<'_>) -> rusqlite::Result<ImportBatch> {
    let source: String = row.get(3)?;
    let status: String = row.get(9)?;
    let created_at: String = row.get(11)?;
    let completed_at: Option<String> = row.get(12)?;

    Ok(ImportBatch {
        id: row.get(0)?,
        user_id: row.get(1)?,
        account_id: row.get(2)?,
        source: source.parse().unwrap_or(BankSource::Generic),
        file_name: row.get(4)?,
        total_rows: row.get(5)?,
        imported_rows: row.get(6)?,
        skipped_rows: row.get(7)?,
        error_rows: row.get(8)?,
        status: status.parse().unwrap_or(BatchStatus::Failed),
        error_summary: row.get(10)?,
        created_at: parse_datetime(&created_at),
        completed_at: completed_at.map(|s| parse_datetime(&s)),
    })
}

const BATCH_COLUMNS: &str = "id, user_id, account_id, source, file_name, total_rows, \
    imported_rows, skipped_rows, error_rows, status, error_summary, created_at, completed_at";

impl Database {
    /// Create a batch in `processing` state
    pub fn create_batch(
        &self,
        user_id: &str,
        account_id: i64,
        source: BankSource,
        file_name: Option<&str>,
    ) -> Result<i64> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO import_batches (user_id, account_id, source, file_name) VALUES (?, ?, ?, ?)",
            params![user_id, account_id, source.as_str(), file_name],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// Finalize a batch: write counters, terminal status, and completion time
    pub fn finalize_batch(
        &self,
        batch_id: i64,
        total_rows: i64,
        imported_rows: i64,
        skipped_rows: i64,
        error_rows: i64,
        status: BatchStatus,
        error_summary: Option<&str>,
    ) -> Result<()> {
        let conn = self.conn()?;
        conn.execute(
            r#"
            UPDATE import_batches
            SET total_rows = ?, imported_rows = ?, skipped_rows = ?, error_rows = ?,
                status = ?, error_summary = ?, completed_at = CURRENT_TIMESTAMP
            WHERE id = ?
            "#,
            params![
                total_rows,
                imported_rows,
                skipped_rows,
                error_rows,
                status.as_str(),
                error_summary,
                batch_id,
            ],
        )?;
        Ok(())
    }

    /// Get a batch by id, scoped to its owner
    pub fn get_batch(&self, user_id: &str, id: i64) -> Result<Option<ImportBatch>> {
        let conn = self.conn()?;
        let sql = format!(
            "SELECT {} FROM import_batches WHERE id = ? AND user_id = ?",
            BATCH_COLUMNS
        );
        let batch = conn
            .query_row(&sql, params![id, user_id], batch_from_row)
            .optional()?;
        Ok(batch)
    }

    /// List a user's batches, newest first
    pub fn list_batches(&self, user_id: &str, limit: i64) -> Result<Vec<ImportBatch>> {
        let conn = self.conn()?;
        let sql = format!(
            "SELECT {} FROM import_batches WHERE user_id = ? ORDER BY created_at DESC, id DESC LIMIT ?",
            BATCH_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let batches = stmt
            .query_map(params![user_id, limit], batch_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(batches)
    }
}
