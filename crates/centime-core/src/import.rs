//! Import orchestration: one uploaded statement file to one finalized
//! batch
//!
//! The orchestrator validates the file, detects its format, parses and
//! stages every data row, and finalizes the batch with reconciled
//! counters. Row failures are isolated: a bad row becomes an error
//! counter and a capped error message, never an abort of the whole
//! file.

use tracing::{info, warn};

use crate::categorize::RuleBasedCategorizer;
use crate::db::{Database, StagedInsertResult};
use crate::error::{Error, Result};
use crate::formats::{detect_format, tokenize_for};
use crate::models::{BankSource, BatchStatus, NewStagedTransaction};

/// Upload size ceiling (5 MiB); bank statements are far smaller
pub const MAX_IMPORT_BYTES: usize = 5 * 1024 * 1024;

/// At most this many row error messages are kept on the batch
pub const MAX_ERROR_MESSAGES: usize = 5;

/// File extensions accepted for statement uploads
const ALLOWED_EXTENSIONS: &[&str] = &["csv", "tsv", "txt"];

/// Files without an extension are accepted; anything else must be on
/// the allow-list
fn has_allowed_extension(file_name: &str) -> bool {
    match std::path::Path::new(file_name)
        .extension()
        .and_then(|e| e.to_str())
    {
        Some(ext) => ALLOWED_EXTENSIONS.contains(&ext.to_lowercase().as_str()),
        None => true,
    }
}

/// One statement file to ingest for a user's account
#[derive(Debug, Clone)]
pub struct ImportRequest {
    pub user_id: String,
    pub account_id: i64,
    pub file_name: Option<String>,
    pub content: String,
    /// Skip format detection and force a specific parser
    pub source_override: Option<BankSource>,
}

/// Aggregate result of one import run
///
/// Counters always reconcile: `total_rows` equals imported + skipped +
/// errors.
#[derive(Debug, Clone)]
pub struct BatchOutcome {
    pub batch_id: i64,
    pub source: BankSource,
    pub total_rows: i64,
    pub imported_rows: i64,
    pub skipped_rows: i64,
    pub error_rows: i64,
    pub status: BatchStatus,
    pub error_messages: Vec<String>,
}

impl BatchOutcome {
    fn new(batch_id: i64, source: BankSource) -> Self {
        Self {
            batch_id,
            source,
            total_rows: 0,
            imported_rows: 0,
            skipped_rows: 0,
            error_rows: 0,
            status: BatchStatus::Processing,
            error_messages: Vec::new(),
        }
    }

    fn record_error(&mut self, row_number: usize, message: String) {
        self.error_rows += 1;
        if self.error_messages.len() < MAX_ERROR_MESSAGES {
            self.error_messages.push(format!("Row {}: {}", row_number, message));
        }
    }

    /// A batch fails only when it produced errors and nothing was
    /// imported; partial success completes.
    fn terminal_status(&self) -> BatchStatus {
        if self.error_rows > 0 && self.imported_rows == 0 {
            BatchStatus::Failed
        } else {
            BatchStatus::Completed
        }
    }
}

/// Check a format without importing anything
///
/// Returns the source that would be used, or `UnrecognizedFormat` when
/// nothing matches.
pub fn validate_format(content: &str) -> Result<BankSource> {
    if content.len() > MAX_IMPORT_BYTES {
        return Err(Error::Import(format!(
            "File too large: {} bytes (limit {})",
            content.len(),
            MAX_IMPORT_BYTES
        )));
    }
    detect_format(content).ok_or_else(|| {
        Error::UnrecognizedFormat(
            "No supported bank format matched the file headers".to_string(),
        )
    })
}

/// Ingest one statement file end to end
///
/// Pre-batch failures (unknown account, oversized file, unrecognized
/// format) return an error before any batch row exists. Once the batch
/// is created, every path finalizes it exactly once.
pub fn run_import(db: &Database, request: &ImportRequest) -> Result<BatchOutcome> {
    if request.content.len() > MAX_IMPORT_BYTES {
        return Err(Error::Import(format!(
            "File too large: {} bytes (limit {})",
            request.content.len(),
            MAX_IMPORT_BYTES
        )));
    }
    if request.content.trim().is_empty() {
        return Err(Error::Import("File is empty".to_string()));
    }
    if let Some(name) = request.file_name.as_deref() {
        if !has_allowed_extension(name) {
            return Err(Error::InvalidData(format!(
                "Unsupported file type: {} (expected .csv, .tsv, or .txt)",
                name
            )));
        }
    }

    let account = db
        .get_account(&request.user_id, request.account_id)?
        .ok_or_else(|| {
            Error::NotFound(format!("Account {} not found", request.account_id))
        })?;

    let source = match request.source_override {
        Some(source) => source,
        None => validate_format(&request.content)?,
    };

    let (headers, rows) = tokenize_for(source, &request.content)?;
    if headers.is_empty() {
        return Err(Error::Import("File has no header row".to_string()));
    }

    let batch_id = db.create_batch(
        &request.user_id,
        account.id,
        source,
        request.file_name.as_deref(),
    )?;
    info!(
        batch_id,
        account_id = account.id,
        source = %source,
        rows = rows.len(),
        "Import started"
    );

    let mut outcome = BatchOutcome::new(batch_id, source);
    let categorizer = RuleBasedCategorizer;

    for (idx, row) in rows.iter().enumerate() {
        outcome.total_rows += 1;
        // Statement row number: 1-based, counting the header
        let row_number = idx + 2;

        let Some(parsed) = source.parse_row(&headers, row) else {
            outcome.skipped_rows += 1;
            continue;
        };

        let staged = match categorizer.suggest(db, &request.user_id, &parsed.label, parsed.amount)
        {
            Ok(suggestion) => NewStagedTransaction::from_parsed(
                &request.user_id,
                account.id,
                source,
                &parsed,
                suggestion.category,
                suggestion.recurrence,
            ),
            Err(e) => {
                warn!(row_number, error = %e, "Categorization failed for row");
                outcome.record_error(row_number, e.to_string());
                continue;
            }
        };

        match db.insert_staged(&request.user_id, account.id, batch_id, &staged) {
            Ok(StagedInsertResult::Inserted(_)) => outcome.imported_rows += 1,
            Ok(StagedInsertResult::Duplicate(_)) => outcome.skipped_rows += 1,
            Err(e) => {
                warn!(row_number, error = %e, "Failed to stage row");
                outcome.record_error(row_number, e.to_string());
            }
        }
    }

    outcome.status = outcome.terminal_status();
    let error_summary = if outcome.error_messages.is_empty() {
        None
    } else {
        Some(outcome.error_messages.join("\n"))
    };
    db.finalize_batch(
        batch_id,
        outcome.total_rows,
        outcome.imported_rows,
        outcome.skipped_rows,
        outcome.error_rows,
        outcome.status,
        error_summary.as_deref(),
    )?;

    info!(
        batch_id,
        imported = outcome.imported_rows,
        skipped = outcome.skipped_rows,
        errors = outcome.error_rows,
        status = %outcome.status,
        "Import finished"
    );
    Ok(outcome)
}
