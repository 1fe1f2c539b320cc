//! Statement import and batch listing commands

use std::path::Path;

use anyhow::{Context, Result};
use centime_core::db::Database;
use centime_core::import::{run_import, ImportRequest};
use centime_core::models::BankSource;

use super::truncate;

pub fn cmd_import(
    db: &Database,
    user: &str,
    file: &Path,
    account_id: i64,
    bank: Option<&str>,
) -> Result<()> {
    let content = std::fs::read_to_string(file)
        .with_context(|| format!("Failed to read {}", file.display()))?;

    let source_override = match bank {
        Some(name) => Some(
            name.parse::<BankSource>()
                .map_err(|e| anyhow::anyhow!(e))?,
        ),
        None => None,
    };

    let file_name = file
        .file_name()
        .map(|n| n.to_string_lossy().into_owned());

    let request = ImportRequest {
        user_id: user.to_string(),
        account_id,
        file_name,
        content,
        source_override,
    };
    let outcome = run_import(db, &request)?;

    println!(
        "Batch {} ({}): {}",
        outcome.batch_id,
        outcome.source.display_name(),
        outcome.status
    );
    println!(
        "  {} rows: {} imported, {} skipped, {} errors",
        outcome.total_rows, outcome.imported_rows, outcome.skipped_rows, outcome.error_rows
    );
    for message in &outcome.error_messages {
        println!("  ! {}", message);
    }
    if outcome.imported_rows > 0 {
        println!();
        println!("Review with: centime review {}", outcome.batch_id);
    }
    Ok(())
}

pub fn cmd_batches(db: &Database, user: &str, limit: i64) -> Result<()> {
    let batches = db.list_batches(user, limit.max(1))?;
    if batches.is_empty() {
        println!("No import batches yet.");
        return Ok(());
    }

    println!(
        "{:<6} {:<18} {:<24} {:<11} {:>6} {:>9} {:>8} {:>7}",
        "ID", "SOURCE", "FILE", "STATUS", "ROWS", "IMPORTED", "SKIPPED", "ERRORS"
    );
    for batch in batches {
        println!(
            "{:<6} {:<18} {:<24} {:<11} {:>6} {:>9} {:>8} {:>7}",
            batch.id,
            batch.source.display_name(),
            truncate(batch.file_name.as_deref().unwrap_or("-"), 24),
            batch.status.to_string(),
            batch.total_rows,
            batch.imported_rows,
            batch.skipped_rows,
            batch.error_rows,
        );
    }
    Ok(())
}
