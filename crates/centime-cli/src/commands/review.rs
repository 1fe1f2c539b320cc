//! Staged transaction review commands

use std::collections::HashMap;

use anyhow::{bail, Result};
use centime_core::db::Database;
use centime_core::review::{convert_staged, reject_staged};

use super::truncate;

pub fn cmd_review(db: &Database, user: &str, batch_id: i64) -> Result<()> {
    if db.get_batch(user, batch_id)?.is_none() {
        bail!("Import batch {} not found", batch_id);
    }

    let staged = db.list_staged_by_batch(user, batch_id, None)?;
    if staged.is_empty() {
        println!("Batch {} has no staged transactions.", batch_id);
        return Ok(());
    }

    println!(
        "{:<6} {:<11} {:<12} {:>10}  {:<30} {:<15} {}",
        "ID", "STATUS", "DATE", "AMOUNT", "LABEL", "CATEGORY", "RECURRENCE"
    );
    for row in &staged {
        println!(
            "{:<6} {:<11} {:<12} {:>10.2}  {:<30} {:<15} {}",
            row.id,
            row.status.to_string(),
            row.date,
            row.amount,
            truncate(&row.label, 30),
            row.suggested_category.as_deref().unwrap_or("-"),
            row.recurrence,
        );
    }
    println!();
    println!("Validate with: centime validate <ids> [--category id=name]");
    println!("Reject with:   centime reject <ids>");
    Ok(())
}

/// Parse repeated `--category id=name` overrides
fn parse_overrides(overrides: &[String]) -> Result<HashMap<i64, String>> {
    let mut map = HashMap::new();
    for entry in overrides {
        let Some((id, name)) = entry.split_once('=') else {
            bail!("Invalid category override '{}' (expected id=name)", entry);
        };
        let id: i64 = id
            .trim()
            .parse()
            .map_err(|_| anyhow::anyhow!("Invalid staged id in override '{}'", entry))?;
        map.insert(id, name.trim().to_string());
    }
    Ok(map)
}

pub fn cmd_validate(db: &Database, user: &str, ids: &[i64], overrides: &[String]) -> Result<()> {
    let overrides = parse_overrides(overrides)?;

    let mut validated = 0;
    for id in ids {
        let category = overrides.get(id).map(String::as_str);
        match convert_staged(db, db, user, *id, category) {
            Ok(summary) => {
                validated += 1;
                match summary.category {
                    Some(category) => println!("  {} -> expense ({})", id, category),
                    None => println!("  {} -> income", id),
                }
                if summary.subscription_id.is_some() {
                    println!("       promoted to subscription");
                }
            }
            Err(e) => println!("  {} failed: {}", id, e),
        }
    }
    println!("Validated {} of {} staged transactions.", validated, ids.len());
    Ok(())
}

pub fn cmd_reject(db: &Database, user: &str, ids: &[i64]) -> Result<()> {
    let mut rejected = 0;
    for id in ids {
        match reject_staged(db, user, *id) {
            Ok(()) => rejected += 1,
            Err(e) => println!("  {} failed: {}", id, e),
        }
    }
    println!("Rejected {} of {} staged transactions.", rejected, ids.len());
    Ok(())
}
