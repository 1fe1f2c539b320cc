//! Core command implementations and shared utilities

use std::path::Path;

use anyhow::{Context, Result};
use centime_core::db::Database;

/// Open database with encryption by default, or unencrypted if --no-encrypt
pub fn open_db(db_path: &Path, no_encrypt: bool) -> Result<Database> {
    let path_str = db_path.to_string_lossy();
    if no_encrypt {
        Database::new_unencrypted(&path_str).context("Failed to open database (unencrypted)")
    } else {
        Database::new(&path_str).context("Failed to open database")
    }
}

pub fn cmd_init(db_path: &Path, no_encrypt: bool) -> Result<()> {
    println!("Initializing database at {}...", db_path.display());

    let _db = open_db(db_path, no_encrypt)?;

    if no_encrypt {
        println!("  Encryption: DISABLED (--no-encrypt)");
    } else {
        println!("  Encryption: ENABLED");
    }

    println!("Database initialized.");
    println!();
    println!("Next steps:");
    println!("  1. Create an account:  centime accounts add \"Checking\"");
    println!("  2. Import a statement: centime import statement.csv --account 1");
    println!("  3. Start the web UI:   centime serve");

    Ok(())
}
