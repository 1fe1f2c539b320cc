//! Account management commands

use anyhow::Result;
use centime_core::db::Database;

pub fn cmd_accounts_add(db: &Database, user: &str, name: &str) -> Result<()> {
    let account = db.upsert_account(user, name)?;
    println!("Account {} \"{}\" ready.", account.id, account.name);
    Ok(())
}

pub fn cmd_accounts_list(db: &Database, user: &str) -> Result<()> {
    let accounts = db.list_accounts(user)?;
    if accounts.is_empty() {
        println!("No accounts. Create one with: centime accounts add \"Checking\"");
        return Ok(());
    }

    println!("{:<6} {:<30} {}", "ID", "NAME", "CREATED");
    for account in accounts {
        println!(
            "{:<6} {:<30} {}",
            account.id,
            account.name,
            account.created_at.format("%Y-%m-%d")
        );
    }
    Ok(())
}
