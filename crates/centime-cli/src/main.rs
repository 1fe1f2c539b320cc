//! Centime CLI - Personal finance tracker
//!
//! Usage:
//!   centime init                         Initialize database
//!   centime accounts add "Checking"      Create an account
//!   centime import file.csv --account 1  Import a bank statement
//!   centime review 1                     Show staged rows of a batch
//!   centime serve --port 3000            Start web server

mod cli;
mod commands;

#[cfg(test)]
mod tests;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use cli::*;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging
    // Priority: RUST_LOG env var > --verbose flag > default (info)
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).compact())
        .init();

    match cli.command {
        Commands::Init => commands::cmd_init(&cli.db, cli.no_encrypt),
        Commands::Accounts { action } => {
            let db = commands::open_db(&cli.db, cli.no_encrypt)?;
            match action {
                AccountsAction::Add { name } => commands::cmd_accounts_add(&db, &cli.user, &name),
                AccountsAction::List => commands::cmd_accounts_list(&db, &cli.user),
            }
        }
        Commands::Import { file, account, bank } => {
            let db = commands::open_db(&cli.db, cli.no_encrypt)?;
            commands::cmd_import(&db, &cli.user, &file, account, bank.as_deref())
        }
        Commands::Batches { limit } => {
            let db = commands::open_db(&cli.db, cli.no_encrypt)?;
            commands::cmd_batches(&db, &cli.user, limit)
        }
        Commands::Review { batch } => {
            let db = commands::open_db(&cli.db, cli.no_encrypt)?;
            commands::cmd_review(&db, &cli.user, batch)
        }
        Commands::Validate { ids, category } => {
            let db = commands::open_db(&cli.db, cli.no_encrypt)?;
            commands::cmd_validate(&db, &cli.user, &ids, &category)
        }
        Commands::Reject { ids } => {
            let db = commands::open_db(&cli.db, cli.no_encrypt)?;
            commands::cmd_reject(&db, &cli.user, &ids)
        }
        Commands::Serve {
            port,
            host,
            no_auth,
        } => commands::cmd_serve(&cli.db, &host, port, no_auth, cli.no_encrypt).await,
    }
}
