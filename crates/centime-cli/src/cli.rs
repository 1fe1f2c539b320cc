//! CLI argument definitions using clap
//!
//! This module contains all the clap structs and enums for parsing CLI
//! arguments. The actual command implementations are in the `commands`
//! module.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Centime - Personal finance tracker with bank-statement import
#[derive(Parser)]
#[command(name = "centime")]
#[command(about = "Self-hosted personal finance tracker", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Database path
    #[arg(long, default_value = "centime.db", global = true)]
    pub db: PathBuf,

    /// User identity to act as
    #[arg(long, default_value = "local-dev", global = true)]
    pub user: String,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Disable database encryption (not recommended for production)
    ///
    /// By default, the database is encrypted using SQLCipher.
    /// Set CENTIME_DB_KEY environment variable with your passphrase.
    /// Use --no-encrypt only for development or testing.
    #[arg(long, global = true)]
    pub no_encrypt: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize the database
    Init,

    /// Manage accounts
    Accounts {
        #[command(subcommand)]
        action: AccountsAction,
    },

    /// Import a bank statement file
    Import {
        /// Statement file to import
        file: PathBuf,

        /// Target account id
        #[arg(short, long)]
        account: i64,

        /// Bank format (auto-detected if not specified)
        #[arg(short, long)]
        bank: Option<String>,
    },

    /// List import batches, newest first
    Batches {
        /// Maximum number of batches to show
        #[arg(short, long, default_value = "20")]
        limit: i64,
    },

    /// Show the staged transactions of a batch
    Review {
        /// Batch id
        batch: i64,
    },

    /// Convert staged transactions into ledger records
    Validate {
        /// Staged transaction ids
        #[arg(required = true)]
        ids: Vec<i64>,

        /// Category override as id=name (repeatable)
        #[arg(short, long)]
        category: Vec<String>,
    },

    /// Reject staged transactions
    Reject {
        /// Staged transaction ids
        #[arg(required = true)]
        ids: Vec<i64>,
    },

    /// Start the web server
    Serve {
        /// Port to listen on
        #[arg(short, long, default_value = "3000")]
        port: u16,

        /// Host to bind to
        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        /// Disable the identity header requirement (for local development only)
        ///
        /// WARNING: Do not use this flag when exposing the server to a network.
        #[arg(long)]
        no_auth: bool,
    },
}

#[derive(Subcommand)]
pub enum AccountsAction {
    /// Create an account
    Add {
        /// Account name
        name: String,
    },
    /// List accounts
    List,
}
