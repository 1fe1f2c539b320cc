//! Database access layer with connection pooling and migrations
//!
//! This module is organized by domain:
//! - `accounts` - Bank account operations
//! - `batches` - Import batch lifecycle and counters
//! - `staged` - Staged transaction insertion (dedup) and review state
//! - `ledger` - Incomes, expenses, categories, subscriptions, and
//!   category feedback

use chrono::{DateTime, NaiveDate, Utc};
use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use tracing::info;

use crate::error::{Error, Result};

mod accounts;
mod batches;
mod ledger;
mod staged;

pub use staged::StagedInsertResult;

pub type DbPool = Pool<SqliteConnectionManager>;
pub type DbConn = PooledConnection<SqliteConnectionManager>;

/// Environment variable for database encryption key
pub const DB_KEY_ENV: &str = "CENTIME_DB_KEY";

/// Derive an encryption key from a passphrase using Argon2
///
/// Uses a fixed application salt so the same passphrase always produces
/// the same key, regardless of database path. This allows
/// moving/renaming/restoring the database freely.
fn derive_key(passphrase: &str) -> Result<String> {
    use argon2::{password_hash::SaltString, Argon2, PasswordHasher};

    // Fixed application salt - changing this would invalidate all existing encrypted databases
    const APP_SALT: &[u8; 16] = b"centime-salt-v1a";

    let salt = SaltString::encode_b64(APP_SALT)
        .map_err(|e| Error::Encryption(format!("Failed to create salt: {}", e)))?;

    let argon2 = Argon2::default();
    let hash = argon2
        .hash_password(passphrase.as_bytes(), &salt)
        .map_err(|e| Error::Encryption(format!("Failed to derive key: {}", e)))?;

    // Extract the hash portion for use as SQLCipher key (hex encoded)
    let hash_str = hash
        .hash
        .ok_or_else(|| Error::Encryption("No hash output".to_string()))?;
    Ok(hex::encode(hash_str.as_bytes()))
}

/// Parse a SQLite datetime string into a DateTime<Utc>
pub(crate) fn parse_datetime(s: &str) -> DateTime<Utc> {
    // SQLite stores as "YYYY-MM-DD HH:MM:SS" format
    chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S")
        .map(|dt| dt.and_utc())
        .unwrap_or_else(|_| Utc::now())
}

/// Parse a SQLite date string into a NaiveDate
pub(crate) fn parse_date(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap_or_default()
}

/// Database wrapper with connection pooling
#[derive(Clone)]
pub struct Database {
    pool: DbPool,
}

impl Database {
    /// Create a new database connection pool with encryption
    ///
    /// Requires `CENTIME_DB_KEY` environment variable to be set.
    /// The database will be encrypted using SQLCipher with a key derived
    /// from the passphrase via Argon2.
    ///
    /// Returns an error if `CENTIME_DB_KEY` is not set. Use
    /// `new_unencrypted()` for development/testing without encryption.
    pub fn new(path: &str) -> Result<Self> {
        let encryption_key = std::env::var(DB_KEY_ENV).ok();
        match encryption_key {
            Some(key) => Self::new_with_key(path, Some(&key)),
            None => Err(Error::Encryption(format!(
                "Database encryption required. Set {} environment variable with your passphrase, \
                or use --no-encrypt for unencrypted databases (not recommended for production).",
                DB_KEY_ENV
            ))),
        }
    }

    /// Create a new unencrypted database connection pool
    ///
    /// WARNING: This creates an unencrypted database. Only use for
    /// development or testing. For production, use `new()` with
    /// `CENTIME_DB_KEY` set.
    pub fn new_unencrypted(path: &str) -> Result<Self> {
        Self::new_with_key(path, None)
    }

    /// Create a new database with an explicit encryption key
    pub fn new_with_key(path: &str, passphrase: Option<&str>) -> Result<Self> {
        let manager = SqliteConnectionManager::file(path);

        let pool = if let Some(pass) = passphrase {
            let key = derive_key(pass)?;
            let key_pragma = format!("PRAGMA key = 'x\"{}\"';", key);

            // Use with_init to set the key on every new connection
            let manager = manager.with_init(move |conn| {
                conn.execute_batch(&key_pragma)?;
                Ok(())
            });

            Pool::builder().max_size(10).build(manager)?
        } else {
            Pool::builder().max_size(10).build(manager)?
        };

        let db = Self { pool };
        db.run_migrations()?;

        Ok(db)
    }

    /// Create an in-memory database (for testing)
    ///
    /// Note: Uses a temporary file rather than `:memory:` because
    /// SQLCipher has issues with in-memory databases in the connection
    /// pool.
    pub fn in_memory() -> Result<Self> {
        use std::sync::atomic::{AtomicU64, Ordering};
        static COUNTER: AtomicU64 = AtomicU64::new(0);

        let id = COUNTER.fetch_add(1, Ordering::SeqCst);
        let path = format!("/tmp/centime_test_{}_{}.db", std::process::id(), id);

        // Remove any existing file
        let _ = std::fs::remove_file(&path);

        Self::new_unencrypted(&path)
    }

    /// Get a connection from the pool
    pub fn conn(&self) -> Result<DbConn> {
        Ok(self.pool.get()?)
    }

    /// Run database migrations
    fn run_migrations(&self) -> Result<()> {
        let conn = self.conn()?;

        conn.execute_batch(
            r#"
            -- Enable foreign keys
            PRAGMA foreign_keys = ON;

            -- WAL mode: better concurrency, readers don't block writers
            -- Note: creates -wal and -shm sidecar files alongside the database
            PRAGMA journal_mode = WAL;

            -- Synchronous NORMAL: good balance of safety and performance
            PRAGMA synchronous = NORMAL;

            -- Store temp tables in memory (faster for complex queries)
            PRAGMA temp_store = MEMORY;

            -- Accounts (bank accounts, scoped per user)
            CREATE TABLE IF NOT EXISTS accounts (
                id INTEGER PRIMARY KEY,
                user_id TEXT NOT NULL,
                name TEXT NOT NULL,
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP,
                UNIQUE(user_id, name)
            );

            CREATE INDEX IF NOT EXISTS idx_accounts_user ON accounts(user_id);

            -- Import batches (one per statement file upload)
            CREATE TABLE IF NOT EXISTS import_batches (
                id INTEGER PRIMARY KEY,
                user_id TEXT NOT NULL,
                account_id INTEGER NOT NULL REFERENCES accounts(id),
                source TEXT NOT NULL,                       -- detected bank format
                file_name TEXT,
                total_rows INTEGER NOT NULL DEFAULT 0,
                imported_rows INTEGER NOT NULL DEFAULT 0,
                skipped_rows INTEGER NOT NULL DEFAULT 0,
                error_rows INTEGER NOT NULL DEFAULT 0,
                status TEXT NOT NULL DEFAULT 'processing',  -- processing, completed, failed
                error_summary TEXT,                         -- first few row errors, newline separated
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP,
                completed_at DATETIME
            );

            CREATE INDEX IF NOT EXISTS idx_batches_user ON import_batches(user_id);
            CREATE INDEX IF NOT EXISTS idx_batches_account ON import_batches(account_id);
            CREATE INDEX IF NOT EXISTS idx_batches_created ON import_batches(created_at);

            -- Staged transactions (parsed rows awaiting review)
            CREATE TABLE IF NOT EXISTS staged_transactions (
                id INTEGER PRIMARY KEY,
                user_id TEXT NOT NULL,
                account_id INTEGER NOT NULL REFERENCES accounts(id),
                batch_id INTEGER NOT NULL REFERENCES import_batches(id),
                date DATE NOT NULL,
                label TEXT NOT NULL,
                amount REAL NOT NULL,                       -- signed: credit positive, debit negative
                source TEXT NOT NULL,
                suggested_category TEXT,
                recurrence TEXT NOT NULL DEFAULT 'none',    -- none, income, subscription
                status TEXT NOT NULL DEFAULT 'pending',     -- pending, converted, rejected
                ledger_record_id INTEGER,                   -- income/expense id once converted
                final_category TEXT,                        -- category name chosen at conversion
                raw_data TEXT,                              -- JSON of original statement row
                dedup_digest TEXT NOT NULL UNIQUE,          -- SHA-256 over the dedup key
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP
            );

            CREATE INDEX IF NOT EXISTS idx_staged_batch ON staged_transactions(batch_id);
            CREATE INDEX IF NOT EXISTS idx_staged_user_status ON staged_transactions(user_id, status);

            -- Categories (user-owned, or seeded global defaults with NULL user_id)
            CREATE TABLE IF NOT EXISTS categories (
                id INTEGER PRIMARY KEY,
                user_id TEXT,
                name TEXT NOT NULL,
                color TEXT NOT NULL,
                icon TEXT NOT NULL,
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP,
                UNIQUE(user_id, name)
            );

            CREATE INDEX IF NOT EXISTS idx_categories_user ON categories(user_id);

            -- Seeded defaults use fixed ids so re-running migrations is idempotent
            INSERT OR IGNORE INTO categories (id, user_id, name, color, icon) VALUES
                (1, NULL, 'Groceries', '#22c55e', 'shopping-cart'),
                (2, NULL, 'Restaurants', '#f97316', 'utensils'),
                (3, NULL, 'Transport', '#3b82f6', 'bus'),
                (4, NULL, 'Housing', '#8b5cf6', 'home'),
                (5, NULL, 'Utilities', '#eab308', 'zap'),
                (6, NULL, 'Entertainment', '#ec4899', 'film'),
                (7, NULL, 'Health', '#ef4444', 'heart'),
                (8, NULL, 'Other', '#6b7280', 'tag');

            -- Income ledger records
            CREATE TABLE IF NOT EXISTS incomes (
                id INTEGER PRIMARY KEY,
                user_id TEXT NOT NULL,
                account_id INTEGER NOT NULL REFERENCES accounts(id),
                label TEXT NOT NULL,
                amount REAL NOT NULL,
                date DATE NOT NULL,
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP
            );

            CREATE INDEX IF NOT EXISTS idx_incomes_user ON incomes(user_id);
            CREATE INDEX IF NOT EXISTS idx_incomes_date ON incomes(date);

            -- Expense ledger records (amount stored as positive magnitude)
            CREATE TABLE IF NOT EXISTS expenses (
                id INTEGER PRIMARY KEY,
                user_id TEXT NOT NULL,
                account_id INTEGER NOT NULL REFERENCES accounts(id),
                label TEXT NOT NULL,
                amount REAL NOT NULL,
                date DATE NOT NULL,
                category_id INTEGER NOT NULL REFERENCES categories(id),
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP
            );

            CREATE INDEX IF NOT EXISTS idx_expenses_user ON expenses(user_id);
            CREATE INDEX IF NOT EXISTS idx_expenses_date ON expenses(date);
            CREATE INDEX IF NOT EXISTS idx_expenses_category ON expenses(category_id);

            -- Subscriptions (recurring charges promoted during review)
            CREATE TABLE IF NOT EXISTS subscriptions (
                id INTEGER PRIMARY KEY,
                user_id TEXT NOT NULL,
                name TEXT NOT NULL,
                amount REAL NOT NULL,
                billing_day INTEGER NOT NULL,               -- day of month (1-31)
                status TEXT NOT NULL DEFAULT 'active',      -- active, cancelled
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP
            );

            CREATE INDEX IF NOT EXISTS idx_subscriptions_user ON subscriptions(user_id);
            CREATE INDEX IF NOT EXISTS idx_subscriptions_status ON subscriptions(status);

            -- Category feedback (user corrections of suggested categories)
            CREATE TABLE IF NOT EXISTS category_feedback (
                id INTEGER PRIMARY KEY,
                user_id TEXT NOT NULL,
                label_pattern TEXT NOT NULL,                -- normalized label the correction applies to
                suggested_category TEXT,                    -- what the heuristic proposed
                chosen_category TEXT NOT NULL,              -- what the user picked
                recurrence TEXT NOT NULL DEFAULT 'none',    -- hint the corrected row carried
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP
            );

            CREATE INDEX IF NOT EXISTS idx_feedback_user_pattern ON category_feedback(user_id, label_pattern);
            "#,
        )?;

        info!("Database schema initialized");
        Ok(())
    }
}

#[cfg(test)]
mod tests;
