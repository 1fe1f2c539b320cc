//! Account operations

use rusqlite::{params, OptionalExtension};

use super::{parse_datetime, Database};
use crate::error::{Error, Result};
use crate::models::Account;

impl Database {
    /// Create an account, or return the existing one with the same name
    pub fn upsert_account(&self, user_id: &str, name: &str) -> Result<Account> {
        let name = name.trim();
        if name.is_empty() {
            return Err(Error::InvalidData("Account name cannot be empty".into()));
        }

        let conn = self.conn()?;

        let existing: Option<i64> = conn
            .query_row(
                "SELECT id FROM accounts WHERE user_id = ? AND name = ?",
                params![user_id, name],
                |row| row.get(0),
            )
            .optional()?;

        let id = match existing {
            Some(id) => id,
            None => {
                conn.execute(
                    "INSERT INTO accounts (user_id, name) VALUES (?, ?)",
                    params![user_id, name],
                )?;
                conn.last_insert_rowid()
            }
        };

        self.get_account(user_id, id)?
            .ok_or_else(|| Error::NotFound(format!("Account {} not found after upsert", id)))
    }

    /// Get an account by id, scoped to its owner
    pub fn get_account(&self, user_id: &str, id: i64) -> Result<Option<Account>> {
        let conn = self.conn()?;
        let account = conn
            .query_row(
                "SELECT id, user_id, name, created_at FROM accounts WHERE id = ? AND user_id = ?",
                params![id, user_id],
                |row| {
                    let created_at: String = row.get(3)?;
                    Ok(Account {
                        id: row.get(0)?,
                        user_id: row.get(1)?,
                        name: row.get(2)?,
                        created_at: parse_datetime(&created_at),
                    })
                },
            )
            .optional()?;
        Ok(account)
    }

    /// List a user's accounts, ordered by name
    pub fn list_accounts(&self, user_id: &str) -> Result<Vec<Account>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, user_id, name, created_at FROM accounts WHERE user_id = ? ORDER BY name",
        )?;

        let accounts = stmt
            .query_map(params![user_id], |row| {
                let created_at: String = row.get(3)?;
                Ok(Account {
                    id: row.get(0)?,
                    user_id: row.get(1)?,
                    name: row.get(2)?,
                    created_at: parse_datetime(&created_at),
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(accounts)
    }
}
