//! Ledger records: incomes, expenses, categories, subscriptions, and
//! category feedback

use chrono::NaiveDate;
use rusqlite::{params, OptionalExtension};

use super::Database;
use crate::error::Result;
use crate::models::{
    Category, RecurrenceHint, SubscriptionStatus, DEFAULT_CATEGORY_COLOR, DEFAULT_CATEGORY_ICON,
};

impl Database {
    /// Find a category by name, or create a user-owned one
    ///
    /// Matching is case-insensitive and prefers the user's own category
    /// over a seeded global default of the same name.
    pub fn find_or_create_category(&self, user_id: &str, name: &str) -> Result<i64> {
        let conn = self.conn()?;

        let existing: Option<i64> = conn
            .query_row(
                r#"
                SELECT id FROM categories
                WHERE (user_id = ?1 OR user_id IS NULL) AND LOWER(name) = LOWER(?2)
                ORDER BY user_id IS NULL
                LIMIT 1
                "#,
                params![user_id, name],
                |row| row.get(0),
            )
            .optional()?;

        if let Some(id) = existing {
            return Ok(id);
        }

        conn.execute(
            "INSERT INTO categories (user_id, name, color, icon) VALUES (?, ?, ?, ?)",
            params![user_id, name, DEFAULT_CATEGORY_COLOR, DEFAULT_CATEGORY_ICON],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// List categories visible to a user: their own plus the global
    /// defaults
    pub fn list_categories(&self, user_id: &str) -> Result<Vec<Category>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT id, user_id, name, color, icon FROM categories
            WHERE user_id = ? OR user_id IS NULL
            ORDER BY name
            "#,
        )?;
        let categories = stmt
            .query_map(params![user_id], |row| {
                Ok(Category {
                    id: row.get(0)?,
                    user_id: row.get(1)?,
                    name: row.get(2)?,
                    color: row.get(3)?,
                    icon: row.get(4)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(categories)
    }

    /// Create an income record
    pub fn create_income(
        &self,
        user_id: &str,
        account_id: i64,
        label: &str,
        amount: f64,
        date: NaiveDate,
    ) -> Result<i64> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO incomes (user_id, account_id, label, amount, date) VALUES (?, ?, ?, ?, ?)",
            params![user_id, account_id, label, amount, date.to_string()],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// Create an expense record (amount is a positive magnitude)
    pub fn create_expense(
        &self,
        user_id: &str,
        account_id: i64,
        label: &str,
        amount: f64,
        date: NaiveDate,
        category_id: i64,
    ) -> Result<i64> {
        let conn = self.conn()?;
        conn.execute(
            r#"
            INSERT INTO expenses (user_id, account_id, label, amount, date, category_id)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
            params![
                user_id,
                account_id,
                label,
                amount,
                date.to_string(),
                category_id,
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// Find a user's active subscription by name (case-insensitive)
    pub fn find_active_subscription(&self, user_id: &str, name: &str) -> Result<Option<i64>> {
        let conn = self.conn()?;
        let id = conn
            .query_row(
                r#"
                SELECT id FROM subscriptions
                WHERE user_id = ? AND LOWER(name) = LOWER(?) AND status = 'active'
                LIMIT 1
                "#,
                params![user_id, name],
                |row| row.get(0),
            )
            .optional()?;
        Ok(id)
    }

    /// Create an active subscription
    pub fn create_subscription(
        &self,
        user_id: &str,
        name: &str,
        amount: f64,
        billing_day: u32,
    ) -> Result<i64> {
        let conn = self.conn()?;
        conn.execute(
            r#"
            INSERT INTO subscriptions (user_id, name, amount, billing_day, status)
            VALUES (?, ?, ?, ?, ?)
            "#,
            params![
                user_id,
                name,
                amount,
                billing_day,
                SubscriptionStatus::Active.as_str(),
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// Record a category correction so future suggestions for the same
    /// label follow the user's choice
    pub fn record_category_feedback(
        &self,
        user_id: &str,
        label_pattern: &str,
        suggested_category: Option<&str>,
        chosen_category: &str,
        recurrence: RecurrenceHint,
    ) -> Result<()> {
        let conn = self.conn()?;
        conn.execute(
            r#"
            INSERT INTO category_feedback
                (user_id, label_pattern, suggested_category, chosen_category, recurrence)
            VALUES (?, ?, ?, ?, ?)
            "#,
            params![
                user_id,
                label_pattern,
                suggested_category,
                chosen_category,
                recurrence.as_str(),
            ],
        )?;
        Ok(())
    }

    /// Most recent learned category for a label, if the user corrected
    /// one before
    pub fn lookup_category_feedback(
        &self,
        user_id: &str,
        label_pattern: &str,
    ) -> Result<Option<String>> {
        let conn = self.conn()?;
        let chosen = conn
            .query_row(
                r#"
                SELECT chosen_category FROM category_feedback
                WHERE user_id = ? AND LOWER(label_pattern) = LOWER(?)
                ORDER BY created_at DESC, id DESC
                LIMIT 1
                "#,
                params![user_id, label_pattern],
                |row| row.get(0),
            )
            .optional()?;
        Ok(chosen)
    }
}
