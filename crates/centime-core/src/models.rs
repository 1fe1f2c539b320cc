//! Data models for Centime

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Supported bank statement sources
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BankSource {
    Boursorama,
    SocieteGenerale,
    CreditAgricole,
    N26,
    Revolut,
    Generic,
}

impl BankSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Boursorama => "boursorama",
            Self::SocieteGenerale => "societe_generale",
            Self::CreditAgricole => "credit_agricole",
            Self::N26 => "n26",
            Self::Revolut => "revolut",
            Self::Generic => "generic",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Boursorama => "Boursorama",
            Self::SocieteGenerale => "Société Générale",
            Self::CreditAgricole => "Crédit Agricole",
            Self::N26 => "N26",
            Self::Revolut => "Revolut",
            Self::Generic => "Generic CSV",
        }
    }
}

impl std::str::FromStr for BankSource {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "boursorama" => Ok(Self::Boursorama),
            "societe_generale" | "societegenerale" | "sg" => Ok(Self::SocieteGenerale),
            "credit_agricole" | "creditagricole" | "ca" => Ok(Self::CreditAgricole),
            "n26" => Ok(Self::N26),
            "revolut" => Ok(Self::Revolut),
            "generic" => Ok(Self::Generic),
            _ => Err(format!("Unknown bank source: {}", s)),
        }
    }
}

impl std::fmt::Display for BankSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Recurrence hint attached to a staged transaction by the categorizer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum RecurrenceHint {
    #[default]
    None,
    Income,
    Subscription,
}

impl RecurrenceHint {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Income => "income",
            Self::Subscription => "subscription",
        }
    }
}

impl std::str::FromStr for RecurrenceHint {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "none" => Ok(Self::None),
            "income" => Ok(Self::Income),
            "subscription" => Ok(Self::Subscription),
            _ => Err(format!("Unknown recurrence hint: {}", s)),
        }
    }
}

impl std::fmt::Display for RecurrenceHint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Import batch lifecycle status
///
/// A batch is created in `processing` the moment row parsing starts and
/// transitions exactly once, to `completed` or `failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BatchStatus {
    Processing,
    Completed,
    Failed,
}

impl BatchStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Processing => "processing",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }
}

impl std::str::FromStr for BatchStatus {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "processing" => Ok(Self::Processing),
            "completed" => Ok(Self::Completed),
            "failed" => Ok(Self::Failed),
            _ => Err(format!("Unknown batch status: {}", s)),
        }
    }
}

impl std::fmt::Display for BatchStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Staged transaction lifecycle status
///
/// `pending` rows await review; `converted` and `rejected` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum StagedStatus {
    #[default]
    Pending,
    Converted,
    Rejected,
}

impl StagedStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Converted => "converted",
            Self::Rejected => "rejected",
        }
    }
}

impl std::str::FromStr for StagedStatus {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pending" => Ok(Self::Pending),
            "converted" => Ok(Self::Converted),
            "rejected" => Ok(Self::Rejected),
            _ => Err(format!("Unknown staged status: {}", s)),
        }
    }
}

impl std::fmt::Display for StagedStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A bank account owned by a user
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    pub id: i64,
    pub user_id: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

/// Transient parser output: one statement row reduced to the common shape
/// before persistence. Credit is positive, debit negative.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedTransaction {
    pub date: NaiveDate,
    pub label: String,
    pub amount: f64,
    /// Original row as JSON (headers as keys), kept for diagnostics
    pub raw_data: Option<String>,
}

/// Staged transaction candidate ready for insertion
#[derive(Debug, Clone)]
pub struct NewStagedTransaction {
    pub date: NaiveDate,
    pub label: String,
    pub amount: f64,
    pub source: BankSource,
    pub suggested_category: Option<String>,
    pub recurrence: RecurrenceHint,
    pub raw_data: Option<String>,
    pub dedup_digest: String,
}

impl NewStagedTransaction {
    /// Build a staged candidate for a given owner scope, computing the
    /// dedup digest over (user, account, label, amount, date, source).
    pub fn from_parsed(
        user_id: &str,
        account_id: i64,
        source: BankSource,
        parsed: &ParsedTransaction,
        suggested_category: Option<String>,
        recurrence: RecurrenceHint,
    ) -> Self {
        let dedup_digest = dedup_digest(
            user_id,
            account_id,
            &parsed.label,
            parsed.amount,
            &parsed.date,
            source,
        );
        Self {
            date: parsed.date,
            label: parsed.label.clone(),
            amount: parsed.amount,
            source,
            suggested_category,
            recurrence,
            raw_data: parsed.raw_data.clone(),
            dedup_digest,
        }
    }
}

/// Compute the dedup digest for a staged transaction
///
/// The digest covers the full dedup key so re-importing an overlapping
/// statement period hits the storage uniqueness constraint instead of
/// double-inserting.
pub fn dedup_digest(
    user_id: &str,
    account_id: i64,
    label: &str,
    amount: f64,
    date: &NaiveDate,
    source: BankSource,
) -> String {
    let mut hasher = Sha256::new();
    hasher.update(user_id.as_bytes());
    hasher.update(account_id.to_be_bytes());
    hasher.update(label.as_bytes());
    hasher.update(amount.to_be_bytes());
    hasher.update(date.to_string().as_bytes());
    hasher.update(source.as_str().as_bytes());
    hex::encode(hasher.finalize())
}

/// A staged transaction awaiting review
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StagedTransaction {
    pub id: i64,
    pub user_id: String,
    pub account_id: i64,
    pub batch_id: i64,
    pub date: NaiveDate,
    pub label: String,
    /// Signed: positive = credit/income, negative = debit/expense
    pub amount: f64,
    pub source: BankSource,
    pub suggested_category: Option<String>,
    pub recurrence: RecurrenceHint,
    pub status: StagedStatus,
    /// Ledger record created by conversion (income or expense id)
    pub ledger_record_id: Option<i64>,
    /// Category name the row was converted under
    pub final_category: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// One file-upload ingestion event and its aggregate counters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportBatch {
    pub id: i64,
    pub user_id: String,
    pub account_id: i64,
    pub source: BankSource,
    pub file_name: Option<String>,
    pub total_rows: i64,
    pub imported_rows: i64,
    pub skipped_rows: i64,
    pub error_rows: i64,
    pub status: BatchStatus,
    pub error_summary: Option<String>,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

/// An expense category, either user-owned or a seeded global default
/// (`user_id` is NULL for defaults)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Category {
    pub id: i64,
    pub user_id: Option<String>,
    pub name: String,
    pub color: String,
    pub icon: String,
}

/// Neutral appearance for categories created on the fly during conversion
pub const DEFAULT_CATEGORY_COLOR: &str = "#6b7280";
pub const DEFAULT_CATEGORY_ICON: &str = "tag";

/// An income ledger record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Income {
    pub id: i64,
    pub user_id: String,
    pub account_id: i64,
    pub label: String,
    pub amount: f64,
    pub date: NaiveDate,
    pub created_at: DateTime<Utc>,
}

/// An expense ledger record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Expense {
    pub id: i64,
    pub user_id: String,
    pub account_id: i64,
    pub label: String,
    /// Stored as a positive magnitude
    pub amount: f64,
    pub date: NaiveDate,
    pub category_id: i64,
    pub created_at: DateTime<Utc>,
}

/// A recurring subscription promoted from a staged transaction
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Subscription {
    pub id: i64,
    pub user_id: String,
    pub name: String,
    pub amount: f64,
    /// Day of month the charge lands on (1-31)
    pub billing_day: u32,
    pub status: SubscriptionStatus,
    pub created_at: DateTime<Utc>,
}

/// Subscription status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SubscriptionStatus {
    #[default]
    Active,
    Cancelled,
}

impl SubscriptionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Cancelled => "cancelled",
        }
    }
}

impl std::str::FromStr for SubscriptionStatus {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "active" => Ok(Self::Active),
            "cancelled" => Ok(Self::Cancelled),
            _ => Err(format!("Unknown subscription status: {}", s)),
        }
    }
}
