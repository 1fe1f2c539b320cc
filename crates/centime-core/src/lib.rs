//! Centime Core Library
//!
//! Shared functionality for the Centime personal finance tracker:
//! - Database access and migrations
//! - Statement tokenization and field normalization
//! - Bank format detection and per-institution row parsers
//! - Import orchestration with batch lifecycle and dedup
//! - Review/conversion of staged rows into ledger records
//! - Heuristic category suggestion with correction learning

pub mod categorize;
pub mod db;
pub mod error;
pub mod formats;
pub mod import;
pub mod models;
pub mod normalize;
pub mod review;
pub mod tokenizer;

pub use categorize::{CategoryLearner, CategorySuggestion, RuleBasedCategorizer};
pub use db::{Database, StagedInsertResult};
pub use error::{Error, Result};
pub use formats::detect_format;
pub use models::BankSource;
pub use import::{run_import, BatchOutcome, ImportRequest, MAX_ERROR_MESSAGES, MAX_IMPORT_BYTES};
pub use review::{convert_staged, reject_staged, ConversionSummary};
