//! CLI command implementations
//!
//! Commands are organized by domain:
//! - `core` - Init command and shared utilities (open_db)
//! - `accounts` - Account management commands
//! - `import` - Statement import and batch listing
//! - `review` - Staged transaction review (show, validate, reject)
//! - `serve` - Web server command

pub mod accounts;
pub mod core;
pub mod import;
pub mod review;
pub mod serve;

// Re-export command functions for main.rs
pub use accounts::*;
pub use core::*;
pub use import::*;
pub use review::*;
pub use serve::*;

/// Truncate a string to a maximum length, adding "..." if truncated
pub fn truncate(s: &str, max: usize) -> String {
    if s.len() <= max {
        s.to_string()
    } else {
        format!("{}...", &s[..max.saturating_sub(3)])
    }
}
