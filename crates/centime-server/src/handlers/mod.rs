//! HTTP request handlers organized by domain
//!
//! Each submodule contains handlers for a specific API area.

pub mod accounts;
pub mod imports;
pub mod review;

// Re-export all handlers for use in router
pub use accounts::*;
pub use imports::*;
pub use review::*;
