//! CLI command implementations
//!
//! Commands are organized by domain:
//! - `core` - Shared utilities (config, snapshot loading, `--now` parsing)
//! - `analyze` - Full analytics report, per relationship in parallel
//! - `warnings` - Alerts for an upcoming interaction
//! - `triggers` - Trigger risk profiles
//! - `config` - Show the active configuration

pub mod analyze;
pub mod config;
pub mod core;
pub mod triggers;
pub mod warnings;

// Re-export command functions for main.rs
pub use analyze::*;
pub use config::*;
pub use core::*;
pub use triggers::*;
pub use warnings::*;

/// Truncate a string to a maximum length, adding "..." if truncated
pub fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}
