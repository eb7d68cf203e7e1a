//! CLI command implementations
//!
//! Commands are organized by domain:
//! - `core` - Init command and shared utilities (open_db)
//! - `prompts` - Prompt library management commands
//! - `reports` - Monthly report command
//! - `serve` - Web server command
//! - `users` - User registration

pub mod core;
pub mod prompts;
pub mod reports;
pub mod serve;
pub mod users;

// Re-export command functions for main.rs
pub use core::*;
pub use prompts::*;
pub use reports::*;
pub use serve::*;
pub use users::*;
