//! MoneyTalk Core Library
//!
//! Shared functionality for the MoneyTalk personal finance API:
//! - Database access and migrations (users, categories, transactions)
//! - Monthly financial report engine
//! - Password hashing and bearer tokens
//! - Pluggable local AI backends that narrate finished reports
//! - Prompt library for customizable AI prompts

pub mod ai;
pub mod auth;
pub mod db;
pub mod error;
pub mod models;
pub mod prompts;
pub mod report;
pub mod store;

/// Test utilities including mock Ollama server
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use ai::{explain_with_timeout, AIBackend, AIClient, InsightOutcome, MockBackend, OllamaBackend};
pub use auth::IssuedToken;
pub use db::Database;
pub use error::{AuthError, Error, Result, StoreError};
pub use prompts::{Prompt, PromptId, PromptInfo, PromptLibrary};
pub use report::FinanceEngine;
pub use store::{CategoryStore, TransactionStore};
