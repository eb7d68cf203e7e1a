//! Error types for MoneyTalk

use thiserror::Error;
use uuid::Uuid;

/// Failures of the underlying persistence layer
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Database pool error: {0}")]
    Pool(#[from] r2d2::Error),
}

/// Authentication failures (tokens and passwords)
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("Authorization token missing or invalid")]
    MissingToken,

    #[error("Token expired")]
    Expired,

    #[error("Invalid token")]
    InvalidToken,

    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("Password hashing failed: {0}")]
    Hashing(String),
}

#[derive(Error, Debug)]
pub enum Error {
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error(
        "Data consistency error: transaction {transaction_id} references unknown category {category_id}"
    )]
    DataConsistency {
        transaction_id: Uuid,
        category_id: Uuid,
    },

    #[error("Amount overflow: {0}")]
    Overflow(String),

    #[error("Invalid period: year={year}, month={month}")]
    InvalidPeriod { year: i32, month: u32 },

    #[error("Encryption error: {0}")]
    Encryption(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("AI backend error: {0}")]
    Ai(String),

    #[error("Authentication error: {0}")]
    Auth(#[from] AuthError),

    #[error("Invalid data: {0}")]
    InvalidData(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Regex error: {0}")]
    Regex(#[from] regex::Error),
}

impl From<rusqlite::Error> for Error {
    fn from(err: rusqlite::Error) -> Self {
        Error::Store(StoreError::Database(err))
    }
}

impl From<r2d2::Error> for Error {
    fn from(err: r2d2::Error) -> Self {
        Error::Store(StoreError::Pool(err))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
