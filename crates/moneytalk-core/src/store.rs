//! Read interfaces the report engine consumes
//!
//! The engine never talks to SQLite directly; it borrows read access through
//! these traits so any backing store (or a test double) can feed it.

use async_trait::async_trait;
use uuid::Uuid;

use crate::db::Database;
use crate::error::Result;
use crate::models::{Category, Transaction};

/// Source of a user's transactions
#[async_trait]
pub trait TransactionStore: Send + Sync {
    /// Transactions owned by `user_id` whose occurrence has this calendar month and year
    async fn list_for_user_month(
        &self,
        user_id: Uuid,
        month: u32,
        year: i32,
    ) -> Result<Vec<Transaction>>;
}

/// Source of a user's categories
#[async_trait]
pub trait CategoryStore: Send + Sync {
    /// Every category owned by `user_id`
    async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<Category>>;
}

#[async_trait]
impl TransactionStore for Database {
    async fn list_for_user_month(
        &self,
        user_id: Uuid,
        month: u32,
        year: i32,
    ) -> Result<Vec<Transaction>> {
        self.list_transactions_for_month(user_id, month, year)
    }
}

#[async_trait]
impl CategoryStore for Database {
    async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<Category>> {
        self.list_categories(user_id)
    }
}
