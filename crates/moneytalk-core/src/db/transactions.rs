//! Transaction CRUD operations

use chrono::{Datelike, NaiveDateTime};
use rusqlite::{params, OptionalExtension};
use rust_decimal::Decimal;
use tracing::debug;
use uuid::Uuid;

use super::{
    column_datetime, column_decimal, column_naive, column_parsed, column_uuid, format_occurred_at,
    Database,
};
use crate::error::{Error, Result};
use crate::models::{
    NewTransaction, Transaction, TransactionUpdate, TransactionWithCategory, SUPPORTED_YEARS,
};

const TRANSACTION_COLUMNS: &str =
    "id, user_id, category_id, amount, direction, occurred_at, description, created_at";

/// Same columns as `TRANSACTION_COLUMNS` followed by the category name and type
const JOINED_COLUMNS: &str = "t.id, t.user_id, t.category_id, t.amount, t.direction, t.occurred_at, \
     t.description, t.created_at, c.name, c.type";

/// Reject zero and negative amounts
pub fn ensure_positive_amount(amount: Decimal) -> Result<()> {
    if amount <= Decimal::ZERO {
        return Err(Error::InvalidData(
            "Amount must be greater than 0!".to_string(),
        ));
    }
    Ok(())
}

/// Reject occurrence years the monthly query cannot match
pub fn ensure_supported_occurred_at(occurred_at: &NaiveDateTime) -> Result<()> {
    if !SUPPORTED_YEARS.contains(&occurred_at.year()) {
        return Err(Error::InvalidData(format!(
            "occurred_at year must be between {} and {}",
            SUPPORTED_YEARS.start(),
            SUPPORTED_YEARS.end()
        )));
    }
    Ok(())
}

impl Database {
    /// Insert a transaction for a user
    ///
    /// The category must belong to the same user.
    pub fn insert_transaction(&self, user_id: Uuid, tx: &NewTransaction) -> Result<Transaction> {
        ensure_positive_amount(tx.amount)?;
        ensure_supported_occurred_at(&tx.occurred_at)?;
        if self.get_category(user_id, tx.category_id)?.is_none() {
            return Err(Error::NotFound(format!("category {}", tx.category_id)));
        }

        let id = Uuid::new_v4();
        {
            let conn = self.conn()?;
            conn.execute(
                "INSERT INTO transactions (id, user_id, category_id, amount, direction, occurred_at, description)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    id.to_string(),
                    user_id.to_string(),
                    tx.category_id.to_string(),
                    tx.amount.to_string(),
                    tx.direction.as_str(),
                    format_occurred_at(&tx.occurred_at),
                    tx.description,
                ],
            )?;
        }

        self.get_transaction(user_id, id)?
            .ok_or_else(|| Error::NotFound(format!("transaction {}", id)))
    }

    /// List a user's transactions with category name and type, newest first
    pub fn list_transactions_with_category(
        &self,
        user_id: Uuid,
    ) -> Result<Vec<TransactionWithCategory>> {
        let conn = self.conn()?;
        let sql = format!(
            "SELECT {} FROM transactions t
             JOIN categories c ON c.id = t.category_id
             WHERE t.user_id = ?1
             ORDER BY t.occurred_at DESC, t.created_at DESC",
            JOINED_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let transactions = stmt
            .query_map(params![user_id.to_string()], |row| {
                Self::row_to_transaction_with_category(row)
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(transactions)
    }

    /// Get one transaction with its category resolved
    pub fn get_transaction_with_category(
        &self,
        user_id: Uuid,
        id: Uuid,
    ) -> Result<Option<TransactionWithCategory>> {
        let conn = self.conn()?;
        let sql = format!(
            "SELECT {} FROM transactions t
             JOIN categories c ON c.id = t.category_id
             WHERE t.user_id = ?1 AND t.id = ?2",
            JOINED_COLUMNS
        );
        let transaction = conn
            .query_row(&sql, params![user_id.to_string(), id.to_string()], |row| {
                Self::row_to_transaction_with_category(row)
            })
            .optional()?;
        Ok(transaction)
    }

    /// List a user's transactions whose occurrence falls in a calendar month
    ///
    /// Matches the literal month and year components of the stored timestamp.
    pub fn list_transactions_for_month(
        &self,
        user_id: Uuid,
        month: u32,
        year: i32,
    ) -> Result<Vec<Transaction>> {
        let conn = self.conn()?;
        let sql = format!(
            "SELECT {} FROM transactions
             WHERE user_id = ?1
               AND CAST(strftime('%m', occurred_at) AS INTEGER) = ?2
               AND CAST(strftime('%Y', occurred_at) AS INTEGER) = ?3
             ORDER BY occurred_at",
            TRANSACTION_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let transactions = stmt
            .query_map(params![user_id.to_string(), month, year], |row| {
                Self::row_to_transaction(row)
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        debug!(
            user_id = %user_id,
            month,
            year,
            count = transactions.len(),
            "Loaded transactions for month"
        );
        Ok(transactions)
    }

    /// Get a single transaction owned by a user
    pub fn get_transaction(&self, user_id: Uuid, id: Uuid) -> Result<Option<Transaction>> {
        let conn = self.conn()?;
        let sql = format!(
            "SELECT {} FROM transactions WHERE user_id = ?1 AND id = ?2",
            TRANSACTION_COLUMNS
        );
        let transaction = conn
            .query_row(&sql, params![user_id.to_string(), id.to_string()], |row| {
                Self::row_to_transaction(row)
            })
            .optional()?;
        Ok(transaction)
    }

    /// Apply a partial update; returns `None` if the user has no such transaction
    pub fn update_transaction(
        &self,
        user_id: Uuid,
        id: Uuid,
        update: &TransactionUpdate,
    ) -> Result<Option<Transaction>> {
        let Some(mut existing) = self.get_transaction(user_id, id)? else {
            return Ok(None);
        };

        if let Some(amount) = update.amount {
            ensure_positive_amount(amount)?;
            existing.amount = amount;
        }
        if let Some(category_id) = update.category_id {
            if self.get_category(user_id, category_id)?.is_none() {
                return Err(Error::NotFound(format!("category {}", category_id)));
            }
            existing.category_id = category_id;
        }
        if let Some(direction) = update.direction {
            existing.direction = direction;
        }
        if let Some(occurred_at) = update.occurred_at {
            ensure_supported_occurred_at(&occurred_at)?;
            existing.occurred_at = occurred_at;
        }
        if let Some(ref description) = update.description {
            existing.description = Some(description.clone());
        }

        {
            let conn = self.conn()?;
            conn.execute(
                "UPDATE transactions
                 SET category_id = ?1, amount = ?2, direction = ?3, occurred_at = ?4, description = ?5
                 WHERE id = ?6 AND user_id = ?7",
                params![
                    existing.category_id.to_string(),
                    existing.amount.to_string(),
                    existing.direction.as_str(),
                    format_occurred_at(&existing.occurred_at),
                    existing.description,
                    id.to_string(),
                    user_id.to_string(),
                ],
            )?;
        }

        self.get_transaction(user_id, id)
    }

    /// Delete a transaction; returns whether a row was removed
    pub fn delete_transaction(&self, user_id: Uuid, id: Uuid) -> Result<bool> {
        let conn = self.conn()?;
        let affected = conn.execute(
            "DELETE FROM transactions WHERE id = ?1 AND user_id = ?2",
            params![id.to_string(), user_id.to_string()],
        )?;
        Ok(affected > 0)
    }

    /// Helper to convert a row to Transaction
    /// Column order: id, user_id, category_id, amount, direction, occurred_at, description, created_at
    pub(crate) fn row_to_transaction(row: &rusqlite::Row) -> rusqlite::Result<Transaction> {
        Ok(Transaction {
            id: column_uuid(row, 0)?,
            user_id: column_uuid(row, 1)?,
            category_id: column_uuid(row, 2)?,
            amount: column_decimal(row, 3)?,
            direction: column_parsed(row, 4)?,
            occurred_at: column_naive(row, 5)?,
            description: row.get(6)?,
            created_at: column_datetime(row, 7)?,
        })
    }

    fn row_to_transaction_with_category(
        row: &rusqlite::Row,
    ) -> rusqlite::Result<TransactionWithCategory> {
        Ok(TransactionWithCategory {
            transaction: Self::row_to_transaction(row)?,
            category_name: row.get(8)?,
            category_type: column_parsed(row, 9)?,
        })
    }
}
