//! User registration and lookup

use rusqlite::{params, OptionalExtension};
use uuid::Uuid;

use super::{column_datetime, column_uuid, Database};
use crate::error::{Error, Result};
use crate::models::User;

const USER_COLUMNS: &str = "id, username, user_email, password_hash, is_active, created_at";

impl Database {
    /// Insert a new user with an already-hashed password
    ///
    /// Username and email must both be unused; the first clash found is
    /// reported as `Error::Conflict`.
    pub fn create_user(&self, username: &str, user_email: &str, password_hash: &str) -> Result<User> {
        if self.get_user_by_username(username)?.is_some() {
            return Err(Error::Conflict(format!("{} already registered", username)));
        }
        if self.get_user_by_email(user_email)?.is_some() {
            return Err(Error::Conflict(format!("{} already registered", user_email)));
        }

        let id = Uuid::new_v4();
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO users (id, username, user_email, password_hash) VALUES (?1, ?2, ?3, ?4)",
            params![id.to_string(), username, user_email, password_hash],
        )?;
        drop(conn);

        self.get_user(id)?
            .ok_or_else(|| Error::NotFound(format!("user {}", id)))
    }

    /// Get a user by ID
    pub fn get_user(&self, id: Uuid) -> Result<Option<User>> {
        self.find_user("id", &id.to_string())
    }

    /// Get a user by email address
    pub fn get_user_by_email(&self, email: &str) -> Result<Option<User>> {
        self.find_user("user_email", email)
    }

    /// Get a user by username
    pub fn get_user_by_username(&self, username: &str) -> Result<Option<User>> {
        self.find_user("username", username)
    }

    fn find_user(&self, column: &str, value: &str) -> Result<Option<User>> {
        let conn = self.conn()?;
        let sql = format!("SELECT {} FROM users WHERE {} = ?1", USER_COLUMNS, column);
        let user = conn
            .query_row(&sql, params![value], |row| Self::row_to_user(row))
            .optional()?;
        Ok(user)
    }

    fn row_to_user(row: &rusqlite::Row) -> rusqlite::Result<User> {
        Ok(User {
            id: column_uuid(row, 0)?,
            username: row.get(1)?,
            user_email: row.get(2)?,
            password_hash: row.get(3)?,
            is_active: row.get(4)?,
            created_at: column_datetime(row, 5)?,
        })
    }
}
