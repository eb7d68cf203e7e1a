//! User-scoped categories
//!
//! Categories are created lazily the first time a user records a transaction
//! under a new name. Within one user the name is the natural key: a second
//! lookup by the same name returns the existing row whatever its type.

use rusqlite::{params, OptionalExtension};
use tracing::debug;
use uuid::Uuid;

use super::{column_datetime, column_parsed, column_uuid, Database};
use crate::error::{Error, Result};
use crate::models::{Category, CategoryType};

const CATEGORY_COLUMNS: &str = "id, user_id, name, type, created_at";

impl Database {
    /// Find a user's category by exact name
    pub fn get_category_by_name(&self, user_id: Uuid, name: &str) -> Result<Option<Category>> {
        let conn = self.conn()?;
        let sql = format!(
            "SELECT {} FROM categories WHERE user_id = ?1 AND name = ?2",
            CATEGORY_COLUMNS
        );
        let category = conn
            .query_row(&sql, params![user_id.to_string(), name], |row| {
                Self::row_to_category(row)
            })
            .optional()?;
        Ok(category)
    }

    /// Get a user's category by ID
    pub fn get_category(&self, user_id: Uuid, id: Uuid) -> Result<Option<Category>> {
        let conn = self.conn()?;
        let sql = format!(
            "SELECT {} FROM categories WHERE user_id = ?1 AND id = ?2",
            CATEGORY_COLUMNS
        );
        let category = conn
            .query_row(&sql, params![user_id.to_string(), id.to_string()], |row| {
                Self::row_to_category(row)
            })
            .optional()?;
        Ok(category)
    }

    /// Create a category for a user
    pub fn add_category(
        &self,
        user_id: Uuid,
        name: &str,
        category_type: CategoryType,
    ) -> Result<Category> {
        let id = Uuid::new_v4();
        {
            let conn = self.conn()?;
            conn.execute(
                "INSERT INTO categories (id, user_id, name, type) VALUES (?1, ?2, ?3, ?4)",
                params![
                    id.to_string(),
                    user_id.to_string(),
                    name,
                    category_type.as_str()
                ],
            )?;
        }

        self.get_category(user_id, id)?
            .ok_or_else(|| Error::NotFound(format!("category {}", id)))
    }

    /// Return the user's category with this name, creating it if needed
    pub fn find_or_create_category(
        &self,
        user_id: Uuid,
        name: &str,
        category_type: CategoryType,
    ) -> Result<Category> {
        if let Some(existing) = self.get_category_by_name(user_id, name)? {
            return Ok(existing);
        }
        debug!(user_id = %user_id, name, "Creating category");
        self.add_category(user_id, name, category_type)
    }

    /// List every category owned by a user, ordered by name
    pub fn list_categories(&self, user_id: Uuid) -> Result<Vec<Category>> {
        let conn = self.conn()?;
        let sql = format!(
            "SELECT {} FROM categories WHERE user_id = ?1 ORDER BY name",
            CATEGORY_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let categories = stmt
            .query_map(params![user_id.to_string()], |row| Self::row_to_category(row))?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(categories)
    }

    pub(crate) fn row_to_category(row: &rusqlite::Row) -> rusqlite::Result<Category> {
        Ok(Category {
            id: column_uuid(row, 0)?,
            user_id: column_uuid(row, 1)?,
            name: row.get(2)?,
            category_type: column_parsed(row, 3)?,
            created_at: column_datetime(row, 4)?,
        })
    }
}
