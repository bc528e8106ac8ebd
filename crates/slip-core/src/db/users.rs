//! User lookup and creation

use rusqlite::{params, OptionalExtension};

use super::{parse_datetime, Database};
use crate::error::{Error, Result};
use crate::models::{NewUser, User};

impl Database {
    /// Persist a new user
    ///
    /// The phone column is UNIQUE; inserting a duplicate phone surfaces the
    /// constraint violation as a database error.
    pub fn create_user(&self, user: &NewUser) -> Result<User> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO users (phone, name, email, company_id) VALUES (?, ?, ?, ?)",
            params![user.phone, user.name, user.email, user.company_id],
        )?;
        let id = conn.last_insert_rowid();

        self.get_user(id)?
            .ok_or_else(|| Error::NotFound(format!("User {} after insert", id)))
    }

    /// Get a user by ID
    pub fn get_user(&self, id: i64) -> Result<Option<User>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, phone, name, email, company_id, created_at, updated_at
             FROM users WHERE id = ?",
        )?;

        let user = stmt
            .query_row(params![id], Self::row_to_user)
            .optional()?;

        Ok(user)
    }

    /// Get a user by phone number
    pub fn get_user_by_phone(&self, phone: &str) -> Result<Option<User>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, phone, name, email, company_id, created_at, updated_at
             FROM users WHERE phone = ?",
        )?;

        let user = stmt
            .query_row(params![phone], Self::row_to_user)
            .optional()?;

        Ok(user)
    }

    /// Count all users (for the status command)
    pub fn count_users(&self) -> Result<i64> {
        let conn = self.conn()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM users", [], |row| row.get(0))?;
        Ok(count)
    }

    /// Helper to convert a row to User
    fn row_to_user(row: &rusqlite::Row) -> rusqlite::Result<User> {
        let created_at_str: String = row.get(5)?;
        let updated_at_str: String = row.get(6)?;

        Ok(User {
            id: row.get(0)?,
            phone: row.get(1)?,
            name: row.get(2)?,
            email: row.get(3)?,
            company_id: row.get(4)?,
            created_at: parse_datetime(&created_at_str),
            updated_at: parse_datetime(&updated_at_str),
        })
    }
}
