//! Accounts and session tokens

use rusqlite::{params, OptionalExtension, Row};

use super::{parse_datetime, Database};
use crate::error::Result;
use crate::models::User;

fn row_to_user(row: &Row) -> rusqlite::Result<User> {
    let created_at: String = row.get(2)?;
    Ok(User {
        id: row.get(0)?,
        email: row.get(1)?,
        created_at: parse_datetime(&created_at),
    })
}

impl Database {
    /// Create an account; `email` must already be normalized
    pub fn create_user(&self, email: &str, password_hash: &str) -> Result<User> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO users (email, password_hash) VALUES (?, ?)",
            params![email, password_hash],
        )?;
        let id = conn.last_insert_rowid();

        let user = conn.query_row(
            "SELECT id, email, created_at FROM users WHERE id = ?",
            params![id],
            row_to_user,
        )?;
        Ok(user)
    }

    /// Get a user by ID
    pub fn get_user(&self, id: i64) -> Result<Option<User>> {
        let conn = self.conn()?;
        let user = conn
            .query_row(
                "SELECT id, email, created_at FROM users WHERE id = ?",
                params![id],
                row_to_user,
            )
            .optional()?;
        Ok(user)
    }

    /// Look up a user together with the stored password hash
    pub fn get_user_credentials(&self, email: &str) -> Result<Option<(User, String)>> {
        let conn = self.conn()?;
        let found = conn
            .query_row(
                "SELECT id, email, created_at, password_hash FROM users WHERE email = ?",
                params![email],
                |row| Ok((row_to_user(row)?, row.get::<_, String>(3)?)),
            )
            .optional()?;
        Ok(found)
    }

    /// Record a session by token digest
    pub fn create_session(&self, user_id: i64, token_hash: &str) -> Result<()> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO sessions (token_hash, user_id) VALUES (?, ?)",
            params![token_hash, user_id],
        )?;
        Ok(())
    }

    /// Resolve a session token digest to its user
    pub fn get_session_user(&self, token_hash: &str) -> Result<Option<User>> {
        let conn = self.conn()?;
        let user = conn
            .query_row(
                r#"
                SELECT u.id, u.email, u.created_at
                FROM sessions s
                JOIN users u ON u.id = s.user_id
                WHERE s.token_hash = ?
                "#,
                params![token_hash],
                row_to_user,
            )
            .optional()?;
        Ok(user)
    }

    /// Remove a session; returns whether it existed
    pub fn delete_session(&self, token_hash: &str) -> Result<bool> {
        let conn = self.conn()?;
        let deleted = conn.execute(
            "DELETE FROM sessions WHERE token_hash = ?",
            params![token_hash],
        )?;
        Ok(deleted > 0)
    }
}
