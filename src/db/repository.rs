//! User repository for Cabinet.
//!
//! This module provides CRUD operations for users and their profiles.

use sqlx::{QueryBuilder, SqliteConnection, SqlitePool};

use super::user::{NewUser, Profile, Role, User, UserUpdate};
use crate::{CabinetError, Result};

const USER_COLUMNS: &str = "id, username, password, email, role, created_at, last_login, is_active";

/// Repository for user CRUD operations.
pub struct UserRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> UserRepository<'a> {
    /// Create a new UserRepository with the given database pool reference.
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Create a new user together with its profile.
    ///
    /// Both rows are written in one transaction; a duplicate username
    /// leaves nothing behind and surfaces as [`CabinetError::Integrity`].
    pub async fn create(&self, new_user: &NewUser, display_name: &str) -> Result<User> {
        let mut tx = self.pool.begin().await?;
        let id = Self::insert_with_profile(&mut *tx, new_user, display_name).await?;
        tx.commit().await?;

        self.get_by_id(id)
            .await?
            .ok_or_else(|| CabinetError::NotFound("user".to_string()))
    }

    /// Insert a user row and its profile on an existing connection.
    ///
    /// Returns the new user ID.
    pub async fn insert_with_profile(
        conn: &mut SqliteConnection,
        new_user: &NewUser,
        display_name: &str,
    ) -> Result<i64> {
        let result = sqlx::query(
            "INSERT INTO users (username, password, email, role) VALUES (?, ?, ?, ?)",
        )
        .bind(&new_user.username)
        .bind(&new_user.password)
        .bind(&new_user.email)
        .bind(new_user.role.as_str())
        .execute(&mut *conn)
        .await?;

        let id = result.last_insert_rowid();

        sqlx::query("INSERT INTO profiles (user_id, display_name) VALUES (?, ?)")
            .bind(id)
            .bind(display_name)
            .execute(&mut *conn)
            .await?;

        Ok(id)
    }

    /// Get a user by ID.
    pub async fn get_by_id(&self, id: i64) -> Result<Option<User>> {
        let result = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await
        .map_err(|e| CabinetError::Database(e.to_string()))?;

        Ok(result)
    }

    /// Get a user by username (case-insensitive).
    pub async fn get_by_username(&self, username: &str) -> Result<Option<User>> {
        let result = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE username = ? COLLATE NOCASE"
        ))
        .bind(username)
        .fetch_optional(self.pool)
        .await
        .map_err(|e| CabinetError::Database(e.to_string()))?;

        Ok(result)
    }

    /// Get the profile attached to a user.
    pub async fn get_profile(&self, user_id: i64) -> Result<Option<Profile>> {
        let result = sqlx::query_as::<_, Profile>(
            "SELECT user_id, display_name, created_at FROM profiles WHERE user_id = ?",
        )
        .bind(user_id)
        .fetch_optional(self.pool)
        .await
        .map_err(|e| CabinetError::Database(e.to_string()))?;

        Ok(result)
    }

    /// Update a user by ID.
    ///
    /// Only fields that are set in the update will be modified.
    /// Returns the updated user, or None if not found.
    pub async fn update(&self, id: i64, update: &UserUpdate) -> Result<Option<User>> {
        if update.is_empty() {
            return self.get_by_id(id).await;
        }

        let mut query: QueryBuilder<sqlx::Sqlite> = QueryBuilder::new("UPDATE users SET ");
        let mut separated = query.separated(", ");

        if let Some(ref password) = update.password {
            separated.push("password = ");
            separated.push_bind_unseparated(password);
        }
        if let Some(ref email) = update.email {
            separated.push("email = ");
            separated.push_bind_unseparated(email.clone());
        }
        if let Some(role) = update.role {
            separated.push("role = ");
            separated.push_bind_unseparated(role.as_str().to_string());
        }
        if let Some(is_active) = update.is_active {
            separated.push("is_active = ");
            separated.push_bind_unseparated(is_active);
        }

        query.push(" WHERE id = ");
        query.push_bind(id);

        let result = query.build().execute(self.pool).await?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }

        self.get_by_id(id).await
    }

    /// Update the last login timestamp for a user.
    pub async fn update_last_login(&self, id: i64) -> Result<()> {
        sqlx::query("UPDATE users SET last_login = datetime('now') WHERE id = ?")
            .bind(id)
            .execute(self.pool)
            .await
            .map_err(|e| CabinetError::Database(e.to_string()))?;
        Ok(())
    }

    /// List users by role.
    pub async fn list_by_role(&self, role: Role) -> Result<Vec<User>> {
        let users = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE role = ? ORDER BY username"
        ))
        .bind(role.as_str())
        .fetch_all(self.pool)
        .await
        .map_err(|e| CabinetError::Database(e.to_string()))?;

        Ok(users)
    }

    /// Check if a username is already taken (case-insensitive).
    pub async fn username_exists(&self, username: &str) -> Result<bool> {
        let exists: (i64,) =
            sqlx::query_as("SELECT EXISTS(SELECT 1 FROM users WHERE username = ? COLLATE NOCASE)")
                .bind(username)
                .fetch_one(self.pool)
                .await
                .map_err(|e| CabinetError::Database(e.to_string()))?;
        Ok(exists.0 != 0)
    }
}
