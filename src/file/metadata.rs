//! File metadata types and repository for Cabinet file management.

use std::path::Path;

use sqlx::{SqliteConnection, SqlitePool};

use super::folder::SUBTREE_CTE;
use super::{like_pattern, SortKey};
use crate::auth::Owned;
use crate::{CabinetError, Result};

const FILE_COLUMNS: &str = "id, name, owner_id, folder_id, stored_path, size, created_at";

/// Metadata for a stored file.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct FileMetadata {
    /// Unique file ID.
    pub id: i64,
    /// Display name; what the user sees and downloads as.
    pub name: String,
    /// Owning user ID.
    pub owner_id: i64,
    /// Containing folder ID (None for the owner's root).
    pub folder_id: Option<i64>,
    /// Location of the bytes, relative to the storage base path.
    pub stored_path: String,
    /// File size in bytes.
    pub size: i64,
    /// When the file was uploaded.
    pub created_at: String,
}

impl FileMetadata {
    /// Lower-cased extension of the display name, if any.
    pub fn extension(&self) -> Option<String> {
        Path::new(&self.name)
            .extension()
            .and_then(|s| s.to_str())
            .map(|s| s.to_lowercase())
    }

    /// MIME type guessed from the display name.
    pub fn mime_type(&self) -> String {
        mime_guess::from_path(&self.name)
            .first_or_octet_stream()
            .to_string()
    }

    /// Whether the file looks like an image.
    pub fn is_image(&self) -> bool {
        mime_guess::from_path(&self.name)
            .first()
            .is_some_and(|m| m.type_().as_str() == "image")
    }
}

impl Owned for FileMetadata {
    fn owner_id(&self) -> i64 {
        self.owner_id
    }
}

/// Data for creating a new file record.
#[derive(Debug, Clone)]
pub struct NewFile {
    /// Display name.
    pub name: String,
    /// Owning user ID.
    pub owner_id: i64,
    /// Containing folder ID.
    pub folder_id: Option<i64>,
    /// Stored path returned by the storage backend.
    pub stored_path: String,
    /// File size in bytes.
    pub size: i64,
}

impl NewFile {
    /// Create a new NewFile in the owner's root.
    pub fn new(
        name: impl Into<String>,
        owner_id: i64,
        stored_path: impl Into<String>,
        size: i64,
    ) -> Self {
        Self {
            name: name.into(),
            owner_id,
            folder_id: None,
            stored_path: stored_path.into(),
            size,
        }
    }

    /// Place the file inside a folder.
    pub fn in_folder(mut self, folder_id: Option<i64>) -> Self {
        self.folder_id = folder_id;
        self
    }
}

/// Repository for file metadata operations.
pub struct FileRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> FileRepository<'a> {
    /// Create a new FileRepository with the given database pool reference.
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Insert a file record on the given connection and return its ID.
    pub async fn insert(conn: &mut SqliteConnection, file: &NewFile) -> Result<i64> {
        let result = sqlx::query(
            "INSERT INTO files (name, owner_id, folder_id, stored_path, size)
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&file.name)
        .bind(file.owner_id)
        .bind(file.folder_id)
        .bind(&file.stored_path)
        .bind(file.size)
        .execute(&mut *conn)
        .await?;

        Ok(result.last_insert_rowid())
    }

    /// Get a file record by ID.
    pub async fn get_by_id(&self, id: i64) -> Result<Option<FileMetadata>> {
        let file = sqlx::query_as::<_, FileMetadata>(&format!(
            "SELECT {FILE_COLUMNS} FROM files WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await
        .map_err(|e| CabinetError::Database(e.to_string()))?;

        Ok(file)
    }

    /// Get several file records by ID, in ID order.
    pub async fn get_many(&self, ids: &[i64]) -> Result<Vec<FileMetadata>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let placeholders = vec!["?"; ids.len()].join(",");
        let query =
            format!("SELECT {FILE_COLUMNS} FROM files WHERE id IN ({placeholders}) ORDER BY id");

        let mut q = sqlx::query_as::<_, FileMetadata>(&query);
        for id in ids {
            q = q.bind(id);
        }

        let files = q
            .fetch_all(self.pool)
            .await
            .map_err(|e| CabinetError::Database(e.to_string()))?;

        Ok(files)
    }

    /// List the files of `owner_id` directly inside `folder_id`
    /// (root level when `None`).
    pub async fn list_children(
        &self,
        owner_id: i64,
        folder_id: Option<i64>,
        sort: SortKey,
    ) -> Result<Vec<FileMetadata>> {
        let query = format!(
            "SELECT {FILE_COLUMNS} FROM files
             WHERE owner_id = ? AND folder_id IS ? {}",
            sort.order_clause()
        );

        let files = sqlx::query_as::<_, FileMetadata>(&query)
            .bind(owner_id)
            .bind(folder_id)
            .fetch_all(self.pool)
            .await
            .map_err(|e| CabinetError::Database(e.to_string()))?;

        Ok(files)
    }

    /// Find files of `owner_id` whose name contains `query`, ignoring case.
    pub async fn search(&self, owner_id: i64, query: &str) -> Result<Vec<FileMetadata>> {
        let files = sqlx::query_as::<_, FileMetadata>(&format!(
            "SELECT {FILE_COLUMNS} FROM files
             WHERE owner_id = ? AND name LIKE ? ESCAPE '\\'
             ORDER BY name COLLATE NOCASE, id"
        ))
        .bind(owner_id)
        .bind(like_pattern(query))
        .fetch_all(self.pool)
        .await
        .map_err(|e| CabinetError::Database(e.to_string()))?;

        Ok(files)
    }

    /// The most recently uploaded files of `owner_id`, newest first.
    pub async fn list_recent(&self, owner_id: i64, limit: i64) -> Result<Vec<FileMetadata>> {
        let files = sqlx::query_as::<_, FileMetadata>(&format!(
            "SELECT {FILE_COLUMNS} FROM files
             WHERE owner_id = ? ORDER BY created_at DESC, id DESC LIMIT ?"
        ))
        .bind(owner_id)
        .bind(limit)
        .fetch_all(self.pool)
        .await
        .map_err(|e| CabinetError::Database(e.to_string()))?;

        Ok(files)
    }

    /// Delete every file record inside a folder or its descendants.
    ///
    /// Runs on the given connection so the removal and the returned stored
    /// paths come from the same transaction.
    pub async fn delete_in_subtree(
        conn: &mut SqliteConnection,
        folder_id: i64,
    ) -> Result<Vec<String>> {
        let paths: Vec<String> = sqlx::query_scalar(&format!(
            "{SUBTREE_CTE} DELETE FROM files
             WHERE folder_id IN (SELECT id FROM subtree)
             RETURNING stored_path"
        ))
        .bind(folder_id)
        .fetch_all(&mut *conn)
        .await?;

        Ok(paths)
    }

    /// Change the display name of a file.
    ///
    /// Returns the updated record, or None if not found.
    pub async fn rename(&self, id: i64, name: &str) -> Result<Option<FileMetadata>> {
        let result = sqlx::query("UPDATE files SET name = ? WHERE id = ?")
            .bind(name)
            .bind(id)
            .execute(self.pool)
            .await
            .map_err(|e| CabinetError::Database(e.to_string()))?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }

        self.get_by_id(id).await
    }

    /// Delete a file record by ID.
    pub async fn delete(&self, id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM files WHERE id = ?")
            .bind(id)
            .execute(self.pool)
            .await
            .map_err(|e| CabinetError::Database(e.to_string()))?;

        Ok(result.rows_affected() > 0)
    }

    /// Count the files owned by a user.
    pub async fn count_by_owner(&self, owner_id: i64) -> Result<i64> {
        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM files WHERE owner_id = ?")
            .bind(owner_id)
            .fetch_one(self.pool)
            .await
            .map_err(|e| CabinetError::Database(e.to_string()))?;

        Ok(count.0)
    }
}
