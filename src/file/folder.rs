//! Folder types and repository for Cabinet file management.

use sqlx::{SqliteConnection, SqlitePool};

use super::{like_pattern, SortKey};
use crate::auth::Owned;
use crate::{CabinetError, Result};

const FOLDER_COLUMNS: &str = "id, name, owner_id, parent_id, created_at";

/// Recursive CTE naming a folder and all of its descendants as `subtree(id)`.
///
/// Binds one parameter: the root folder ID.
pub(crate) const SUBTREE_CTE: &str = "WITH RECURSIVE subtree(id) AS (
         SELECT id FROM folders WHERE id = ?
         UNION ALL
         SELECT f.id FROM folders f JOIN subtree s ON f.parent_id = s.id
     )";

/// A folder in a user's storage tree.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct Folder {
    /// Unique folder ID.
    pub id: i64,
    /// Folder name, unique among its siblings.
    pub name: String,
    /// Owning user ID.
    pub owner_id: i64,
    /// Parent folder ID (None for root folders).
    pub parent_id: Option<i64>,
    /// When the folder was created.
    pub created_at: String,
}

impl Owned for Folder {
    fn owner_id(&self) -> i64 {
        self.owner_id
    }
}

/// Data for creating a new folder.
#[derive(Debug, Clone)]
pub struct NewFolder {
    /// Folder name.
    pub name: String,
    /// Owning user ID.
    pub owner_id: i64,
    /// Parent folder ID (None for root folders).
    pub parent_id: Option<i64>,
}

impl NewFolder {
    /// Create a new root folder for the given owner.
    pub fn new(name: impl Into<String>, owner_id: i64) -> Self {
        Self {
            name: name.into(),
            owner_id,
            parent_id: None,
        }
    }

    /// Set the parent folder.
    pub fn with_parent(mut self, parent_id: i64) -> Self {
        self.parent_id = Some(parent_id);
        self
    }
}

/// Repository for folder operations.
pub struct FolderRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> FolderRepository<'a> {
    /// Create a new FolderRepository with the given database pool reference.
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Create a new folder.
    ///
    /// A sibling with the same name under the same owner fails with
    /// [`CabinetError::Integrity`].
    pub async fn create(&self, folder: &NewFolder) -> Result<Folder> {
        let result = sqlx::query("INSERT INTO folders (name, owner_id, parent_id) VALUES (?, ?, ?)")
            .bind(&folder.name)
            .bind(folder.owner_id)
            .bind(folder.parent_id)
            .execute(self.pool)
            .await?;

        let id = result.last_insert_rowid();
        self.get_by_id(id)
            .await?
            .ok_or_else(|| CabinetError::NotFound("folder".to_string()))
    }

    /// Get a folder by ID.
    pub async fn get_by_id(&self, id: i64) -> Result<Option<Folder>> {
        let folder = sqlx::query_as::<_, Folder>(&format!(
            "SELECT {FOLDER_COLUMNS} FROM folders WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await
        .map_err(|e| CabinetError::Database(e.to_string()))?;

        Ok(folder)
    }

    /// List the folders of `owner_id` directly under `parent_id`
    /// (root level when `None`).
    pub async fn list_children(
        &self,
        owner_id: i64,
        parent_id: Option<i64>,
        sort: SortKey,
    ) -> Result<Vec<Folder>> {
        let query = format!(
            "SELECT {FOLDER_COLUMNS} FROM folders
             WHERE owner_id = ? AND parent_id IS ? {}",
            sort.order_clause()
        );

        let folders = sqlx::query_as::<_, Folder>(&query)
            .bind(owner_id)
            .bind(parent_id)
            .fetch_all(self.pool)
            .await
            .map_err(|e| CabinetError::Database(e.to_string()))?;

        Ok(folders)
    }

    /// Find folders of `owner_id` whose name contains `query`, ignoring case.
    pub async fn search(&self, owner_id: i64, query: &str) -> Result<Vec<Folder>> {
        let folders = sqlx::query_as::<_, Folder>(&format!(
            "SELECT {FOLDER_COLUMNS} FROM folders
             WHERE owner_id = ? AND name LIKE ? ESCAPE '\\'
             ORDER BY name COLLATE NOCASE, id"
        ))
        .bind(owner_id)
        .bind(like_pattern(query))
        .fetch_all(self.pool)
        .await
        .map_err(|e| CabinetError::Database(e.to_string()))?;

        Ok(folders)
    }

    /// Get the path from root to a folder, inclusive.
    ///
    /// A folder at depth D yields D + 1 entries, root first.
    pub async fn get_path(&self, id: i64) -> Result<Vec<Folder>> {
        let mut path = Vec::new();
        let mut current_id = Some(id);

        while let Some(folder_id) = current_id {
            if let Some(folder) = self.get_by_id(folder_id).await? {
                current_id = folder.parent_id;
                path.push(folder);
            } else {
                break;
            }
        }

        path.reverse();
        Ok(path)
    }

    /// Delete a folder and its descendants.
    ///
    /// File records inside the subtree must already be gone; see
    /// [`FileRepository::delete_in_subtree`](super::FileRepository::delete_in_subtree).
    /// Runs on the given connection so callers can wrap it in a transaction.
    /// Returns the number of folders removed.
    pub async fn delete_subtree(conn: &mut SqliteConnection, id: i64) -> Result<u64> {
        let result = sqlx::query(&format!(
            "{SUBTREE_CTE} DELETE FROM folders WHERE id IN (SELECT id FROM subtree)"
        ))
        .bind(id)
        .execute(&mut *conn)
        .await?;

        Ok(result.rows_affected())
    }

    /// Count the folders owned by a user.
    pub async fn count_by_owner(&self, owner_id: i64) -> Result<i64> {
        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM folders WHERE owner_id = ?")
            .bind(owner_id)
            .fetch_one(self.pool)
            .await
            .map_err(|e| CabinetError::Database(e.to_string()))?;

        Ok(count.0)
    }
}
