//! File service for Cabinet.
//!
//! This module provides high-level operations on a user's storage tree:
//! - Folder creation and cascading deletion
//! - Batch upload, rename, delete and download of files
//! - Listing with breadcrumbs, search and recent files
//!
//! Every operation that touches an existing folder or file passes it through
//! the ownership gate first; nothing is modified when the gate refuses.

use tracing::{error, info, warn};

use crate::auth::require_access;
use crate::db::Database;
use crate::{CabinetError, Result};

use super::folder::{Folder, FolderRepository, NewFolder};
use super::metadata::{FileMetadata, FileRepository, NewFile};
use super::scope::AccessScope;
use super::storage::FileStorage;
use super::{validate_name, ListView, SortKey, DEFAULT_MAX_FILE_SIZE, RECENT_FILES_LIMIT};

/// One uploaded item.
#[derive(Debug, Clone)]
pub struct UploadItem {
    /// Client-supplied filename.
    pub filename: String,
    /// File content.
    pub content: Vec<u8>,
}

impl UploadItem {
    /// Create a new upload item.
    pub fn new(filename: impl Into<String>, content: Vec<u8>) -> Self {
        Self {
            filename: filename.into(),
            content,
        }
    }
}

/// Result of a file download.
#[derive(Debug)]
pub struct DownloadResult {
    /// File metadata.
    pub metadata: FileMetadata,
    /// File content.
    pub content: Vec<u8>,
}

/// Contents of one level of a storage tree.
#[derive(Debug, Clone)]
pub struct Listing {
    /// User whose tree is listed.
    pub owner_id: i64,
    /// The listed folder (None for the root level).
    pub folder: Option<Folder>,
    /// Path from the root to the listed folder, inclusive.
    pub breadcrumbs: Vec<Folder>,
    /// Child folders.
    pub folders: Vec<Folder>,
    /// Child files.
    pub files: Vec<FileMetadata>,
}

/// Folders and files matching a search query.
#[derive(Debug, Clone)]
pub struct SearchResults {
    /// The trimmed query.
    pub query: String,
    /// Matching folders.
    pub folders: Vec<Folder>,
    /// Matching files.
    pub files: Vec<FileMetadata>,
}

/// File service for managing folders and files.
pub struct FileService<'a> {
    db: &'a Database,
    storage: &'a FileStorage,
    max_file_size: u64,
}

impl<'a> FileService<'a> {
    /// Create a new FileService.
    pub fn new(db: &'a Database, storage: &'a FileStorage) -> Self {
        Self {
            db,
            storage,
            max_file_size: DEFAULT_MAX_FILE_SIZE,
        }
    }

    /// Create a new FileService with a custom max file size.
    pub fn with_max_file_size(mut self, max_size: u64) -> Self {
        self.max_file_size = max_size;
        self
    }

    fn folders(&self) -> FolderRepository<'a> {
        FolderRepository::new(self.db.pool())
    }

    fn files(&self) -> FileRepository<'a> {
        FileRepository::new(self.db.pool())
    }

    /// Load a folder and check the actor may touch it.
    async fn accessible_folder(&self, scope: &AccessScope, folder_id: i64) -> Result<Folder> {
        let folder = self
            .folders()
            .get_by_id(folder_id)
            .await?
            .ok_or_else(|| CabinetError::NotFound("folder".to_string()))?;
        require_access(scope.actor(), &folder)?;
        Ok(folder)
    }

    /// Load a file record and check the actor may touch it.
    async fn accessible_file(&self, scope: &AccessScope, file_id: i64) -> Result<FileMetadata> {
        let file = self
            .files()
            .get_by_id(file_id)
            .await?
            .ok_or_else(|| CabinetError::NotFound("file".to_string()))?;
        require_access(scope.actor(), &file)?;
        Ok(file)
    }

    /// Create a folder.
    ///
    /// Inside a parent folder the new folder belongs to the parent's owner;
    /// at the root it belongs to the scope's owner. A sibling with the same
    /// name is reported as a validation error.
    pub async fn create_folder(
        &self,
        scope: &AccessScope,
        name: &str,
        parent_id: Option<i64>,
    ) -> Result<Folder> {
        let name = validate_name(name)?;

        let mut new_folder = NewFolder::new(&name, scope.owner_id());
        if let Some(parent_id) = parent_id {
            let parent = self.accessible_folder(scope, parent_id).await?;
            new_folder.owner_id = parent.owner_id;
            new_folder = new_folder.with_parent(parent.id);
        }

        let folder = self
            .folders()
            .create(&new_folder)
            .await
            .map_err(|e| match e {
                CabinetError::Integrity(_) => CabinetError::Validation(format!(
                    "a folder named '{name}' already exists here"
                )),
                other => other,
            })?;

        info!(
            folder_id = folder.id,
            owner_id = folder.owner_id,
            actor_id = scope.actor().id,
            delegated = scope.is_delegated(),
            parent_id = ?folder.parent_id,
            "Folder created"
        );

        Ok(folder)
    }

    /// Delete a folder with all of its descendants and their files.
    ///
    /// File records are removed first inside one transaction, which also
    /// yields their stored paths. Those bytes are moved aside before the
    /// folders go, then purged once the transaction commits; if anything
    /// fails they are put back and the rows roll back with them.
    ///
    /// # Returns
    /// The number of folders removed.
    pub async fn delete_folder(&self, scope: &AccessScope, folder_id: i64) -> Result<u64> {
        let folder = self.accessible_folder(scope, folder_id).await?;

        let mut tx = self.db.begin().await?;
        let stored_paths = FileRepository::delete_in_subtree(&mut *tx, folder.id).await?;
        let staged = self
            .storage
            .stage_removal(stored_paths.iter().map(String::as_str))?;

        let outcome = async {
            let removed = FolderRepository::delete_subtree(&mut *tx, folder.id).await?;
            tx.commit().await?;
            Ok::<_, CabinetError>(removed)
        }
        .await;

        match outcome {
            Ok(removed) => {
                if let Err(e) = staged.purge() {
                    warn!(folder_id = folder.id, error = %e, "Failed to purge staged files");
                }
                info!(
                    folder_id = folder.id,
                    owner_id = folder.owner_id,
                    actor_id = scope.actor().id,
                    delegated = scope.is_delegated(),
                    folders_removed = removed,
                    files_removed = stored_paths.len(),
                    "Folder deleted"
                );
                Ok(removed)
            }
            Err(e) => {
                if let Err(restore_err) = staged.restore() {
                    error!(
                        folder_id = folder.id,
                        error = %restore_err,
                        "Failed to restore staged files after aborted delete"
                    );
                }
                Err(e)
            }
        }
    }

    /// Upload a batch of files.
    ///
    /// Inside a folder the files belong to the folder's owner; at the root
    /// they belong to the scope's owner. Every item gets its own record even
    /// when names collide. Either all records are created or none are, and
    /// no bytes are left behind on failure.
    pub async fn upload_files(
        &self,
        scope: &AccessScope,
        items: Vec<UploadItem>,
        folder_id: Option<i64>,
    ) -> Result<Vec<FileMetadata>> {
        if items.is_empty() {
            return Err(CabinetError::Validation(
                "no files were uploaded".to_string(),
            ));
        }

        let mut names = Vec::with_capacity(items.len());
        for item in &items {
            let basename = item
                .filename
                .rsplit(['/', '\\'])
                .next()
                .unwrap_or_default();
            names.push(validate_name(basename)?);

            if item.content.len() as u64 > self.max_file_size {
                let max_mb = self.max_file_size / 1024 / 1024;
                return Err(CabinetError::Validation(format!(
                    "'{}' is too large (max {max_mb}MB)",
                    item.filename
                )));
            }
        }

        let folder = match folder_id {
            Some(id) => Some(self.accessible_folder(scope, id).await?),
            None => None,
        };
        let owner_id = folder.as_ref().map_or(scope.owner_id(), |f| f.owner_id);
        let folder_name = folder.as_ref().map(|f| f.name.as_str());

        let mut new_files = Vec::with_capacity(items.len());
        for (item, name) in items.iter().zip(names) {
            match self.storage.save(owner_id, folder_name, &name, &item.content) {
                Ok(stored_path) => new_files.push(
                    NewFile::new(name, owner_id, stored_path, item.content.len() as i64)
                        .in_folder(folder_id),
                ),
                Err(e) => {
                    self.discard(&new_files);
                    return Err(e);
                }
            }
        }

        let inserted = async {
            let mut tx = self.db.begin().await?;
            let mut ids = Vec::with_capacity(new_files.len());
            for new_file in &new_files {
                ids.push(FileRepository::insert(&mut *tx, new_file).await?);
            }
            tx.commit().await?;
            Ok::<_, CabinetError>(ids)
        }
        .await;

        let ids = match inserted {
            Ok(ids) => ids,
            Err(e) => {
                self.discard(&new_files);
                return Err(e);
            }
        };

        info!(
            owner_id,
            actor_id = scope.actor().id,
            delegated = scope.is_delegated(),
            folder_id = ?folder_id,
            count = ids.len(),
            "Files uploaded"
        );

        self.files().get_many(&ids).await
    }

    /// Remove bytes written for records that never made it to the database.
    fn discard(&self, new_files: &[NewFile]) {
        for new_file in new_files {
            if let Err(e) = self.storage.delete(&new_file.stored_path) {
                warn!(path = %new_file.stored_path, error = %e, "Failed to discard upload");
            }
        }
    }

    /// Rename a file. Only the display name changes.
    pub async fn rename_file(
        &self,
        scope: &AccessScope,
        file_id: i64,
        new_name: &str,
    ) -> Result<FileMetadata> {
        let file = self.accessible_file(scope, file_id).await?;
        let name = validate_name(new_name)?;

        let renamed = self
            .files()
            .rename(file.id, &name)
            .await?
            .ok_or_else(|| CabinetError::NotFound("file".to_string()))?;

        info!(
            file_id = file.id,
            actor_id = scope.actor().id,
            delegated = scope.is_delegated(),
            old_name = %file.name,
            new_name = %renamed.name,
            "File renamed"
        );

        Ok(renamed)
    }

    /// Delete a file and its bytes.
    ///
    /// Bytes that are already gone do not prevent removing the record.
    pub async fn delete_file(&self, scope: &AccessScope, file_id: i64) -> Result<()> {
        let file = self.accessible_file(scope, file_id).await?;

        if !self.storage.delete(&file.stored_path)? {
            warn!(file_id = file.id, path = %file.stored_path, "File bytes were already missing");
        }
        self.files().delete(file.id).await?;

        info!(
            file_id = file.id,
            owner_id = file.owner_id,
            actor_id = scope.actor().id,
            delegated = scope.is_delegated(),
            "File deleted"
        );

        Ok(())
    }

    /// Download a file.
    pub async fn download_file(&self, scope: &AccessScope, file_id: i64) -> Result<DownloadResult> {
        let metadata = self.accessible_file(scope, file_id).await?;
        let content = self.storage.load(&metadata.stored_path)?;

        Ok(DownloadResult { metadata, content })
    }

    /// List one level of a storage tree.
    ///
    /// Without a folder the scope owner's root is listed. With a folder, the
    /// folder's owner is the one listed and breadcrumbs lead to it.
    pub async fn list_children(
        &self,
        scope: &AccessScope,
        folder_id: Option<i64>,
        sort: SortKey,
        view: ListView,
    ) -> Result<Listing> {
        let (owner_id, folder, breadcrumbs) = match folder_id {
            Some(id) => {
                let folder = self.accessible_folder(scope, id).await?;
                let breadcrumbs = self.folders().get_path(folder.id).await?;
                (folder.owner_id, Some(folder), breadcrumbs)
            }
            None => (scope.owner_id(), None, Vec::new()),
        };

        let folders = self
            .folders()
            .list_children(owner_id, folder_id, sort)
            .await?;
        let files = self
            .files()
            .list_children(owner_id, folder_id, view.file_sort(sort))
            .await?;

        Ok(Listing {
            owner_id,
            folder,
            breadcrumbs,
            folders,
            files,
        })
    }

    /// Search the scope owner's folders and files by name.
    pub async fn search(&self, scope: &AccessScope, query: &str) -> Result<SearchResults> {
        let query = query.trim();
        if query.is_empty() {
            return Err(CabinetError::Validation(
                "search query cannot be empty".to_string(),
            ));
        }

        let folders = self.folders().search(scope.owner_id(), query).await?;
        let files = self.files().search(scope.owner_id(), query).await?;

        Ok(SearchResults {
            query: query.to_string(),
            folders,
            files,
        })
    }

    /// The scope owner's most recently uploaded files.
    pub async fn recent_files(&self, scope: &AccessScope) -> Result<Vec<FileMetadata>> {
        self.files()
            .list_recent(scope.owner_id(), RECENT_FILES_LIMIT)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{NewUser, Role, User, UserRepository};
    use tempfile::TempDir;

    async fn setup() -> (Database, TempDir, FileStorage) {
        let db = Database::open_in_memory().await.unwrap();
        let temp_dir = TempDir::new().unwrap();
        let storage = FileStorage::new(temp_dir.path()).unwrap();
        (db, temp_dir, storage)
    }

    async fn create_user(db: &Database, username: &str, role: Role) -> User {
        UserRepository::new(db.pool())
            .create(&NewUser::new(username, "hash").with_role(role), username)
            .await
            .unwrap()
    }

    fn item(name: &str, content: &[u8]) -> UploadItem {
        UploadItem::new(name, content.to_vec())
    }

    #[tokio::test]
    async fn test_walkthrough() {
        let (db, _temp_dir, storage) = setup().await;
        let user = create_user(&db, "user", Role::Member).await;
        let scope = AccessScope::own(user.clone());
        let service = FileService::new(&db, &storage);

        let docs = service.create_folder(&scope, "Docs", None).await.unwrap();
        let year = service
            .create_folder(&scope, "2024", Some(docs.id))
            .await
            .unwrap();
        let uploaded = service
            .upload_files(&scope, vec![item("a.txt", b"hello world!")], Some(year.id))
            .await
            .unwrap();
        assert_eq!(uploaded.len(), 1);
        assert_eq!(uploaded[0].size, 12);

        let listing = service
            .list_children(&scope, Some(docs.id), SortKey::Name, ListView::Grid)
            .await
            .unwrap();
        let folder_names: Vec<_> = listing.folders.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(folder_names, vec!["2024"]);
        assert!(listing.files.is_empty());

        let listing = service
            .list_children(&scope, Some(year.id), SortKey::Name, ListView::Grid)
            .await
            .unwrap();
        assert_eq!(listing.files.len(), 1);
        assert_eq!(listing.files[0].name, "a.txt");
        assert_eq!(listing.files[0].size, 12);

        service.delete_folder(&scope, docs.id).await.unwrap();

        assert_eq!(
            FolderRepository::new(db.pool())
                .count_by_owner(user.id)
                .await
                .unwrap(),
            0
        );
        assert_eq!(
            FileRepository::new(db.pool())
                .count_by_owner(user.id)
                .await
                .unwrap(),
            0
        );
        assert!(!storage.exists(&uploaded[0].stored_path));
    }

    #[tokio::test]
    async fn test_delete_folder_failure_keeps_rows_and_bytes() {
        let (db, _temp_dir, storage) = setup().await;
        let user = create_user(&db, "user", Role::Member).await;
        let scope = AccessScope::own(user.clone());
        let service = FileService::new(&db, &storage);

        let docs = service.create_folder(&scope, "Docs", None).await.unwrap();
        let sub = service
            .create_folder(&scope, "Sub", Some(docs.id))
            .await
            .unwrap();
        let mut uploaded = service
            .upload_files(&scope, vec![item("a.txt", b"alpha")], Some(docs.id))
            .await
            .unwrap();
        uploaded.extend(
            service
                .upload_files(&scope, vec![item("b.txt", b"beta")], Some(sub.id))
                .await
                .unwrap(),
        );

        sqlx::raw_sql(
            "CREATE TRIGGER block_folder_delete BEFORE DELETE ON folders
             BEGIN SELECT RAISE(ABORT, 'folder delete blocked'); END;",
        )
        .execute(db.pool())
        .await
        .unwrap();

        assert!(service.delete_folder(&scope, docs.id).await.is_err());

        let folders = FolderRepository::new(db.pool());
        let files = FileRepository::new(db.pool());
        assert_eq!(folders.count_by_owner(user.id).await.unwrap(), 2);
        assert_eq!(files.count_by_owner(user.id).await.unwrap(), 2);
        for (file, content) in uploaded.iter().zip([b"alpha".as_slice(), b"beta".as_slice()]) {
            assert!(files.get_by_id(file.id).await.unwrap().is_some());
            assert_eq!(storage.load(&file.stored_path).unwrap(), content);
        }
        let trash = storage.base_path().join(".trash");
        assert_eq!(std::fs::read_dir(trash).unwrap().count(), 0);

        sqlx::raw_sql("DROP TRIGGER block_folder_delete")
            .execute(db.pool())
            .await
            .unwrap();
        assert_eq!(service.delete_folder(&scope, docs.id).await.unwrap(), 2);
        for file in &uploaded {
            assert!(!storage.exists(&file.stored_path));
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_delete_folder_during_uploads_leaves_no_orphans() {
        let temp_dir = TempDir::new().unwrap();
        let db = Database::open(temp_dir.path().join("cabinet.db"))
            .await
            .unwrap();
        let storage = FileStorage::new(temp_dir.path().join("files")).unwrap();
        let user = create_user(&db, "user", Role::Member).await;
        let scope = AccessScope::own(user.clone());
        let service = FileService::new(&db, &storage);

        for round in 0..10 {
            let docs = service
                .create_folder(&scope, &format!("Docs{round}"), None)
                .await
                .unwrap();
            let sub = service
                .create_folder(&scope, "Sub", Some(docs.id))
                .await
                .unwrap();

            let uploads = async {
                for i in 0..8 {
                    let batch = vec![item(&format!("f{i}.txt"), b"payload")];
                    let _ = service.upload_files(&scope, batch, Some(sub.id)).await;
                    tokio::task::yield_now().await;
                }
            };
            let delete = async {
                tokio::task::yield_now().await;
                service.delete_folder(&scope, docs.id).await.unwrap();
            };
            tokio::join!(uploads, delete);
        }

        // Every byte file on disk belongs to a surviving record
        let files = FileRepository::new(db.pool());
        assert_eq!(files.count_by_owner(user.id).await.unwrap(), 0);
        let user_dir = storage.base_path().join(format!("user_{}", user.id));
        let mut stack = vec![user_dir];
        while let Some(dir) = stack.pop() {
            let Ok(entries) = std::fs::read_dir(&dir) else {
                continue;
            };
            for entry in entries {
                let path = entry.unwrap().path();
                assert!(path.is_dir(), "orphaned bytes at {}", path.display());
                stack.push(path);
            }
        }
    }

    #[tokio::test]
    async fn test_create_folder_duplicate_is_validation_error() {
        let (db, _temp_dir, storage) = setup().await;
        let user = create_user(&db, "user", Role::Member).await;
        let scope = AccessScope::own(user);
        let service = FileService::new(&db, &storage);

        service.create_folder(&scope, "Docs", None).await.unwrap();
        let result = service.create_folder(&scope, "  Docs ", None).await;
        assert!(matches!(result, Err(CabinetError::Validation(_))));

        let result = service.create_folder(&scope, "", None).await;
        assert!(matches!(result, Err(CabinetError::Validation(_))));
    }

    #[tokio::test]
    async fn test_create_folder_missing_parent() {
        let (db, _temp_dir, storage) = setup().await;
        let user = create_user(&db, "user", Role::Member).await;
        let service = FileService::new(&db, &storage);

        let result = service
            .create_folder(&AccessScope::own(user), "Docs", Some(42))
            .await;
        assert!(matches!(result, Err(CabinetError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_breadcrumbs_depth() {
        let (db, _temp_dir, storage) = setup().await;
        let user = create_user(&db, "user", Role::Member).await;
        let scope = AccessScope::own(user);
        let service = FileService::new(&db, &storage);

        let mut parent = None;
        let mut names = Vec::new();
        for depth in 0..4 {
            let name = format!("level{depth}");
            let folder = service.create_folder(&scope, &name, parent).await.unwrap();
            parent = Some(folder.id);
            names.push(name);
        }

        let listing = service
            .list_children(&scope, parent, SortKey::Name, ListView::Grid)
            .await
            .unwrap();
        let crumbs: Vec<_> = listing
            .breadcrumbs
            .iter()
            .map(|f| f.name.clone())
            .collect();
        assert_eq!(crumbs, names);
        assert_eq!(listing.breadcrumbs.last().map(|f| f.id), parent);
    }

    #[tokio::test]
    async fn test_upload_same_name_twice() {
        let (db, _temp_dir, storage) = setup().await;
        let user = create_user(&db, "user", Role::Member).await;
        let scope = AccessScope::own(user);
        let service = FileService::new(&db, &storage);

        let uploaded = service
            .upload_files(
                &scope,
                vec![
                    item("dup.txt", b"one"),
                    item("dup.txt", b"three"),
                    item("C:\\tmp\\other.bin", b""),
                ],
                None,
            )
            .await
            .unwrap();

        assert_eq!(uploaded.len(), 3);
        assert_eq!(uploaded[0].name, "dup.txt");
        assert_eq!(uploaded[1].name, "dup.txt");
        assert_eq!(uploaded[2].name, "other.bin");
        assert_ne!(uploaded[0].stored_path, uploaded[1].stored_path);
        for (file, expected) in uploaded.iter().zip([3u64, 5, 0]) {
            assert_eq!(file.size as u64, expected);
            assert_eq!(storage.load(&file.stored_path).unwrap().len() as u64, expected);
        }
    }

    #[tokio::test]
    async fn test_upload_validation() {
        let (db, _temp_dir, storage) = setup().await;
        let user = create_user(&db, "user", Role::Member).await;
        let scope = AccessScope::own(user.clone());
        let service = FileService::new(&db, &storage).with_max_file_size(4);

        let result = service.upload_files(&scope, vec![], None).await;
        assert!(matches!(result, Err(CabinetError::Validation(_))));

        let result = service
            .upload_files(&scope, vec![item("ok.txt", b"ok"), item("big.txt", b"too big")], None)
            .await;
        assert!(matches!(result, Err(CabinetError::Validation(_))));

        let result = service.upload_files(&scope, vec![item("", b"x")], None).await;
        assert!(matches!(result, Err(CabinetError::Validation(_))));

        // Nothing from the rejected batches was kept
        assert_eq!(
            FileRepository::new(db.pool())
                .count_by_owner(user.id)
                .await
                .unwrap(),
            0
        );
        assert!(!storage.base_path().join("user_1").exists());
    }

    #[tokio::test]
    async fn test_non_owner_is_refused() {
        let (db, _temp_dir, storage) = setup().await;
        let alice = create_user(&db, "alice", Role::Member).await;
        let mallory = create_user(&db, "mallory", Role::Member).await;
        let service = FileService::new(&db, &storage);

        let alice_scope = AccessScope::own(alice.clone());
        let folder = service
            .create_folder(&alice_scope, "Private", None)
            .await
            .unwrap();
        let file = service
            .upload_files(&alice_scope, vec![item("secret.txt", b"secret")], Some(folder.id))
            .await
            .unwrap()
            .remove(0);

        fn denied<T>(r: &Result<T>) -> bool {
            matches!(r, Err(CabinetError::Permission(_)))
        }

        let scope = AccessScope::own(mallory);

        assert!(denied(
            &service.create_folder(&scope, "inner", Some(folder.id)).await
        ));
        assert!(denied(
            &service
                .upload_files(&scope, vec![item("x.txt", b"x")], Some(folder.id))
                .await
        ));
        assert!(denied(&service.rename_file(&scope, file.id, "mine.txt").await));
        assert!(denied(&service.download_file(&scope, file.id).await));
        assert!(denied(&service.delete_file(&scope, file.id).await));
        assert!(denied(&service.delete_folder(&scope, folder.id).await));
        assert!(denied(
            &service
                .list_children(&scope, Some(folder.id), SortKey::Name, ListView::Grid)
                .await
        ));

        // Nothing changed
        let files = FileRepository::new(db.pool());
        let unchanged = files.get_by_id(file.id).await.unwrap().unwrap();
        assert_eq!(unchanged, file);
        assert_eq!(files.count_by_owner(alice.id).await.unwrap(), 1);
        assert_eq!(
            FolderRepository::new(db.pool())
                .count_by_owner(alice.id)
                .await
                .unwrap(),
            1
        );
        assert_eq!(storage.load(&file.stored_path).unwrap(), b"secret");
    }

    #[tokio::test]
    async fn test_admin_can_do_everything() {
        let (db, _temp_dir, storage) = setup().await;
        let alice = create_user(&db, "alice", Role::Member).await;
        let admin = create_user(&db, "admin", Role::Admin).await;
        let service = FileService::new(&db, &storage);

        let alice_scope = AccessScope::own(alice.clone());
        let folder = service
            .create_folder(&alice_scope, "Docs", None)
            .await
            .unwrap();

        let users = UserRepository::new(db.pool());
        let scope = AccessScope::resolve(&users, admin.clone(), Some(alice.id))
            .await
            .unwrap();

        // Created inside alice's folder: owned by alice
        let sub = service
            .create_folder(&scope, "Sub", Some(folder.id))
            .await
            .unwrap();
        assert_eq!(sub.owner_id, alice.id);

        // Created at alice's root via the scope: owned by alice
        let root_level = service.create_folder(&scope, "Root", None).await.unwrap();
        assert_eq!(root_level.owner_id, alice.id);

        let file = service
            .upload_files(&scope, vec![item("a.txt", b"abc")], Some(sub.id))
            .await
            .unwrap()
            .remove(0);
        assert_eq!(file.owner_id, alice.id);
        assert!(file.stored_path.starts_with(&format!("user_{}/", alice.id)));

        let renamed = service.rename_file(&scope, file.id, "b.txt").await.unwrap();
        assert_eq!(renamed.name, "b.txt");
        assert_eq!(renamed.stored_path, file.stored_path);

        let download = service.download_file(&scope, file.id).await.unwrap();
        assert_eq!(download.content, b"abc");
        assert_eq!(download.metadata.name, "b.txt");

        let listing = service
            .list_children(&scope, None, SortKey::Name, ListView::Grid)
            .await
            .unwrap();
        assert_eq!(listing.owner_id, alice.id);
        assert_eq!(listing.folders.len(), 2);

        // The admin's own scope still reaches alice's items by id
        let own = AccessScope::own(admin);
        service.delete_file(&own, file.id).await.unwrap();
        service.delete_folder(&own, folder.id).await.unwrap();

        let folders = FolderRepository::new(db.pool());
        assert_eq!(folders.count_by_owner(alice.id).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_delete_file_missing_bytes() {
        let (db, _temp_dir, storage) = setup().await;
        let user = create_user(&db, "user", Role::Member).await;
        let scope = AccessScope::own(user.clone());
        let service = FileService::new(&db, &storage);

        let file = service
            .upload_files(&scope, vec![item("gone.txt", b"x")], None)
            .await
            .unwrap()
            .remove(0);
        storage.delete(&file.stored_path).unwrap();

        let result = service.download_file(&scope, file.id).await;
        assert!(matches!(result, Err(CabinetError::NotFound(_))));

        service.delete_file(&scope, file.id).await.unwrap();
        let result = service.delete_file(&scope, file.id).await;
        assert!(matches!(result, Err(CabinetError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_list_view_orders_files_by_date() {
        let (db, _temp_dir, storage) = setup().await;
        let user = create_user(&db, "user", Role::Member).await;
        let scope = AccessScope::own(user);
        let service = FileService::new(&db, &storage);

        service
            .upload_files(&scope, vec![item("a.txt", b"a"), item("b.txt", b"b")], None)
            .await
            .unwrap();

        let grid = service
            .list_children(&scope, None, SortKey::Name, ListView::Grid)
            .await
            .unwrap();
        let names: Vec<_> = grid.files.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["a.txt", "b.txt"]);

        let list = service
            .list_children(&scope, None, SortKey::Name, ListView::List)
            .await
            .unwrap();
        let names: Vec<_> = list.files.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["b.txt", "a.txt"]);
    }

    #[tokio::test]
    async fn test_search_and_recent() {
        let (db, _temp_dir, storage) = setup().await;
        let alice = create_user(&db, "alice", Role::Member).await;
        let bob = create_user(&db, "bob", Role::Member).await;
        let service = FileService::new(&db, &storage);

        let scope = AccessScope::own(alice);
        service.create_folder(&scope, "Invoices", None).await.unwrap();
        service
            .upload_files(&scope, vec![item("invoice-1.pdf", b"1"), item("cat.png", b"2")], None)
            .await
            .unwrap();

        let bob_scope = AccessScope::own(bob);
        service
            .upload_files(&bob_scope, vec![item("invoice-bob.pdf", b"3")], None)
            .await
            .unwrap();

        let results = service.search(&scope, "  INVOICE ").await.unwrap();
        assert_eq!(results.query, "INVOICE");
        assert_eq!(results.folders.len(), 1);
        assert_eq!(results.files.len(), 1);
        assert_eq!(results.files[0].name, "invoice-1.pdf");

        let result = service.search(&scope, "   ").await;
        assert!(matches!(result, Err(CabinetError::Validation(_))));

        let recent = service.recent_files(&scope).await.unwrap();
        let names: Vec<_> = recent.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["cat.png", "invoice-1.pdf"]);
    }
}
