//! File storage for Cabinet.
//!
//! This module provides physical file storage:
//! - Per-owner directory layout
//! - Save, load, and delete operations
//! - Staged removal that can be purged or rolled back

use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Component, Path, PathBuf};

use tracing::warn;
use uuid::Uuid;

use crate::{CabinetError, Result};

/// Directory (under the base path) where staged removals are parked.
const STAGING_DIR: &str = ".trash";

/// Segment used for files that are not inside a folder.
const ROOT_SEGMENT: &str = "root";

/// Fallback used when a name sanitizes down to nothing.
const FALLBACK_SEGMENT: &str = "file";

/// Maximum length of a stored path segment (in characters).
const MAX_SEGMENT_LENGTH: usize = 200;

/// File storage service for managing physical files.
///
/// Files are stored under their owner and folder:
/// ```text
/// {base_path}/
/// ├── user_1/
/// │   ├── root/
/// │   │   └── notes.txt
/// │   └── Docs/
/// │       ├── report.pdf
/// │       └── report_3f2a9c1e.pdf
/// └── .trash/
///     └── {uuid}/    (staged removals)
/// ```
///
/// Stored paths handed out by [`FileStorage::save`] are relative to the base
/// path and always use `/` as the separator.
#[derive(Debug, Clone)]
pub struct FileStorage {
    /// Base directory for file storage.
    base_path: PathBuf,
}

impl FileStorage {
    /// Create a new FileStorage with the given base path.
    ///
    /// The base directory will be created if it doesn't exist.
    pub fn new(base_path: impl Into<PathBuf>) -> Result<Self> {
        let base_path = base_path.into();
        fs::create_dir_all(&base_path)?;

        Ok(Self { base_path })
    }

    /// Get the base path of this storage.
    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    /// Save content for an owner, optionally inside a named folder.
    ///
    /// The target is `user_<owner_id>/<folder or "root">/<filename>`. The
    /// file is created exclusively, so an existing file is never overwritten
    /// even by a concurrent save; a random suffix is added to the stem instead.
    ///
    /// # Returns
    ///
    /// The stored path relative to the base path.
    pub fn save(
        &self,
        owner_id: i64,
        folder_name: Option<&str>,
        filename: &str,
        content: &[u8],
    ) -> Result<String> {
        let folder_segment = folder_name
            .map(sanitize_segment)
            .unwrap_or_else(|| ROOT_SEGMENT.to_string());
        let dir = format!("user_{owner_id}/{folder_segment}");
        fs::create_dir_all(self.base_path.join(&dir))?;

        let base_name = sanitize_segment(filename);
        let mut name = base_name.clone();
        let mut file = loop {
            let opened = OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(self.base_path.join(&dir).join(&name));
            match opened {
                Ok(file) => break file,
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                    name = with_random_suffix(&base_name);
                }
                Err(e) => return Err(e.into()),
            }
        };

        let stored_path = format!("{dir}/{name}");
        if let Err(e) = file.write_all(content) {
            drop(file);
            let _ = fs::remove_file(self.base_path.join(&stored_path));
            return Err(e.into());
        }

        Ok(stored_path)
    }

    /// Load content from storage.
    pub fn load(&self, stored_path: &str) -> Result<Vec<u8>> {
        let file_path = self.resolve(stored_path)?;

        match fs::read(&file_path) {
            Ok(content) => Ok(content),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                Err(CabinetError::NotFound("file content".to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Delete a file from storage.
    ///
    /// # Returns
    ///
    /// `true` if the file was deleted, `false` if it didn't exist
    pub fn delete(&self, stored_path: &str) -> Result<bool> {
        let file_path = self.resolve(stored_path)?;

        match fs::remove_file(&file_path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    /// Check if a file exists in storage.
    pub fn exists(&self, stored_path: &str) -> bool {
        self.resolve(stored_path)
            .map(|p| p.is_file())
            .unwrap_or(false)
    }

    /// Move the given stored files aside so they can be purged or restored.
    ///
    /// Paths whose bytes are already gone are skipped. If a move fails,
    /// everything moved so far is put back before the error is returned.
    pub fn stage_removal<'p>(
        &self,
        stored_paths: impl IntoIterator<Item = &'p str>,
    ) -> Result<StagedRemoval> {
        let dir = self
            .base_path
            .join(STAGING_DIR)
            .join(Uuid::new_v4().to_string());
        fs::create_dir_all(&dir)?;

        let mut staged = StagedRemoval {
            dir,
            moves: Vec::new(),
        };

        for stored_path in stored_paths {
            let original = self.resolve(stored_path)?;
            if !original.is_file() {
                continue;
            }

            let parked = staged.dir.join(staged.moves.len().to_string());
            if let Err(e) = fs::rename(&original, &parked) {
                staged.restore()?;
                return Err(e.into());
            }
            staged.moves.push((original, parked));
        }

        Ok(staged)
    }

    /// Resolve a stored path to an absolute path inside the base directory.
    ///
    /// Absolute paths and parent-directory components are rejected.
    fn resolve(&self, stored_path: &str) -> Result<PathBuf> {
        let relative = Path::new(stored_path);
        let is_plain = relative
            .components()
            .all(|c| matches!(c, Component::Normal(_)));

        if stored_path.is_empty() || !is_plain {
            return Err(CabinetError::Validation(format!(
                "invalid stored path: {stored_path}"
            )));
        }

        Ok(self.base_path.join(relative))
    }
}

/// Files moved aside by [`FileStorage::stage_removal`].
///
/// Exactly one of [`StagedRemoval::purge`] or [`StagedRemoval::restore`]
/// should be called once the surrounding database work has settled.
#[derive(Debug)]
#[must_use = "staged files must be purged or restored"]
pub struct StagedRemoval {
    dir: PathBuf,
    moves: Vec<(PathBuf, PathBuf)>,
}

impl StagedRemoval {
    /// Permanently remove the staged files.
    pub fn purge(self) -> Result<()> {
        match fs::remove_dir_all(&self.dir) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// Move every staged file back to where it came from.
    pub fn restore(self) -> Result<()> {
        let mut first_error = None;

        for (original, parked) in self.moves.iter().rev() {
            if let Some(parent) = original.parent() {
                if let Err(e) = fs::create_dir_all(parent) {
                    first_error.get_or_insert(e);
                    continue;
                }
            }
            if let Err(e) = fs::rename(parked, original) {
                warn!(path = %original.display(), error = %e, "Failed to restore staged file");
                first_error.get_or_insert(e);
            }
        }

        if first_error.is_none() {
            let _ = fs::remove_dir_all(&self.dir);
        }

        match first_error {
            Some(e) => Err(e.into()),
            None => Ok(()),
        }
    }
}

/// Reduce a user-supplied name to a single safe path segment.
///
/// Directory parts are dropped, reserved and control characters become
/// `_`, and leading/trailing dots and spaces are trimmed.
pub fn sanitize_segment(name: &str) -> String {
    let last = name
        .rsplit(['/', '\\'])
        .find(|part| !part.trim().is_empty())
        .unwrap_or("");

    let replaced: String = last
        .chars()
        .map(|c| match c {
            '<' | '>' | ':' | '"' | '|' | '?' | '*' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .take(MAX_SEGMENT_LENGTH)
        .collect();

    let trimmed = replaced.trim_matches(|c: char| c == '.' || c.is_whitespace());
    if trimmed.is_empty() {
        FALLBACK_SEGMENT.to_string()
    } else {
        trimmed.to_string()
    }
}

/// Insert a short random token between the stem and the extension.
fn with_random_suffix(name: &str) -> String {
    let token = Uuid::new_v4().simple().to_string();
    let token = &token[..8];

    match name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => format!("{stem}_{token}.{ext}"),
        _ => format!("{name}_{token}"),
    }
}
