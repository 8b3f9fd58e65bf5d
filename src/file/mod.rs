//! File management module for Cabinet.
//!
//! This module provides the per-user storage tree:
//! - Nested, user-owned folders
//! - File records backed by bytes in [`FileStorage`]
//! - Owner-scoped listing, search and cascading delete

mod folder;
mod metadata;
mod scope;
mod service;
mod storage;

use std::str::FromStr;

pub use folder::{Folder, FolderRepository, NewFolder};
pub use metadata::{FileMetadata, FileRepository, NewFile};
pub use scope::AccessScope;
pub use service::{DownloadResult, FileService, Listing, SearchResults, UploadItem};
pub use storage::{sanitize_segment, FileStorage, StagedRemoval};

use crate::{CabinetError, Result};

/// Maximum length for file and folder names (in characters).
pub const MAX_NAME_LENGTH: usize = 255;

/// Default maximum file size (50MB).
pub const DEFAULT_MAX_FILE_SIZE: u64 = 50 * 1024 * 1024;

/// Number of files returned by the recent-files view.
pub const RECENT_FILES_LIMIT: i64 = 50;

/// Ordering applied to listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortKey {
    /// Alphabetical, case-insensitive.
    #[default]
    Name,
    /// Newest first; ties broken by id, newest first.
    CreatedDesc,
}

impl SortKey {
    /// SQL `ORDER BY` clause for this key.
    pub(crate) fn order_clause(&self) -> &'static str {
        match self {
            SortKey::Name => "ORDER BY name COLLATE NOCASE, id",
            SortKey::CreatedDesc => "ORDER BY created_at DESC, id DESC",
        }
    }
}

impl FromStr for SortKey {
    type Err = CabinetError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "name" => Ok(SortKey::Name),
            "date" | "created_at" => Ok(SortKey::CreatedDesc),
            other => Err(CabinetError::Validation(format!(
                "unknown sort key: {other}"
            ))),
        }
    }
}

/// How a listing is presented.
///
/// The list view always shows files newest first; the grid view applies
/// the requested sort to both folders and files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ListView {
    /// Grid of icons.
    #[default]
    Grid,
    /// Detailed list.
    List,
}

impl ListView {
    /// Sort key to apply to files under this view.
    pub fn file_sort(&self, requested: SortKey) -> SortKey {
        match self {
            ListView::Grid => requested,
            ListView::List => SortKey::CreatedDesc,
        }
    }
}

impl FromStr for ListView {
    type Err = CabinetError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "grid" => Ok(ListView::Grid),
            "list" => Ok(ListView::List),
            other => Err(CabinetError::Validation(format!("unknown view: {other}"))),
        }
    }
}

/// Validate and normalize a file or folder name.
///
/// Surrounding whitespace is trimmed. The result must be non-empty, at
/// most [`MAX_NAME_LENGTH`] characters, and free of path separators and
/// control characters.
pub fn validate_name(name: &str) -> Result<String> {
    let name = name.trim();

    if name.is_empty() {
        return Err(CabinetError::Validation("name cannot be empty".to_string()));
    }
    if name.chars().count() > MAX_NAME_LENGTH {
        return Err(CabinetError::Validation(format!(
            "name must be at most {MAX_NAME_LENGTH} characters"
        )));
    }
    if name == "." || name == ".." {
        return Err(CabinetError::Validation(format!("invalid name: {name}")));
    }
    if name
        .chars()
        .any(|c| c == '/' || c == '\\' || c.is_control())
    {
        return Err(CabinetError::Validation(
            "name cannot contain slashes or control characters".to_string(),
        ));
    }

    Ok(name.to_string())
}

/// Build a `LIKE` pattern matching `query` as a literal substring.
///
/// `%`, `_` and the escape character itself are escaped with `\`.
pub(crate) fn like_pattern(query: &str) -> String {
    let mut pattern = String::with_capacity(query.len() + 2);
    pattern.push('%');
    for c in query.chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sort_key_parse() {
        assert_eq!("name".parse::<SortKey>().unwrap(), SortKey::Name);
        assert_eq!("date".parse::<SortKey>().unwrap(), SortKey::CreatedDesc);
        assert!("size".parse::<SortKey>().is_err());
        assert_eq!(SortKey::default(), SortKey::Name);
    }

    #[test]
    fn test_list_view_file_sort() {
        assert_eq!(ListView::Grid.file_sort(SortKey::Name), SortKey::Name);
        assert_eq!(ListView::List.file_sort(SortKey::Name), SortKey::CreatedDesc);
        assert_eq!("list".parse::<ListView>().unwrap(), ListView::List);
        assert!("tiles".parse::<ListView>().is_err());
    }

    #[test]
    fn test_validate_name() {
        assert_eq!(validate_name("  Docs  ").unwrap(), "Docs");
        assert_eq!(validate_name("2024 report.pdf").unwrap(), "2024 report.pdf");
        assert!(validate_name("").is_err());
        assert!(validate_name("   ").is_err());
        assert!(validate_name("..").is_err());
        assert!(validate_name("a/b").is_err());
        assert!(validate_name("a\\b").is_err());
        assert!(validate_name("tab\there").is_err());
        assert!(validate_name(&"n".repeat(MAX_NAME_LENGTH)).is_ok());
        assert!(validate_name(&"n".repeat(MAX_NAME_LENGTH + 1)).is_err());
    }

    #[test]
    fn test_like_pattern() {
        assert_eq!(like_pattern("doc"), "%doc%");
        assert_eq!(like_pattern("50%"), "%50\\%%");
        assert_eq!(like_pattern("a_b"), "%a\\_b%");
        assert_eq!(like_pattern("c:\\x"), "%c:\\\\x%");
    }
}
