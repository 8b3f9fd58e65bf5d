//! Response DTOs for the JSON API.

use serde::Serialize;

use crate::datetime::to_rfc3339;
use crate::db::{Profile, User};
use crate::file::{FileMetadata, Folder, Listing, SearchResults};

// ============================================================================
// Generic Response Wrappers
// ============================================================================

/// Generic API response wrapper.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    /// Response data.
    pub data: T,
}

impl<T: Serialize> ApiResponse<T> {
    /// Create a new API response.
    pub fn new(data: T) -> Self {
        Self { data }
    }
}

// ============================================================================
// Auth DTOs
// ============================================================================

/// Login response.
#[derive(Debug, Serialize)]
pub struct LoginResponse {
    /// Access token (JWT).
    pub access_token: String,
    /// Always `Bearer`.
    pub token_type: &'static str,
    /// Access token expiry in seconds.
    pub expires_in: u64,
    /// User information.
    pub user: UserInfo,
}

/// User information in responses.
#[derive(Debug, Serialize)]
pub struct UserInfo {
    /// User ID.
    pub id: i64,
    /// Username.
    pub username: String,
    /// User role.
    pub role: String,
}

impl From<&User> for UserInfo {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            role: user.role.as_str().to_string(),
        }
    }
}

/// Current user response (for /api/auth/me).
#[derive(Debug, Serialize)]
pub struct MeResponse {
    /// User ID.
    pub id: i64,
    /// Username.
    pub username: String,
    /// Display name from the profile.
    pub display_name: String,
    /// User role.
    pub role: String,
    /// Email address.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// Account creation timestamp.
    pub created_at: String,
    /// Last login timestamp.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_login_at: Option<String>,
}

impl MeResponse {
    /// Build from a user and their profile, if one exists.
    pub fn new(user: User, profile: Option<Profile>) -> Self {
        let display_name = profile
            .map(|p| p.display_name)
            .unwrap_or_else(|| user.username.clone());
        Self {
            id: user.id,
            role: user.role.as_str().to_string(),
            username: user.username,
            display_name,
            email: user.email,
            created_at: to_rfc3339(&user.created_at),
            last_login_at: user.last_login.as_deref().map(to_rfc3339),
        }
    }
}

// ============================================================================
// Storage DTOs
// ============================================================================

/// Folder in responses.
#[derive(Debug, Serialize)]
pub struct FolderResponse {
    /// Folder ID.
    pub id: i64,
    /// Folder name.
    pub name: String,
    /// Owner user ID.
    pub owner_id: i64,
    /// Parent folder ID (`null` at root).
    pub parent_id: Option<i64>,
    /// Creation timestamp.
    pub created_at: String,
}

impl From<Folder> for FolderResponse {
    fn from(folder: Folder) -> Self {
        Self {
            id: folder.id,
            name: folder.name,
            owner_id: folder.owner_id,
            parent_id: folder.parent_id,
            created_at: to_rfc3339(&folder.created_at),
        }
    }
}

/// File in responses.
#[derive(Debug, Serialize)]
pub struct FileResponse {
    /// File ID.
    pub id: i64,
    /// Display name.
    pub name: String,
    /// Size in bytes.
    pub size: i64,
    /// Containing folder (`null` at root).
    pub folder_id: Option<i64>,
    /// Owner user ID.
    pub owner_id: i64,
    /// Upload timestamp.
    pub created_at: String,
    /// MIME type guessed from the name.
    pub mime_type: String,
    /// Whether the file can be previewed as an image.
    pub is_image: bool,
}

impl From<FileMetadata> for FileResponse {
    fn from(file: FileMetadata) -> Self {
        let mime_type = file.mime_type();
        let is_image = file.is_image();
        Self {
            id: file.id,
            name: file.name,
            size: file.size,
            folder_id: file.folder_id,
            owner_id: file.owner_id,
            created_at: to_rfc3339(&file.created_at),
            mime_type,
            is_image,
        }
    }
}

/// Breadcrumb entry.
#[derive(Debug, Serialize)]
pub struct BreadcrumbResponse {
    /// Folder ID.
    pub id: i64,
    /// Folder name.
    pub name: String,
}

/// Contents of one folder (or the root).
#[derive(Debug, Serialize)]
pub struct ListingResponse {
    /// Whose tree this is.
    pub owner_id: i64,
    /// The listed folder, `null` at root.
    pub folder: Option<FolderResponse>,
    /// Path from the root to the listed folder.
    pub breadcrumbs: Vec<BreadcrumbResponse>,
    /// Child folders.
    pub folders: Vec<FolderResponse>,
    /// Child files.
    pub files: Vec<FileResponse>,
}

impl From<Listing> for ListingResponse {
    fn from(listing: Listing) -> Self {
        Self {
            owner_id: listing.owner_id,
            folder: listing.folder.map(FolderResponse::from),
            breadcrumbs: listing
                .breadcrumbs
                .into_iter()
                .map(|f| BreadcrumbResponse {
                    id: f.id,
                    name: f.name,
                })
                .collect(),
            folders: listing.folders.into_iter().map(Into::into).collect(),
            files: listing.files.into_iter().map(Into::into).collect(),
        }
    }
}

/// Search hits.
#[derive(Debug, Serialize)]
pub struct SearchResponse {
    /// The query as searched.
    pub query: String,
    /// Matching folders.
    pub folders: Vec<FolderResponse>,
    /// Matching files.
    pub files: Vec<FileResponse>,
}

impl From<SearchResults> for SearchResponse {
    fn from(results: SearchResults) -> Self {
        Self {
            query: results.query,
            folders: results.folders.into_iter().map(Into::into).collect(),
            files: results.files.into_iter().map(Into::into).collect(),
        }
    }
}

/// Outcome of a delete request.
#[derive(Debug, Serialize)]
pub struct DeleteResponse {
    /// ID of the deleted item.
    pub id: i64,
    /// Number of records removed: the folder and its descendants, or 1
    /// for a file.
    pub removed: u64,
}

// ============================================================================
// Admin DTOs
// ============================================================================

/// User entry in the administrator's user list.
#[derive(Debug, Serialize)]
pub struct UserListResponse {
    /// User ID.
    pub id: i64,
    /// Username.
    pub username: String,
    /// User role.
    pub role: String,
    /// Whether the account can log in.
    pub is_active: bool,
    /// Account creation timestamp.
    pub created_at: String,
    /// Number of folders the user owns.
    pub folder_count: i64,
    /// Number of files the user owns.
    pub file_count: i64,
}

impl UserListResponse {
    /// Build an entry from a user and their storage counts.
    pub fn new(user: User, folder_count: i64, file_count: i64) -> Self {
        Self {
            id: user.id,
            username: user.username,
            role: user.role.as_str().to_string(),
            is_active: user.is_active,
            created_at: to_rfc3339(&user.created_at),
            folder_count,
            file_count,
        }
    }
}
