//! Request DTOs for the JSON API.

use serde::Deserialize;
use validator::Validate;

use super::validation::valid_name;

/// Login request.
#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    /// Username.
    #[validate(length(min = 1, message = "Username is required"))]
    pub username: String,
    /// Password.
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

/// User registration request.
#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    /// Username.
    #[validate(length(min = 1, message = "Username is required"))]
    pub username: String,
    /// Password.
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
    /// Display name; defaults to the username.
    #[serde(default)]
    pub display_name: Option<String>,
    /// Email (optional).
    #[serde(default)]
    pub email: Option<String>,
}

/// Body of a folder creation request.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateFolderRequest {
    /// Folder name.
    #[validate(length(min = 1, max = 255), custom(function = "valid_name"))]
    pub name: String,
}

/// Body of a file rename request.
#[derive(Debug, Deserialize, Validate)]
pub struct RenameFileRequest {
    /// New display name.
    #[validate(length(min = 1, max = 255), custom(function = "valid_name"))]
    pub name: String,
}

/// `?user_id=` selector honored for administrators.
#[derive(Debug, Default, Deserialize)]
pub struct OwnerQuery {
    /// Whose tree to act on.
    #[serde(default)]
    pub user_id: Option<i64>,
}

/// Query parameters of a listing request.
#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    /// Whose tree to list.
    #[serde(default)]
    pub user_id: Option<i64>,
    /// `name` or `date`.
    #[serde(default)]
    pub sort: Option<String>,
    /// `grid` or `list`.
    #[serde(default)]
    pub view: Option<String>,
}

/// Query parameters of a search request.
#[derive(Debug, Default, Deserialize)]
pub struct SearchQuery {
    /// Substring to look for.
    #[serde(default)]
    pub q: String,
    /// Whose tree to search.
    #[serde(default)]
    pub user_id: Option<i64>,
}
