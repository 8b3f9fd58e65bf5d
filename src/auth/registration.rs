//! User registration for Cabinet.
//!
//! This module provides the user registration functionality.

use thiserror::Error;
use tracing::info;

use crate::auth::validation::{validate_registration, ValidationError};
use crate::auth::{hash_password, PasswordError};
use crate::db::{NewUser, Role, User, UserRepository};
use crate::CabinetError;

/// Registration-specific errors.
#[derive(Error, Debug)]
pub enum RegistrationError {
    /// Validation failed.
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Username already exists.
    #[error("username already exists")]
    UsernameExists,

    /// Password hashing failed.
    #[error("password error: {0}")]
    Password(#[from] PasswordError),

    /// Database error.
    #[error("database error: {0}")]
    Database(String),
}

impl From<CabinetError> for RegistrationError {
    fn from(e: CabinetError) -> Self {
        match e {
            // Lost a race with a concurrent registration of the same name
            CabinetError::Integrity(_) => RegistrationError::UsernameExists,
            other => RegistrationError::Database(other.to_string()),
        }
    }
}

/// Registration request data.
#[derive(Debug, Clone)]
pub struct RegistrationRequest {
    /// Desired username (3-32 characters).
    pub username: String,
    /// Password (8-128 characters).
    pub password: String,
    /// Display name for the profile; defaults to the username.
    pub display_name: Option<String>,
    /// Optional email address.
    pub email: Option<String>,
}

impl RegistrationRequest {
    /// Create a new registration request.
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
            display_name: None,
            email: None,
        }
    }

    /// Set the display name.
    pub fn with_display_name(mut self, display_name: impl Into<String>) -> Self {
        self.display_name = Some(display_name.into());
        self
    }

    /// Set the email address.
    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }
}

/// Register a new member.
///
/// This function:
/// 1. Validates all input fields
/// 2. Checks if the username already exists
/// 3. Hashes the password
/// 4. Creates the user and its profile in one transaction
pub async fn register(
    repo: &UserRepository<'_>,
    request: RegistrationRequest,
) -> std::result::Result<User, RegistrationError> {
    register_with_role(repo, request, Role::Member).await
}

/// Register a new user with a specific role.
///
/// This is used for the bootstrap administrator account.
pub async fn register_with_role(
    repo: &UserRepository<'_>,
    request: RegistrationRequest,
    role: Role,
) -> std::result::Result<User, RegistrationError> {
    let display_name = request
        .display_name
        .clone()
        .unwrap_or_else(|| request.username.clone());

    validate_registration(
        &request.username,
        &request.password,
        &display_name,
        request.email.as_deref(),
    )?;

    if repo.username_exists(&request.username).await? {
        return Err(RegistrationError::UsernameExists);
    }

    let password_hash = hash_password(&request.password)?;

    let mut new_user = NewUser::new(&request.username, password_hash).with_role(role);
    if let Some(ref email) = request.email {
        new_user = new_user.with_email(email);
    }

    let user = repo.create(&new_user, &display_name).await?;

    info!(
        username = %user.username,
        user_id = user.id,
        role = %role,
        "New user registered"
    );

    Ok(user)
}

/// Create the administrator account unless the username is already taken.
///
/// Returns the new account, or `None` when it existed already. An existing
/// account is left untouched, whatever its role.
pub async fn ensure_admin(
    repo: &UserRepository<'_>,
    username: &str,
    password: &str,
) -> std::result::Result<Option<User>, RegistrationError> {
    if repo.username_exists(username).await? {
        return Ok(None);
    }

    let request = RegistrationRequest::new(username, password);
    match register_with_role(repo, request, Role::Admin).await {
        Ok(user) => Ok(Some(user)),
        Err(RegistrationError::UsernameExists) => Ok(None),
        Err(e) => Err(e),
    }
}
