//! Input validation for Cabinet user registration.
//!
//! This module provides validation functions for usernames, passwords,
//! display names, and email addresses.

use thiserror::Error;

/// Minimum username length.
pub const MIN_USERNAME_LENGTH: usize = 3;

/// Maximum username length.
pub const MAX_USERNAME_LENGTH: usize = 32;

/// Minimum password length.
pub const MIN_PASSWORD_LENGTH: usize = 8;

/// Maximum password length.
pub const MAX_PASSWORD_LENGTH: usize = 128;

/// Maximum display name length.
pub const MAX_DISPLAY_NAME_LENGTH: usize = 64;

/// Maximum email length.
pub const MAX_EMAIL_LENGTH: usize = 254;

/// Validation errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Username is too short.
    #[error("username must be at least {MIN_USERNAME_LENGTH} characters")]
    UsernameTooShort,

    /// Username is too long.
    #[error("username must be at most {MAX_USERNAME_LENGTH} characters")]
    UsernameTooLong,

    /// Username contains invalid characters.
    #[error("username can only contain letters, digits and . - _")]
    UsernameInvalidChars,

    /// Password is too short.
    #[error("password must be at least {MIN_PASSWORD_LENGTH} characters")]
    PasswordTooShort,

    /// Password is too long.
    #[error("password must be at most {MAX_PASSWORD_LENGTH} characters")]
    PasswordTooLong,

    /// Password is the same as username.
    #[error("password cannot be the same as username")]
    PasswordSameAsUsername,

    /// Display name is empty.
    #[error("display name cannot be empty")]
    DisplayNameEmpty,

    /// Display name is too long.
    #[error("display name must be at most {MAX_DISPLAY_NAME_LENGTH} characters")]
    DisplayNameTooLong,

    /// Display name contains control characters.
    #[error("display name contains invalid characters")]
    DisplayNameInvalidChars,

    /// Email is too long.
    #[error("email must be at most {MAX_EMAIL_LENGTH} characters")]
    EmailTooLong,

    /// Email format is invalid.
    #[error("invalid email format")]
    EmailInvalidFormat,
}

/// Validate a username.
///
/// Requirements:
/// - Length: 3-32 characters
/// - Characters: ASCII letters, digits, `.`, `-` and `_`
///
/// # Examples
///
/// ```
/// use cabinet::auth::validation::validate_username;
///
/// assert!(validate_username("john_doe").is_ok());
/// assert!(validate_username("ab").is_err()); // too short
/// assert!(validate_username("john doe").is_err()); // space
/// ```
pub fn validate_username(username: &str) -> Result<(), ValidationError> {
    if username.len() < MIN_USERNAME_LENGTH {
        return Err(ValidationError::UsernameTooShort);
    }
    if username.len() > MAX_USERNAME_LENGTH {
        return Err(ValidationError::UsernameTooLong);
    }

    if !username
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'))
    {
        return Err(ValidationError::UsernameInvalidChars);
    }

    Ok(())
}

/// Validate a password.
///
/// Requirements:
/// - Length: 8-128 characters
/// - Must not be the same as the username (if provided)
pub fn validate_registration_password(
    password: &str,
    username: Option<&str>,
) -> Result<(), ValidationError> {
    if password.len() < MIN_PASSWORD_LENGTH {
        return Err(ValidationError::PasswordTooShort);
    }
    if password.len() > MAX_PASSWORD_LENGTH {
        return Err(ValidationError::PasswordTooLong);
    }

    if let Some(user) = username {
        if password.eq_ignore_ascii_case(user) {
            return Err(ValidationError::PasswordSameAsUsername);
        }
    }

    Ok(())
}

/// Validate a display name.
pub fn validate_display_name(display_name: &str) -> Result<(), ValidationError> {
    if display_name.trim().is_empty() {
        return Err(ValidationError::DisplayNameEmpty);
    }

    // Length in characters, not bytes
    if display_name.chars().count() > MAX_DISPLAY_NAME_LENGTH {
        return Err(ValidationError::DisplayNameTooLong);
    }

    if display_name.chars().any(|c| c.is_control()) {
        return Err(ValidationError::DisplayNameInvalidChars);
    }

    Ok(())
}

/// Validate an email address (optional field).
///
/// If empty, returns Ok. If provided, performs a basic format check.
///
/// # Examples
///
/// ```
/// use cabinet::auth::validation::validate_email;
///
/// assert!(validate_email("").is_ok());
/// assert!(validate_email("user@example.com").is_ok());
/// assert!(validate_email("invalid").is_err());
/// ```
pub fn validate_email(email: &str) -> Result<(), ValidationError> {
    if email.is_empty() {
        return Ok(());
    }

    if email.len() > MAX_EMAIL_LENGTH {
        return Err(ValidationError::EmailTooLong);
    }

    if email.chars().any(|c| c.is_whitespace()) {
        return Err(ValidationError::EmailInvalidFormat);
    }

    let Some((local, domain)) = email.split_once('@') else {
        return Err(ValidationError::EmailInvalidFormat);
    };

    if local.is_empty() || domain.contains('@') {
        return Err(ValidationError::EmailInvalidFormat);
    }

    // Domain needs at least one dot and no empty labels
    if !domain.contains('.') || domain.split('.').any(|p| p.is_empty()) {
        return Err(ValidationError::EmailInvalidFormat);
    }

    Ok(())
}

/// Validate all registration fields at once.
///
/// Returns the first validation error encountered, or Ok if all fields are valid.
pub fn validate_registration(
    username: &str,
    password: &str,
    display_name: &str,
    email: Option<&str>,
) -> Result<(), ValidationError> {
    validate_username(username)?;
    validate_registration_password(password, Some(username))?;
    validate_display_name(display_name)?;
    if let Some(e) = email {
        validate_email(e)?;
    }
    Ok(())
}
