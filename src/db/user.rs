//! User model for Cabinet.
//!
//! This module defines the User struct and Role enum for user management.

use std::fmt;
use std::str::FromStr;

/// User role for permission management.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum Role {
    /// Regular member; may only act on their own storage.
    #[default]
    Member = 0,
    /// Administrator; may act on any user's storage.
    Admin = 1,
}

impl Role {
    /// Convert role to database string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Member => "member",
            Role::Admin => "admin",
        }
    }

    /// Whether this role bypasses ownership checks.
    pub fn is_elevated(&self) -> bool {
        *self == Role::Admin
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "member" => Ok(Role::Member),
            "admin" => Ok(Role::Admin),
            _ => Err(format!("unknown role: {s}")),
        }
    }
}

impl TryFrom<String> for Role {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// User entity representing a registered user.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct User {
    /// Unique user ID.
    pub id: i64,
    /// Login username (unique, case-insensitive).
    pub username: String,
    /// Password hash (Argon2).
    pub password: String,
    /// Email address (optional).
    pub email: Option<String>,
    /// User role for permissions.
    #[sqlx(try_from = "String")]
    pub role: Role,
    /// Account creation timestamp.
    pub created_at: String,
    /// Last login timestamp (optional).
    pub last_login: Option<String>,
    /// Whether the account is active.
    pub is_active: bool,
}

impl User {
    /// Whether this user is an administrator.
    pub fn is_elevated(&self) -> bool {
        self.role.is_elevated()
    }
}

/// Data for creating a new user.
#[derive(Debug, Clone)]
pub struct NewUser {
    /// Login username.
    pub username: String,
    /// Password hash (must already be hashed).
    pub password: String,
    /// Email address.
    pub email: Option<String>,
    /// User role.
    pub role: Role,
}

impl NewUser {
    /// Create a new member with the given username and password hash.
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
            email: None,
            role: Role::Member,
        }
    }

    /// Set the email address.
    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    /// Set the role.
    pub fn with_role(mut self, role: Role) -> Self {
        self.role = role;
        self
    }
}

/// Builder for updating a user.
#[derive(Debug, Clone, Default)]
pub struct UserUpdate {
    /// New password hash.
    pub password: Option<String>,
    /// New email.
    pub email: Option<Option<String>>,
    /// New role.
    pub role: Option<Role>,
    /// New active flag.
    pub is_active: Option<bool>,
}

impl UserUpdate {
    /// Create an empty update.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the password hash.
    pub fn password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    /// Set the email.
    pub fn email(mut self, email: Option<String>) -> Self {
        self.email = Some(email);
        self
    }

    /// Set the role.
    pub fn role(mut self, role: Role) -> Self {
        self.role = Some(role);
        self
    }

    /// Set the active flag.
    pub fn is_active(mut self, is_active: bool) -> Self {
        self.is_active = Some(is_active);
        self
    }

    /// Check if any fields are set.
    pub fn is_empty(&self) -> bool {
        self.password.is_none()
            && self.email.is_none()
            && self.role.is_none()
            && self.is_active.is_none()
    }
}

/// Profile attached to every registered user.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Profile {
    /// Owning user ID.
    pub user_id: i64,
    /// Display name shown in listings.
    pub display_name: String,
    /// When the profile was created.
    pub created_at: String,
}
