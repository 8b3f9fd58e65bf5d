//! Authentication module for Cabinet.
//!
//! This module provides password hashing, user registration, input
//! validation and the ownership gate.

mod password;
pub mod permission;
mod registration;
pub mod validation;

pub use password::{hash_password, needs_rehash, verify_password, PasswordError};
pub use permission::{authorize, require_access, require_admin, Owned, PermissionError};
pub use registration::{
    ensure_admin, register, register_with_role, RegistrationError, RegistrationRequest,
};
pub use validation::ValidationError;
