//! Cabinet - multi-user file storage
//!
//! Each user owns a tree of nested folders and files. Members manage their
//! own tree; administrators can open anyone's. Everything is served as a
//! token-authenticated JSON API.

pub mod auth;
pub mod config;
pub mod datetime;
pub mod db;
pub mod error;
pub mod file;
pub mod logging;
pub mod web;

pub use auth::{
    hash_password, needs_rehash, register, register_with_role, verify_password,
    PasswordError, PermissionError, RegistrationError, RegistrationRequest, ValidationError,
};
pub use config::Config;
pub use db::{Database, NewUser, Role, User, UserRepository, UserUpdate};
pub use error::{CabinetError, Result};
pub use file::{AccessScope, FileService, FileStorage};
