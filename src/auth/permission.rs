//! Permission checking for Cabinet.
//!
//! Every folder and file is owned by exactly one user. An actor may touch
//! an entity when it owns it or holds the administrator role; this module
//! is the single place where that rule lives.

use thiserror::Error;

use crate::db::User;

/// Permission-related errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PermissionError {
    /// The actor neither owns the entity nor is an administrator.
    #[error("you do not have permission to access this item")]
    NotOwner,

    /// The operation is reserved for administrators.
    #[error("administrator privileges are required")]
    AdminRequired,

    /// User account is not active.
    #[error("account is disabled")]
    AccountInactive,
}

/// An entity that belongs to exactly one user.
pub trait Owned {
    /// ID of the owning user.
    fn owner_id(&self) -> i64;
}

/// Check whether `actor` may act on `entity`.
///
/// True iff the actor owns the entity or is elevated. No side effects.
pub fn authorize(actor: &User, entity: &impl Owned) -> bool {
    actor.id == entity.owner_id() || actor.is_elevated()
}

/// Require that `actor` may act on `entity`.
///
/// # Examples
///
/// ```ignore
/// use cabinet::auth::permission::require_access;
///
/// let folder = folders.get_by_id(id).await?.ok_or(...)?;
/// require_access(&actor, &folder)?;
/// ```
pub fn require_access(actor: &User, entity: &impl Owned) -> Result<(), PermissionError> {
    if !actor.is_active {
        return Err(PermissionError::AccountInactive);
    }
    if !authorize(actor, entity) {
        return Err(PermissionError::NotOwner);
    }
    Ok(())
}

/// Require the administrator role.
pub fn require_admin(actor: &User) -> Result<(), PermissionError> {
    if !actor.is_active {
        return Err(PermissionError::AccountInactive);
    }
    if !actor.is_elevated() {
        return Err(PermissionError::AdminRequired);
    }
    Ok(())
}
