//! Per-request owner resolution.

use tracing::debug;

use crate::db::{User, UserRepository};
use crate::{CabinetError, Result};

/// Who is acting, and whose storage tree they are acting on.
///
/// Built once per request. Members always act on their own tree; an
/// administrator may name another user to browse or modify theirs.
#[derive(Debug, Clone)]
pub struct AccessScope {
    actor: User,
    owner: User,
}

impl AccessScope {
    /// A scope in which the actor works on their own tree.
    pub fn own(actor: User) -> Self {
        Self {
            owner: actor.clone(),
            actor,
        }
    }

    /// Resolve the effective owner for `actor`.
    ///
    /// `requested_owner` is honored only for elevated actors; members have
    /// it ignored. An unknown user ID is [`CabinetError::NotFound`].
    pub async fn resolve(
        users: &UserRepository<'_>,
        actor: User,
        requested_owner: Option<i64>,
    ) -> Result<Self> {
        match requested_owner {
            Some(owner_id) if actor.is_elevated() && owner_id != actor.id => {
                let owner = users
                    .get_by_id(owner_id)
                    .await?
                    .ok_or_else(|| CabinetError::NotFound("user".to_string()))?;
                debug!(
                    actor_id = actor.id,
                    owner_id = owner.id,
                    "Acting on another user's storage"
                );
                Ok(Self { actor, owner })
            }
            _ => Ok(Self::own(actor)),
        }
    }

    /// The authenticated user performing the request.
    pub fn actor(&self) -> &User {
        &self.actor
    }

    /// ID of the user whose tree is targeted.
    pub fn owner_id(&self) -> i64 {
        self.owner.id
    }

    /// Whether the actor is working on someone else's tree.
    pub fn is_delegated(&self) -> bool {
        self.actor.id != self.owner.id
    }
}
