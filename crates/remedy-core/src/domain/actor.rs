//! The already-authenticated caller of a core operation.

use remedy_state::{Role, UserId};
use serde::{Deserialize, Serialize};

/// An authenticated user acting on the platform.
///
/// Read paths take `Option<&Actor>`; `None` is an anonymous viewer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub user_id: UserId,
    pub role: Role,
}

impl Actor {
    pub fn new(user_id: UserId, role: Role) -> Self {
        Self { user_id, role }
    }

    pub fn user(user_id: UserId) -> Self {
        Self::new(user_id, Role::User)
    }

    pub fn moderator(user_id: UserId) -> Self {
        Self::new(user_id, Role::Moderator)
    }

    pub fn admin(user_id: UserId) -> Self {
        Self::new(user_id, Role::Admin)
    }

    /// Moderators and admins.
    pub fn is_privileged(&self) -> bool {
        self.role.is_privileged()
    }

    pub fn is(&self, user_id: &UserId) -> bool {
        self.user_id == *user_id
    }
}
