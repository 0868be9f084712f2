//! Well-known role name constants and batch ownership rules.
//!
//! Role names must match the `users.role` check constraint in
//! `20260301000002_create_users_table.sql`.

use crate::types::DbId;

pub const ROLE_ADMIN: &str = "admin";
pub const ROLE_PRODUCER: &str = "producer";
pub const ROLE_CONSUMER: &str = "consumer";

/// The caller on whose behalf a QR operation runs.
///
/// Handlers build this from the authenticated request and pass it into the
/// service explicitly, so ownership checks never read ambient request state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Actor {
    pub user_id: DbId,
    pub role: String,
}

impl Actor {
    pub fn new(user_id: DbId, role: impl Into<String>) -> Self {
        Self {
            user_id,
            role: role.into(),
        }
    }

    /// Whether this actor may mint or administer codes for a batch owned by
    /// `batch_producer_id`.
    pub fn can_manage_batch(&self, batch_producer_id: Option<DbId>) -> bool {
        can_manage_batch(&self.role, self.user_id, batch_producer_id)
    }
}

/// Admins manage every batch; producers manage only the batches they own.
///
/// A batch with no recorded producer is manageable by admins only.
pub fn can_manage_batch(role: &str, user_id: DbId, batch_producer_id: Option<DbId>) -> bool {
    match role {
        ROLE_ADMIN => true,
        ROLE_PRODUCER => batch_producer_id == Some(user_id),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn admin_manages_any_batch() {
        assert!(can_manage_batch(ROLE_ADMIN, 1, Some(99)));
        assert!(can_manage_batch(ROLE_ADMIN, 1, None));
    }

    #[test]
    fn producer_manages_only_own_batches() {
        assert!(can_manage_batch(ROLE_PRODUCER, 7, Some(7)));
        assert!(!can_manage_batch(ROLE_PRODUCER, 7, Some(8)));
        assert!(!can_manage_batch(ROLE_PRODUCER, 7, None));
    }

    #[test]
    fn consumers_and_unknown_roles_manage_nothing() {
        assert!(!can_manage_batch(ROLE_CONSUMER, 7, Some(7)));
        assert!(!can_manage_batch("auditor", 7, Some(7)));
    }

    #[test]
    fn actor_delegates_to_rule() {
        let actor = Actor::new(3, ROLE_PRODUCER);
        assert!(actor.can_manage_batch(Some(3)));
        assert!(!actor.can_manage_batch(Some(4)));
    }
}
