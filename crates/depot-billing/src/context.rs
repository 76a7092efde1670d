//! # Current-User Context
//!
//! The signed-in operator, passed explicitly into every operation that records
//! who did what. The engine performs no authorization; callers gate actions
//! with [`UserContext::has_permission`] before calling in.

use serde::{Deserialize, Serialize};

/// Permission to save draft exits.
pub const PERM_EXIT_SAVE: &str = "exit.save";
/// Permission to issue (finalize) exits.
pub const PERM_EXIT_FINALIZE: &str = "exit.finalize";
/// Permission to delete draft exits.
pub const PERM_EXIT_DELETE: &str = "exit.delete";

/// Role with every permission.
pub const ROLE_ADMIN: &str = "admin";

/// Opaque operator identity with role and permission strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserContext {
    pub username: String,
    pub role: String,
    #[serde(default)]
    pub permissions: Vec<String>,
}

impl UserContext {
    pub fn new(
        username: impl Into<String>,
        role: impl Into<String>,
        permissions: Vec<String>,
    ) -> Self {
        UserContext {
            username: username.into(),
            role: role.into(),
            permissions,
        }
    }

    /// True if the user holds `permission` or is an admin.
    pub fn has_permission(&self, permission: &str) -> bool {
        self.role == ROLE_ADMIN || self.permissions.iter().any(|p| p == permission)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_permissions() {
        let clerk = UserContext::new("clerk", "gate", vec![PERM_EXIT_SAVE.to_string()]);
        assert!(clerk.has_permission(PERM_EXIT_SAVE));
        assert!(!clerk.has_permission(PERM_EXIT_FINALIZE));

        let admin = UserContext::new("root", ROLE_ADMIN, Vec::new());
        assert!(admin.has_permission(PERM_EXIT_DELETE));
    }
}
