//! Role delegation: which roles a caller may hand out

mod administration;

pub use administration::{OrgAdministration, RoleAdministration};

use std::collections::HashSet;
use std::sync::Arc;

use tracing::debug;

use crate::error::{AuthzError, Result};
use crate::store::DirectoryStore;
use crate::types::{RoleId, Session, SystemRoles};

/// Grant-authority checks over the delegation edge set.
///
/// Each edge `(grantor, grantable)` says that holders of the grantor role
/// may assign the grantable role. Edges are direct only: holding a role
/// that can grant role B conveys nothing about what B itself can grant.
/// Superadmin and user-admin sessions skip the graph entirely, and
/// revocation never consults it; the graph gates additions of authority.
pub struct RoleDelegation {
    store: Arc<dyn DirectoryStore>,
    system: Arc<SystemRoles>,
}

impl RoleDelegation {
    /// Create a delegation checker over a directory store
    pub fn new(store: Arc<dyn DirectoryStore>, system: Arc<SystemRoles>) -> Self {
        Self { store, system }
    }

    /// Role ids the session may assign, by direct delegation edge from any
    /// role the caller holds
    pub async fn assignable_roles(&self, session: &Session) -> Result<HashSet<RoleId>> {
        let names: Vec<String> = session.roles.iter().cloned().collect();
        let held = self.store.roles_by_names(&names).await?;
        let held_ids: Vec<RoleId> = held.into_iter().map(|role| role.id).collect();
        self.store.assignable_role_ids(&held_ids).await
    }

    /// Guard: the session must be able to assign every requested role.
    ///
    /// Requesting no roles asks for nothing and passes. Blank role ids are
    /// rejected before any graph lookup.
    pub async fn check_all_role_permission(
        &self,
        session: &Session,
        requested: &[RoleId],
    ) -> Result<()> {
        if self.system.grants_blanket_authority(session) {
            return Ok(());
        }
        if requested.is_empty() {
            return Ok(());
        }
        if requested.iter().any(|id| id.trim().is_empty()) {
            return Err(AuthzError::Validation(
                "requested role ids must be non-blank".to_string(),
            ));
        }

        let assignable = self.assignable_roles(session).await?;
        match requested.iter().find(|id| !assignable.contains(*id)) {
            Some(denied) => {
                debug!(user_id = %session.user_id, role_id = %denied, "role grant outside delegation edges");
                Err(AuthzError::Forbidden(format!(
                    "user {} may not grant role {}",
                    session.user_id, denied
                )))
            }
            None => Ok(()),
        }
    }

    /// Guard: the named role must not belong to the protected set
    pub fn check_not_protected(&self, role_name: &str) -> Result<()> {
        if self.system.is_protected(role_name) {
            return Err(AuthzError::Forbidden(format!(
                "role '{}' is platform-managed and cannot be altered here",
                role_name
            )));
        }
        Ok(())
    }
}
