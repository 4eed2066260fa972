//! Role assignment and administrator-edge workflows

use std::sync::Arc;

use tracing::{error, info, warn};

use crate::delegation::RoleDelegation;
use crate::error::{AuthzError, Result};
use crate::hierarchy::HierarchyIndex;
use crate::scope::ScopeAuthorizer;
use crate::store::DirectoryStore;
use crate::types::{Role, RoleId, Session, SystemRoles};

/// Grants, revokes, and deletes custom roles.
///
/// Every path through here runs the protected-role guard first: the
/// platform roles can never be handed out, taken away, or deleted by the
/// generic role surface. All authorization failures are raised before the
/// first mutation.
pub struct RoleAdministration {
    store: Arc<dyn DirectoryStore>,
    authorizer: Arc<ScopeAuthorizer>,
    delegation: Arc<RoleDelegation>,
}

impl RoleAdministration {
    /// Create the role workflow service
    pub fn new(
        store: Arc<dyn DirectoryStore>,
        authorizer: Arc<ScopeAuthorizer>,
        delegation: Arc<RoleDelegation>,
    ) -> Self {
        Self {
            store,
            authorizer,
            delegation,
        }
    }

    /// Assign roles to a user.
    ///
    /// The caller must hold management authority over the target user and a
    /// delegation edge for every requested role.
    pub async fn grant_roles(
        &self,
        session: &Session,
        target_user_id: &str,
        role_ids: &[RoleId],
    ) -> Result<()> {
        if role_ids.is_empty() {
            return Ok(());
        }
        let roles = self.load_roles(role_ids).await?;
        for role in &roles {
            self.delegation.check_not_protected(&role.name)?;
        }
        self.authorizer.check_user_permission(session, target_user_id).await?;
        self.delegation.check_all_role_permission(session, role_ids).await?;

        for role in &roles {
            self.store.grant_role(target_user_id, &role.id).await?;
        }
        info!(
            user_id = %session.user_id,
            target_user_id = %target_user_id,
            count = roles.len(),
            "roles granted"
        );
        Ok(())
    }

    /// Remove roles from a user.
    ///
    /// Revocation reduces authority, so the delegation graph is not
    /// consulted; only management authority over the user is required.
    pub async fn revoke_roles(
        &self,
        session: &Session,
        target_user_id: &str,
        role_ids: &[RoleId],
    ) -> Result<()> {
        if role_ids.is_empty() {
            return Ok(());
        }
        let roles = self.load_roles(role_ids).await?;
        for role in &roles {
            self.delegation.check_not_protected(&role.name)?;
        }
        self.authorizer.check_user_permission(session, target_user_id).await?;

        for role in &roles {
            self.store.revoke_role(target_user_id, &role.id).await?;
        }
        info!(
            user_id = %session.user_id,
            target_user_id = %target_user_id,
            count = roles.len(),
            "roles revoked"
        );
        Ok(())
    }

    /// Delete a custom role together with every assignment and delegation
    /// edge that references it.
    ///
    /// The cascade is transactional in the store; when it fails the true
    /// cause is logged and the caller gets a generic internal error.
    pub async fn delete_role(&self, role_id: &str) -> Result<()> {
        let role = match self.store.role(role_id).await? {
            Some(role) => role,
            None => return Err(AuthzError::NotFound(format!("role {}", role_id))),
        };
        self.delegation.check_not_protected(&role.name)?;
        if let Err(e) = self.store.delete_role_cascade(role_id).await {
            error!(role_id = %role_id, error = %e, "role cascade delete failed, rolled back");
            return Err(AuthzError::Internal(format!("failed to delete role {}", role_id)));
        }
        info!(role_id = %role_id, name = %role.name, "role deleted with its assignments and edges");
        Ok(())
    }

    async fn load_roles(&self, role_ids: &[RoleId]) -> Result<Vec<Role>> {
        let mut roles = Vec::with_capacity(role_ids.len());
        for id in role_ids {
            match self.store.role(id).await? {
                Some(role) => roles.push(role),
                None => return Err(AuthzError::NotFound(format!("role {}", id))),
            }
        }
        Ok(roles)
    }
}

/// Manages the administrator edges that define subtree authority.
///
/// The org-admin role rides along with the edges: it is granted with the
/// first edge a user receives and revoked when their last edge goes away.
/// This workflow is the only writer of that role.
pub struct OrgAdministration {
    store: Arc<dyn DirectoryStore>,
    authorizer: Arc<ScopeAuthorizer>,
    index: HierarchyIndex,
    system: Arc<SystemRoles>,
}

impl OrgAdministration {
    /// Create the administrator workflow service
    pub fn new(
        store: Arc<dyn DirectoryStore>,
        authorizer: Arc<ScopeAuthorizer>,
        system: Arc<SystemRoles>,
    ) -> Self {
        Self {
            index: HierarchyIndex::new(store.clone()),
            store,
            authorizer,
            system,
        }
    }

    /// Make `user_id` an administrator of `org_id`
    pub async fn grant_administrator(
        &self,
        session: &Session,
        org_id: &str,
        user_id: &str,
    ) -> Result<()> {
        self.authorizer.check_organization_permission(session, org_id).await?;
        // Blanket callers skip scope resolution, so the target still needs
        // an existence check before an edge is written.
        self.index.path_of(org_id).await?;

        self.store.insert_admin_edge(org_id, user_id).await?;
        let role = self.org_admin_role().await?.ok_or_else(|| {
            AuthzError::Internal(format!("the '{}' role is not provisioned", self.system.org_admin))
        })?;
        self.store.grant_role(user_id, &role.id).await?;
        info!(org_id = %org_id, user_id = %user_id, "administrator edge granted");
        Ok(())
    }

    /// Remove `user_id` as administrator of `org_id`.
    ///
    /// When the removed edge was the user's last one, the org-admin role is
    /// revoked as well.
    pub async fn revoke_administrator(
        &self,
        session: &Session,
        org_id: &str,
        user_id: &str,
    ) -> Result<()> {
        self.authorizer.check_organization_permission(session, org_id).await?;

        self.store.remove_admin_edge(org_id, user_id).await?;
        let remaining = self.store.admin_organizations(user_id).await?;
        if remaining.is_empty() {
            match self.org_admin_role().await? {
                Some(role) => {
                    self.store.revoke_role(user_id, &role.id).await?;
                    info!(user_id = %user_id, "last administrator edge removed, org-admin role revoked");
                }
                None => {
                    warn!(user_id = %user_id, "org-admin role is not provisioned, nothing to revoke");
                }
            }
        }
        info!(org_id = %org_id, user_id = %user_id, "administrator edge revoked");
        Ok(())
    }

    async fn org_admin_role(&self) -> Result<Option<Role>> {
        let found = self
            .store
            .roles_by_names(std::slice::from_ref(&self.system.org_admin))
            .await?;
        Ok(found.into_iter().next())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scope::AdminScopeResolver;
    use crate::store::InMemoryDirectory;
    use crate::types::Organization;

    struct Fixture {
        dir: Arc<InMemoryDirectory>,
        roles: RoleAdministration,
        admins: OrgAdministration,
    }

    async fn fixture() -> Fixture {
        let dir = Arc::new(InMemoryDirectory::new());
        dir.upsert_organization(Organization::root("1", "Acme")).await.unwrap();
        dir.upsert_organization(Organization::child_of("1", "2", "West")).await.unwrap();
        dir.upsert_organization(Organization::child_of("1", "3", "East")).await.unwrap();

        let system = SystemRoles::default();
        dir.upsert_role(Role::new("r-org-admin", system.org_admin.clone())).await.unwrap();
        dir.upsert_role(Role::new("r-clerk", "Clerk")).await.unwrap();

        let store: Arc<dyn DirectoryStore> = dir.clone();
        let system = Arc::new(system);
        let resolver = Arc::new(AdminScopeResolver::new(store.clone()));
        let authorizer = Arc::new(ScopeAuthorizer::new(
            store.clone(),
            resolver,
            system.clone(),
        ));
        let delegation = Arc::new(RoleDelegation::new(store.clone(), system.clone()));

        Fixture {
            dir,
            roles: RoleAdministration::new(store.clone(), authorizer.clone(), delegation.clone()),
            admins: OrgAdministration::new(store, authorizer, system),
        }
    }

    #[tokio::test]
    async fn test_grant_administrator_writes_edge_and_role() {
        let f = fixture().await;
        let root = Session::new("root").with_role("superadmin");

        f.admins.grant_administrator(&root, "2", "alice").await.unwrap();

        assert_eq!(f.dir.admin_organizations("alice").await.unwrap(), vec!["2".to_string()]);
        let roles = f.dir.roles_for_user("alice").await.unwrap();
        assert_eq!(roles.len(), 1);
        assert_eq!(roles[0].id, "r-org-admin");
    }

    #[tokio::test]
    async fn test_last_edge_revocation_drops_org_admin_role() {
        let f = fixture().await;
        let root = Session::new("root").with_role("superadmin");

        f.admins.grant_administrator(&root, "2", "alice").await.unwrap();
        f.admins.grant_administrator(&root, "3", "alice").await.unwrap();

        f.admins.revoke_administrator(&root, "2", "alice").await.unwrap();
        // One edge left, role retained
        assert_eq!(f.dir.roles_for_user("alice").await.unwrap().len(), 1);

        f.admins.revoke_administrator(&root, "3", "alice").await.unwrap();
        assert!(f.dir.roles_for_user("alice").await.unwrap().is_empty());
        assert!(f.dir.admin_organizations("alice").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_grant_administrator_requires_existing_org() {
        let f = fixture().await;
        let root = Session::new("root").with_role("superadmin");

        let err = f.admins.grant_administrator(&root, "nope", "alice").await.unwrap_err();
        assert_eq!(err.code(), 404);
        assert!(f.dir.admin_organizations("alice").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_generic_surface_rejects_protected_roles() {
        let f = fixture().await;
        let root = Session::new("root").with_role("superadmin");

        let err = f
            .roles
            .grant_roles(&root, "bob", &["r-org-admin".to_string()])
            .await
            .unwrap_err();
        assert!(err.is_forbidden());

        let err = f
            .roles
            .revoke_roles(&root, "bob", &["r-org-admin".to_string()])
            .await
            .unwrap_err();
        assert!(err.is_forbidden());

        let err = f.roles.delete_role("r-org-admin").await.unwrap_err();
        assert!(err.is_forbidden());
    }

    #[tokio::test]
    async fn test_grant_roles_unknown_role_is_not_found() {
        let f = fixture().await;
        let root = Session::new("root").with_role("superadmin");

        let err = f
            .roles
            .grant_roles(&root, "bob", &["missing".to_string()])
            .await
            .unwrap_err();
        assert_eq!(err.code(), 404);
    }

    #[tokio::test]
    async fn test_delete_role_cascades() {
        let f = fixture().await;
        f.dir.grant_role("bob", "r-clerk").await.unwrap();

        f.roles.delete_role("r-clerk").await.unwrap();

        assert!(f.dir.role("r-clerk").await.unwrap().is_none());
        assert!(f.dir.roles_for_user("bob").await.unwrap().is_empty());
        assert_eq!(f.roles.delete_role("r-clerk").await.unwrap_err().code(), 404);
    }
}
