//! Facade wiring all authorization components over one directory store

use std::sync::Arc;
use std::time::Duration;

use tracing::info;

use crate::delegation::{OrgAdministration, RoleAdministration, RoleDelegation};
use crate::error::Result;
use crate::hierarchy::HierarchyIndex;
use crate::scope::{AdminScopeResolver, ScopeAuthorizer, DEFAULT_SCOPE_TTL};
use crate::statement::{EnforceRequest, Enforcer};
use crate::store::DirectoryStore;
use crate::types::{RoleId, ScopedOrg, Session, SystemRoles};

/// Authorization core configuration
#[derive(Debug, Clone)]
pub struct CoreConfig {
    /// Names of the platform-managed roles
    pub system_roles: SystemRoles,

    /// Sliding TTL for the administrator scope cache
    pub scope_cache_ttl: Duration,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            system_roles: SystemRoles::default(),
            scope_cache_ttl: DEFAULT_SCOPE_TTL,
        }
    }
}

/// Entry point for session layers: scope checks, delegation checks,
/// administrator workflows, and statement enforcement behind one handle.
///
/// All components share the same directory store and the same
/// [`SystemRoles`] configuration, so the blanket-authority bypass and the
/// protected-role set agree everywhere.
pub struct AuthzCore {
    hierarchy: HierarchyIndex,
    resolver: Arc<AdminScopeResolver>,
    authorizer: Arc<ScopeAuthorizer>,
    delegation: Arc<RoleDelegation>,
    role_admin: RoleAdministration,
    org_admin: OrgAdministration,
    enforcer: Enforcer,
    system: Arc<SystemRoles>,
}

impl AuthzCore {
    /// Create a core with default configuration
    pub fn new(store: Arc<dyn DirectoryStore>) -> Self {
        Self::with_config(store, CoreConfig::default())
    }

    /// Create a core with explicit configuration
    pub fn with_config(store: Arc<dyn DirectoryStore>, config: CoreConfig) -> Self {
        let system = Arc::new(config.system_roles);
        let resolver = Arc::new(AdminScopeResolver::with_ttl(
            store.clone(),
            config.scope_cache_ttl,
        ));
        let authorizer = Arc::new(ScopeAuthorizer::new(
            store.clone(),
            resolver.clone(),
            system.clone(),
        ));
        let delegation = Arc::new(RoleDelegation::new(store.clone(), system.clone()));
        let role_admin =
            RoleAdministration::new(store.clone(), authorizer.clone(), delegation.clone());
        let org_admin = OrgAdministration::new(store.clone(), authorizer.clone(), system.clone());
        let enforcer = Enforcer::new(store.clone());

        info!(
            scope_cache_ttl_secs = config.scope_cache_ttl.as_secs(),
            "authorization core initialized"
        );

        Self {
            hierarchy: HierarchyIndex::new(store),
            resolver,
            authorizer,
            delegation,
            role_admin,
            org_admin,
            enforcer,
            system,
        }
    }

    // Scope surface

    /// Organizations the user administers, with materialized paths
    pub async fn admin_organizations(&self, user_id: &str) -> Vec<ScopedOrg> {
        self.resolver.admin_organizations(user_id).await
    }

    /// Whether the session may manage one organization
    pub async fn can_manage_organization(&self, session: &Session, org_id: &str) -> bool {
        self.authorizer.can_manage_organization(session, org_id).await
    }

    /// Whether the session may manage every named organization
    pub async fn can_manage_all_organizations(&self, session: &Session, org_ids: &[String]) -> bool {
        self.authorizer.can_manage_all_organizations(session, org_ids).await
    }

    /// Guard variant of [`can_manage_organization`]
    ///
    /// [`can_manage_organization`]: AuthzCore::can_manage_organization
    pub async fn check_organization_permission(&self, session: &Session, org_id: &str) -> Result<()> {
        self.authorizer.check_organization_permission(session, org_id).await
    }

    /// Guard variant of [`can_manage_all_organizations`]
    ///
    /// [`can_manage_all_organizations`]: AuthzCore::can_manage_all_organizations
    pub async fn check_all_organizations_permission(
        &self,
        session: &Session,
        org_ids: &[String],
    ) -> Result<()> {
        self.authorizer.check_all_organizations_permission(session, org_ids).await
    }

    /// Guard: the session must manage at least one organization the target
    /// user belongs to
    pub async fn check_user_permission(&self, session: &Session, target_user_id: &str) -> Result<()> {
        self.authorizer.check_user_permission(session, target_user_id).await
    }

    // Delegation surface

    /// Guard: the session must be able to assign every requested role
    pub async fn check_all_role_permission(
        &self,
        session: &Session,
        role_ids: &[RoleId],
    ) -> Result<()> {
        self.delegation.check_all_role_permission(session, role_ids).await
    }

    /// Assign roles to a user
    pub async fn grant_roles(
        &self,
        session: &Session,
        target_user_id: &str,
        role_ids: &[RoleId],
    ) -> Result<()> {
        self.role_admin.grant_roles(session, target_user_id, role_ids).await
    }

    /// Remove roles from a user
    pub async fn revoke_roles(
        &self,
        session: &Session,
        target_user_id: &str,
        role_ids: &[RoleId],
    ) -> Result<()> {
        self.role_admin.revoke_roles(session, target_user_id, role_ids).await
    }

    /// Delete a custom role and all its references
    pub async fn delete_role(&self, role_id: &str) -> Result<()> {
        self.role_admin.delete_role(role_id).await
    }

    /// Make a user administrator of an organization
    pub async fn grant_administrator(
        &self,
        session: &Session,
        org_id: &str,
        user_id: &str,
    ) -> Result<()> {
        self.org_admin.grant_administrator(session, org_id, user_id).await
    }

    /// Remove a user as administrator of an organization
    pub async fn revoke_administrator(
        &self,
        session: &Session,
        org_id: &str,
        user_id: &str,
    ) -> Result<()> {
        self.org_admin.revoke_administrator(session, org_id, user_id).await
    }

    // Enforcement surface

    /// Decide one enforcement request
    pub async fn enforce(&self, request: &EnforceRequest) -> Result<bool> {
        self.enforcer.enforce(request).await
    }

    /// Decide a batch of enforcement requests, answers in request order
    pub async fn enforce_batch(&self, requests: &[EnforceRequest]) -> Result<Vec<bool>> {
        self.enforcer.enforce_batch(requests).await
    }

    // Component access

    /// Hierarchy queries (paths, containment)
    pub fn hierarchy(&self) -> &HierarchyIndex {
        &self.hierarchy
    }

    /// The shared scope resolver, for cache statistics and invalidation
    pub fn scope_resolver(&self) -> &AdminScopeResolver {
        &self.resolver
    }

    /// The scope authorizer
    pub fn authorizer(&self) -> &ScopeAuthorizer {
        &self.authorizer
    }

    /// The delegation checker
    pub fn delegation(&self) -> &RoleDelegation {
        &self.delegation
    }

    /// The platform role names in effect
    pub fn system_roles(&self) -> &SystemRoles {
        &self.system
    }
}
