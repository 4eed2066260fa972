//! Scope-based management authority checks

use std::sync::Arc;

use tracing::{debug, warn};

use crate::error::{AuthzError, Result};
use crate::hierarchy::{HierarchyIndex, OrgPath};
use crate::scope::AdminScopeResolver;
use crate::store::DirectoryStore;
use crate::types::{ScopedOrg, Session, SystemRoles};

/// Whether any organization in `scope` sits at or above `target`
pub fn covers(scope: &[ScopedOrg], target: &OrgPath) -> bool {
    scope.iter().any(|owned| owned.path.is_ancestor_or_self(target))
}

/// Whether every target is covered by `scope`.
///
/// Empty target lists pass: granting nothing requires no authority.
pub fn all_covered(scope: &[ScopedOrg], targets: &[OrgPath]) -> bool {
    targets.iter().all(|t| covers(scope, t))
}

/// Whether at least one target is covered by `scope`.
///
/// Empty target lists fail: there is no standing to act on.
pub fn any_covered(scope: &[ScopedOrg], targets: &[OrgPath]) -> bool {
    targets.iter().any(|t| covers(scope, t))
}

/// Decides whether a session may manage given organizations or users.
///
/// Authority is subtree containment: a caller manages an organization when
/// one of their administrator organizations is that organization or an
/// ancestor of it. Superadmin and user-admin sessions bypass every check.
///
/// The two combinators are deliberately asymmetric. Operations that grant
/// new scope demand authority over all named targets, so an empty target
/// list passes vacuously. Operations that act on a user's existing standing
/// demand authority over at least one of their organizations, so a user
/// with no memberships cannot be touched by subtree administrators at all.
pub struct ScopeAuthorizer {
    resolver: Arc<AdminScopeResolver>,
    index: HierarchyIndex,
    store: Arc<dyn DirectoryStore>,
    system: Arc<SystemRoles>,
}

impl ScopeAuthorizer {
    /// Create an authorizer over a store and a shared scope resolver
    pub fn new(
        store: Arc<dyn DirectoryStore>,
        resolver: Arc<AdminScopeResolver>,
        system: Arc<SystemRoles>,
    ) -> Self {
        Self {
            resolver,
            index: HierarchyIndex::new(store.clone()),
            store,
            system,
        }
    }

    /// Whether the session may manage one organization
    pub async fn can_manage_organization(&self, session: &Session, org_id: &str) -> bool {
        if self.system.grants_blanket_authority(session) {
            return true;
        }
        let target = match self.index.path_of(org_id).await {
            Ok(path) => path,
            Err(AuthzError::NotFound(_)) => {
                debug!(org_id = %org_id, "management check against unknown organization");
                return false;
            }
            Err(e) => {
                warn!(org_id = %org_id, error = %e, "target resolution failed, denying");
                return false;
            }
        };
        let scope = self.resolver.admin_organizations(&session.user_id).await;
        covers(&scope, &target)
    }

    /// Whether the session may manage every named organization.
    ///
    /// An empty list passes; an unresolvable target fails the whole check.
    pub async fn can_manage_all_organizations(&self, session: &Session, org_ids: &[String]) -> bool {
        if self.system.grants_blanket_authority(session) {
            return true;
        }
        let mut targets = Vec::with_capacity(org_ids.len());
        for org_id in org_ids {
            match self.index.path_of(org_id).await {
                Ok(path) => targets.push(path),
                Err(AuthzError::NotFound(_)) => {
                    debug!(org_id = %org_id, "unknown organization fails all-targets check");
                    return false;
                }
                Err(e) => {
                    warn!(org_id = %org_id, error = %e, "target resolution failed, denying");
                    return false;
                }
            }
        }
        let scope = self.resolver.admin_organizations(&session.user_id).await;
        all_covered(&scope, &targets)
    }

    /// Whether the session may manage at least one named organization.
    ///
    /// Unresolvable targets are skipped; an empty list fails.
    pub async fn can_manage_any_organization(&self, session: &Session, org_ids: &[String]) -> bool {
        if self.system.grants_blanket_authority(session) {
            return true;
        }
        let mut targets = Vec::with_capacity(org_ids.len());
        for org_id in org_ids {
            match self.index.path_of(org_id).await {
                Ok(path) => targets.push(path),
                Err(AuthzError::NotFound(_)) => {
                    debug!(org_id = %org_id, "skipping unknown organization in any-target check");
                }
                Err(e) => {
                    warn!(org_id = %org_id, error = %e, "target resolution failed, skipping");
                }
            }
        }
        let scope = self.resolver.admin_organizations(&session.user_id).await;
        any_covered(&scope, &targets)
    }

    /// Whether the session may manage a user, by way of any organization
    /// the target user belongs to
    pub async fn can_manage_user(&self, session: &Session, target_user_id: &str) -> bool {
        if self.system.grants_blanket_authority(session) {
            return true;
        }
        let memberships = match self.store.member_organizations(target_user_id).await {
            Ok(orgs) => orgs,
            Err(e) => {
                warn!(target_user_id = %target_user_id, error = %e, "membership lookup failed, denying");
                return false;
            }
        };
        self.can_manage_any_organization(session, &memberships).await
    }

    /// [`can_manage_organization`] as a guard raising `Forbidden`
    ///
    /// [`can_manage_organization`]: ScopeAuthorizer::can_manage_organization
    pub async fn check_organization_permission(&self, session: &Session, org_id: &str) -> Result<()> {
        if self.can_manage_organization(session, org_id).await {
            Ok(())
        } else {
            Err(AuthzError::Forbidden(format!(
                "user {} cannot manage organization {}",
                session.user_id, org_id
            )))
        }
    }

    /// [`can_manage_all_organizations`] as a guard raising `Forbidden`
    ///
    /// [`can_manage_all_organizations`]: ScopeAuthorizer::can_manage_all_organizations
    pub async fn check_all_organizations_permission(
        &self,
        session: &Session,
        org_ids: &[String],
    ) -> Result<()> {
        if self.can_manage_all_organizations(session, org_ids).await {
            Ok(())
        } else {
            Err(AuthzError::Forbidden(format!(
                "user {} cannot manage all of the requested organizations",
                session.user_id
            )))
        }
    }

    /// [`can_manage_any_organization`] as a guard raising `Forbidden`
    ///
    /// [`can_manage_any_organization`]: ScopeAuthorizer::can_manage_any_organization
    pub async fn check_any_organization_permission(
        &self,
        session: &Session,
        org_ids: &[String],
    ) -> Result<()> {
        if self.can_manage_any_organization(session, org_ids).await {
            Ok(())
        } else {
            Err(AuthzError::Forbidden(format!(
                "user {} cannot manage any of the requested organizations",
                session.user_id
            )))
        }
    }

    /// [`can_manage_user`] as a guard raising `Forbidden`
    ///
    /// [`can_manage_user`]: ScopeAuthorizer::can_manage_user
    pub async fn check_user_permission(&self, session: &Session, target_user_id: &str) -> Result<()> {
        if self.can_manage_user(session, target_user_id).await {
            Ok(())
        } else {
            Err(AuthzError::Forbidden(format!(
                "user {} cannot manage user {}",
                session.user_id, target_user_id
            )))
        }
    }
}
