//! Directory store contract and in-memory implementation

use crate::error::{AuthzError, Result};
use crate::hierarchy::{OrgPath, SEP};
use crate::statement::Statement;
use crate::types::{normalize_role_name, OrgId, OrgProjection, Organization, Role, RoleId, UserId};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::RwLock;

/// Narrow persistence surface the authorization core depends on.
///
/// Every read is point-in-time: callers see whatever rows are committed when
/// the call runs. Mutations are idempotent, and [`delete_role_cascade`]
/// removes the role together with its assignments and delegation edges in a
/// single transaction.
///
/// [`delete_role_cascade`]: DirectoryStore::delete_role_cascade
#[async_trait]
pub trait DirectoryStore: Send + Sync {
    /// Hierarchy projection row for a live organization
    async fn projection(&self, org_id: &str) -> Result<Option<OrgProjection>>;

    /// Organizations the user holds an administrator edge on
    async fn admin_organizations(&self, user_id: &str) -> Result<Vec<OrgId>>;

    /// Organizations the user is a member of
    async fn member_organizations(&self, user_id: &str) -> Result<Vec<OrgId>>;

    /// Role rows granted to the user
    async fn roles_for_user(&self, user_id: &str) -> Result<Vec<Role>>;

    /// Role row by id
    async fn role(&self, role_id: &str) -> Result<Option<Role>>;

    /// Role rows whose normalized name matches one of the given names
    async fn roles_by_names(&self, names: &[String]) -> Result<Vec<Role>>;

    /// Union of role ids reachable by exactly one delegation edge from any
    /// of the given roles
    async fn assignable_role_ids(&self, grantor_roles: &[RoleId]) -> Result<HashSet<RoleId>>;

    /// Record an administrator edge
    async fn insert_admin_edge(&self, org_id: &str, user_id: &str) -> Result<()>;

    /// Remove an administrator edge
    async fn remove_admin_edge(&self, org_id: &str, user_id: &str) -> Result<()>;

    /// Grant a role to a user
    async fn grant_role(&self, user_id: &str, role_id: &str) -> Result<()>;

    /// Revoke a role from a user
    async fn revoke_role(&self, user_id: &str, role_id: &str) -> Result<()>;

    /// Delete a role with its assignments and delegation edges, atomically
    async fn delete_role_cascade(&self, role_id: &str) -> Result<()>;
}

/// A user's membership or administrator edge on an organization
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserOrgEdge {
    /// User id
    pub user_id: UserId,
    /// Organization id
    pub org_id: OrgId,
}

/// A role granted to a user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleGrant {
    /// User id
    pub user_id: UserId,
    /// Role id
    pub role_id: RoleId,
}

/// One delegation edge: holders of the grantor role may hand out the
/// grantable role
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Delegation {
    /// Role whose holders gain grant authority
    pub grantor_role_id: RoleId,
    /// Role that becomes grantable
    pub grantable_role_id: RoleId,
}

/// Role seed used when loading fixtures
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleSeed {
    /// Role id
    pub id: RoleId,
    /// Display name; the normalized form is derived on load
    pub name: String,
    /// Policy statements attached to the role
    #[serde(default)]
    pub statements: Vec<Statement>,
}

/// Declarative directory contents, loadable from JSON
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DirectoryFixture {
    /// Organization rows, parents before children not required
    #[serde(default)]
    pub organizations: Vec<Organization>,
    /// Role definitions
    #[serde(default)]
    pub roles: Vec<RoleSeed>,
    /// User-organization memberships
    #[serde(default)]
    pub memberships: Vec<UserOrgEdge>,
    /// Administrator edges
    #[serde(default)]
    pub administrators: Vec<UserOrgEdge>,
    /// Role assignments
    #[serde(default)]
    pub role_grants: Vec<RoleGrant>,
    /// Delegation edges
    #[serde(default)]
    pub delegations: Vec<Delegation>,
}

#[derive(Default)]
struct DirectoryState {
    organizations: HashMap<OrgId, Organization>,
    projection: HashMap<OrgId, OrgProjection>,
    admin_edges: BTreeSet<(UserId, OrgId)>,
    memberships: BTreeSet<(UserId, OrgId)>,
    roles: HashMap<RoleId, Role>,
    user_roles: BTreeSet<(UserId, RoleId)>,
    delegations: BTreeSet<(RoleId, RoleId)>,
}

/// In-memory directory backed by a single lock, with the hierarchy
/// projection rebuilt on every organization change
pub struct InMemoryDirectory {
    state: Arc<RwLock<DirectoryState>>,
}

impl InMemoryDirectory {
    /// Create an empty directory
    pub fn new() -> Self {
        Self {
            state: Arc::new(RwLock::new(DirectoryState::default())),
        }
    }

    /// Build a directory from fixture contents
    pub async fn from_fixture(fixture: DirectoryFixture) -> Result<Self> {
        let dir = Self::new();
        for org in fixture.organizations {
            dir.upsert_organization(org).await?;
        }
        for seed in fixture.roles {
            let mut role = Role::new(seed.id, seed.name);
            role.statements = seed.statements;
            dir.upsert_role(role).await?;
        }
        for edge in fixture.memberships {
            dir.add_membership(&edge.user_id, &edge.org_id).await?;
        }
        for edge in fixture.administrators {
            dir.insert_admin_edge(&edge.org_id, &edge.user_id).await?;
        }
        for grant in fixture.role_grants {
            dir.grant_role(&grant.user_id, &grant.role_id).await?;
        }
        for edge in fixture.delegations {
            dir.add_delegation(&edge.grantor_role_id, &edge.grantable_role_id)
                .await?;
        }
        Ok(dir)
    }

    /// Insert or replace an organization row and rebuild the projection
    pub async fn upsert_organization(&self, org: Organization) -> Result<()> {
        if org.id.is_empty() {
            return Err(AuthzError::Validation("organization id is empty".to_string()));
        }
        if org.id.contains(SEP) {
            return Err(AuthzError::Validation(format!(
                "organization id '{}' contains the path separator",
                org.id
            )));
        }
        let mut state = self.state.write().await;
        state.organizations.insert(org.id.clone(), org);
        Self::rebuild_projection(&mut state);
        Ok(())
    }

    /// Soft-delete an organization; its whole subtree leaves the projection
    pub async fn soft_delete_organization(&self, org_id: &str) -> Result<()> {
        let mut state = self.state.write().await;
        match state.organizations.get_mut(org_id) {
            Some(org) => org.is_deleted = true,
            None => return Err(AuthzError::NotFound(format!("organization {}", org_id))),
        }
        Self::rebuild_projection(&mut state);
        Ok(())
    }

    /// Insert or replace a role row, enforcing normalized-name uniqueness
    pub async fn upsert_role(&self, role: Role) -> Result<()> {
        let mut state = self.state.write().await;
        let taken = state
            .roles
            .values()
            .any(|r| r.normalized_name == role.normalized_name && r.id != role.id);
        if taken {
            return Err(AuthzError::Validation(format!(
                "role name '{}' is already taken",
                role.name
            )));
        }
        state.roles.insert(role.id.clone(), role);
        Ok(())
    }

    /// Record a user's membership in an organization
    pub async fn add_membership(&self, user_id: &str, org_id: &str) -> Result<()> {
        let mut state = self.state.write().await;
        if !state.organizations.contains_key(org_id) {
            return Err(AuthzError::NotFound(format!("organization {}", org_id)));
        }
        state
            .memberships
            .insert((user_id.to_string(), org_id.to_string()));
        Ok(())
    }

    /// Record a delegation edge between two existing roles
    pub async fn add_delegation(&self, grantor_role_id: &str, grantable_role_id: &str) -> Result<()> {
        let mut state = self.state.write().await;
        for id in [grantor_role_id, grantable_role_id] {
            if !state.roles.contains_key(id) {
                return Err(AuthzError::NotFound(format!("role {}", id)));
            }
        }
        state
            .delegations
            .insert((grantor_role_id.to_string(), grantable_role_id.to_string()));
        Ok(())
    }

    /// Recompute every materialized path from the organization table.
    ///
    /// Soft-deleted organizations, subtrees under them, and rows whose
    /// parent chain loops are all dropped from the projection rather than
    /// given a partial path.
    fn rebuild_projection(state: &mut DirectoryState) {
        let orgs = &state.organizations;
        let total = orgs.len();
        let mut projection: HashMap<OrgId, OrgProjection> = HashMap::new();

        for org in orgs.values() {
            if org.is_deleted {
                continue;
            }
            let mut chain: Vec<&str> = vec![org.id.as_str()];
            let mut cursor = org.parent_id.as_deref();
            let mut live = true;
            while let Some(parent_id) = cursor {
                if chain.len() > total {
                    live = false; // parent chain loops
                    break;
                }
                match orgs.get(parent_id) {
                    Some(parent) if !parent.is_deleted => {
                        chain.push(parent.id.as_str());
                        cursor = parent.parent_id.as_deref();
                    }
                    _ => {
                        live = false; // orphaned under a missing or deleted parent
                        break;
                    }
                }
            }
            if !live {
                continue;
            }
            chain.reverse();
            let mut path = OrgPath::root(chain[0]);
            for segment in &chain[1..] {
                path = path.child(segment);
            }
            projection.insert(
                org.id.clone(),
                OrgProjection {
                    org_id: org.id.clone(),
                    parent_id: org.parent_id.clone(),
                    level: path.level(),
                    path,
                    has_child: false,
                },
            );
        }

        let parents: HashSet<OrgId> = projection
            .values()
            .filter_map(|row| row.parent_id.clone())
            .collect();
        for row in projection.values_mut() {
            row.has_child = parents.contains(&row.org_id);
        }
        state.projection = projection;
    }
}

impl Default for InMemoryDirectory {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DirectoryStore for InMemoryDirectory {
    async fn projection(&self, org_id: &str) -> Result<Option<OrgProjection>> {
        let state = self.state.read().await;
        Ok(state.projection.get(org_id).cloned())
    }

    async fn admin_organizations(&self, user_id: &str) -> Result<Vec<OrgId>> {
        let state = self.state.read().await;
        Ok(state
            .admin_edges
            .iter()
            .filter(|(user, _)| user == user_id)
            .map(|(_, org)| org.clone())
            .collect())
    }

    async fn member_organizations(&self, user_id: &str) -> Result<Vec<OrgId>> {
        let state = self.state.read().await;
        Ok(state
            .memberships
            .iter()
            .filter(|(user, _)| user == user_id)
            .map(|(_, org)| org.clone())
            .collect())
    }

    async fn roles_for_user(&self, user_id: &str) -> Result<Vec<Role>> {
        let state = self.state.read().await;
        Ok(state
            .user_roles
            .iter()
            .filter(|(user, _)| user == user_id)
            .filter_map(|(_, role_id)| state.roles.get(role_id).cloned())
            .collect())
    }

    async fn role(&self, role_id: &str) -> Result<Option<Role>> {
        let state = self.state.read().await;
        Ok(state.roles.get(role_id).cloned())
    }

    async fn roles_by_names(&self, names: &[String]) -> Result<Vec<Role>> {
        let wanted: HashSet<String> = names.iter().map(|n| normalize_role_name(n)).collect();
        let state = self.state.read().await;
        Ok(state
            .roles
            .values()
            .filter(|r| wanted.contains(&r.normalized_name))
            .cloned()
            .collect())
    }

    async fn assignable_role_ids(&self, grantor_roles: &[RoleId]) -> Result<HashSet<RoleId>> {
        let grantors: HashSet<&str> = grantor_roles.iter().map(String::as_str).collect();
        let state = self.state.read().await;
        Ok(state
            .delegations
            .iter()
            .filter(|(grantor, _)| grantors.contains(grantor.as_str()))
            .map(|(_, grantable)| grantable.clone())
            .collect())
    }

    async fn insert_admin_edge(&self, org_id: &str, user_id: &str) -> Result<()> {
        let mut state = self.state.write().await;
        if !state.projection.contains_key(org_id) {
            return Err(AuthzError::NotFound(format!("organization {}", org_id)));
        }
        state
            .admin_edges
            .insert((user_id.to_string(), org_id.to_string()));
        Ok(())
    }

    async fn remove_admin_edge(&self, org_id: &str, user_id: &str) -> Result<()> {
        let mut state = self.state.write().await;
        state
            .admin_edges
            .remove(&(user_id.to_string(), org_id.to_string()));
        Ok(())
    }

    async fn grant_role(&self, user_id: &str, role_id: &str) -> Result<()> {
        let mut state = self.state.write().await;
        if !state.roles.contains_key(role_id) {
            return Err(AuthzError::NotFound(format!("role {}", role_id)));
        }
        state
            .user_roles
            .insert((user_id.to_string(), role_id.to_string()));
        Ok(())
    }

    async fn revoke_role(&self, user_id: &str, role_id: &str) -> Result<()> {
        let mut state = self.state.write().await;
        state
            .user_roles
            .remove(&(user_id.to_string(), role_id.to_string()));
        Ok(())
    }

    async fn delete_role_cascade(&self, role_id: &str) -> Result<()> {
        // One write lock covers the role, its assignments, and its
        // delegation edges, so the cascade is all-or-nothing.
        let mut state = self.state.write().await;
        state.roles.remove(role_id);
        state.user_roles.retain(|(_, role)| role != role_id);
        state
            .delegations
            .retain(|(grantor, grantable)| grantor != role_id && grantable != role_id);
        Ok(())
    }
}
