//! Core directory and session types

use crate::hierarchy::OrgPath;
use crate::statement::Statement;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Unique organization identifier
pub type OrgId = String;

/// Unique user identifier
pub type UserId = String;

/// Unique role identifier
pub type RoleId = String;

/// Canonical form used for role-name comparison and the protected-role set
pub fn normalize_role_name(name: &str) -> String {
    name.trim().to_uppercase()
}

/// Organization row as stored in the directory
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Organization {
    /// Organization identifier
    pub id: OrgId,

    /// Display name
    pub name: String,

    /// Short business code
    pub code: String,

    /// Parent organization, `None` for roots
    #[serde(default)]
    pub parent_id: Option<OrgId>,

    /// Soft-delete marker; deleted organizations drop out of the hierarchy
    #[serde(default)]
    pub is_deleted: bool,
}

impl Organization {
    /// Create a root organization
    pub fn root(id: impl Into<String>, name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            id: id.into(),
            code: name.to_uppercase(),
            name,
            parent_id: None,
            is_deleted: false,
        }
    }

    /// Create a child of an existing organization
    pub fn child_of(parent: &str, id: impl Into<String>, name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            id: id.into(),
            code: name.to_uppercase(),
            name,
            parent_id: Some(parent.to_string()),
            is_deleted: false,
        }
    }
}

/// Hierarchy projection row: one per live organization, rebuilt whenever
/// the organization table changes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrgProjection {
    /// Organization this row projects
    pub org_id: OrgId,

    /// Parent organization, `None` for roots
    pub parent_id: Option<OrgId>,

    /// Materialized ancestor path, root first
    pub path: OrgPath,

    /// Depth below the root (roots are 0)
    pub level: u32,

    /// Whether any live organization names this one as parent
    pub has_child: bool,
}

/// An organization an administrator holds authority over, carrying the
/// materialized path needed for containment checks
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScopedOrg {
    /// Organization identifier
    pub id: OrgId,

    /// Materialized ancestor path
    pub path: OrgPath,
}

impl ScopedOrg {
    /// Create a scoped organization
    pub fn new(id: impl Into<String>, path: OrgPath) -> Self {
        Self { id: id.into(), path }
    }
}

/// Authenticated caller identity as handed in by the session layer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    /// Caller's user id
    pub user_id: UserId,

    /// Role names carried by the session token
    #[serde(default)]
    pub roles: HashSet<String>,
}

impl Session {
    /// Create a session with no roles
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            roles: HashSet::new(),
        }
    }

    /// Add a role name to the session
    pub fn with_role(mut self, role: impl Into<String>) -> Self {
        self.roles.insert(role.into());
        self
    }
}

/// Names of the built-in roles with special treatment.
///
/// The set is closed: membership decides both the blanket-authority bypass
/// and the protected-role guard. Comparison is by normalized name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SystemRoles {
    /// Role with unrestricted authority over everything
    pub super_admin: String,

    /// Role with unrestricted authority over user administration
    pub user_admin: String,

    /// Role marking a user as administrator of some organization subtree
    pub org_admin: String,
}

impl Default for SystemRoles {
    fn default() -> Self {
        Self {
            super_admin: "superadmin".to_string(),
            user_admin: "user-admin".to_string(),
            org_admin: "org-admin".to_string(),
        }
    }
}

impl SystemRoles {
    /// Whether `name` is the superadmin role
    pub fn is_super_admin(&self, name: &str) -> bool {
        normalize_role_name(name) == normalize_role_name(&self.super_admin)
    }

    /// Whether `name` is the user-admin role
    pub fn is_user_admin(&self, name: &str) -> bool {
        normalize_role_name(name) == normalize_role_name(&self.user_admin)
    }

    /// Whether `name` is the org-admin role
    pub fn is_org_admin(&self, name: &str) -> bool {
        normalize_role_name(name) == normalize_role_name(&self.org_admin)
    }

    /// Whether `name` belongs to the protected set barred from generic
    /// role management
    pub fn is_protected(&self, name: &str) -> bool {
        self.is_super_admin(name) || self.is_user_admin(name) || self.is_org_admin(name)
    }

    /// Whether the session holds a role that bypasses scope and delegation
    /// checks entirely
    pub fn grants_blanket_authority(&self, session: &Session) -> bool {
        session
            .roles
            .iter()
            .any(|r| self.is_super_admin(r) || self.is_user_admin(r))
    }
}

/// Role row as stored in the directory
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    /// Role identifier
    pub id: RoleId,

    /// Display name
    pub name: String,

    /// Normalized name used for uniqueness and the protected-role guard
    pub normalized_name: String,

    /// Policy statements attached to the role
    #[serde(default)]
    pub statements: Vec<Statement>,

    /// Bumped on every statement mutation
    #[serde(default)]
    pub version: u32,
}

impl Role {
    /// Create a role with no statements
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            id: id.into(),
            normalized_name: normalize_role_name(&name),
            name,
            statements: Vec::new(),
            version: 0,
        }
    }

    /// Attach a policy statement
    pub fn with_statement(mut self, statement: Statement) -> Self {
        self.statements.push(statement);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_normalization() {
        let role = Role::new("r-1", "  Billing-Admin ");
        assert_eq!(role.name, "  Billing-Admin ");
        assert_eq!(role.normalized_name, "BILLING-ADMIN");
    }

    #[test]
    fn test_protected_set_is_case_insensitive() {
        let system = SystemRoles::default();
        assert!(system.is_protected("SuperAdmin"));
        assert!(system.is_protected("user-ADMIN"));
        assert!(system.is_protected(" org-admin "));
        assert!(!system.is_protected("billing-admin"));
    }

    #[test]
    fn test_blanket_authority_roles() {
        let system = SystemRoles::default();

        let root = Session::new("u-1").with_role("superadmin");
        let user_admin = Session::new("u-2").with_role("User-Admin");
        let org_admin = Session::new("u-3").with_role("org-admin");
        let nobody = Session::new("u-4");

        assert!(system.grants_blanket_authority(&root));
        assert!(system.grants_blanket_authority(&user_admin));
        assert!(!system.grants_blanket_authority(&org_admin));
        assert!(!system.grants_blanket_authority(&nobody));
    }
}
