//! # Orgward Authorization Core
//!
//! Organization-scoped authorization for administration backends.
//!
//! ## Features
//!
//! - **Materialized hierarchy paths** with segment-safe containment checks
//! - **Administrator scope resolution** cached per user under a sliding TTL
//! - **Fail-closed design**: resolution failures deny instead of erroring
//! - **Role delegation graph** of direct, non-transitive grant edges
//! - **Protected platform roles** barred from the generic role surface
//! - **Deny-overrides statement enforcement** with wildcard patterns
//!
//! ## Example
//!
//! ```rust
//! use orgward_authz::{AuthzCore, EnforceRequest};
//! use orgward_authz::statement::{Effect, Statement};
//! use orgward_authz::store::{DirectoryStore, InMemoryDirectory};
//! use orgward_authz::types::{Organization, Role, Session};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let dir = Arc::new(InMemoryDirectory::new());
//!     dir.upsert_organization(Organization::root("1", "Acme")).await?;
//!     dir.upsert_organization(Organization::child_of("1", "2", "West")).await?;
//!     dir.upsert_role(
//!         Role::new("r-auditor", "Auditor")
//!             .with_statement(Statement::new(Effect::Allow).with_action("reports:read")),
//!     )
//!     .await?;
//!     dir.grant_role("alice", "r-auditor").await?;
//!     dir.insert_admin_edge("2", "alice").await?;
//!
//!     let core = AuthzCore::new(dir);
//!
//!     let alice = Session::new("alice");
//!     assert!(core.can_manage_organization(&alice, "2").await);
//!     assert!(!core.can_manage_organization(&alice, "1").await);
//!     assert!(core.enforce(&EnforceRequest::new("alice", "reports:read")).await?);
//!
//!     Ok(())
//! }
//! ```

pub mod core;
pub mod delegation;
pub mod error;
pub mod hierarchy;
pub mod scope;
pub mod statement;
pub mod store;
pub mod types;

// Re-export commonly used types
pub use self::core::{AuthzCore, CoreConfig};
pub use delegation::{OrgAdministration, RoleAdministration, RoleDelegation};
pub use error::{AuthzError, Result};
pub use hierarchy::{HierarchyIndex, OrgPath};
pub use scope::{AdminScopeResolver, CacheStats, ScopeAuthorizer};
pub use statement::{Effect, EnforceRequest, Enforcer, Statement};
pub use store::{DirectoryFixture, DirectoryStore, InMemoryDirectory};
pub use types::{Organization, Role, ScopedOrg, Session, SystemRoles};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
