//! Administrator scope: which organization subtrees a caller may manage
//!
//! Scope resolution turns administrator edges into materialized paths and
//! caches the result per user; the authorizer reduces every management
//! question to containment checks over that scope.

mod authorizer;
mod resolver;

pub use authorizer::{all_covered, any_covered, covers, ScopeAuthorizer};
pub use resolver::{AdminScopeResolver, CacheStats, DEFAULT_SCOPE_TTL};
