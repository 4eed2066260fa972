//! Organization hierarchy: materialized paths and containment checks
//!
//! The hierarchy is a forest keyed by parent pointers. Every live
//! organization carries a materialized path (root id through its own id),
//! and every authority question reduces to one segment-safe prefix check
//! on two such paths.

mod index;
mod path;

pub use index::HierarchyIndex;
pub use path::{OrgPath, SEP};
