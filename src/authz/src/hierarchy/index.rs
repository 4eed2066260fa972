//! Path lookups over the hierarchy projection

use crate::error::{AuthzError, Result};
use crate::hierarchy::OrgPath;
use crate::store::DirectoryStore;
use crate::types::ScopedOrg;
use std::sync::Arc;

/// Read-side view of the organization hierarchy.
///
/// All answers come from the materialized projection; the index never walks
/// parent chains at query time.
#[derive(Clone)]
pub struct HierarchyIndex {
    store: Arc<dyn DirectoryStore>,
}

impl HierarchyIndex {
    /// Create an index over a directory store
    pub fn new(store: Arc<dyn DirectoryStore>) -> Self {
        Self { store }
    }

    /// Materialized path of a live organization
    pub async fn path_of(&self, org_id: &str) -> Result<OrgPath> {
        match self.store.projection(org_id).await? {
            Some(row) => Ok(row.path),
            None => Err(AuthzError::NotFound(format!("organization {}", org_id))),
        }
    }

    /// Organization id paired with its materialized path
    pub async fn scoped(&self, org_id: &str) -> Result<ScopedOrg> {
        let path = self.path_of(org_id).await?;
        Ok(ScopedOrg::new(org_id, path))
    }

    /// Whether `ancestor_id` is `descendant_id` or one of its ancestors
    pub async fn is_ancestor_or_self(&self, ancestor_id: &str, descendant_id: &str) -> Result<bool> {
        let ancestor = self.path_of(ancestor_id).await?;
        let descendant = self.path_of(descendant_id).await?;
        Ok(ancestor.is_ancestor_or_self(&descendant))
    }
}
