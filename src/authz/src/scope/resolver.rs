//! Administrator scope resolution with sliding-TTL caching

use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use tracing::{debug, warn};

use crate::error::AuthzError;
use crate::hierarchy::HierarchyIndex;
use crate::store::DirectoryStore;
use crate::types::{ScopedOrg, UserId};

/// Default scope cache TTL (60 seconds)
pub const DEFAULT_SCOPE_TTL: Duration = Duration::from_secs(60);

/// Cache entry with a sliding expiry window
#[derive(Debug, Clone)]
struct CacheEntry {
    /// Resolved administrator scope
    orgs: Vec<ScopedOrg>,
    /// Last time the entry was written or read
    touched_at: Instant,
}

impl CacheEntry {
    fn new(orgs: Vec<ScopedOrg>) -> Self {
        Self {
            orgs,
            touched_at: Instant::now(),
        }
    }

    fn is_expired(&self, ttl: Duration) -> bool {
        self.touched_at.elapsed() > ttl
    }
}

/// Statistics about scope cache performance
#[derive(Debug, Clone, Default)]
pub struct CacheStats {
    /// Number of cache hits
    pub hits: usize,
    /// Number of cache misses
    pub misses: usize,
    /// Number of expired entries encountered
    pub expirations: usize,
    /// Number of fail-closed resolutions
    pub failures: usize,
    /// Total number of entries in cache
    pub entries: usize,
}

impl CacheStats {
    /// Calculates the cache hit rate
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

/// Resolves the set of organizations a user administers, with caching.
///
/// A user's scope is the set of organizations they hold an administrator
/// edge on, each paired with its materialized path. Resolution hits the
/// directory store, so results are cached per user under a sliding TTL:
/// every read within the window refreshes it. Edge changes do not
/// invalidate the cache; staleness up to the TTL is accepted.
///
/// Resolution failures never escape: the resolver answers with an empty
/// scope (denying everything downstream) and leaves the cache untouched,
/// so the next call retries the store.
///
/// # Examples
///
/// ```
/// use orgward_authz::scope::AdminScopeResolver;
/// use orgward_authz::store::{DirectoryStore, InMemoryDirectory};
/// use orgward_authz::types::Organization;
/// use std::sync::Arc;
///
/// tokio_test::block_on(async {
///     let dir = Arc::new(InMemoryDirectory::new());
///     dir.upsert_organization(Organization::root("1", "Acme")).await.unwrap();
///     dir.insert_admin_edge("1", "alice").await.unwrap();
///
///     let resolver = AdminScopeResolver::new(dir);
///     let scope = resolver.admin_organizations("alice").await;
///     assert_eq!(scope.len(), 1);
///     assert_eq!(scope[0].path.as_str(), "1");
/// });
/// ```
pub struct AdminScopeResolver {
    /// Directory the administrator edges live in
    store: Arc<dyn DirectoryStore>,
    /// Path lookups for scoped organizations
    index: HierarchyIndex,
    /// Per-user scope cache
    cache: DashMap<UserId, CacheEntry>,
    /// Sliding window duration
    ttl: Duration,
    /// Cache statistics
    stats: DashMap<String, usize>,
}

impl AdminScopeResolver {
    /// Creates a resolver with the default TTL
    pub fn new(store: Arc<dyn DirectoryStore>) -> Self {
        Self::with_ttl(store, DEFAULT_SCOPE_TTL)
    }

    /// Creates a resolver with a custom TTL
    ///
    /// # Arguments
    ///
    /// * `ttl` - Sliding window duration for cache entries
    pub fn with_ttl(store: Arc<dyn DirectoryStore>, ttl: Duration) -> Self {
        Self {
            index: HierarchyIndex::new(store.clone()),
            store,
            cache: DashMap::new(),
            ttl,
            stats: DashMap::new(),
        }
    }

    /// Resolves the organizations `user_id` administers.
    ///
    /// Served from cache when a fresh entry exists (refreshing its window),
    /// otherwise recomputed from the store. On store failure the answer is
    /// an empty scope and nothing is cached.
    pub async fn admin_organizations(&self, user_id: &str) -> Vec<ScopedOrg> {
        if let Some(mut entry) = self.cache.get_mut(user_id) {
            if !entry.is_expired(self.ttl) {
                entry.touched_at = Instant::now();
                self.increment_stat("hits");
                return entry.orgs.clone();
            }
            drop(entry);
            self.cache.remove(user_id);
            self.increment_stat("expirations");
        }
        self.increment_stat("misses");

        match self.resolve_uncached(user_id).await {
            Ok(orgs) => {
                self.cache
                    .insert(user_id.to_string(), CacheEntry::new(orgs.clone()));
                orgs
            }
            Err(e) => {
                warn!(user_id = %user_id, error = %e, "scope resolution failed, answering with empty scope");
                self.increment_stat("failures");
                Vec::new()
            }
        }
    }

    /// Resolves a user's scope straight from the store
    async fn resolve_uncached(&self, user_id: &str) -> crate::error::Result<Vec<ScopedOrg>> {
        let edges = self.store.admin_organizations(user_id).await?;
        let mut orgs = Vec::with_capacity(edges.len());
        for org_id in edges {
            match self.index.scoped(&org_id).await {
                Ok(scoped) => orgs.push(scoped),
                Err(AuthzError::NotFound(_)) => {
                    // Edge pointing at a deleted or orphaned organization
                    debug!(user_id = %user_id, org_id = %org_id, "dropping stale administrator edge");
                }
                Err(e) => return Err(e),
            }
        }
        Ok(orgs)
    }

    /// Drops the cached scope for one user
    pub fn invalidate(&self, user_id: &str) {
        self.cache.remove(user_id);
    }

    /// Clears the cache and statistics
    pub fn clear_cache(&self) {
        self.cache.clear();
        self.stats.clear();
    }

    /// Removes entries whose window has lapsed
    pub fn cleanup_expired(&self) {
        self.cache.retain(|_, entry| !entry.is_expired(self.ttl));
    }

    /// Returns cache statistics
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.get_stat("hits"),
            misses: self.get_stat("misses"),
            expirations: self.get_stat("expirations"),
            failures: self.get_stat("failures"),
            entries: self.cache.len(),
        }
    }

    /// Returns the sliding window duration
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Returns the number of cached users
    pub fn cache_size(&self) -> usize {
        self.cache.len()
    }

    fn increment_stat(&self, key: &str) {
        self.stats
            .entry(key.to_string())
            .and_modify(|count| *count += 1)
            .or_insert(1);
    }

    fn get_stat(&self, key: &str) -> usize {
        self.stats.get(key).map(|v| *v).unwrap_or(0)
    }
}
