//! Deny-overrides enforcement over role statements

use std::sync::Arc;

use futures::future::try_join_all;
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use crate::error::{AuthzError, Result};
use crate::statement::{Effect, PatternCache};
use crate::store::DirectoryStore;

/// One enforcement question: may `subject` perform `action` on `resource`?
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnforceRequest {
    /// User the question is about
    pub subject: String,

    /// Requested action (e.g. "users:read")
    pub action: String,

    /// Optional resource the action applies to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource: Option<String>,
}

impl EnforceRequest {
    /// Create a resource-free request
    pub fn new(subject: impl Into<String>, action: impl Into<String>) -> Self {
        Self {
            subject: subject.into(),
            action: action.into(),
            resource: None,
        }
    }

    /// Name the resource the action applies to
    pub fn with_resource(mut self, resource: impl Into<String>) -> Self {
        self.resource = Some(resource.into());
        self
    }
}

/// Evaluates enforcement requests against the subject's role statements.
///
/// Combination is deny-overrides: any matching Deny statement settles the
/// answer as false, any matching Allow without a Deny yields true, and a
/// subject whose statements are all silent is denied by default.
pub struct Enforcer {
    store: Arc<dyn DirectoryStore>,
    patterns: PatternCache,
}

impl Enforcer {
    /// Create an enforcer over a directory store
    pub fn new(store: Arc<dyn DirectoryStore>) -> Self {
        Self {
            store,
            patterns: PatternCache::new(),
        }
    }

    /// Decide one request
    pub async fn enforce(&self, request: &EnforceRequest) -> Result<bool> {
        if request.subject.trim().is_empty() || request.action.trim().is_empty() {
            return Err(AuthzError::Validation(
                "enforce requests need a non-blank subject and action".to_string(),
            ));
        }

        let decision_id = Uuid::new_v4();
        let roles = self.store.roles_for_user(&request.subject).await?;

        let mut allowed = false;
        for role in &roles {
            for statement in &role.statements {
                match statement.evaluate(&request.action, request.resource.as_deref(), &self.patterns)
                {
                    Some(Effect::Deny) => {
                        debug!(
                            decision_id = %decision_id,
                            subject = %request.subject,
                            action = %request.action,
                            role = %role.name,
                            "explicit deny"
                        );
                        return Ok(false);
                    }
                    Some(Effect::Allow) => allowed = true,
                    None => {}
                }
            }
        }

        debug!(
            decision_id = %decision_id,
            subject = %request.subject,
            action = %request.action,
            allowed,
            "enforcement decided"
        );
        Ok(allowed)
    }

    /// Decide a batch of requests, answers in request order
    pub async fn enforce_batch(&self, requests: &[EnforceRequest]) -> Result<Vec<bool>> {
        try_join_all(requests.iter().map(|request| self.enforce(request))).await
    }

    /// Number of wildcard patterns compiled so far
    pub fn compiled_patterns(&self) -> usize {
        self.patterns.len()
    }
}
