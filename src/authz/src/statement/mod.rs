//! Policy statements and wildcard matching

use dashmap::DashMap;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{AuthzError, Result};

pub mod enforcer;

pub use enforcer::{EnforceRequest, Enforcer};

/// Character class matched by the `*` and `?` wildcards
const WILDCARD_CLASS: &str = "[A-Za-z0-9_:/]";

/// Statement effect
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Effect {
    /// Allow the action
    Allow,
    /// Deny the action
    Deny,
}

/// A single policy statement attached to a role.
///
/// A statement speaks only when its action patterns cover the requested
/// action and its resource patterns cover the requested resource; otherwise
/// it is silent and contributes nothing to the decision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Statement {
    /// Effect contributed when the statement matches
    pub effect: Effect,

    /// Action patterns (e.g. "users:read", "users:*")
    #[serde(default)]
    pub actions: Vec<String>,

    /// Resource patterns; empty means the statement is action-only and
    /// applies solely to requests that name no resource
    #[serde(default)]
    pub resources: Vec<String>,
}

impl Statement {
    /// Create a statement with no patterns
    pub fn new(effect: Effect) -> Self {
        Self {
            effect,
            actions: Vec::new(),
            resources: Vec::new(),
        }
    }

    /// Add an action pattern
    pub fn with_action(mut self, pattern: impl Into<String>) -> Self {
        self.actions.push(pattern.into());
        self
    }

    /// Add a resource pattern
    pub fn with_resource(mut self, pattern: impl Into<String>) -> Self {
        self.resources.push(pattern.into());
        self
    }

    /// Evaluate the statement against one request.
    ///
    /// Returns the statement's effect when both gates pass, `None` when the
    /// statement is silent. Evaluation never fails; malformed patterns
    /// simply match nothing.
    pub fn evaluate(
        &self,
        action: &str,
        resource: Option<&str>,
        patterns: &PatternCache,
    ) -> Option<Effect> {
        if !self.actions.iter().any(|p| patterns.matches(p, action)) {
            return None;
        }

        let resource_covered = match resource {
            None => self.resources.is_empty(),
            Some(res) => self.resources.iter().any(|p| patterns.matches(p, res)),
        };

        resource_covered.then_some(self.effect)
    }
}

/// Parse a serialized policy statement document (a JSON array of statements)
pub fn parse_statements(doc: &str) -> Result<Vec<Statement>> {
    serde_json::from_str(doc)
        .map_err(|e| AuthzError::Validation(format!("malformed policy statement document: {}", e)))
}

/// Thread-safe cache of compiled wildcard patterns.
///
/// Patterns are compiled to anchored regexes on first use and reused for
/// every later request, so steady-state matching never recompiles.
pub struct PatternCache {
    compiled: DashMap<String, Regex>,
}

impl PatternCache {
    /// Create an empty pattern cache
    pub fn new() -> Self {
        Self {
            compiled: DashMap::new(),
        }
    }

    /// Match `value` against a wildcard `pattern`.
    ///
    /// `*` matches zero or more characters of the wildcard class, `?` matches
    /// exactly one. Patterns without wildcards are literal equality. The
    /// match is anchored: the whole value must be covered.
    pub fn matches(&self, pattern: &str, value: &str) -> bool {
        if pattern == value {
            return true;
        }
        if !pattern.contains('*') && !pattern.contains('?') {
            return false;
        }

        if let Some(regex) = self.compiled.get(pattern) {
            return regex.is_match(value);
        }

        match Regex::new(&wildcard_regex(pattern)) {
            Ok(regex) => {
                let matched = regex.is_match(value);
                self.compiled.insert(pattern.to_string(), regex);
                matched
            }
            Err(e) => {
                warn!(pattern = %pattern, error = %e, "unparseable wildcard pattern treated as non-matching");
                false
            }
        }
    }

    /// Number of compiled patterns held by the cache
    pub fn len(&self) -> usize {
        self.compiled.len()
    }

    /// Whether the cache holds no compiled patterns
    pub fn is_empty(&self) -> bool {
        self.compiled.is_empty()
    }
}

impl Default for PatternCache {
    fn default() -> Self {
        Self::new()
    }
}

/// Translate a wildcard pattern into an anchored regex
fn wildcard_regex(pattern: &str) -> String {
    let mut out = String::with_capacity(pattern.len() + 16);
    let mut literal = String::new();
    out.push('^');
    for ch in pattern.chars() {
        match ch {
            '*' | '?' => {
                if !literal.is_empty() {
                    out.push_str(&regex::escape(&literal));
                    literal.clear();
                }
                out.push_str(WILDCARD_CLASS);
                if ch == '*' {
                    out.push('*');
                }
            }
            c => literal.push(c),
        }
    }
    if !literal.is_empty() {
        out.push_str(&regex::escape(&literal));
    }
    out.push('$');
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_literal_patterns_are_exact() {
        let patterns = PatternCache::new();
        assert!(patterns.matches("users:read", "users:read"));
        assert!(!patterns.matches("users:read", "users:readall"));
        assert!(!patterns.matches("users:read", "users:rea"));
    }

    #[test]
    fn test_star_matches_zero_or_more_class_chars() {
        let patterns = PatternCache::new();
        assert!(patterns.matches("users:*", "users:"));
        assert!(patterns.matches("users:*", "users:read"));
        assert!(patterns.matches("users:*", "users:delete_all"));
        assert!(patterns.matches("*", "orgs/42/users"));
        // '-' and '.' sit outside the wildcard class
        assert!(!patterns.matches("users:*", "users:read-all"));
        assert!(!patterns.matches("*", "users.read"));
    }

    #[test]
    fn test_question_mark_matches_exactly_one() {
        let patterns = PatternCache::new();
        assert!(patterns.matches("users:re?d", "users:read"));
        assert!(!patterns.matches("users:re?d", "users:red"));
        assert!(!patterns.matches("users:re?d", "users:reead"));
        assert!(!patterns.matches("users?read", "users.read"));
    }

    #[test]
    fn test_match_is_anchored() {
        let patterns = PatternCache::new();
        assert!(!patterns.matches("users:*", "admin:users:read"));
        assert!(!patterns.matches("*:read", "users:read:extra"));
    }

    #[test]
    fn test_patterns_compile_once() {
        let patterns = PatternCache::new();
        for _ in 0..10 {
            assert!(patterns.matches("orgs/*", "orgs/42"));
        }
        assert_eq!(patterns.len(), 1);
    }

    #[test]
    fn test_statement_action_gate() {
        let patterns = PatternCache::new();
        let stmt = Statement::new(Effect::Allow).with_action("users:*");

        assert_eq!(stmt.evaluate("users:read", None, &patterns), Some(Effect::Allow));
        assert_eq!(stmt.evaluate("orgs:read", None, &patterns), None);
    }

    #[test]
    fn test_action_only_statement_ignores_resourceful_requests() {
        let patterns = PatternCache::new();
        let stmt = Statement::new(Effect::Allow).with_action("users:read");

        assert_eq!(stmt.evaluate("users:read", None, &patterns), Some(Effect::Allow));
        assert_eq!(stmt.evaluate("users:read", Some("orgs/42"), &patterns), None);
    }

    #[test]
    fn test_resourceful_statement_requires_a_resource() {
        let patterns = PatternCache::new();
        let stmt = Statement::new(Effect::Deny)
            .with_action("users:*")
            .with_resource("orgs/42/*");

        assert_eq!(stmt.evaluate("users:delete", Some("orgs/42/users"), &patterns), Some(Effect::Deny));
        assert_eq!(stmt.evaluate("users:delete", Some("orgs/7/users"), &patterns), None);
        assert_eq!(stmt.evaluate("users:delete", None, &patterns), None);
    }

    #[test]
    fn test_parse_statement_document() {
        let doc = r#"[
            {"effect": "ALLOW", "actions": ["users:*"], "resources": []},
            {"effect": "DENY", "actions": ["users:delete"], "resources": ["orgs/1"]}
        ]"#;

        let statements = parse_statements(doc).unwrap();
        assert_eq!(statements.len(), 2);
        assert_eq!(statements[0].effect, Effect::Allow);
        assert_eq!(statements[1].effect, Effect::Deny);
        assert!(statements[0].resources.is_empty());

        assert!(parse_statements("not json").is_err());
    }
}
