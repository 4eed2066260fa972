//! Materialized organization paths

use crate::error::{AuthzError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Separator between path segments
pub const SEP: char = '/';

/// Materialized path of an organization: the ids of every ancestor from the
/// root down to the organization itself, joined by [`SEP`].
///
/// Paths are ordering artifacts, not display strings: all containment checks
/// in the crate go through [`OrgPath::is_ancestor_or_self`], which respects
/// segment boundaries.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrgPath(String);

impl OrgPath {
    /// Path of a root organization (no parent)
    pub fn root(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Path of a direct child of this organization
    pub fn child(&self, id: &str) -> Self {
        let mut raw = String::with_capacity(self.0.len() + 1 + id.len());
        raw.push_str(&self.0);
        raw.push(SEP);
        raw.push_str(id);
        Self(raw)
    }

    /// Parse a serialized path, rejecting empty input and empty segments
    pub fn parse(raw: &str) -> Result<Self> {
        if raw.is_empty() {
            return Err(AuthzError::Validation("organization path is empty".to_string()));
        }
        if raw.split(SEP).any(str::is_empty) {
            return Err(AuthzError::Validation(format!(
                "organization path '{}' contains an empty segment",
                raw
            )));
        }
        Ok(Self(raw.to_string()))
    }

    /// Raw path string
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Path segments from root to leaf
    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.0.split(SEP)
    }

    /// Id of the organization this path materializes (the last segment)
    pub fn leaf(&self) -> &str {
        self.0.rsplit(SEP).next().unwrap_or(&self.0)
    }

    /// Number of ancestors above this organization (roots are level 0)
    pub fn level(&self) -> u32 {
        self.0.matches(SEP).count() as u32
    }

    /// Path of the parent organization, if any
    pub fn parent(&self) -> Option<OrgPath> {
        self.0.rfind(SEP).map(|idx| Self(self.0[..idx].to_string()))
    }

    /// True when `descendant` sits at or below this path in the hierarchy.
    ///
    /// Containment holds only on whole segments: the path must either be equal
    /// or continue with a separator. A raw prefix test would make `1/12` claim
    /// `1/123` as a descendant.
    pub fn is_ancestor_or_self(&self, descendant: &OrgPath) -> bool {
        let anc = self.0.as_str();
        let desc = descendant.0.as_str();
        if anc == desc {
            return true;
        }
        desc.len() > anc.len()
            && desc.as_bytes()[anc.len()] == SEP as u8
            && desc.starts_with(anc)
    }
}

impl fmt::Display for OrgPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for OrgPath {
    type Err = AuthzError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}
