//! Composite child names
//!
//! ARM list operations return child names qualified by their parents, e.g. a
//! backup vault comes back as `"account/vault"` and a backup as
//! `"account/vault/backup"`. Only the last segment addresses the child in
//! follow-up calls.

use std::fmt;

/// Name of a child resource as returned by a list API.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ChildName(String);

impl ChildName {
    pub fn new(listed: impl Into<String>) -> Self {
        Self(listed.into())
    }

    /// The child's own name: the suffix after the last `/`.
    pub fn leaf(&self) -> &str {
        // rsplit always yields at least one item
        self.0.rsplit('/').next().unwrap_or(&self.0)
    }

    /// The name exactly as listed.
    pub fn listed(&self) -> &str {
        &self.0
    }
}

impl From<String> for ChildName {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for ChildName {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl fmt::Display for ChildName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.leaf())
    }
}
