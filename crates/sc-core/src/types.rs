//! Core domain types

use serde::{Deserialize, Serialize};
use std::fmt;

/// Server-assigned identifier of a backend (collector) definition.
///
/// Stable across catalog fetches.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BackendId(pub String);

impl BackendId {
    /// Create a new backend ID
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the raw ID string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BackendId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for BackendId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for BackendId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Last-seen version of a polled resource (an ETag or checksum).
///
/// Compared by equality only. The initial token is empty and never matches
/// a server version, so the first fetch always goes through.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChangeToken(String);

impl ChangeToken {
    /// The token held before anything was fetched
    pub fn initial() -> Self {
        Self(String::new())
    }

    /// Create a token from a server-provided version marker
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// Whether nothing has been fetched yet
    pub fn is_initial(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ChangeToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_initial() {
            write!(f, "<initial>")
        } else {
            write!(f, "{}", self.0)
        }
    }
}
