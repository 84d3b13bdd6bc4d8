//! Principal identifiers.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The identity on whose behalf a request is made.
///
/// Opaque to the safety layer: often an email address, and in single-user
/// deployments usually the fixed value [`PrincipalId::DEFAULT`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PrincipalId(String);

impl PrincipalId {
    /// Principal used when the caller does not distinguish users.
    pub const DEFAULT: &'static str = "default";

    /// Create a principal id from any string.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The single-user principal.
    #[must_use]
    pub fn default_principal() -> Self {
        Self(Self::DEFAULT.to_owned())
    }

    /// Borrow the id as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether the id is empty or whitespace only.
    #[must_use]
    pub fn is_blank(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl Default for PrincipalId {
    fn default() -> Self {
        Self::default_principal()
    }
}

impl fmt::Display for PrincipalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PrincipalId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for PrincipalId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl AsRef<str> for PrincipalId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_principal() {
        assert_eq!(PrincipalId::default().as_str(), "default");
    }

    #[test]
    fn test_blank_detection() {
        assert!(PrincipalId::new("  ").is_blank());
        assert!(PrincipalId::new("").is_blank());
        assert!(!PrincipalId::new("u1").is_blank());
    }

    #[test]
    fn test_serializes_as_plain_string() {
        let json = serde_json::to_string(&PrincipalId::new("alice@example.com")).unwrap();
        assert_eq!(json, "\"alice@example.com\"");
    }
}
