//! Stable external identifiers keying papers throughout the core (spec §3).

use serde::{Deserialize, Serialize};
use std::fmt;

/// A stable external identifier string (e.g. an arXiv-style id).
///
/// Uniqueness key for papers throughout the system. Cheap to clone and hash;
/// callers should pass it by reference where possible.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PaperId(String);

impl PaperId {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for PaperId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for PaperId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for PaperId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn displays_raw_string() {
        let id = PaperId::new("2401.00001");
        assert_eq!(id.to_string(), "2401.00001");
        assert_eq!(id.as_str(), "2401.00001");
    }

    #[test]
    fn equality_is_by_value() {
        assert_eq!(PaperId::new("P0"), PaperId::from("P0".to_string()));
    }
}
