use serde::{Deserialize, Serialize};
use std::fmt;

/// Name of a group member.
///
/// Members are identified by their display name only: names are opaque,
/// case-sensitive keys that must be unique within a group. Renames and
/// duplicate names are the caller's concern.
///
/// # Examples
///
/// ```
/// use settlement_engine::core::member::MemberId;
///
/// let alice = MemberId::new("Alice");
/// let lower = MemberId::new("alice");
/// assert_ne!(alice, lower);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MemberId(String);

impl MemberId {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Returns the member's name.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MemberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for MemberId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for MemberId {
    fn from(s: String) -> Self {
        Self(s)
    }
}
