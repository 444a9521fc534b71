use std::fmt;

use serde::{Deserialize, Serialize};

/// Platform-native identifier of a record in the legacy source.
///
/// Sources use integer keys or string keys (sorted-set members, slugs).
/// `Int(0)` and the empty string denote a record without per-row identity.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SourceId {
    Int(i64),
    Text(String),
}

impl SourceId {
    /// Returns `true` for the "no natural identity" markers (`0`, `""`).
    pub fn is_relation(&self) -> bool {
        match self {
            Self::Int(n) => *n == 0,
            Self::Text(s) => s.is_empty(),
        }
    }

    /// Text holding a canonical decimal integer becomes `Int`, so `"17"` and
    /// `17` name the same record. `"007"` and `"+7"` stay text.
    pub fn normalize(self) -> Self {
        match self {
            Self::Text(s) => match s.parse::<i64>() {
                Ok(n) if n.to_string() == s => Self::Int(n),
                _ => Self::Text(s),
            },
            int => int,
        }
    }

    /// The integer value, if this is an integer id.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(n) => Some(*n),
            Self::Text(s) => s.parse().ok(),
        }
    }
}

impl fmt::Display for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(n) => write!(f, "{n}"),
            Self::Text(s) => f.write_str(s),
        }
    }
}

impl From<i64> for SourceId {
    fn from(n: i64) -> Self {
        Self::Int(n)
    }
}

impl From<i32> for SourceId {
    fn from(n: i32) -> Self {
        Self::Int(i64::from(n))
    }
}

impl From<&str> for SourceId {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for SourceId {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

/// Identifier assigned by the destination system on import.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DestinationId(u64);

impl DestinationId {
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn get(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for DestinationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for DestinationId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}
