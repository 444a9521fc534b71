use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::MarkupError;

/// A source markup dialect.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    /// Restricted Markdown with embedded BBCode quotes and `upload://` refs.
    Markdown,
    /// BBCode-like markup (phpBB, MyBB, SMF, vBulletin families).
    BbCode,
    /// Raw HTML.
    Html,
    /// Text already in the canonical markup.
    Canonical,
}

impl Dialect {
    pub const ALL: [Dialect; 4] = [
        Dialect::Markdown,
        Dialect::BbCode,
        Dialect::Html,
        Dialect::Canonical,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Markdown => "markdown",
            Self::BbCode => "bbcode",
            Self::Html => "html",
            Self::Canonical => "canonical",
        }
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Dialect {
    type Err = MarkupError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.to_ascii_lowercase();
        Self::ALL
            .iter()
            .copied()
            .find(|d| d.as_str() == lower)
            .ok_or_else(|| MarkupError::UnknownDialect(s.to_string()))
    }
}
