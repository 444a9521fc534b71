use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{CredentialError, Result};
use crate::scheme::CredentialScheme;
use crate::verify;

/// Rendering of [`TaggedCredential::Unresolved`].
pub const UNRESOLVED_MARKER: &str = "invalid:";

/// A legacy password hash annotated with everything needed to verify it.
///
/// The string form is `scheme:hash:salt`, followed by `:k=v,k=v` when the
/// scheme carries parameters. Within the salt, `%`, `:`, `,` and `=` are
/// written as `%25`, `%3A`, `%2C` and `%3D`. [`TaggedCredential::Unresolved`]
/// renders as `invalid:` and forces a password reset on the destination.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TaggedCredential {
    Tagged {
        scheme: CredentialScheme,
        hash: String,
        salt: String,
        params: BTreeMap<String, String>,
    },
    Unresolved,
}

impl TaggedCredential {
    pub fn is_unresolved(&self) -> bool {
        matches!(self, Self::Unresolved)
    }

    pub fn scheme(&self) -> Option<CredentialScheme> {
        match self {
            Self::Tagged { scheme, .. } => Some(*scheme),
            Self::Unresolved => None,
        }
    }

    /// Parse the string form produced by `Display`.
    pub fn parse(s: &str) -> Result<Self> {
        if s == UNRESOLVED_MARKER {
            return Ok(Self::Unresolved);
        }

        let mut parts = s.splitn(4, ':');
        let (Some(tag), Some(hash), Some(salt)) = (parts.next(), parts.next(), parts.next()) else {
            return Err(CredentialError::Malformed(s.to_string()));
        };
        let scheme = CredentialScheme::from_str(tag)?;
        if hash.is_empty() {
            return Err(CredentialError::Malformed(s.to_string()));
        }

        let mut params = BTreeMap::new();
        if let Some(encoded) = parts.next() {
            for pair in encoded.split(',') {
                let (key, value) = pair
                    .split_once('=')
                    .ok_or_else(|| CredentialError::Malformed(s.to_string()))?;
                params.insert(key.to_string(), value.to_string());
            }
        }

        Ok(Self::Tagged {
            scheme,
            hash: hash.to_string(),
            salt: unescape_salt(salt).ok_or_else(|| CredentialError::Malformed(s.to_string()))?,
            params,
        })
    }

    /// Check a candidate password against the stored hash.
    ///
    /// Only the MD5-based schemes can be checked here; the others fail with
    /// [`CredentialError::Unverifiable`].
    pub fn verify(&self, password: &str) -> Result<bool> {
        match self {
            Self::Unresolved => Err(CredentialError::Unverifiable(UNRESOLVED_MARKER.to_string())),
            Self::Tagged {
                scheme, hash, salt, ..
            } => verify::check(*scheme, hash, salt, password),
        }
    }
}

impl fmt::Display for TaggedCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unresolved => f.write_str(UNRESOLVED_MARKER),
            Self::Tagged {
                scheme,
                hash,
                salt,
                params,
            } => {
                write!(f, "{scheme}:{hash}:")?;
                for c in salt.chars() {
                    match escape(c) {
                        Some(code) => f.write_str(code)?,
                        None => write!(f, "{c}")?,
                    }
                }
                for (i, (key, value)) in params.iter().enumerate() {
                    let sep = if i == 0 { ':' } else { ',' };
                    write!(f, "{sep}{key}={value}")?;
                }
                Ok(())
            }
        }
    }
}

const ESCAPES: [(char, &str); 4] = [('%', "%25"), (':', "%3A"), (',', "%2C"), ('=', "%3D")];

fn escape(c: char) -> Option<&'static str> {
    ESCAPES.iter().find(|(raw, _)| *raw == c).map(|(_, code)| *code)
}

/// `None` on a `%` that does not start one of the known escapes.
fn unescape_salt(salt: &str) -> Option<String> {
    let mut out = String::with_capacity(salt.len());
    let mut rest = salt;
    while let Some(at) = rest.find('%') {
        out.push_str(&rest[..at]);
        rest = &rest[at..];
        let (raw, code) = ESCAPES
            .iter()
            .find(|(_, code)| rest.get(..3).is_some_and(|head| head.eq_ignore_ascii_case(code)))?;
        out.push(*raw);
        rest = &rest[code.len()..];
    }
    out.push_str(rest);
    Some(out)
}

impl FromStr for TaggedCredential {
    type Err = CredentialError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl Serialize for TaggedCredential {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for TaggedCredential {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::parse(&s).map_err(serde::de::Error::custom)
    }
}
