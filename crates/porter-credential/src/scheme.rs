use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CredentialError;

/// A legacy password-hash scheme the destination knows how to verify.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CredentialScheme {
    /// `md5(password)`
    Md5,
    /// `md5(salt . password)`
    SaltedMd5,
    /// vBulletin 3/4: `md5(md5(password) . salt)`
    Vb3,
    /// MyBB: `md5(md5(salt) . md5(password))`
    #[serde(rename = "mybb1")]
    MyBb1,
    /// IP.Board 3, same construction as MyBB.
    Ipb3,
    /// phpBB 3: phpass portable hashes, or bcrypt on newer installs.
    #[serde(rename = "phpbb3")]
    PhpBb3,
    /// `$1$` md5-crypt.
    CryptMd5,
    /// `$2a$` / `$2b$` / `$2y$` bcrypt.
    Bcrypt,
    /// vBulletin 5: bcrypt over the hex md5 of the password.
    Vb5,
    /// XenForo 1 composite sha256 scheme.
    Xf1,
    /// SMF 2: sha1 keyed by the lowercased username.
    Smf2,
    /// PBKDF2 with explicit digest, iteration count and key length.
    Pbkdf2,
}

const ALIASES: &[(&str, CredentialScheme)] = &[
    ("phpass", CredentialScheme::PhpBb3),
    ("mybb", CredentialScheme::MyBb1),
    ("ipb", CredentialScheme::Ipb3),
    ("vbulletin3", CredentialScheme::Vb3),
    ("vbulletin5", CredentialScheme::Vb5),
    ("xenforo1", CredentialScheme::Xf1),
    ("smf", CredentialScheme::Smf2),
    ("md5crypt", CredentialScheme::CryptMd5),
];

impl CredentialScheme {
    pub const ALL: [CredentialScheme; 12] = [
        Self::Md5,
        Self::SaltedMd5,
        Self::Vb3,
        Self::MyBb1,
        Self::Ipb3,
        Self::PhpBb3,
        Self::CryptMd5,
        Self::Bcrypt,
        Self::Vb5,
        Self::Xf1,
        Self::Smf2,
        Self::Pbkdf2,
    ];

    /// The tag written into tagged credentials.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Md5 => "md5",
            Self::SaltedMd5 => "salted-md5",
            Self::Vb3 => "vb3",
            Self::MyBb1 => "mybb1",
            Self::Ipb3 => "ipb3",
            Self::PhpBb3 => "phpbb3",
            Self::CryptMd5 => "crypt-md5",
            Self::Bcrypt => "bcrypt",
            Self::Vb5 => "vb5",
            Self::Xf1 => "xf1",
            Self::Smf2 => "smf2",
            Self::Pbkdf2 => "pbkdf2",
        }
    }

    /// Look up a scheme by tag or a known alias, ignoring case.
    pub fn from_tag(tag: &str) -> Option<Self> {
        let tag = tag.trim().to_ascii_lowercase();
        Self::ALL
            .iter()
            .copied()
            .find(|s| s.as_str() == tag)
            .or_else(|| {
                ALIASES
                    .iter()
                    .find(|(alias, _)| *alias == tag)
                    .map(|(_, scheme)| *scheme)
            })
    }

    /// Whether the scheme cannot be verified without a salt.
    pub fn requires_salt(&self) -> bool {
        matches!(
            self,
            Self::SaltedMd5
                | Self::Vb3
                | Self::MyBb1
                | Self::Ipb3
                | Self::Xf1
                | Self::Smf2
                | Self::Pbkdf2
        )
    }

    /// Algorithm parameters the scheme cannot be verified without.
    pub fn required_params(&self) -> &'static [&'static str] {
        match self {
            Self::Pbkdf2 => &["digest", "iterations", "length"],
            _ => &[],
        }
    }

    /// Check the stored hash has the shape this scheme produces.
    pub fn accepts_hash(&self, hash: &str) -> bool {
        match self {
            Self::Bcrypt | Self::Vb5 => hash.starts_with("$2"),
            Self::PhpBb3 => {
                hash.starts_with("$H$") || hash.starts_with("$P$") || hash.starts_with("$2")
            }
            Self::CryptMd5 => hash.starts_with("$1$"),
            _ => true,
        }
    }
}

impl fmt::Display for CredentialScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CredentialScheme {
    type Err = CredentialError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_tag(s).ok_or_else(|| CredentialError::UnknownScheme(s.to_string()))
    }
}
