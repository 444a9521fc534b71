//! Legacy credential re-encoding for porter.
//!
//! Source platforms store password hashes in a dozen different constructions.
//! The destination can verify logins against the original algorithm as long
//! as it knows which one was used, so each hash is carried over as a
//! [`TaggedCredential`]: the scheme tag, the hash, the salt and any algorithm
//! parameters. Nothing here ever sees or derives a plaintext password.
//!
//! ```
//! use std::collections::BTreeMap;
//! use porter_credential::rewrite;
//!
//! let tagged = rewrite("md5", "5f4dcc3b5aa765d61d8327deb882cf99", "", &BTreeMap::new());
//! assert_eq!(tagged.to_string(), "md5:5f4dcc3b5aa765d61d8327deb882cf99:");
//! assert!(tagged.verify("password").unwrap());
//!
//! let unknown = rewrite("argon9", "…", "", &BTreeMap::new());
//! assert!(unknown.is_unresolved());
//! ```

pub mod error;
pub mod rewrite;
pub mod scheme;
pub mod tagged;
mod verify;

pub use error::{CredentialError, Result};
pub use rewrite::{rewrite, rewrite_legacy};
pub use scheme::CredentialScheme;
pub use tagged::{TaggedCredential, UNRESOLVED_MARKER};
