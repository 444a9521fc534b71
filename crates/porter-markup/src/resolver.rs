//! Lookup of stored uploads by content hash.

use std::collections::HashMap;

use porter_types::SourceId;

/// Resolves the SHA-1 of an uploaded file to the id of the stored upload.
///
/// The transcoder calls this for every embedded `upload://` reference. The
/// hash is passed as 40 lowercase hex characters.
pub trait AttachmentResolver: Send + Sync {
    /// Return the source id of the upload with this hash, if one is stored.
    fn resolve(&self, sha1_hex: &str) -> Option<SourceId>;
}

/// Resolver that knows no uploads; every reference is removed.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoAttachments;

impl AttachmentResolver for NoAttachments {
    fn resolve(&self, _sha1_hex: &str) -> Option<SourceId> {
        None
    }
}

/// Hash-keyed upload index, typically filled from the source's upload table
/// once per run.
#[derive(Clone, Debug, Default)]
pub struct AttachmentIndex {
    by_hash: HashMap<String, SourceId>,
}

impl AttachmentIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an upload. The hash is stored lowercase.
    pub fn insert(&mut self, sha1_hex: &str, upload: impl Into<SourceId>) {
        self.by_hash
            .insert(sha1_hex.to_ascii_lowercase(), upload.into());
    }

    pub fn len(&self) -> usize {
        self.by_hash.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_hash.is_empty()
    }
}

impl FromIterator<(String, SourceId)> for AttachmentIndex {
    fn from_iter<I: IntoIterator<Item = (String, SourceId)>>(iter: I) -> Self {
        let mut index = Self::new();
        for (hash, id) in iter {
            index.insert(&hash, id);
        }
        index
    }
}

impl AttachmentResolver for AttachmentIndex {
    fn resolve(&self, sha1_hex: &str) -> Option<SourceId> {
        self.by_hash.get(&sha1_hex.to_ascii_lowercase()).cloned()
    }
}
