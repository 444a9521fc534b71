//! File storage for avatars and attachments.

use std::fs;
use std::path::{Component, Path, PathBuf};

use crate::error::FileAccessError;

/// Resolves a record's relative file path to a readable file.
pub trait FileStorage: Send + Sync {
    /// Locate `relative` under the storage root.
    fn locate(&self, relative: &str) -> Result<PathBuf, FileAccessError>;

    /// Read the whole file.
    fn read(&self, relative: &str) -> Result<Vec<u8>, FileAccessError> {
        let path = self.locate(relative)?;
        fs::read(&path).map_err(|source| FileAccessError::Unreadable { path, source })
    }
}

/// Files under a directory on the local file system.
#[derive(Clone, Debug)]
pub struct LocalFileStorage {
    root: PathBuf,
}

impl LocalFileStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl FileStorage for LocalFileStorage {
    fn locate(&self, relative: &str) -> Result<PathBuf, FileAccessError> {
        let rel = Path::new(relative);
        if relative.is_empty()
            || rel
                .components()
                .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir))
        {
            return Err(FileAccessError::OutsideRoot(relative.to_string()));
        }

        let path = self.root.join(rel);
        match fs::metadata(&path) {
            Ok(meta) if meta.is_file() => Ok(path),
            Ok(_) => Err(FileAccessError::Missing(path)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(FileAccessError::Missing(path)),
            Err(source) => Err(FileAccessError::Unreadable { path, source }),
        }
    }
}
