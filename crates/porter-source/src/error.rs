use std::path::PathBuf;

use porter_types::ObjectType;

/// Errors from a source connector.
///
/// Every variant except [`SourceError::UnsupportedType`] is fatal to a run;
/// pre-flight validation reports them before any chunk is requested.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    /// An expected table, column or key is absent.
    #[error("source schema error in {object}: {detail}")]
    Schema { object: String, detail: String },

    /// The source store cannot be reached.
    #[error("source connection failed: {0}")]
    Connection(String),

    /// The connector does not export this object type.
    #[error("object type not supported by this source: {0}")]
    UnsupportedType(ObjectType),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Result alias for source operations.
pub type SourceResult<T> = Result<T, SourceError>;

/// One source row that could not be turned into a record.
///
/// Returned inside a chunk; the enumerator logs and skips it.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("malformed {object} row {row}: {reason}")]
pub struct RowError {
    pub object: ObjectType,
    /// Row key as the source knows it.
    pub row: String,
    pub reason: String,
}

impl RowError {
    pub fn new(object: ObjectType, row: impl ToString, reason: impl Into<String>) -> Self {
        Self {
            object,
            row: row.to_string(),
            reason: reason.into(),
        }
    }
}

/// An avatar or attachment file that cannot be read.
///
/// Only the one asset is skipped.
#[derive(Debug, thiserror::Error)]
pub enum FileAccessError {
    #[error("file not found: {0}")]
    Missing(PathBuf),

    #[error("file not readable: {path}: {source}")]
    Unreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("path escapes the storage root: {0}")]
    OutsideRoot(String),
}
