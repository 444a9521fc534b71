//! Error types for import sink operations.

use thiserror::Error;

use porter_types::{DestinationId, ObjectType, SourceId};

/// Errors raised by an import sink.
///
/// A record the destination declines is not an error: `import` returns
/// `Ok(None)` for it.
#[derive(Debug, Error)]
pub enum SinkError {
    /// A source id already maps to a different destination id.
    #[error("{object} {source_id} is already mapped to {existing}, refusing {attempted}")]
    Conflict {
        object: ObjectType,
        source_id: SourceId,
        existing: DestinationId,
        attempted: DestinationId,
    },

    /// The destination has no record with this id.
    #[error("no {object} record with destination id {id}")]
    UnknownRecord { object: ObjectType, id: DestinationId },

    /// The destination cannot be reached.
    #[error("destination unavailable: {0}")]
    Unavailable(String),
}

/// Convenience type alias for sink operations.
pub type Result<T> = std::result::Result<T, SinkError>;
