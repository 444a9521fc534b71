//! Error types for the migration engine.

use thiserror::Error;
use uuid::Uuid;

use porter_markup::MarkupError;
use porter_sink::SinkError;
use porter_source::SourceError;
use porter_types::{Category, ObjectType};

/// Errors from building the dependency queue.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum QueueError {
    /// A selection entry names no known category.
    #[error("unknown category: {0}")]
    UnknownCategory(String),

    /// A selection entry names no known sub-feature of its category.
    #[error("unknown sub-feature: {0}")]
    UnknownSubFeature(String),

    /// The source cannot export a selected category.
    #[error("category not supported by the source: {0}")]
    UnsupportedCategory(Category),

    /// Prerequisites form a cycle among these types.
    #[error("prerequisite cycle among {0:?}")]
    Cycle(Vec<ObjectType>),
}

/// Errors that stop a migration run.
///
/// Everything that can be recovered locally (a bad row, a missing file, an
/// unresolved reference) is counted in the run report instead.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("queue error: {0}")]
    Queue(#[from] QueueError),

    #[error("source error: {0}")]
    Source(#[from] SourceError),

    #[error("sink error: {0}")]
    Sink(#[from] SinkError),

    #[error("transcoder setup failed: {0}")]
    Markup(#[from] MarkupError),

    /// The stored checkpoint was written for a different queue.
    #[error("checkpoint of run {run_id} was written for a different queue")]
    CheckpointMismatch { run_id: Uuid },

    #[error("checkpoint error: {0}")]
    Checkpoint(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience type alias for engine operations.
pub type Result<T> = std::result::Result<T, EngineError>;
