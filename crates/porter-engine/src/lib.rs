//! Migration engine for porter.
//!
//! Turns a category selection into a dependency-ordered queue of object
//! types, then drives a [`SourceConnector`](porter_source::SourceConnector)
//! into an [`ImportSink`](porter_sink::ImportSink) chunk by chunk: records
//! are normalized, transcoded, stripped of unavailable assets, rewritten to
//! destination-id references and imported. Progress is checkpointed after
//! every chunk so an interrupted run resumes where it stopped.
//!
//! # Key Types
//!
//! - [`Migration`]: The driver for one source and one sink
//! - [`QueueBuilder`] / [`Queue`]: Prerequisite-ordered object types
//! - [`MigrationConfig`]: TOML-loadable run configuration
//! - [`ReferenceResolver`]: Foreign keys to destination ids, with fallbacks
//! - [`Checkpoint`] / [`CheckpointStore`]: Resumable progress
//! - [`RunReport`]: Per-type counters of one run

pub mod checkpoint;
pub mod config;
pub mod driver;
pub mod error;
pub mod queue;
pub mod report;
pub mod resolve;

pub use checkpoint::{
    Checkpoint, CheckpointStore, FileCheckpointStore, InMemoryCheckpointStore, Progress,
};
pub use config::MigrationConfig;
pub use driver::{Migration, StopSignal, FILE_KEY, LOCATION_KEY};
pub use error::{EngineError, QueueError, Result};
pub use queue::{order_types, Queue, QueueBuilder, Selection};
pub use report::{RunReport, TypeReport};
pub use resolve::{ReferenceResolver, Resolution};
