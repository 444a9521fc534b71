//! Import sink boundary for porter.
//!
//! The sink is the destination side of a migration. It owns the mapping
//! from source ids to destination ids; the engine only reads it through
//! [`ImportSink::lookup`] while resolving foreign keys of dependent types.
//!
//! # Key Types
//!
//! - [`ImportSink`]: Import, lookup and credential attachment
//! - [`ImportRecord`]: A composed record with destination-id references
//! - [`IdMap`]: Write-once source to destination mapping per object type
//! - [`InMemoryImportSink`]: Complete in-memory destination

pub mod error;
pub mod idmap;
pub mod memory;
pub mod record;
pub mod traits;

pub use error::{Result, SinkError};
pub use idmap::IdMap;
pub use memory::{InMemoryImportSink, StoredRecord};
pub use record::{ImportRecord, ResolvedAssociation};
pub use traits::ImportSink;
