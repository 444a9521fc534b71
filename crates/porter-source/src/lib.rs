//! Source connector boundary for porter.
//!
//! A connector exposes one legacy platform's data as count-and-slice access
//! per object type. The engine never sees tables or keys: it asks for a
//! [`RecordCount`] estimate and then for consecutive [`Window`]s until a
//! window starts past the count.
//!
//! # Key Types
//!
//! - [`SourceConnector`]: Per-platform adapter consumed by the engine
//! - [`ObjectExporter`]: Count and slice access to one object type
//! - [`RegistryConnector`]: Connector assembled from registered exporters
//! - [`ChunkedEnumerator`]: Walks one type window by window
//! - [`SqliteTableExporter`]: Id-range exporter over a SQLite table
//! - [`HierarchyExporter`]: Parent-before-child ordering for board trees
//! - [`FileStorage`]: Resolves avatar and attachment paths

pub mod enumerator;
pub mod error;
pub mod files;
pub mod memory;
pub mod registry;
pub mod sqlite;
pub mod traits;
pub mod tree;
pub mod window;

pub use enumerator::{Chunk, ChunkedEnumerator};
pub use error::{FileAccessError, RowError, SourceError, SourceResult};
pub use files::{FileStorage, LocalFileStorage};
pub use memory::{SortedSetExporter, TableExporter};
pub use registry::{ExporterRegistry, RegistryConnector};
pub use sqlite::{SharedConnection, SqliteTableExporter};
pub use traits::{Capabilities, ObjectExporter, RowResult, SourceConnector};
pub use tree::HierarchyExporter;
pub use window::{RecordCount, Window};
