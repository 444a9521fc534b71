//! Foundation types for porter.
//!
//! This crate provides the shared vocabulary of the migration engine: the
//! object-type tags every connector exports, the identifiers that flow between
//! the source and destination systems, and the canonical field-map schemas
//! records are normalized against. Every other porter crate depends on
//! `porter-types`.
//!
//! # Key Types
//!
//! - [`ObjectType`]: Stable tag for a migrated entity (`"user"`, `"post"`, …)
//! - [`ObjectTypeDescriptor`]: Label, prerequisites and preferred chunk size
//! - [`Category`]: Top-level selectable category with its sub-features
//! - [`SourceId`] / [`DestinationId`]: Identifiers on either side of a run
//! - [`FieldValue`] / [`FieldMap`]: Typed canonical field values
//! - [`ExportRecord`]: One record produced by a source connector
//! - [`Schema`]: Canonical field list per object type, with foreign keys

pub mod category;
pub mod error;
pub mod id;
pub mod object_type;
pub mod record;
pub mod schema;
pub mod value;

pub use category::{Category, SubFeature};
pub use error::TypeError;
pub use id::{DestinationId, SourceId};
pub use object_type::{ObjectType, ObjectTypeDescriptor};
pub use record::{Association, AssociationKind, ExportRecord, LegacyCredential};
pub use schema::{Fallback, FieldKind, FieldSpec, Reference, Schema};
pub use value::{FieldMap, FieldValue};
