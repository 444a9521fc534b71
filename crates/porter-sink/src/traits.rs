//! The [`ImportSink`] trait: the destination side of a migration.

use porter_credential::TaggedCredential;
use porter_types::{DestinationId, ObjectType, SourceId};

use crate::error::Result;
use crate::record::ImportRecord;

/// Destination import pipeline and owner of the id mapping.
///
/// Implementations must satisfy:
/// - `import` is idempotent per (object type, source id): importing the same
///   pair again updates or no-ops and returns the same destination id.
/// - Records without a source id are always newly allocated.
/// - Once `lookup` has returned an id for a pair, it keeps returning it.
pub trait ImportSink: Send + Sync {
    /// Create or update a destination record.
    ///
    /// Returns `Ok(None)` when the destination declines the record
    /// (duplicate or invalid).
    fn import(&self, record: &ImportRecord) -> Result<Option<DestinationId>>;

    /// Destination id previously assigned to `source_id`.
    fn lookup(&self, object_type: ObjectType, source_id: &SourceId) -> Result<Option<DestinationId>>;

    /// Attach a tagged credential to an already imported user.
    fn update_credential(&self, user: DestinationId, credential: &TaggedCredential) -> Result<()>;
}
