use std::collections::{BTreeMap, BTreeSet};

use porter_markup::{AttachmentResolver, Dialect};
use porter_types::{Category, ExportRecord, ObjectType};

use crate::error::{RowError, SourceResult};
use crate::window::{RecordCount, Window};

/// One row of a chunk: a record, or the reason the row was unusable.
pub type RowResult = Result<ExportRecord, RowError>;

/// Count and slice access to one object type of one source.
///
/// Implementations must satisfy:
/// - `export` returns records in ascending source order for the window.
/// - Re-issuing the same window returns the same rows.
/// - A malformed row is returned as `Err(RowError)` inside the chunk, never
///   as a failure of the whole call.
/// - Structural problems (missing table or key) surface from `validate`.
pub trait ObjectExporter: Send + Sync {
    fn object_type(&self) -> ObjectType;

    /// Check that the backing table or key exists and is readable.
    fn validate(&self) -> SourceResult<()>;

    /// Progress estimate for this type.
    fn count(&self) -> SourceResult<RecordCount>;

    /// Rows in `window`, in ascending order.
    fn export(&self, window: Window) -> SourceResult<Vec<RowResult>>;
}

/// What a connector can export, by category.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Capabilities {
    categories: BTreeMap<Category, BTreeSet<&'static str>>,
}

impl Capabilities {
    /// Derive capabilities from the exported object types.
    ///
    /// A category is supported when all of its primary types are exported,
    /// a sub-feature when all of its types are.
    pub fn from_types(types: impl IntoIterator<Item = ObjectType>) -> Self {
        let types: BTreeSet<ObjectType> = types.into_iter().collect();
        let mut categories = BTreeMap::new();
        for category in Category::ALL {
            if !category.primary().iter().all(|t| types.contains(t)) {
                continue;
            }
            let features = category
                .sub_features()
                .iter()
                .filter(|f| f.object_types.iter().all(|t| types.contains(t)))
                .map(|f| f.name)
                .collect();
            categories.insert(category, features);
        }
        Self { categories }
    }

    pub fn supports_category(&self, category: Category) -> bool {
        self.categories.contains_key(&category)
    }

    pub fn supports_sub_feature(&self, category: Category, name: &str) -> bool {
        self.categories
            .get(&category)
            .is_some_and(|features| features.contains(name))
    }

    pub fn categories(&self) -> impl Iterator<Item = Category> + '_ {
        self.categories.keys().copied()
    }

    pub fn sub_features(&self, category: Category) -> Vec<&'static str> {
        self.categories
            .get(&category)
            .map(|f| f.iter().copied().collect())
            .unwrap_or_default()
    }
}

/// A legacy platform as seen by the migration driver.
pub trait SourceConnector: Send + Sync {
    /// Platform name, for logs.
    fn name(&self) -> &str;

    /// Markup dialect of the platform's text fields.
    fn dialect(&self) -> Dialect;

    /// Categories and sub-features this connector can export.
    fn capabilities(&self) -> Capabilities;

    /// Pre-flight validation. Fails on schema or connection problems.
    fn validate(&self) -> SourceResult<()>;

    fn count(&self, object_type: ObjectType) -> SourceResult<RecordCount>;

    fn export(&self, object_type: ObjectType, window: Window) -> SourceResult<Vec<RowResult>>;

    /// Upload lookup for embedded `upload://` references, when the platform
    /// has them.
    fn attachment_resolver(&self) -> Option<&dyn AttachmentResolver> {
        None
    }
}
