//! Tag-keyed exporter registry and the generic connector built on it.

use std::collections::BTreeMap;
use std::fmt;

use tracing::debug;

use porter_markup::{AttachmentResolver, Dialect};
use porter_types::ObjectType;

use crate::error::{SourceError, SourceResult};
use crate::traits::{Capabilities, ObjectExporter, RowResult, SourceConnector};
use crate::window::{RecordCount, Window};

/// Exporters by object type, assembled once when a connector is set up.
#[derive(Default)]
pub struct ExporterRegistry {
    exporters: BTreeMap<ObjectType, Box<dyn ObjectExporter>>,
}

impl ExporterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an exporter, replacing any earlier one for the same type.
    pub fn register(&mut self, exporter: impl ObjectExporter + 'static) {
        self.exporters
            .insert(exporter.object_type(), Box::new(exporter));
    }

    /// Builder form of [`register`](Self::register).
    pub fn with(mut self, exporter: impl ObjectExporter + 'static) -> Self {
        self.register(exporter);
        self
    }

    pub fn get(&self, object_type: ObjectType) -> Option<&dyn ObjectExporter> {
        self.exporters.get(&object_type).map(|e| e.as_ref())
    }

    pub fn types(&self) -> impl Iterator<Item = ObjectType> + '_ {
        self.exporters.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.exporters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.exporters.is_empty()
    }

    fn require(&self, object_type: ObjectType) -> SourceResult<&dyn ObjectExporter> {
        self.get(object_type)
            .ok_or(SourceError::UnsupportedType(object_type))
    }
}

impl fmt::Debug for ExporterRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExporterRegistry")
            .field("types", &self.exporters.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// A [`SourceConnector`] that dispatches to an [`ExporterRegistry`].
pub struct RegistryConnector {
    name: String,
    dialect: Dialect,
    registry: ExporterRegistry,
    attachments: Option<Box<dyn AttachmentResolver>>,
}

impl RegistryConnector {
    pub fn new(name: impl Into<String>, dialect: Dialect, registry: ExporterRegistry) -> Self {
        Self {
            name: name.into(),
            dialect,
            registry,
            attachments: None,
        }
    }

    /// Attach the platform's upload index.
    pub fn with_attachments(mut self, resolver: impl AttachmentResolver + 'static) -> Self {
        self.attachments = Some(Box::new(resolver));
        self
    }

    pub fn registry(&self) -> &ExporterRegistry {
        &self.registry
    }
}

impl SourceConnector for RegistryConnector {
    fn name(&self) -> &str {
        &self.name
    }

    fn dialect(&self) -> Dialect {
        self.dialect
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities::from_types(self.registry.types())
    }

    fn validate(&self) -> SourceResult<()> {
        for object_type in self.registry.types() {
            self.registry.require(object_type)?.validate()?;
            debug!(source = %self.name, object = %object_type, "exporter validated");
        }
        Ok(())
    }

    fn count(&self, object_type: ObjectType) -> SourceResult<RecordCount> {
        self.registry.require(object_type)?.count()
    }

    fn export(&self, object_type: ObjectType, window: Window) -> SourceResult<Vec<RowResult>> {
        self.registry.require(object_type)?.export(window)
    }

    fn attachment_resolver(&self) -> Option<&dyn AttachmentResolver> {
        self.attachments.as_deref()
    }
}

impl fmt::Debug for RegistryConnector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegistryConnector")
            .field("name", &self.name)
            .field("dialect", &self.dialect)
            .field("registry", &self.registry)
            .finish()
    }
}
