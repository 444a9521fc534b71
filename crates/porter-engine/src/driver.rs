use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::{debug, info, warn};

use porter_credential::{rewrite_legacy, TaggedCredential};
use porter_markup::{AttachmentResolver, NoAttachments, Transcoder};
use porter_sink::{ImportRecord, ImportSink};
use porter_source::{ChunkedEnumerator, FileStorage, LocalFileStorage, SourceConnector};
use porter_types::{ExportRecord, FieldMap, FieldValue, ObjectType, Schema};

use crate::checkpoint::{Checkpoint, CheckpointStore, FileCheckpointStore, InMemoryCheckpointStore};
use crate::config::MigrationConfig;
use crate::error::Result;
use crate::queue::{Queue, QueueBuilder};
use crate::report::{RunReport, TypeReport};
use crate::resolve::ReferenceResolver;

/// Aux key holding an asset's path relative to the file storage root.
pub const FILE_KEY: &str = "file";

/// Aux key the driver fills with the resolved location of an asset.
pub const LOCATION_KEY: &str = "location";

// ---------------------------------------------------------------------------
// StopSignal
// ---------------------------------------------------------------------------

/// Cooperative stop request, checked between chunks.
#[derive(Clone, Debug, Default)]
pub struct StopSignal(Arc<AtomicBool>);

impl StopSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stop(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_stopped(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    pub fn reset(&self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

// ---------------------------------------------------------------------------
// Migration
// ---------------------------------------------------------------------------

/// Drives one source into one sink.
///
/// For each object type in queue order the driver walks the source in
/// chunks and, per record: normalizes the fields against the canonical
/// schema, transcodes markup fields, resolves the asset file, rewrites
/// references to destination ids, imports the record and, for users,
/// attaches the tagged credential. The checkpoint is saved after every
/// chunk.
pub struct Migration<'a> {
    connector: &'a dyn SourceConnector,
    sink: &'a dyn ImportSink,
    config: MigrationConfig,
    transcoder: Transcoder,
    checkpoints: Box<dyn CheckpointStore>,
    files: Option<Box<dyn FileStorage>>,
    stop: StopSignal,
}

impl<'a> Migration<'a> {
    /// Set up a run; checkpoint and file storage follow `config`.
    pub fn new(
        connector: &'a dyn SourceConnector,
        sink: &'a dyn ImportSink,
        config: MigrationConfig,
    ) -> Result<Self> {
        config.validate()?;
        let checkpoints: Box<dyn CheckpointStore> = match &config.checkpoint_path {
            Some(path) => Box::new(FileCheckpointStore::new(path)),
            None => Box::new(InMemoryCheckpointStore::new()),
        };
        let files = config
            .files_root
            .as_ref()
            .map(|root| Box::new(LocalFileStorage::new(root)) as Box<dyn FileStorage>);
        Ok(Self {
            connector,
            sink,
            config,
            transcoder: Transcoder::new()?,
            checkpoints,
            files,
            stop: StopSignal::new(),
        })
    }

    pub fn with_checkpoint_store(mut self, store: impl CheckpointStore + 'static) -> Self {
        self.checkpoints = Box::new(store);
        self
    }

    pub fn with_file_storage(mut self, storage: impl FileStorage + 'static) -> Self {
        self.files = Some(Box::new(storage));
        self
    }

    /// Share an externally owned stop signal.
    pub fn with_stop_signal(mut self, stop: StopSignal) -> Self {
        self.stop = stop;
        self
    }

    /// A handle that stops the run after the chunk in progress.
    pub fn stop_signal(&self) -> StopSignal {
        self.stop.clone()
    }

    pub fn checkpoints(&self) -> &dyn CheckpointStore {
        self.checkpoints.as_ref()
    }

    pub fn config(&self) -> &MigrationConfig {
        &self.config
    }

    /// The queue this run would process.
    pub fn plan(&self) -> Result<Queue> {
        let selection = self.config.selection()?;
        Ok(QueueBuilder::new(selection)
            .with_capabilities(self.connector.capabilities())
            .build()?)
    }

    /// Run or resume the migration.
    ///
    /// Fails before any import when the source does not pass validation, the
    /// selection cannot be queued or the saved checkpoint belongs to a
    /// different queue.
    pub fn run(&self) -> Result<RunReport> {
        self.connector.validate()?;
        let queue = self.plan()?;

        let mut checkpoint = match self.checkpoints.load()? {
            Some(saved) => {
                saved.verify(&queue)?;
                info!(run_id = %saved.run_id, completed = saved.completed.len(), "resuming run");
                saved
            }
            None => Checkpoint::new(&queue),
        };
        let mut report = RunReport::new(checkpoint.run_id, queue.as_slice().to_vec());
        info!(
            run_id = %checkpoint.run_id,
            source = self.connector.name(),
            queue = %queue,
            "migration started"
        );

        let resolver = self.connector.attachment_resolver().unwrap_or(&NoAttachments);
        for object_type in queue.iter() {
            if checkpoint.is_completed(object_type) {
                debug!(object = %object_type, "already complete");
                report.resumed_past.push(object_type);
                continue;
            }
            if !self.migrate_type(object_type, resolver, &mut checkpoint, &mut report)? {
                report.finish(true);
                info!(run_id = %report.run_id, object = %object_type, "migration stopped");
                return Ok(report);
            }
        }

        report.finish(false);
        let totals = report.totals();
        info!(
            run_id = %report.run_id,
            exported = totals.exported,
            imported = totals.imported,
            "migration finished"
        );
        Ok(report)
    }

    /// Returns `false` when stopped before the type was complete.
    fn migrate_type(
        &self,
        object_type: ObjectType,
        resolver: &dyn AttachmentResolver,
        checkpoint: &mut Checkpoint,
        report: &mut RunReport,
    ) -> Result<bool> {
        let offset = checkpoint.resume_offset(object_type);
        let chunk_size = self.config.chunk_size(object_type);
        let mut chunks =
            ChunkedEnumerator::new(self.connector, object_type, chunk_size)?.resume_at(offset);
        let estimate = chunks.estimate();
        info!(
            object = %object_type,
            estimate = estimate.total,
            exact = estimate.exact,
            offset,
            chunk_size,
            "exporting"
        );

        let references = ReferenceResolver::new(self.sink, self.config.fallback_board());
        loop {
            if self.stop.is_stopped() {
                checkpoint.advance(object_type, chunks.offset());
                self.checkpoints.save(checkpoint)?;
                return Ok(false);
            }
            let Some(chunk) = chunks.next_chunk()? else {
                break;
            };

            let stats = report.entry(object_type);
            stats.skipped_rows += chunk.skipped as u64;
            for record in chunk.records {
                self.import_record(object_type, record, resolver, &references, stats)?;
            }
            checkpoint.advance(object_type, chunks.offset());
            self.checkpoints.save(checkpoint)?;
            debug!(object = %object_type, offset = chunks.offset(), "chunk imported");
        }

        checkpoint.complete(object_type);
        self.checkpoints.save(checkpoint)?;
        let stats = report.get(object_type);
        info!(
            object = %object_type,
            exported = stats.exported,
            imported = stats.imported,
            skipped = stats.skipped_rows,
            "object type complete"
        );
        Ok(true)
    }

    fn import_record(
        &self,
        object_type: ObjectType,
        record: ExportRecord,
        resolver: &dyn AttachmentResolver,
        references: &ReferenceResolver<'_>,
        stats: &mut TypeReport,
    ) -> Result<()> {
        stats.exported += 1;
        let ExportRecord {
            source_id,
            fields,
            mut aux,
            associations,
            credential,
        } = record;

        let schema = Schema::of(object_type);
        let (mut fields, dropped) = schema.normalize(fields);
        if !dropped.is_empty() {
            debug!(object = %object_type, fields = ?dropped, "dropped non-canonical fields");
            stats.dropped_fields += dropped.len() as u64;
        }

        let dialect = self.connector.dialect();
        for spec in schema.markup_fields() {
            if let Some(FieldValue::Text(raw)) = fields.get_mut(spec.name) {
                *raw = self
                    .transcoder
                    .transcode(dialect, raw.as_str(), resolver)
                    .into_string();
            }
        }

        if object_type.carries_file() {
            match self.locate_file(&aux) {
                Ok(path) => {
                    aux.insert(LOCATION_KEY.to_string(), path.display().to_string().into());
                }
                Err(reason) => {
                    warn!(object = %object_type, id = ?source_id, reason = %reason, "asset skipped");
                    stats.missing_files += 1;
                    return Ok(());
                }
            }
        }

        let resolution = references.resolve(object_type, fields, &associations)?;
        stats.unresolved_references += resolution.unresolved as u64;

        let mut import = ImportRecord::new(object_type, source_id, resolution.fields);
        import.aux = aux;
        import.associations = resolution.associations;
        let Some(id) = self.sink.import(&import)? else {
            stats.declined += 1;
            return Ok(());
        };
        stats.imported += 1;

        if object_type == ObjectType::User {
            let tagged = credential
                .as_ref()
                .map(rewrite_legacy)
                .unwrap_or(TaggedCredential::Unresolved);
            if tagged.is_unresolved() {
                debug!(user = %id, "credential unresolved; password reset required");
                stats.unresolved_credentials += 1;
            }
            self.sink.update_credential(id, &tagged)?;
        }
        Ok(())
    }

    fn locate_file(&self, aux: &FieldMap) -> std::result::Result<PathBuf, String> {
        let relative = aux
            .get(FILE_KEY)
            .and_then(FieldValue::as_str)
            .filter(|p| !p.is_empty())
            .ok_or_else(|| "no file path recorded".to_string())?;
        let storage = self
            .files
            .as_deref()
            .ok_or_else(|| "no file storage configured".to_string())?;
        storage.locate(relative).map_err(|e| e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use porter_markup::Dialect;
    use porter_sink::InMemoryImportSink;
    use porter_source::{ExporterRegistry, RegistryConnector, TableExporter};
    use porter_types::{LegacyCredential, SourceId};

    fn config(selection: &[&str]) -> MigrationConfig {
        MigrationConfig {
            selection: selection.iter().map(|s| s.to_string()).collect(),
            ..Default::default()
        }
    }

    #[test]
    fn stop_signal_is_shared() {
        let signal = StopSignal::new();
        let clone = signal.clone();
        clone.stop();
        assert!(signal.is_stopped());
        signal.reset();
        assert!(!clone.is_stopped());
    }

    #[test]
    fn users_get_transcoded_signatures_and_credentials() {
        let mut users = TableExporter::new(ObjectType::User, "users");
        users.insert(
            1,
            ExportRecord::new(1)
                .with_field("username", "alice")
                .with_field("signature", "**bold**")
                .with_field("karma", 12)
                .with_credential(LegacyCredential::new("md5", "5f4dcc3b5aa765d61d8327deb882cf99")),
        );
        users.insert(2, ExportRecord::new(2).with_field("username", "bob"));
        let connector =
            RegistryConnector::new("t", Dialect::Markdown, ExporterRegistry::new().with(users));
        let sink = InMemoryImportSink::new();

        let report = Migration::new(&connector, &sink, config(&["user"]))
            .unwrap()
            .run()
            .unwrap();
        let stats = report.get(ObjectType::User);
        assert_eq!(stats.imported, 2);
        assert_eq!(stats.dropped_fields, 1);
        assert_eq!(stats.unresolved_credentials, 1);

        let alice = sink.find(ObjectType::User, &SourceId::Int(1)).unwrap();
        assert_eq!(alice.field("signature"), Some(&FieldValue::from("[b]bold[/b]")));
        assert_eq!(alice.field("email"), Some(&FieldValue::from("")));
        assert!(alice.field("karma").is_none());
        assert!(alice.credential.unwrap().verify("password").unwrap());

        let bob = sink.find(ObjectType::User, &SourceId::Int(2)).unwrap();
        assert_eq!(bob.credential, Some(TaggedCredential::Unresolved));
    }

    #[test]
    fn assets_without_files_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("1.png"), b"png").unwrap();

        let mut users = TableExporter::new(ObjectType::User, "users");
        users.insert(1, ExportRecord::new(1).with_field("username", "alice"));
        let mut avatars = TableExporter::new(ObjectType::UserAvatar, "avatars");
        avatars.insert(1, ExportRecord::new(1).with_field("userID", 1).with_aux(FILE_KEY, "1.png"));
        avatars.insert(2, ExportRecord::new(2).with_field("userID", 1).with_aux(FILE_KEY, "2.png"));
        avatars.insert(3, ExportRecord::new(3).with_field("userID", 1));
        let connector = RegistryConnector::new(
            "t",
            Dialect::BbCode,
            ExporterRegistry::new().with(users).with(avatars),
        );
        let sink = InMemoryImportSink::new();
        let config = MigrationConfig {
            files_root: Some(dir.path().to_path_buf()),
            ..config(&["user", "user.avatar"])
        };

        let report = Migration::new(&connector, &sink, config).unwrap().run().unwrap();
        let stats = report.get(ObjectType::UserAvatar);
        assert_eq!(stats.exported, 3);
        assert_eq!(stats.imported, 1);
        assert_eq!(stats.missing_files, 2);

        let avatar = sink.find(ObjectType::UserAvatar, &SourceId::Int(1)).unwrap();
        let location = avatar.aux[LOCATION_KEY].as_str().unwrap().to_string();
        assert!(location.ends_with("1.png"));
        let user = sink.lookup(ObjectType::User, &SourceId::Int(1)).unwrap().unwrap();
        assert_eq!(avatar.field("userID"), Some(&FieldValue::Int(user.get() as i64)));
    }

    #[test]
    fn unsupported_selection_fails_before_import() {
        let connector = RegistryConnector::new("t", Dialect::BbCode, ExporterRegistry::new());
        let sink = InMemoryImportSink::new();
        let migration = Migration::new(&connector, &sink, config(&["board"])).unwrap();
        assert!(migration.run().is_err());
        assert_eq!(sink.import_calls(), 0);
    }
}
