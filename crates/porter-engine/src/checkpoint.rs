//! Resumable run state.
//!
//! A [`Checkpoint`] records which object types are complete and how far the
//! current one got. The driver saves it after every chunk, so an
//! interrupted run resumes at the last completed window of the type it was
//! working on and never revisits completed types.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use porter_types::ObjectType;

use crate::error::{EngineError, Result};
use crate::queue::Queue;

/// The object type in progress and the offset of its next window.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Progress {
    pub object_type: ObjectType,
    pub offset: u64,
}

/// Persistent progress of one run.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Checkpoint {
    pub run_id: Uuid,
    /// [`Queue::fingerprint`] of the queue the run was started with.
    pub queue_fingerprint: String,
    pub completed: Vec<ObjectType>,
    pub current: Option<Progress>,
    pub started_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Checkpoint {
    /// A fresh checkpoint for `queue`.
    pub fn new(queue: &Queue) -> Self {
        let now = Utc::now();
        Self {
            run_id: Uuid::now_v7(),
            queue_fingerprint: queue.fingerprint(),
            completed: Vec::new(),
            current: None,
            started_at: now,
            updated_at: now,
        }
    }

    /// Refuse to resume a run that was started with a different queue.
    pub fn verify(&self, queue: &Queue) -> Result<()> {
        if self.queue_fingerprint == queue.fingerprint() {
            Ok(())
        } else {
            Err(EngineError::CheckpointMismatch {
                run_id: self.run_id,
            })
        }
    }

    pub fn is_completed(&self, object_type: ObjectType) -> bool {
        self.completed.contains(&object_type)
    }

    /// Where `object_type` should start: its saved offset if it is the
    /// type in progress, otherwise zero.
    pub fn resume_offset(&self, object_type: ObjectType) -> u64 {
        match self.current {
            Some(p) if p.object_type == object_type => p.offset,
            _ => 0,
        }
    }

    /// Record that every window of `object_type` before `offset` is done.
    pub fn advance(&mut self, object_type: ObjectType, offset: u64) {
        self.current = Some(Progress {
            object_type,
            offset,
        });
        self.updated_at = Utc::now();
    }

    pub fn complete(&mut self, object_type: ObjectType) {
        if !self.is_completed(object_type) {
            self.completed.push(object_type);
        }
        self.current = None;
        self.updated_at = Utc::now();
    }

    /// Returns `true` once every type of `queue` is complete.
    pub fn is_finished(&self, queue: &Queue) -> bool {
        queue.iter().all(|ty| self.is_completed(ty))
    }
}

/// Where checkpoints are kept between runs.
pub trait CheckpointStore: Send + Sync {
    fn load(&self) -> Result<Option<Checkpoint>>;

    fn save(&self, checkpoint: &Checkpoint) -> Result<()>;

    /// Forget any saved checkpoint.
    fn clear(&self) -> Result<()>;
}

/// A JSON checkpoint file, replaced atomically on every save.
#[derive(Clone, Debug)]
pub struct FileCheckpointStore {
    path: PathBuf,
}

impl FileCheckpointStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl CheckpointStore for FileCheckpointStore {
    fn load(&self) -> Result<Option<Checkpoint>> {
        let bytes = match std::fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let checkpoint = serde_json::from_slice(&bytes).map_err(|e| {
            EngineError::Checkpoint(format!("{}: {e}", self.path.display()))
        })?;
        Ok(Some(checkpoint))
    }

    fn save(&self, checkpoint: &Checkpoint) -> Result<()> {
        let dir = match self.path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        let json = serde_json::to_vec_pretty(checkpoint)
            .map_err(|e| EngineError::Checkpoint(e.to_string()))?;

        let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
        tmp.write_all(&json)?;
        tmp.as_file().sync_all()?;
        tmp.persist(&self.path).map_err(|e| EngineError::Io(e.error))?;
        debug!(path = %self.path.display(), run_id = %checkpoint.run_id, "checkpoint saved");
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// Keeps the checkpoint in memory; used when no checkpoint file is
/// configured.
#[derive(Debug, Default)]
pub struct InMemoryCheckpointStore {
    slot: Mutex<Option<Checkpoint>>,
}

impl InMemoryCheckpointStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CheckpointStore for InMemoryCheckpointStore {
    fn load(&self) -> Result<Option<Checkpoint>> {
        let slot = self
            .slot
            .lock()
            .map_err(|e| EngineError::Checkpoint(format!("lock poisoned: {e}")))?;
        Ok(slot.clone())
    }

    fn save(&self, checkpoint: &Checkpoint) -> Result<()> {
        let mut slot = self
            .slot
            .lock()
            .map_err(|e| EngineError::Checkpoint(format!("lock poisoned: {e}")))?;
        *slot = Some(checkpoint.clone());
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        let mut slot = self
            .slot
            .lock()
            .map_err(|e| EngineError::Checkpoint(format!("lock poisoned: {e}")))?;
        *slot = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queue::{QueueBuilder, Selection};

    fn queue(entries: &[&str]) -> Queue {
        QueueBuilder::new(Selection::parse(entries).unwrap()).build().unwrap()
    }

    #[test]
    fn progress_tracking() {
        let q = queue(&["user", "user.group"]);
        let mut cp = Checkpoint::new(&q);
        assert_eq!(cp.resume_offset(ObjectType::UserGroup), 0);

        cp.advance(ObjectType::UserGroup, 500);
        assert_eq!(cp.resume_offset(ObjectType::UserGroup), 500);
        assert_eq!(cp.resume_offset(ObjectType::User), 0);

        cp.complete(ObjectType::UserGroup);
        assert!(cp.is_completed(ObjectType::UserGroup));
        assert_eq!(cp.current, None);
        assert!(!cp.is_finished(&q));
        cp.complete(ObjectType::User);
        cp.complete(ObjectType::User);
        assert_eq!(cp.completed.len(), 2);
        assert!(cp.is_finished(&q));
    }

    #[test]
    fn verify_rejects_other_queues() {
        let cp = Checkpoint::new(&queue(&["user"]));
        cp.verify(&queue(&["user"])).unwrap();
        let err = cp.verify(&queue(&["board"])).unwrap_err();
        assert!(matches!(err, EngineError::CheckpointMismatch { run_id } if run_id == cp.run_id));
    }

    #[test]
    fn file_store_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileCheckpointStore::new(dir.path().join("run.json"));
        assert_eq!(store.load().unwrap(), None);

        let mut cp = Checkpoint::new(&queue(&["board"]));
        cp.complete(ObjectType::Board);
        cp.advance(ObjectType::Thread, 1000);
        store.save(&cp).unwrap();
        store.save(&cp).unwrap();
        assert_eq!(store.load().unwrap(), Some(cp));

        store.clear().unwrap();
        assert_eq!(store.load().unwrap(), None);
        store.clear().unwrap();
    }

    #[test]
    fn corrupt_file_is_a_checkpoint_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("run.json");
        std::fs::write(&path, b"{not json").unwrap();
        let err = FileCheckpointStore::new(&path).load().unwrap_err();
        assert!(matches!(err, EngineError::Checkpoint(_)));
    }

    #[test]
    fn memory_store() {
        let store = InMemoryCheckpointStore::new();
        let cp = Checkpoint::new(&queue(&["smiley"]));
        store.save(&cp).unwrap();
        assert_eq!(store.load().unwrap(), Some(cp));
        store.clear().unwrap();
        assert_eq!(store.load().unwrap(), None);
    }
}
