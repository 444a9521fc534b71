//! In-memory import sink for tests and dry runs.
//!
//! [`InMemoryImportSink`] keeps every imported record, the id mapping and
//! the attached credentials behind one `RwLock`. It allocates destination
//! ids per object type starting at 1 and declines records that lack a
//! required field, the way a destination rejects invalid rows.

use std::collections::BTreeMap;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use tracing::debug;

use porter_credential::TaggedCredential;
use porter_types::{DestinationId, FieldMap, FieldValue, ObjectType, SourceId};

use crate::error::{Result, SinkError};
use crate::idmap::IdMap;
use crate::record::{ImportRecord, ResolvedAssociation};
use crate::traits::ImportSink;

/// A record as the in-memory destination holds it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StoredRecord {
    pub source_id: Option<SourceId>,
    pub fields: FieldMap,
    pub aux: FieldMap,
    pub associations: Vec<ResolvedAssociation>,
    pub credential: Option<TaggedCredential>,
}

impl StoredRecord {
    pub fn field(&self, name: &str) -> Option<&FieldValue> {
        self.fields.get(name)
    }
}

#[derive(Debug, Default)]
struct State {
    next_id: BTreeMap<ObjectType, u64>,
    records: BTreeMap<ObjectType, BTreeMap<DestinationId, StoredRecord>>,
    ids: IdMap,
    declined: BTreeMap<ObjectType, usize>,
    imports: usize,
}

/// An [`ImportSink`] that keeps everything in memory.
#[derive(Debug)]
pub struct InMemoryImportSink {
    state: RwLock<State>,
    required: BTreeMap<ObjectType, Vec<String>>,
}

impl InMemoryImportSink {
    /// A sink that requires a non-empty `username` on users.
    pub fn new() -> Self {
        Self {
            state: RwLock::new(State::default()),
            required: BTreeMap::new(),
        }
        .require(ObjectType::User, "username")
    }

    /// Decline records of `object_type` whose `field` is null or empty.
    pub fn require(mut self, object_type: ObjectType, field: &str) -> Self {
        self.required
            .entry(object_type)
            .or_default()
            .push(field.to_string());
        self
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, State>> {
        self.state
            .read()
            .map_err(|e| SinkError::Unavailable(format!("lock poisoned: {e}")))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, State>> {
        self.state
            .write()
            .map_err(|e| SinkError::Unavailable(format!("lock poisoned: {e}")))
    }

    fn snapshot(&self) -> RwLockReadGuard<'_, State> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn missing_field(&self, record: &ImportRecord) -> Option<&str> {
        self.required
            .get(&record.object_type)?
            .iter()
            .find(|name| record.fields.get(name.as_str()).map_or(true, is_blank))
            .map(String::as_str)
    }

    pub fn record(&self, object_type: ObjectType, id: DestinationId) -> Option<StoredRecord> {
        self.snapshot().records.get(&object_type)?.get(&id).cloned()
    }

    /// All records of `object_type` in destination id order.
    pub fn records(&self, object_type: ObjectType) -> Vec<(DestinationId, StoredRecord)> {
        self.snapshot()
            .records
            .get(&object_type)
            .map(|m| m.iter().map(|(id, r)| (*id, r.clone())).collect())
            .unwrap_or_default()
    }

    /// Record with the given source id, looked up through the id mapping.
    pub fn find(&self, object_type: ObjectType, source_id: &SourceId) -> Option<StoredRecord> {
        let state = self.snapshot();
        let id = state.ids.get(object_type, source_id)?;
        state.records.get(&object_type)?.get(&id).cloned()
    }

    pub fn len(&self, object_type: ObjectType) -> usize {
        self.snapshot().records.get(&object_type).map_or(0, BTreeMap::len)
    }

    pub fn is_empty(&self) -> bool {
        self.snapshot().records.values().all(BTreeMap::is_empty)
    }

    /// Records of `object_type` the sink declined.
    pub fn declined(&self, object_type: ObjectType) -> usize {
        self.snapshot().declined.get(&object_type).copied().unwrap_or(0)
    }

    /// Total `import` calls, accepted or not.
    pub fn import_calls(&self) -> usize {
        self.snapshot().imports
    }
}

impl Default for InMemoryImportSink {
    fn default() -> Self {
        Self::new()
    }
}

impl ImportSink for InMemoryImportSink {
    fn import(&self, record: &ImportRecord) -> Result<Option<DestinationId>> {
        let ty = record.object_type;
        let missing = self.missing_field(record).map(str::to_string);

        let mut guard = self.write()?;
        let state = &mut *guard;
        state.imports += 1;

        if let Some(field) = missing {
            debug!(object = %ty, source_id = ?record.source_id, field = %field, "record declined");
            *state.declined.entry(ty).or_insert(0) += 1;
            return Ok(None);
        }

        if let Some(source_id) = record.identity() {
            if let Some(existing) = state.ids.get(ty, source_id) {
                if let Some(stored) = state.records.get_mut(&ty).and_then(|m| m.get_mut(&existing)) {
                    stored.fields = record.fields.clone();
                    stored.aux = record.aux.clone();
                    stored.associations = record.associations.clone();
                }
                return Ok(Some(existing));
            }
        }

        let next = state.next_id.entry(ty).or_insert(0);
        *next += 1;
        let id = DestinationId::new(*next);
        if let Some(source_id) = record.identity() {
            state.ids.insert(ty, source_id.clone(), id)?;
        }
        state.records.entry(ty).or_default().insert(
            id,
            StoredRecord {
                source_id: record.source_id.clone(),
                fields: record.fields.clone(),
                aux: record.aux.clone(),
                associations: record.associations.clone(),
                credential: None,
            },
        );
        Ok(Some(id))
    }

    fn lookup(&self, object_type: ObjectType, source_id: &SourceId) -> Result<Option<DestinationId>> {
        Ok(self.read()?.ids.get(object_type, source_id))
    }

    fn update_credential(&self, user: DestinationId, credential: &TaggedCredential) -> Result<()> {
        let mut state = self.write()?;
        let stored = state
            .records
            .get_mut(&ObjectType::User)
            .and_then(|m| m.get_mut(&user))
            .ok_or(SinkError::UnknownRecord {
                object: ObjectType::User,
                id: user,
            })?;
        stored.credential = Some(credential.clone());
        Ok(())
    }
}

fn is_blank(value: &FieldValue) -> bool {
    match value {
        FieldValue::Null => true,
        FieldValue::Text(s) => s.trim().is_empty(),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use porter_types::AssociationKind;

    fn user(id: i64, name: &str) -> ImportRecord {
        let mut fields = FieldMap::new();
        fields.insert("username".into(), FieldValue::from(name));
        ImportRecord::new(ObjectType::User, Some(SourceId::Int(id)), fields)
    }

    #[test]
    fn import_is_idempotent_per_source_id() {
        let sink = InMemoryImportSink::new();
        let first = sink.import(&user(7, "alice")).unwrap().unwrap();
        let again = sink.import(&user(7, "alice2")).unwrap().unwrap();
        assert_eq!(first, again);
        assert_eq!(sink.len(ObjectType::User), 1);
        assert_eq!(
            sink.record(ObjectType::User, first).unwrap().field("username"),
            Some(&FieldValue::from("alice2"))
        );
        assert_eq!(sink.import_calls(), 2);
    }

    #[test]
    fn lookup_is_stable() {
        let sink = InMemoryImportSink::new();
        let id = sink.import(&user(3, "bob")).unwrap();
        for _ in 0..3 {
            assert_eq!(sink.lookup(ObjectType::User, &SourceId::Int(3)).unwrap(), id);
        }
        assert_eq!(sink.lookup(ObjectType::User, &SourceId::Int(4)).unwrap(), None);
        assert_eq!(sink.lookup(ObjectType::Board, &SourceId::Int(3)).unwrap(), None);
    }

    #[test]
    fn relation_rows_always_allocate() {
        let sink = InMemoryImportSink::new();
        let like = ImportRecord::new(ObjectType::PostLike, None, FieldMap::new());
        let a = sink.import(&like).unwrap().unwrap();
        let b = sink.import(&like).unwrap().unwrap();
        assert_ne!(a, b);
        assert_eq!(sink.len(ObjectType::PostLike), 2);
        assert_eq!(sink.lookup(ObjectType::PostLike, &SourceId::Int(0)).unwrap(), None);
    }

    #[test]
    fn invalid_records_are_declined() {
        let sink = InMemoryImportSink::new().require(ObjectType::Board, "title");
        assert_eq!(sink.import(&user(1, "  ")).unwrap(), None);
        let board = ImportRecord::new(ObjectType::Board, Some(SourceId::Int(1)), FieldMap::new());
        assert_eq!(sink.import(&board).unwrap(), None);
        assert_eq!(sink.declined(ObjectType::User), 1);
        assert_eq!(sink.declined(ObjectType::Board), 1);
        assert!(sink.is_empty());
    }

    #[test]
    fn credentials_attach_to_existing_users() {
        let sink = InMemoryImportSink::new();
        let id = sink.import(&user(1, "carol")).unwrap().unwrap();
        let cred: TaggedCredential = "md5:5f4dcc3b5aa765d61d8327deb882cf99:".parse().unwrap();
        sink.update_credential(id, &cred).unwrap();
        assert_eq!(sink.record(ObjectType::User, id).unwrap().credential, Some(cred.clone()));

        let err = sink.update_credential(DestinationId::new(99), &cred).unwrap_err();
        assert!(matches!(err, SinkError::UnknownRecord { .. }));
    }

    #[test]
    fn associations_are_kept() {
        let sink = InMemoryImportSink::new();
        let mut record = user(2, "dave");
        record.associations.push(ResolvedAssociation {
            kind: AssociationKind::GroupMembership,
            target: ObjectType::UserGroup,
            destination_ids: vec![DestinationId::new(4)],
        });
        sink.import(&record).unwrap();
        let stored = sink.find(ObjectType::User, &SourceId::Int(2)).unwrap();
        assert_eq!(stored.associations.len(), 1);
    }
}
