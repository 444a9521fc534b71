//! Foreign-key resolution against the sink's id mapping.

use tracing::debug;

use porter_sink::{ImportSink, ResolvedAssociation, Result};
use porter_types::{
    Association, DestinationId, Fallback, FieldKind, FieldMap, FieldValue, ObjectType, Reference,
    Schema,
};

/// A field map whose references hold destination ids.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Resolution {
    pub fields: FieldMap,
    pub associations: Vec<ResolvedAssociation>,
    /// References that named a source record with no destination id.
    pub unresolved: usize,
}

/// Rewrites source-id references into destination ids.
///
/// An unresolved reference never fails the record: the field receives its
/// declared fallback (null, or the configured fallback board) and the miss
/// is counted.
pub struct ReferenceResolver<'a> {
    sink: &'a dyn ImportSink,
    fallback_board: DestinationId,
}

impl<'a> ReferenceResolver<'a> {
    pub fn new(sink: &'a dyn ImportSink, fallback_board: DestinationId) -> Self {
        Self {
            sink,
            fallback_board,
        }
    }

    pub fn resolve(
        &self,
        object_type: ObjectType,
        mut fields: FieldMap,
        associations: &[Association],
    ) -> Result<Resolution> {
        let mut unresolved = 0;
        for (spec, reference) in Schema::of(object_type).references() {
            let value = fields.remove(spec.name).unwrap_or(FieldValue::Null);
            let resolved = if spec.kind == FieldKind::IdList {
                let items = value.as_list().unwrap_or_default();
                let mut ids = Vec::with_capacity(items.len());
                for item in items {
                    match self.lookup_value(reference.target, item)? {
                        Lookup::Found(id) => ids.push(id_value(id)),
                        Lookup::Missing => unresolved += 1,
                        Lookup::Empty => {}
                    }
                }
                FieldValue::List(ids)
            } else {
                match self.lookup_value(reference.target, &value)? {
                    Lookup::Found(id) => id_value(id),
                    Lookup::Missing => {
                        debug!(
                            object = %object_type,
                            field = spec.name,
                            target = %reference.target,
                            value = ?value,
                            "unresolved reference; using fallback"
                        );
                        unresolved += 1;
                        self.fallback(reference)
                    }
                    Lookup::Empty => self.fallback(reference),
                }
            };
            fields.insert(spec.name.to_string(), resolved);
        }

        let mut resolved_associations = Vec::with_capacity(associations.len());
        for association in associations {
            let mut destination_ids = Vec::with_capacity(association.source_ids.len());
            for source_id in &association.source_ids {
                match self.sink.lookup(association.target, source_id)? {
                    Some(id) => destination_ids.push(id),
                    None => unresolved += 1,
                }
            }
            resolved_associations.push(ResolvedAssociation {
                kind: association.kind,
                target: association.target,
                destination_ids,
            });
        }

        Ok(Resolution {
            fields,
            associations: resolved_associations,
            unresolved,
        })
    }

    fn lookup_value(&self, target: ObjectType, value: &FieldValue) -> Result<Lookup> {
        let Some(source_id) = value.to_source_id() else {
            return Ok(Lookup::Empty);
        };
        Ok(match self.sink.lookup(target, &source_id)? {
            Some(id) => Lookup::Found(id),
            None => Lookup::Missing,
        })
    }

    fn fallback(&self, reference: Reference) -> FieldValue {
        match reference.fallback {
            Fallback::Null => FieldValue::Null,
            Fallback::DefaultBoard => id_value(self.fallback_board),
        }
    }
}

enum Lookup {
    Found(DestinationId),
    Missing,
    /// No reference at all (null, `0`, `""`).
    Empty,
}

fn id_value(id: DestinationId) -> FieldValue {
    FieldValue::Int(i64::try_from(id.get()).unwrap_or(i64::MAX))
}

#[cfg(test)]
mod tests {
    use super::*;
    use porter_sink::{ImportRecord, InMemoryImportSink};
    use porter_types::{AssociationKind, SourceId};

    fn sink_with_board(source: i64) -> (InMemoryImportSink, DestinationId) {
        let sink = InMemoryImportSink::new();
        let mut fields = FieldMap::new();
        fields.insert("title".into(), "News".into());
        let id = sink
            .import(&ImportRecord::new(ObjectType::Board, Some(SourceId::Int(source)), fields))
            .unwrap()
            .unwrap();
        (sink, id)
    }

    #[test]
    fn resolves_known_references() {
        let (sink, board) = sink_with_board(12);
        let resolver = ReferenceResolver::new(&sink, DestinationId::new(1));
        let mut fields = FieldMap::new();
        fields.insert("boardID".into(), FieldValue::Int(12));
        fields.insert("userID".into(), FieldValue::Null);
        let r = resolver.resolve(ObjectType::Thread, fields, &[]).unwrap();
        assert_eq!(r.fields["boardID"], FieldValue::Int(board.get() as i64));
        assert_eq!(r.fields["userID"], FieldValue::Null);
        assert_eq!(r.unresolved, 0);
    }

    #[test]
    fn missing_board_falls_back_to_default() {
        let (sink, _) = sink_with_board(12);
        let resolver = ReferenceResolver::new(&sink, DestinationId::new(1));
        let mut fields = FieldMap::new();
        fields.insert("boardID".into(), FieldValue::Int(99));
        fields.insert("userID".into(), FieldValue::Int(5));
        let r = resolver.resolve(ObjectType::Thread, fields, &[]).unwrap();
        assert_eq!(r.fields["boardID"], FieldValue::Int(1));
        assert_eq!(r.fields["userID"], FieldValue::Null);
        assert_eq!(r.unresolved, 2);
    }

    #[test]
    fn id_lists_keep_resolved_members() {
        let sink = InMemoryImportSink::new();
        let group = sink
            .import(&ImportRecord::new(ObjectType::UserGroup, Some(SourceId::Int(4)), FieldMap::new()))
            .unwrap()
            .unwrap();
        let resolver = ReferenceResolver::new(&sink, DestinationId::new(1));
        let mut fields = FieldMap::new();
        fields.insert("groupIDs".into(), FieldValue::List(vec![4.into(), 8.into(), 0.into()]));
        let r = resolver.resolve(ObjectType::User, fields, &[]).unwrap();
        assert_eq!(r.fields["groupIDs"], FieldValue::List(vec![FieldValue::Int(group.get() as i64)]));
        assert_eq!(r.unresolved, 1);
    }

    #[test]
    fn associations_are_resolved() {
        let sink = InMemoryImportSink::new();
        let group = sink
            .import(&ImportRecord::new(ObjectType::UserGroup, Some(SourceId::Int(3)), FieldMap::new()))
            .unwrap()
            .unwrap();
        let resolver = ReferenceResolver::new(&sink, DestinationId::new(1));
        let association = Association {
            kind: AssociationKind::GroupMembership,
            target: ObjectType::UserGroup,
            source_ids: vec![SourceId::Int(3), SourceId::Int(30)],
        };
        let r = resolver
            .resolve(ObjectType::User, FieldMap::new(), &[association])
            .unwrap();
        assert_eq!(r.associations[0].destination_ids, vec![group]);
        assert_eq!(r.unresolved, 1);
    }
}
