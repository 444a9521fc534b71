use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::id::SourceId;
use crate::object_type::ObjectType;
use crate::value::{FieldMap, FieldValue};

/// Kind of nested association carried by a record.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssociationKind {
    /// Additional group memberships of a user.
    GroupMembership,
    /// Labels assigned to a thread or conversation.
    LabelAssignment,
}

/// A request to link the record to other already-imported records.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Association {
    pub kind: AssociationKind,
    /// Object type the referenced ids belong to.
    pub target: ObjectType,
    pub source_ids: Vec<SourceId>,
}

/// A legacy password hash as stored by the source platform.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LegacyCredential {
    /// Scheme tag declared by the connector (e.g. `"vb3"`, `"pbkdf2"`).
    pub scheme: String,
    pub hash: String,
    #[serde(default)]
    pub salt: String,
    /// Algorithm parameters such as `iterations` or `length`.
    #[serde(default)]
    pub params: BTreeMap<String, String>,
}

impl LegacyCredential {
    pub fn new(scheme: impl Into<String>, hash: impl Into<String>) -> Self {
        Self {
            scheme: scheme.into(),
            hash: hash.into(),
            ..Default::default()
        }
    }

    pub fn with_salt(mut self, salt: impl Into<String>) -> Self {
        self.salt = salt.into();
        self
    }

    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }
}

/// One record produced by a source connector.
///
/// Field names follow the canonical schema of the record's object type. Values
/// of reference fields hold *source* ids; the engine rewrites them to
/// destination ids before import.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportRecord {
    /// Platform-native id; absent for pure relation rows.
    pub source_id: Option<SourceId>,
    pub fields: FieldMap,
    /// Auxiliary data that is not a canonical field (file paths, hints).
    #[serde(default)]
    pub aux: FieldMap,
    #[serde(default)]
    pub associations: Vec<Association>,
    /// Legacy credential, for user records.
    #[serde(default)]
    pub credential: Option<LegacyCredential>,
}

impl ExportRecord {
    /// A record with a natural source identity. Numeric text ids are
    /// normalized the same way references are.
    pub fn new(source_id: impl Into<SourceId>) -> Self {
        Self {
            source_id: Some(source_id.into().normalize()),
            ..Default::default()
        }
    }

    /// A pure relation record without per-row identity.
    pub fn relation() -> Self {
        Self::default()
    }

    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    pub fn with_aux(mut self, name: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.aux.insert(name.into(), value.into());
        self
    }

    pub fn with_association(
        mut self,
        kind: AssociationKind,
        target: ObjectType,
        source_ids: Vec<SourceId>,
    ) -> Self {
        self.associations.push(Association {
            kind,
            target,
            source_ids,
        });
        self
    }

    pub fn with_credential(mut self, credential: LegacyCredential) -> Self {
        self.credential = Some(credential);
        self
    }

    pub fn field(&self, name: &str) -> Option<&FieldValue> {
        self.fields.get(name)
    }

    /// The source id when it denotes a real per-row identity.
    ///
    /// Returns `None` for relation rows (`0`, `""`, or absent).
    pub fn identity(&self) -> Option<&SourceId> {
        self.source_id.as_ref().filter(|id| !id.is_relation())
    }
}
