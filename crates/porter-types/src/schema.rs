//! Canonical field-map schemas.
//!
//! Each object type has a fixed list of canonical fields. The schema tells the
//! engine which fields are markup to transcode, which hold foreign keys and
//! what to substitute when a reference cannot be resolved, and which default
//! an absent field receives. A normalized record never leaves a canonical
//! field unset.

use crate::object_type::ObjectType;
use crate::value::{FieldMap, FieldValue};

/// Value kind of a canonical field.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FieldKind {
    Int,
    Bool,
    Text,
    /// Legacy markup, transcoded into the canonical markup.
    Markup,
    /// Unix timestamp in seconds.
    Timestamp,
    /// List of ids.
    IdList,
}

impl FieldKind {
    pub fn default_value(&self) -> FieldValue {
        match self {
            Self::Int | Self::Timestamp => FieldValue::Int(0),
            Self::Bool => FieldValue::Bool(false),
            Self::Text | Self::Markup => FieldValue::Text(String::new()),
            Self::IdList => FieldValue::List(Vec::new()),
        }
    }
}

/// What to write when a referenced parent has no destination id.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Fallback {
    Null,
    /// The configured fallback board ("post to board id 1").
    DefaultBoard,
}

/// A foreign key to another object type.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Reference {
    pub target: ObjectType,
    pub fallback: Fallback,
}

/// One canonical field.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FieldSpec {
    pub name: &'static str,
    pub kind: FieldKind,
    pub reference: Option<Reference>,
}

impl FieldSpec {
    /// Value written when the source has no equivalent.
    ///
    /// Single-valued references default to `Null`, everything else to the
    /// kind's zero value.
    pub fn default_value(&self) -> FieldValue {
        match (self.reference, self.kind) {
            (Some(_), FieldKind::IdList) => FieldValue::List(Vec::new()),
            (Some(_), _) => FieldValue::Null,
            (None, kind) => kind.default_value(),
        }
    }
}

const fn field(name: &'static str, kind: FieldKind) -> FieldSpec {
    FieldSpec {
        name,
        kind,
        reference: None,
    }
}

const fn reference(name: &'static str, target: ObjectType) -> FieldSpec {
    FieldSpec {
        name,
        kind: FieldKind::Int,
        reference: Some(Reference {
            target,
            fallback: Fallback::Null,
        }),
    }
}

const fn id_list(name: &'static str, target: ObjectType) -> FieldSpec {
    FieldSpec {
        name,
        kind: FieldKind::IdList,
        reference: Some(Reference {
            target,
            fallback: Fallback::Null,
        }),
    }
}

use FieldKind::{Bool, Int, Markup, Text, Timestamp};
use ObjectType as T;

const USER_GROUP: &[FieldSpec] = &[
    field("groupName", Text),
    field("groupDescription", Text),
    field("groupType", Int),
];

const USER_RANK: &[FieldSpec] = &[
    reference("groupID", T::UserGroup),
    field("rankTitle", Text),
    field("requiredPoints", Int),
    field("rankImage", Text),
];

const USER_OPTION: &[FieldSpec] = &[
    field("optionName", Text),
    field("optionType", Text),
    field("defaultValue", Text),
    field("required", Bool),
];

const USER: &[FieldSpec] = &[
    field("username", Text),
    field("email", Text),
    field("registrationDate", Timestamp),
    field("lastActivityTime", Timestamp),
    field("banned", Bool),
    field("banReason", Text),
    field("banExpires", Timestamp),
    id_list("groupIDs", T::UserGroup),
    reference("rankID", T::UserRank),
    field("userTitle", Text),
    field("signature", Markup),
];

const USER_AVATAR: &[FieldSpec] = &[
    reference("userID", T::User),
    field("avatarName", Text),
    field("avatarExtension", Text),
    field("width", Int),
    field("height", Int),
];

const USER_FOLLOWER: &[FieldSpec] = &[
    reference("userID", T::User),
    reference("followUserID", T::User),
    field("time", Timestamp),
];

const BOARD: &[FieldSpec] = &[
    reference("parentID", T::Board),
    field("position", Int),
    field("boardType", Int),
    field("title", Text),
    field("description", Text),
    field("externalURL", Text),
];

const LABEL: &[FieldSpec] = &[
    id_list("boardIDs", T::Board),
    field("label", Text),
    field("cssClassName", Text),
];

const THREAD: &[FieldSpec] = &[
    FieldSpec {
        name: "boardID",
        kind: Int,
        reference: Some(Reference {
            target: T::Board,
            fallback: Fallback::DefaultBoard,
        }),
    },
    field("topic", Text),
    field("time", Timestamp),
    reference("userID", T::User),
    field("username", Text),
    field("views", Int),
    field("isSticky", Bool),
    field("isClosed", Bool),
    field("isDeleted", Bool),
    field("deleteTime", Timestamp),
];

const POST: &[FieldSpec] = &[
    reference("threadID", T::Thread),
    reference("userID", T::User),
    field("username", Text),
    field("subject", Text),
    field("message", Markup),
    field("time", Timestamp),
    field("isDeleted", Bool),
    field("deleteTime", Timestamp),
    reference("editorID", T::User),
    field("editor", Text),
    field("lastEditTime", Timestamp),
    field("ipAddress", Text),
];

const POST_ATTACHMENT: &[FieldSpec] = &[
    reference("objectID", T::Post),
    reference("userID", T::User),
    field("filename", Text),
    field("uploadTime", Timestamp),
    field("downloads", Int),
];

const POLL: &[FieldSpec] = &[
    reference("objectID", T::Post),
    field("question", Text),
    field("time", Timestamp),
    field("endTime", Timestamp),
    field("isPublic", Bool),
    field("maxVotes", Int),
];

const POLL_OPTION: &[FieldSpec] = &[
    reference("pollID", T::Poll),
    field("optionValue", Text),
    field("showOrder", Int),
];

const POLL_OPTION_VOTE: &[FieldSpec] = &[
    reference("pollID", T::Poll),
    reference("optionID", T::PollOption),
    reference("userID", T::User),
];

const POST_LIKE: &[FieldSpec] = &[
    reference("objectID", T::Post),
    reference("objectUserID", T::User),
    reference("userID", T::User),
    field("likeValue", Int),
    field("time", Timestamp),
];

const CONVERSATION_LABEL: &[FieldSpec] = &[
    reference("userID", T::User),
    field("label", Text),
    field("cssClassName", Text),
];

const CONVERSATION: &[FieldSpec] = &[
    field("subject", Text),
    field("time", Timestamp),
    reference("userID", T::User),
    field("username", Text),
    field("isClosed", Bool),
];

const CONVERSATION_MESSAGE: &[FieldSpec] = &[
    reference("conversationID", T::Conversation),
    reference("userID", T::User),
    field("username", Text),
    field("message", Markup),
    field("time", Timestamp),
];

const CONVERSATION_PARTICIPANT: &[FieldSpec] = &[
    reference("conversationID", T::Conversation),
    reference("participantID", T::User),
    field("username", Text),
    field("hideConversation", Int),
    field("lastVisitTime", Timestamp),
];

const CONVERSATION_ATTACHMENT: &[FieldSpec] = &[
    reference("objectID", T::ConversationMessage),
    reference("userID", T::User),
    field("filename", Text),
    field("uploadTime", Timestamp),
];

const SMILEY: &[FieldSpec] = &[
    field("smileyTitle", Text),
    field("smileyCode", Text),
    field("aliases", Text),
    field("showOrder", Int),
];

/// The canonical field list of one object type.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Schema {
    pub object_type: ObjectType,
    pub fields: &'static [FieldSpec],
}

impl Schema {
    /// The schema of `object_type`.
    pub fn of(object_type: ObjectType) -> Self {
        let fields = match object_type {
            T::UserGroup => USER_GROUP,
            T::UserRank => USER_RANK,
            T::UserOption => USER_OPTION,
            T::User => USER,
            T::UserAvatar => USER_AVATAR,
            T::UserFollower => USER_FOLLOWER,
            T::Board => BOARD,
            T::Label => LABEL,
            T::Thread => THREAD,
            T::Post => POST,
            T::PostAttachment => POST_ATTACHMENT,
            T::Poll => POLL,
            T::PollOption => POLL_OPTION,
            T::PollOptionVote => POLL_OPTION_VOTE,
            T::PostLike => POST_LIKE,
            T::ConversationLabel => CONVERSATION_LABEL,
            T::Conversation => CONVERSATION,
            T::ConversationMessage => CONVERSATION_MESSAGE,
            T::ConversationParticipant => CONVERSATION_PARTICIPANT,
            T::ConversationAttachment => CONVERSATION_ATTACHMENT,
            T::Smiley => SMILEY,
        };
        Self {
            object_type,
            fields,
        }
    }

    pub fn field(&self, name: &str) -> Option<&'static FieldSpec> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Fields holding foreign keys.
    pub fn references(&self) -> impl Iterator<Item = (&'static FieldSpec, Reference)> {
        self.fields
            .iter()
            .filter_map(|f| f.reference.map(|r| (f, r)))
    }

    /// Fields holding legacy markup.
    pub fn markup_fields(&self) -> impl Iterator<Item = &'static FieldSpec> {
        self.fields.iter().filter(|f| f.kind == FieldKind::Markup)
    }

    /// Fill absent canonical fields with defaults and drop unknown ones.
    ///
    /// Returns the normalized map together with the names of the dropped
    /// fields. A `Null` value on a non-reference field counts as absent.
    pub fn normalize(&self, mut fields: FieldMap) -> (FieldMap, Vec<String>) {
        let mut normalized = FieldMap::new();
        for spec in self.fields {
            let value = match fields.remove(spec.name) {
                Some(FieldValue::Null) if spec.reference.is_none() => spec.default_value(),
                Some(value) => value,
                None => spec.default_value(),
            };
            normalized.insert(spec.name.to_string(), value);
        }
        let dropped = fields.into_keys().collect();
        (normalized, dropped)
    }
}
