//! Object-type tags and their descriptors.
//!
//! The declaration order of [`ObjectType`] is the fixed precedence table used
//! to break ties when the dependency queue is built: groups before users
//! before avatars, boards before labels before threads before posts before
//! attachments, polls and likes, conversations before messages before
//! participants before attachments.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// Default number of records requested per chunk.
pub const DEFAULT_CHUNK_SIZE: usize = 500;

/// Preferred chunk size for rows that need a file-system lookup.
pub const FILE_CHUNK_SIZE: usize = 100;

/// Preferred chunk size for pure relation rows.
pub const RELATION_CHUNK_SIZE: usize = 1000;

/// A named category of migrated entity.
///
/// Serialized as its stable tag string (e.g. `"conversation.message"`).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ObjectType {
    #[serde(rename = "user.group")]
    UserGroup,
    #[serde(rename = "user.rank")]
    UserRank,
    #[serde(rename = "user.option")]
    UserOption,
    #[serde(rename = "user")]
    User,
    #[serde(rename = "user.avatar")]
    UserAvatar,
    #[serde(rename = "user.follower")]
    UserFollower,
    #[serde(rename = "board")]
    Board,
    #[serde(rename = "label")]
    Label,
    #[serde(rename = "thread")]
    Thread,
    #[serde(rename = "post")]
    Post,
    #[serde(rename = "post.attachment")]
    PostAttachment,
    #[serde(rename = "poll")]
    Poll,
    #[serde(rename = "poll.option")]
    PollOption,
    #[serde(rename = "poll.option.vote")]
    PollOptionVote,
    #[serde(rename = "post.like")]
    PostLike,
    #[serde(rename = "conversation.label")]
    ConversationLabel,
    #[serde(rename = "conversation")]
    Conversation,
    #[serde(rename = "conversation.message")]
    ConversationMessage,
    #[serde(rename = "conversation.participant")]
    ConversationParticipant,
    #[serde(rename = "conversation.attachment")]
    ConversationAttachment,
    #[serde(rename = "smiley")]
    Smiley,
}

impl ObjectType {
    /// Every object type, in precedence order.
    pub const ALL: [ObjectType; 21] = [
        ObjectType::UserGroup,
        ObjectType::UserRank,
        ObjectType::UserOption,
        ObjectType::User,
        ObjectType::UserAvatar,
        ObjectType::UserFollower,
        ObjectType::Board,
        ObjectType::Label,
        ObjectType::Thread,
        ObjectType::Post,
        ObjectType::PostAttachment,
        ObjectType::Poll,
        ObjectType::PollOption,
        ObjectType::PollOptionVote,
        ObjectType::PostLike,
        ObjectType::ConversationLabel,
        ObjectType::Conversation,
        ObjectType::ConversationMessage,
        ObjectType::ConversationParticipant,
        ObjectType::ConversationAttachment,
        ObjectType::Smiley,
    ];

    /// The stable tag string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::UserGroup => "user.group",
            Self::UserRank => "user.rank",
            Self::UserOption => "user.option",
            Self::User => "user",
            Self::UserAvatar => "user.avatar",
            Self::UserFollower => "user.follower",
            Self::Board => "board",
            Self::Label => "label",
            Self::Thread => "thread",
            Self::Post => "post",
            Self::PostAttachment => "post.attachment",
            Self::Poll => "poll",
            Self::PollOption => "poll.option",
            Self::PollOptionVote => "poll.option.vote",
            Self::PostLike => "post.like",
            Self::ConversationLabel => "conversation.label",
            Self::Conversation => "conversation",
            Self::ConversationMessage => "conversation.message",
            Self::ConversationParticipant => "conversation.participant",
            Self::ConversationAttachment => "conversation.attachment",
            Self::Smiley => "smiley",
        }
    }

    /// Position in the fixed precedence table (lower runs earlier).
    pub fn precedence(&self) -> usize {
        *self as usize
    }

    /// Returns `true` for records that carry a file resolved through the
    /// file storage accessor.
    pub fn carries_file(&self) -> bool {
        matches!(
            self,
            Self::UserAvatar | Self::PostAttachment | Self::ConversationAttachment | Self::Smiley
        )
    }

    /// Returns `true` for pure relation rows that have no per-row identity
    /// in the source and are always newly allocated on import.
    pub fn is_relation(&self) -> bool {
        matches!(
            self,
            Self::UserFollower
                | Self::PostLike
                | Self::PollOptionVote
                | Self::ConversationParticipant
        )
    }

    /// The descriptor for this object type.
    pub fn descriptor(&self) -> ObjectTypeDescriptor {
        use ObjectType::*;

        let (label, prerequisites): (&'static str, &'static [ObjectType]) = match self {
            UserGroup => ("User groups", &[]),
            UserRank => ("User ranks", &[UserGroup]),
            UserOption => ("User profile fields", &[]),
            User => ("Users", &[UserGroup, UserRank, UserOption]),
            UserAvatar => ("User avatars", &[User]),
            UserFollower => ("Followers", &[User]),
            Board => ("Boards", &[]),
            Label => ("Labels", &[Board]),
            Thread => ("Threads", &[Board, Label, User]),
            Post => ("Posts", &[Thread, User]),
            PostAttachment => ("Attachments", &[Post, User]),
            Poll => ("Polls", &[Post]),
            PollOption => ("Poll options", &[Poll]),
            PollOptionVote => ("Poll votes", &[PollOption, User]),
            PostLike => ("Likes", &[Post, User]),
            ConversationLabel => ("Conversation labels", &[User]),
            Conversation => ("Conversations", &[User, ConversationLabel]),
            ConversationMessage => ("Conversation messages", &[Conversation, User]),
            ConversationParticipant => (
                "Conversation participants",
                &[Conversation, ConversationMessage, User],
            ),
            ConversationAttachment => (
                "Conversation attachments",
                &[ConversationMessage, ConversationParticipant],
            ),
            Smiley => ("Smilies", &[]),
        };

        let chunk_size = if self.carries_file() {
            Some(FILE_CHUNK_SIZE)
        } else if self.is_relation() {
            Some(RELATION_CHUNK_SIZE)
        } else {
            None
        };

        ObjectTypeDescriptor {
            object_type: *self,
            label,
            prerequisites,
            chunk_size,
        }
    }
}

impl fmt::Display for ObjectType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ObjectType {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| TypeError::UnknownObjectType(s.to_string()))
    }
}

/// Static description of an object type.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ObjectTypeDescriptor {
    pub object_type: ObjectType,
    /// Human-readable label.
    pub label: &'static str,
    /// Tags that must be fully exported before this one, when selected.
    pub prerequisites: &'static [ObjectType],
    /// Preferred chunk size; `None` means the run default.
    pub chunk_size: Option<usize>,
}

impl ObjectTypeDescriptor {
    /// Chunk size to use when no explicit override is configured.
    pub fn effective_chunk_size(&self, default: usize) -> usize {
        self.chunk_size.unwrap_or(default)
    }
}
