//! Top-level categories and their optional sub-features.
//!
//! A selection names categories (`"user"`) and sub-features
//! (`"user.avatar"`). Each maps to the object types it contributes to the
//! dependency queue.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;
use crate::object_type::ObjectType;

/// An optional part of a category that can be selected separately.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SubFeature {
    pub name: &'static str,
    pub object_types: &'static [ObjectType],
}

/// A top-level selectable category.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    User,
    Board,
    Conversation,
    Smiley,
}

const USER_FEATURES: &[SubFeature] = &[
    SubFeature { name: "group", object_types: &[ObjectType::UserGroup] },
    SubFeature { name: "rank", object_types: &[ObjectType::UserRank] },
    SubFeature { name: "option", object_types: &[ObjectType::UserOption] },
    SubFeature { name: "avatar", object_types: &[ObjectType::UserAvatar] },
    SubFeature { name: "follower", object_types: &[ObjectType::UserFollower] },
];

const BOARD_FEATURES: &[SubFeature] = &[
    SubFeature { name: "label", object_types: &[ObjectType::Label] },
    SubFeature { name: "attachment", object_types: &[ObjectType::PostAttachment] },
    SubFeature {
        name: "poll",
        object_types: &[ObjectType::Poll, ObjectType::PollOption, ObjectType::PollOptionVote],
    },
    SubFeature { name: "like", object_types: &[ObjectType::PostLike] },
];

const CONVERSATION_FEATURES: &[SubFeature] = &[
    SubFeature { name: "label", object_types: &[ObjectType::ConversationLabel] },
    SubFeature { name: "attachment", object_types: &[ObjectType::ConversationAttachment] },
];

impl Category {
    pub const ALL: [Category; 4] = [
        Category::User,
        Category::Board,
        Category::Conversation,
        Category::Smiley,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Board => "board",
            Self::Conversation => "conversation",
            Self::Smiley => "smiley",
        }
    }

    /// Object types always queued when the category is selected.
    pub fn primary(&self) -> &'static [ObjectType] {
        match self {
            Self::User => &[ObjectType::User],
            Self::Board => &[ObjectType::Board, ObjectType::Thread, ObjectType::Post],
            Self::Conversation => &[
                ObjectType::Conversation,
                ObjectType::ConversationMessage,
                ObjectType::ConversationParticipant,
            ],
            Self::Smiley => &[ObjectType::Smiley],
        }
    }

    /// Optional sub-features of this category.
    pub fn sub_features(&self) -> &'static [SubFeature] {
        match self {
            Self::User => USER_FEATURES,
            Self::Board => BOARD_FEATURES,
            Self::Conversation => CONVERSATION_FEATURES,
            Self::Smiley => &[],
        }
    }

    /// Look up a sub-feature by name.
    pub fn sub_feature(&self, name: &str) -> Result<&'static SubFeature, TypeError> {
        self.sub_features()
            .iter()
            .find(|f| f.name == name)
            .ok_or_else(|| TypeError::UnknownSubFeature {
                category: self.as_str().to_string(),
                name: name.to_string(),
            })
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| TypeError::UnknownCategory(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_categories() {
        assert_eq!("board".parse::<Category>().unwrap(), Category::Board);
        assert!("forum".parse::<Category>().is_err());
    }

    #[test]
    fn sub_feature_lookup() {
        let poll = Category::Board.sub_feature("poll").unwrap();
        assert_eq!(poll.object_types.len(), 3);
        assert!(Category::Smiley.sub_feature("poll").is_err());
    }

    #[test]
    fn every_object_type_belongs_to_exactly_one_feature() {
        let mut seen = Vec::new();
        for category in Category::ALL {
            seen.extend_from_slice(category.primary());
            for feature in category.sub_features() {
                seen.extend_from_slice(feature.object_types);
            }
        }
        seen.sort();
        let before = seen.len();
        seen.dedup();
        assert_eq!(before, seen.len());
        assert_eq!(seen.len(), ObjectType::ALL.len());
    }
}
