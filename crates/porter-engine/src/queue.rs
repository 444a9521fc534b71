//! Dependency queue: from a category selection to an ordered list of types.
//!
//! The selection is expanded to object types, then ordered by a
//! topological sort over descriptor prerequisites in which the ready set is
//! always drained lowest-precedence first. The result is deterministic for a
//! given selection and consistent with every prerequisite that is part of it.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::warn;

use porter_source::Capabilities;
use porter_types::{Category, ObjectType};

use crate::error::QueueError;

/// Selected categories and sub-features.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Selection {
    categories: BTreeSet<Category>,
    features: BTreeSet<(Category, &'static str)>,
}

impl Selection {
    /// Parse entries such as `"user"`, `"user.avatar"` or `"board.like"`.
    pub fn parse<I, S>(entries: I) -> Result<Self, QueueError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut selection = Self::default();
        for entry in entries {
            let entry = entry.as_ref().trim();
            match entry.split_once('.') {
                None => {
                    let category = parse_category(entry)?;
                    selection.categories.insert(category);
                }
                Some((category, feature)) => {
                    let category = parse_category(category)?;
                    let feature = category
                        .sub_feature(feature)
                        .map_err(|_| QueueError::UnknownSubFeature(entry.to_string()))?;
                    selection.features.insert((category, feature.name));
                }
            }
        }
        Ok(selection)
    }

    /// Select every category with all of its sub-features.
    pub fn everything() -> Self {
        let mut selection = Self::default();
        for category in Category::ALL {
            selection.categories.insert(category);
            for feature in category.sub_features() {
                selection.features.insert((category, feature.name));
            }
        }
        selection
    }

    pub fn categories(&self) -> impl Iterator<Item = Category> + '_ {
        self.categories.iter().copied()
    }

    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }
}

fn parse_category(name: &str) -> Result<Category, QueueError> {
    name.parse()
        .map_err(|_| QueueError::UnknownCategory(name.to_string()))
}

/// The ordered object types of one run.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Queue {
    types: Vec<ObjectType>,
}

impl Queue {
    pub fn as_slice(&self) -> &[ObjectType] {
        &self.types
    }

    pub fn iter(&self) -> impl Iterator<Item = ObjectType> + '_ {
        self.types.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    pub fn contains(&self, object_type: ObjectType) -> bool {
        self.types.contains(&object_type)
    }

    /// BLAKE3 hex digest of the tag sequence; identifies the queue in
    /// checkpoints.
    pub fn fingerprint(&self) -> String {
        let mut hasher = blake3::Hasher::new();
        for ty in &self.types {
            hasher.update(ty.as_str().as_bytes());
            hasher.update(b"\n");
        }
        hasher.finalize().to_hex().to_string()
    }
}

impl fmt::Display for Queue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tags: Vec<&str> = self.types.iter().map(ObjectType::as_str).collect();
        f.write_str(&tags.join(" -> "))
    }
}

/// Builds a [`Queue`] from a [`Selection`].
#[derive(Clone, Debug)]
pub struct QueueBuilder {
    selection: Selection,
    capabilities: Option<Capabilities>,
}

impl QueueBuilder {
    pub fn new(selection: Selection) -> Self {
        Self {
            selection,
            capabilities: None,
        }
    }

    /// Restrict the queue to what the source can export.
    ///
    /// A selected category the source does not support is an error; an
    /// unsupported sub-feature is dropped with a warning.
    pub fn with_capabilities(mut self, capabilities: Capabilities) -> Self {
        self.capabilities = Some(capabilities);
        self
    }

    pub fn build(&self) -> Result<Queue, QueueError> {
        let types = self.selected_types()?;
        let types = order_types(&types, |ty| ty.descriptor().prerequisites.to_vec())?;
        Ok(Queue { types })
    }

    fn selected_types(&self) -> Result<BTreeSet<ObjectType>, QueueError> {
        let mut types = BTreeSet::new();
        for category in self.selection.categories() {
            if let Some(caps) = &self.capabilities {
                if !caps.supports_category(category) {
                    return Err(QueueError::UnsupportedCategory(category));
                }
            }
            types.extend(category.primary().iter().copied());
        }

        for &(category, name) in &self.selection.features {
            if !self.selection.categories.contains(&category) {
                warn!(category = %category, feature = name, "sub-feature selected without its category; skipped");
                continue;
            }
            if let Some(caps) = &self.capabilities {
                if !caps.supports_sub_feature(category, name) {
                    warn!(category = %category, feature = name, "sub-feature not supported by the source; skipped");
                    continue;
                }
            }
            if let Ok(feature) = category.sub_feature(name) {
                types.extend(feature.object_types.iter().copied());
            }
        }
        Ok(types)
    }
}

/// Topologically order `types` by `prerequisites`, breaking ties by
/// precedence.
///
/// Prerequisites outside `types` are ignored.
pub fn order_types<F>(
    types: &BTreeSet<ObjectType>,
    prerequisites: F,
) -> Result<Vec<ObjectType>, QueueError>
where
    F: Fn(ObjectType) -> Vec<ObjectType>,
{
    let mut pending: BTreeMap<ObjectType, usize> = BTreeMap::new();
    let mut dependents: BTreeMap<ObjectType, Vec<ObjectType>> = BTreeMap::new();
    for &ty in types {
        let required: BTreeSet<ObjectType> = prerequisites(ty)
            .into_iter()
            .filter(|p| types.contains(p) && *p != ty)
            .collect();
        pending.insert(ty, required.len());
        for p in required {
            dependents.entry(p).or_default().push(ty);
        }
    }

    // ObjectType's ordering is its precedence.
    let mut ready: BTreeSet<ObjectType> = pending
        .iter()
        .filter(|(_, n)| **n == 0)
        .map(|(ty, _)| *ty)
        .collect();
    let mut order = Vec::with_capacity(types.len());
    while let Some(ty) = ready.pop_first() {
        order.push(ty);
        for &dependent in dependents.get(&ty).map(Vec::as_slice).unwrap_or_default() {
            if let Some(n) = pending.get_mut(&dependent) {
                *n -= 1;
                if *n == 0 {
                    ready.insert(dependent);
                }
            }
        }
    }

    if order.len() < types.len() {
        let stuck = types.iter().copied().filter(|t| !order.contains(t)).collect();
        return Err(QueueError::Cycle(stuck));
    }
    Ok(order)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ObjectType::*;

    fn build(entries: &[&str]) -> Vec<ObjectType> {
        let selection = Selection::parse(entries).unwrap();
        QueueBuilder::new(selection).build().unwrap().as_slice().to_vec()
    }

    fn before(order: &[ObjectType], a: ObjectType, b: ObjectType) -> bool {
        let pos = |t| order.iter().position(|x| *x == t).unwrap();
        pos(a) < pos(b)
    }

    #[test]
    fn users_with_groups_and_avatars() {
        assert_eq!(
            build(&["user", "user.group", "user.avatar"]),
            vec![UserGroup, User, UserAvatar]
        );
    }

    #[test]
    fn full_board_order() {
        let order = build(&["user", "board", "board.label", "board.like", "board.attachment", "board.poll"]);
        assert!(before(&order, User, Thread));
        assert!(before(&order, Board, Label));
        assert!(before(&order, Label, Thread));
        assert!(before(&order, Thread, Post));
        assert!(before(&order, Post, PostLike));
        assert!(before(&order, Post, PostAttachment));
        assert!(before(&order, Poll, PollOption));
        assert!(before(&order, PollOption, PollOptionVote));
    }

    #[test]
    fn conversations_order() {
        let order = build(&["conversation", "conversation.attachment", "conversation.label", "user"]);
        assert_eq!(
            order,
            vec![
                User,
                ConversationLabel,
                Conversation,
                ConversationMessage,
                ConversationParticipant,
                ConversationAttachment
            ]
        );
    }

    #[test]
    fn orphaned_sub_features_are_dropped() {
        assert_eq!(build(&["board", "user.avatar"]), vec![Board, Thread, Post]);
    }

    #[test]
    fn deterministic_regardless_of_entry_order() {
        let a = build(&["user", "board", "board.like", "user.group"]);
        let b = build(&["board.like", "user.group", "board", "user"]);
        assert_eq!(a, b);
    }

    #[test]
    fn every_selection_respects_prerequisites() {
        let queue = QueueBuilder::new(Selection::everything()).build().unwrap();
        assert_eq!(queue.len(), ObjectType::ALL.len());
        for (i, ty) in queue.iter().enumerate() {
            for p in ty.descriptor().prerequisites {
                let j = queue.as_slice().iter().position(|t| t == p).unwrap();
                assert!(j < i, "{p} must precede {ty}");
            }
        }
    }

    #[test]
    fn unknown_entries_are_errors() {
        assert_eq!(
            Selection::parse(["forum"]).unwrap_err(),
            QueueError::UnknownCategory("forum".into())
        );
        assert_eq!(
            Selection::parse(["board.karma"]).unwrap_err(),
            QueueError::UnknownSubFeature("board.karma".into())
        );
    }

    #[test]
    fn capabilities_limit_the_queue() {
        let caps = Capabilities::from_types([User, UserGroup, Board, Thread, Post]);
        let selection = Selection::parse(["user", "user.group", "user.avatar", "board", "board.like"]).unwrap();
        let queue = QueueBuilder::new(selection).with_capabilities(caps.clone()).build().unwrap();
        assert_eq!(queue.as_slice(), &[UserGroup, User, Board, Thread, Post]);

        let convo = Selection::parse(["conversation"]).unwrap();
        assert_eq!(
            QueueBuilder::new(convo).with_capabilities(caps).build().unwrap_err(),
            QueueError::UnsupportedCategory(Category::Conversation)
        );
    }

    #[test]
    fn cycles_are_reported() {
        let types: BTreeSet<_> = [Board, Label, Thread].into_iter().collect();
        let err = order_types(&types, |ty| match ty {
            Board => vec![Thread],
            Label => vec![Board],
            Thread => vec![Label],
            _ => vec![],
        })
        .unwrap_err();
        assert_eq!(err, QueueError::Cycle(vec![Board, Label, Thread]));
    }

    const ENTRIES: &[&str] = &[
        "user", "user.group", "user.rank", "user.option", "user.avatar", "user.follower",
        "board", "board.label", "board.attachment", "board.poll", "board.like",
        "conversation", "conversation.label", "conversation.attachment", "smiley",
    ];

    proptest::proptest! {
        #[test]
        fn any_selection_is_ordered(picked in proptest::sample::subsequence(ENTRIES.to_vec(), 1..=ENTRIES.len())) {
            let queue = QueueBuilder::new(Selection::parse(&picked).unwrap()).build().unwrap();
            for (i, ty) in queue.iter().enumerate() {
                for p in ty.descriptor().prerequisites {
                    if let Some(j) = queue.as_slice().iter().position(|t| t == p) {
                        proptest::prop_assert!(j < i, "{} must precede {}", p, ty);
                    }
                }
            }
            let mut reversed = picked.clone();
            reversed.reverse();
            let again = QueueBuilder::new(Selection::parse(&reversed).unwrap()).build().unwrap();
            proptest::prop_assert_eq!(queue, again);
        }
    }

    #[test]
    fn fingerprint_tracks_order() {
        let a = QueueBuilder::new(Selection::parse(["user"]).unwrap()).build().unwrap();
        let b = QueueBuilder::new(Selection::parse(["user", "user.group"]).unwrap()).build().unwrap();
        assert_eq!(a.fingerprint(), a.clone().fingerprint());
        assert_ne!(a.fingerprint(), b.fingerprint());
        assert_eq!(b.to_string(), "user.group -> user");
    }
}
