use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use porter_types::object_type::DEFAULT_CHUNK_SIZE;
use porter_types::{DestinationId, ObjectType};

use crate::error::{EngineError, Result};
use crate::queue::Selection;

/// Configuration of one migration run.
///
/// Every field has a default, so a TOML file only lists what it changes:
///
/// ```toml
/// selection = ["user", "user.avatar", "board", "board.like"]
/// default_chunk_size = 250
/// checkpoint_path = "run.checkpoint.json"
///
/// [chunk_sizes]
/// post = 200
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MigrationConfig {
    /// Records per chunk when neither an override nor a preference applies.
    pub default_chunk_size: usize,
    /// Per-tag chunk size overrides.
    pub chunk_sizes: BTreeMap<String, usize>,
    /// Categories and sub-features to migrate.
    pub selection: Vec<String>,
    /// JSON checkpoint file; runs are resumable only when set.
    pub checkpoint_path: Option<PathBuf>,
    /// Base directory of avatar and attachment files.
    pub files_root: Option<PathBuf>,
    /// Destination board for threads whose board cannot be resolved.
    pub fallback_board_id: u64,
}

impl Default for MigrationConfig {
    fn default() -> Self {
        Self {
            default_chunk_size: DEFAULT_CHUNK_SIZE,
            chunk_sizes: BTreeMap::new(),
            selection: Vec::new(),
            checkpoint_path: None,
            files_root: None,
            fallback_board_id: 1,
        }
    }
}

impl MigrationConfig {
    /// Parse and validate a TOML document.
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let config: Self = toml::from_str(s).map_err(|e| EngineError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| EngineError::Config(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&content)
    }

    pub fn validate(&self) -> Result<()> {
        if self.default_chunk_size == 0 {
            return Err(EngineError::Config("default_chunk_size must be positive".into()));
        }
        for (tag, size) in &self.chunk_sizes {
            tag.parse::<ObjectType>()
                .map_err(|e| EngineError::Config(format!("chunk_sizes: {e}")))?;
            if *size == 0 {
                return Err(EngineError::Config(format!("chunk_sizes.{tag} must be positive")));
            }
        }
        self.selection()?;
        Ok(())
    }

    /// The parsed selection.
    pub fn selection(&self) -> Result<Selection> {
        Ok(Selection::parse(&self.selection)?)
    }

    /// Chunk size for `object_type`: the override, else the type's
    /// preference, else the default.
    pub fn chunk_size(&self, object_type: ObjectType) -> usize {
        self.chunk_sizes
            .get(object_type.as_str())
            .copied()
            .unwrap_or_else(|| {
                object_type
                    .descriptor()
                    .effective_chunk_size(self.default_chunk_size)
            })
    }

    pub fn fallback_board(&self) -> DestinationId {
        DestinationId::new(self.fallback_board_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::QueueError;

    #[test]
    fn defaults() {
        let config = MigrationConfig::default();
        assert_eq!(config.default_chunk_size, 500);
        assert_eq!(config.fallback_board(), DestinationId::new(1));
        assert!(config.checkpoint_path.is_none());
    }

    #[test]
    fn parse_toml() {
        let config = MigrationConfig::from_toml_str(
            r#"
selection = ["user", "user.avatar", "board"]
default_chunk_size = 250
checkpoint_path = "run.json"
fallback_board_id = 9

[chunk_sizes]
post = 200
"#,
        )
        .unwrap();
        assert_eq!(config.selection.len(), 3);
        assert_eq!(config.checkpoint_path, Some(PathBuf::from("run.json")));
        assert_eq!(config.fallback_board(), DestinationId::new(9));
        assert_eq!(config.chunk_size(ObjectType::Post), 200);
        assert_eq!(config.chunk_size(ObjectType::Thread), 250);
    }

    #[test]
    fn chunk_size_precedence() {
        let mut config = MigrationConfig::default();
        assert_eq!(config.chunk_size(ObjectType::User), 500);
        assert_eq!(config.chunk_size(ObjectType::UserAvatar), 100);
        assert_eq!(config.chunk_size(ObjectType::PostLike), 1000);
        config.chunk_sizes.insert("post.like".into(), 50);
        assert_eq!(config.chunk_size(ObjectType::PostLike), 50);
    }

    #[test]
    fn invalid_configs_are_rejected() {
        let err = MigrationConfig::from_toml_str("default_chunk_size = 0").unwrap_err();
        assert!(matches!(err, EngineError::Config(_)));

        let err = MigrationConfig::from_toml_str("[chunk_sizes]\nforum = 5").unwrap_err();
        assert!(err.to_string().contains("forum"));

        let err = MigrationConfig::from_toml_str("selection = [\"forum\"]").unwrap_err();
        assert!(matches!(
            err,
            EngineError::Queue(QueueError::UnknownCategory(ref c)) if c == "forum"
        ));

        assert!(MigrationConfig::from_toml_str("default_chunk_size = \"big\"").is_err());
    }

    #[test]
    fn load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("porter.toml");
        std::fs::write(&path, "selection = [\"smiley\"]\n").unwrap();
        let config = MigrationConfig::load(&path).unwrap();
        assert_eq!(config.selection, vec!["smiley".to_string()]);
        assert!(MigrationConfig::load(&dir.path().join("missing.toml")).is_err());
    }
}
