use thiserror::Error;

/// Errors produced by type operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("unknown object type: {0}")]
    UnknownObjectType(String),

    #[error("unknown category: {0}")]
    UnknownCategory(String),

    #[error("unknown sub-feature '{name}' for category '{category}'")]
    UnknownSubFeature { category: String, name: String },
}
