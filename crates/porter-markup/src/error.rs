/// Errors that can occur while building a rewrite pipeline.
///
/// Applying a pipeline never fails; only rule construction can.
#[derive(Debug, thiserror::Error)]
pub enum MarkupError {
    /// A rule's pattern did not compile.
    #[error("invalid pattern for rule '{rule}': {source}")]
    InvalidPattern {
        rule: String,
        #[source]
        source: regex::Error,
    },

    /// An unknown dialect name.
    #[error("unknown markup dialect: {0}")]
    UnknownDialect(String),
}

/// Convenience type alias for markup operations.
pub type Result<T> = std::result::Result<T, MarkupError>;
