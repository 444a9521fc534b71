/// Errors from parsing or checking tagged credentials.
///
/// Rewriting never fails; bad input yields the unresolved marker instead.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum CredentialError {
    #[error("unknown credential scheme: {0}")]
    UnknownScheme(String),

    #[error("malformed tagged credential: {0}")]
    Malformed(String),

    #[error("credential cannot be verified: {0}")]
    Unverifiable(String),
}

pub type Result<T> = std::result::Result<T, CredentialError>;
