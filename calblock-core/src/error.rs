//! Error types for calblock.

use thiserror::Error;

/// Errors that can occur while talking to providers or the local store.
#[derive(Error, Debug)]
pub enum CalblockError {
    /// The remote object (calendar or event) does not exist. Callers that are
    /// converging towards "absent" treat this as success.
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Authentication required: {0}")]
    AuthRequired(String),

    #[error("Authentication expired: {0}")]
    AuthExpired(String),

    #[error("Configuration error: {0}")]
    ConfigInvalid(String),

    #[error("Remote write failed: {0}")]
    RemoteWriteFailed(String),

    #[error("Provider error: {0}")]
    Provider(String),

    #[error("Store error: {0}")]
    Store(String),

    #[error("ICS parse error: {0}")]
    Ical(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl CalblockError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, CalblockError::NotFound(_))
    }

    /// Credential problems that a fresh consent flow can fix.
    pub fn is_auth(&self) -> bool {
        matches!(
            self,
            CalblockError::AuthRequired(_) | CalblockError::AuthExpired(_)
        )
    }
}

impl From<sqlx::Error> for CalblockError {
    fn from(e: sqlx::Error) -> Self {
        CalblockError::Store(e.to_string())
    }
}

impl From<serde_json::Error> for CalblockError {
    fn from(e: serde_json::Error) -> Self {
        CalblockError::Serialization(e.to_string())
    }
}

/// Result type alias for calblock operations.
pub type CalblockResult<T> = Result<T, CalblockError>;
