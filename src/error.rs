use serde::Serialize;

/// The main error type for membership operations
#[derive(Debug, thiserror::Error)]
pub enum MembershipError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid tier: {0}")]
    InvalidTier(String),

    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}

impl MembershipError {
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn invalid_tier(msg: impl Into<String>) -> Self {
        Self::InvalidTier(msg.into())
    }

    pub fn invalid_state(msg: impl Into<String>) -> Self {
        Self::InvalidState(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Stable machine-readable kind for logging and API mapping.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::InvalidTier(_) => ErrorKind::InvalidTier,
            Self::InvalidState(_) => ErrorKind::InvalidState,
            Self::Conflict(_) => ErrorKind::Conflict,
            Self::Internal(_) | Self::Anyhow(_) => ErrorKind::Internal,
        }
    }
}

/// Machine-readable error classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    NotFound,
    InvalidTier,
    InvalidState,
    Conflict,
    Internal,
}

pub type Result<T> = std::result::Result<T, MembershipError>;
