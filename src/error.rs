//! Error types for the atomic swap coordination server.

use thiserror::Error;

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while coordinating a swap.
///
/// Variants that are part of the fixed wire taxonomy carry the exact
/// string clients are expected to match on; see [`Error::code`].
#[derive(Error, Debug)]
pub enum Error {
    /// The token does not decode, or is not known to the `tokens` store.
    #[error("Token is not registered or is invalid.")]
    TokenInvalid,

    /// The token exists but is not in one of the roles the endpoint expects.
    #[error("Inappropriate token status.")]
    TokenStatusInvalid,

    /// The token is already associated with a swap, where that's an error.
    #[error("Token is already used.")]
    TokenUsed,

    /// The referenced swap does not exist.
    #[error("Selected swap is not registered or is invalid.")]
    SwapInvalid,

    /// The referenced swap exists but is not in the required status.
    #[error("Selected swap is already in progress or completed.")]
    SwapProgress,

    /// The token's role flip failed to persist.
    #[error("Failed to update token status: {0}")]
    UpdateToken(String),

    /// The swap record failed to persist.
    #[error("Failed to update swap data: {0}")]
    UpdateSwap(String),

    /// No push in the redeem transaction matched the committed hash.
    #[error("Pre-image not found in redeem transaction.")]
    FatalError,

    /// A stored record failed to decode under the canonical schema.
    #[error("Storage error: {0}")]
    Storage(String),

    /// Bitcoin transaction/script decode error.
    #[error("Bitcoin error: {0}")]
    Bitcoin(String),

    /// Configuration error at startup.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Generic error with context.
    #[error("{0}")]
    Other(String),
}

/// One invalid field, matching the original server's `{message, target}` shape.
#[derive(Debug, Clone, serde::Serialize)]
pub struct ValidationError {
    pub message: String,
    pub target: Vec<String>,
}

impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Error::Other(format!("{:#}", err))
    }
}

impl From<sled::Error> for Error {
    fn from(err: sled::Error) -> Self {
        Error::Storage(err.to_string())
    }
}

impl Error {
    /// The stable error code clients are expected to match on.
    ///
    /// `None` for variants outside the fixed taxonomy (validation
    /// errors render their own body shape instead).
    pub fn code(&self) -> Option<&'static str> {
        match self {
            Error::TokenInvalid => Some("TOKEN_INVALID"),
            Error::TokenStatusInvalid => Some("TOKEN_STATUS_INVALID"),
            Error::TokenUsed => Some("TOKEN_USED"),
            Error::SwapInvalid => Some("SWAP_INVALID"),
            Error::SwapProgress => Some("SWAP_PROGRESS"),
            Error::UpdateToken(_) => Some("UPDATE_TOKEN"),
            Error::UpdateSwap(_) => Some("UPDATE_SWAP"),
            Error::FatalError => Some("FATAL_ERROR"),
            _ => None,
        }
    }
}
