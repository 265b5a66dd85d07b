//! Request outcome errors surfaced to callers
//!
//! Expired credentials never appear here: the refresh coordinator absorbs
//! them, and a request that stays expired after its one replay surfaces as
//! `InvalidCredential`.

/// Terminal outcome of `AuthClient::request`.
///
/// `Clone` so a single refresh failure can be delivered to every request
/// queued behind it.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RequestError {
    /// No response was received (connection failure or timeout). Transient,
    /// the caller may retry manually.
    #[error("network unreachable: {message}")]
    NetworkUnreachable { message: String },

    /// The session cannot be recovered; local credentials have been cleared.
    #[error("invalid credential: {message}")]
    InvalidCredential { message: String },

    /// The session continues, but this action is not allowed.
    #[error("forbidden: {message}")]
    Forbidden { message: String },

    #[error("not found: {message}")]
    NotFound { path: String, message: String },

    /// Any other failure. `status` is `None` for local failures such as an
    /// undecodable response body.
    #[error("request failed: {message}")]
    Other { status: Option<u16>, message: String },
}

impl RequestError {
    /// Normalized human-readable message, whatever shape the server used.
    pub fn message(&self) -> &str {
        match self {
            RequestError::NetworkUnreachable { message }
            | RequestError::InvalidCredential { message }
            | RequestError::Forbidden { message }
            | RequestError::NotFound { message, .. }
            | RequestError::Other { message, .. } => message,
        }
    }

    /// Category label for logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            RequestError::NetworkUnreachable { .. } => "network_unreachable",
            RequestError::InvalidCredential { .. } => "invalid_credential",
            RequestError::Forbidden { .. } => "forbidden",
            RequestError::NotFound { .. } => "not_found",
            RequestError::Other { .. } => "other",
        }
    }
}

/// Result alias for client requests.
pub type Result<T> = std::result::Result<T, RequestError>;
