//! Response classification
//!
//! Maps a raw dispatch result to one outcome category. Pure: the same
//! `RawOutcome` always yields the same `Outcome`.
//!
//! Servers report errors either as `{"error":{"message":...}}` or as a flat
//! `{"message":...}`; both shapes are normalized into one `message` field.

use crate::dispatcher::RawOutcome;
use crate::error::{RequestError, Result};
use crate::request::Response;

/// Message used for every request that received no response.
pub const NETWORK_UNREACHABLE_MESSAGE: &str =
    "Cannot connect to server. Please check your connection and try again.";

/// Phrases in a 401 payload that mean the token is structurally bad
/// (malformed, tampered, bad signature) rather than merely expired.
const INVALID_TOKEN_PATTERNS: &[&str] = &[
    "invalid token",
    "malformed",
    "tampered",
    "invalid signature",
];

/// Outcome category of a completed dispatch.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Success(Response),
    /// Recoverable by refreshing the credential.
    ExpiredCredential { message: String },
    /// Terminal, the session must end.
    InvalidCredential { message: String },
    Forbidden { message: String },
    NotFound { path: String, message: String },
    NetworkUnreachable { message: String },
    Other { status: u16, message: String },
}

impl Outcome {
    pub fn label(&self) -> &'static str {
        match self {
            Outcome::Success(_) => "success",
            Outcome::ExpiredCredential { .. } => "expired_credential",
            Outcome::InvalidCredential { .. } => "invalid_credential",
            Outcome::Forbidden { .. } => "forbidden",
            Outcome::NotFound { .. } => "not_found",
            Outcome::NetworkUnreachable { .. } => "network_unreachable",
            Outcome::Other { .. } => "other",
        }
    }

    /// Convert to what a caller sees. An expiry that reaches this point could
    /// not be absorbed by a refresh, so it becomes `InvalidCredential`.
    pub fn into_result(self) -> Result<Response> {
        match self {
            Outcome::Success(response) => Ok(response),
            Outcome::ExpiredCredential { message } | Outcome::InvalidCredential { message } => {
                Err(RequestError::InvalidCredential { message })
            }
            Outcome::Forbidden { message } => Err(RequestError::Forbidden { message }),
            Outcome::NotFound { path, message } => Err(RequestError::NotFound { path, message }),
            Outcome::NetworkUnreachable { message } => {
                Err(RequestError::NetworkUnreachable { message })
            }
            Outcome::Other { status, message } => Err(RequestError::Other {
                status: Some(status),
                message,
            }),
        }
    }
}

/// Classify a raw dispatch result.
///
/// Rules, first match wins: no response → network-unreachable; 401 →
/// expired (or invalid when the payload says the token is malformed); 403 →
/// forbidden; 404 → not-found naming the path; 2xx → success; anything else
/// → other.
pub fn classify(raw: &RawOutcome) -> Outcome {
    let (path, response) = match raw {
        RawOutcome::Transport { .. } => {
            return Outcome::NetworkUnreachable {
                message: NETWORK_UNREACHABLE_MESSAGE.to_string(),
            };
        }
        RawOutcome::Response { path, response } => (path, response),
    };

    let status = response.status;
    match status {
        401 => {
            let message = error_message(response);
            if is_invalid_token(&message) {
                Outcome::InvalidCredential { message }
            } else {
                Outcome::ExpiredCredential { message }
            }
        }
        403 => Outcome::Forbidden {
            message: error_message(response),
        },
        404 => Outcome::NotFound {
            path: path.clone(),
            message: format!(
                "API endpoint not found: {path}. This might be a server-side configuration issue."
            ),
        },
        200..=299 => Outcome::Success(response.clone()),
        _ => Outcome::Other {
            status,
            message: error_message(response),
        },
    }
}

/// Best-effort message from an error response, in priority order:
/// `error.message`, top-level `message`, a bare JSON string body, then the
/// transport-level status message.
fn error_message(response: &Response) -> String {
    extract_message(&response.body)
        .unwrap_or_else(|| format!("Request failed with status code {}", response.status))
}

/// Pull the server-provided message out of an error body, if any.
pub fn extract_message(body: &[u8]) -> Option<String> {
    let value: serde_json::Value = serde_json::from_slice(body).ok()?;
    let candidate = value
        .get("error")
        .and_then(|e| e.get("message"))
        .and_then(|m| m.as_str())
        .or_else(|| value.get("message").and_then(|m| m.as_str()))
        .or_else(|| value.as_str())?;
    if candidate.is_empty() {
        None
    } else {
        Some(candidate.to_string())
    }
}

fn is_invalid_token(message: &str) -> bool {
    let lower = message.to_lowercase();
    INVALID_TOKEN_PATTERNS.iter().any(|p| lower.contains(p))
}
