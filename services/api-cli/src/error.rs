//! Argument errors clap reports for values it cannot convert itself

use thiserror::Error;

/// Failures from the API itself come back as `auth_client::RequestError`
/// and are reported through `anyhow` in `main`.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum CliError {
    #[error("unsupported HTTP method: {0}")]
    InvalidMethod(String),

    #[error("request body is not valid JSON: {0}")]
    InvalidBody(String),
}

pub type Result<T> = std::result::Result<T, CliError>;
