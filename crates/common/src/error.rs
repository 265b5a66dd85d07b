//! Configuration errors

use thiserror::Error;

/// Errors raised while loading or validating configuration
#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("{field} must be an http:// or https:// URL, got: {value}")]
    InvalidUrl { field: &'static str, value: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
}

impl Error {
    /// Check that `value` uses an http(s) scheme.
    pub fn check_http_url(field: &'static str, value: &str) -> Result<()> {
        if value.starts_with("http://") || value.starts_with("https://") {
            Ok(())
        } else {
            Err(Error::InvalidUrl {
                field,
                value: value.to_string(),
            })
        }
    }
}

/// Result alias using common Error
pub type Result<T> = std::result::Result<T, Error>;
