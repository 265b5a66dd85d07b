//! Wire types for the credential-issuing endpoints
//!
//! Login, registration and refresh all answer with the same shape:
//! `{ "token": "...", "refreshToken": "...", "user": {...} }`. A response
//! without `token` is a protocol violation.

use serde::{Deserialize, Serialize};

use crate::credentials::Credential;
use crate::error::{Error, Result};

/// Body of `POST /auth/refresh-token`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshRequest<'a> {
    pub refresh_token: &'a str,
}

/// Response from login, registration and refresh.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenResponse {
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub refresh_token: Option<String>,
    /// Profile returned by login/registration; refresh omits it.
    #[serde(default)]
    pub user: Option<serde_json::Value>,
}

impl TokenResponse {
    pub fn parse(body: &[u8]) -> Result<Self> {
        serde_json::from_slice(body).map_err(|e| Error::TokenResponse(format!("{e}")))
    }

    /// Build the credential this response issues.
    ///
    /// `previous_refresh` is kept when the server does not rotate the
    /// refresh token. Fails when `token` is missing or empty, or when no
    /// refresh token is available from either source.
    pub fn into_credential(self, previous_refresh: Option<&str>) -> Result<Credential> {
        let access = self
            .token
            .filter(|t| !t.is_empty())
            .ok_or_else(|| Error::TokenResponse("no token received".into()))?;
        let refresh = self
            .refresh_token
            .filter(|t| !t.is_empty())
            .or_else(|| previous_refresh.map(str::to_owned))
            .ok_or_else(|| Error::TokenResponse("no refresh token received".into()))?;
        Ok(Credential::new(access, refresh))
    }
}
