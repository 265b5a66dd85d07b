//! Account endpoints built on the client
//!
//! Login and registration issue a credential pair that starts a session;
//! logout ends it locally whatever the server says. Login, registration and
//! `current_user` go through `AuthClient::request`; logout is a single
//! dispatch.

use credential_store::{LOGIN_PATH, LOGOUT_PATH, ME_PATH, REGISTER_PATH, TokenResponse};
use tracing::{debug, info, warn};

use crate::classify::classify;
use crate::client::AuthClient;
use crate::error::{RequestError, Result};
use crate::request::{RequestDescription, Response};

/// Result of a successful login or registration.
#[derive(Debug, Clone)]
pub struct SignedIn {
    /// Profile returned by the server, if any
    pub user: Option<serde_json::Value>,
    /// Whether a credential was issued and stored
    pub authenticated: bool,
}

impl AuthClient {
    pub async fn login(&self, email: &str, password: &str) -> Result<SignedIn> {
        let response = self
            .post(
                LOGIN_PATH,
                serde_json::json!({ "email": email, "password": password }),
            )
            .await?;
        self.start_session(&response)
    }

    /// Register a new account. `payload` is passed through as the request
    /// body (email, password, role, ...).
    pub async fn register(&self, payload: serde_json::Value) -> Result<SignedIn> {
        let response = self.post(REGISTER_PATH, payload).await?;
        self.start_session(&response)
    }

    /// Invalidate the token server-side, then clear local credentials even if
    /// that call failed. The call is sent once as is: an expired token is not
    /// refreshed just to be revoked, and the session listener is not told.
    pub async fn logout(&self) {
        let request = RequestDescription::post(LOGOUT_PATH, serde_json::json!({}));
        let outcome = classify(&self.dispatcher().send(&request).await.outcome);
        if let Err(e) = outcome.into_result() {
            debug!(error = %e, "server-side logout failed, clearing local credentials anyway");
        }
        if let Err(e) = self.session().sign_out() {
            warn!(error = %e, "failed to remove persisted credential");
        }
    }

    pub async fn current_user(&self) -> Result<serde_json::Value> {
        self.get(ME_PATH).await?.json()
    }

    pub fn is_authenticated(&self) -> bool {
        self.store().access_token().is_some()
    }

    fn start_session(&self, response: &Response) -> Result<SignedIn> {
        let token = TokenResponse::parse(&response.body).map_err(|e| RequestError::Other {
            status: Some(response.status),
            message: e.to_string(),
        })?;
        let user = token.user.clone();

        if token.token.is_none() {
            warn!("credential endpoint answered without a token");
            return Ok(SignedIn {
                user,
                authenticated: false,
            });
        }

        let credential = token.into_credential(None).map_err(|e| RequestError::Other {
            status: Some(response.status),
            message: e.to_string(),
        })?;
        if let Err(e) = self.session().begin(credential) {
            warn!(error = %e, "failed to persist credential");
        }
        info!("signed in");
        Ok(SignedIn {
            user,
            authenticated: true,
        })
    }
}
