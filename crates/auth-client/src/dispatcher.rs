//! Request dispatcher
//!
//! Performs the network call for one `RequestDescription` and reports the raw
//! result without interpreting status codes. The bearer token is read from
//! the credential store synchronously, right before the request is built, so
//! a refresh committed while this request was queued is always picked up.

use std::sync::Arc;
use std::time::Duration;

use credential_store::{CredentialStore, HEALTH_PROBE_TIMEOUT_SECS};
use reqwest::header::{AUTHORIZATION, HeaderValue};
use tracing::{Instrument, debug, info, info_span, warn};

use crate::config::ClientConfig;
use crate::request::{RequestDescription, Response};

/// Raw result of one network call.
#[derive(Debug, Clone, PartialEq)]
pub enum RawOutcome {
    /// A response was received, whatever its status.
    Response { path: String, response: Response },
    /// No response: connection failure, timeout, or truncated body.
    Transport { path: String, message: String },
}

/// A raw outcome plus the access token that was attached, if any.
#[derive(Debug)]
pub struct Dispatched {
    pub outcome: RawOutcome,
    pub bearer: Option<String>,
}

pub struct Dispatcher {
    http: reqwest::Client,
    config: ClientConfig,
    store: Arc<CredentialStore>,
}

impl Dispatcher {
    pub fn new(http: reqwest::Client, config: ClientConfig, store: Arc<CredentialStore>) -> Self {
        Self {
            http,
            config,
            store,
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<CredentialStore> {
        &self.store
    }

    pub fn is_auth_path(&self, path: &str) -> bool {
        self.config.is_auth_path(path)
    }

    /// Send one request. Never fails: transport problems come back as
    /// `RawOutcome::Transport`.
    pub async fn send(&self, request: &RequestDescription) -> Dispatched {
        let request_id = format!("req_{}", uuid::Uuid::new_v4().as_simple());
        let span = info_span!(
            "dispatch",
            request_id = %request_id,
            method = %request.method,
            path = %request.path,
            retried = request.retried,
        );
        self.send_inner(request).instrument(span).await
    }

    async fn send_inner(&self, request: &RequestDescription) -> Dispatched {
        let url = self.config.url_for(&request.path);
        let mut headers = request.headers.clone();

        // Caller-supplied Authorization wins; auth endpoints never get one.
        let mut bearer = None;
        if !request.has_caller_authorization() && !self.is_auth_path(&request.path) {
            if let Some(token) = self.store.access_token() {
                match HeaderValue::from_str(&format!("Bearer {token}")) {
                    Ok(mut value) => {
                        value.set_sensitive(true);
                        headers.insert(AUTHORIZATION, value);
                        bearer = Some(token);
                    }
                    Err(e) => warn!(error = %e, "stored access token is not a valid header value"),
                }
            }
        }
        debug!(has_token = bearer.is_some(), "sending request");

        let mut builder = self
            .http
            .request(request.method.clone(), &url)
            .headers(headers)
            .timeout(self.config.timeout());
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let outcome = match builder.send().await {
            Ok(response) => {
                let status = response.status().as_u16();
                let headers = response.headers().clone();
                match response.bytes().await {
                    Ok(body) => {
                        debug!(status, "response received");
                        RawOutcome::Response {
                            path: request.path.clone(),
                            response: Response {
                                status,
                                headers,
                                body,
                            },
                        }
                    }
                    Err(e) => {
                        warn!(status, error = %e, "failed to read response body");
                        RawOutcome::Transport {
                            path: request.path.clone(),
                            message: format!("reading response body: {e}"),
                        }
                    }
                }
            }
            Err(e) if e.is_timeout() => {
                let message = format!("timeout of {}ms exceeded", self.config.timeout().as_millis());
                warn!(error = %e, "request timed out");
                RawOutcome::Transport {
                    path: request.path.clone(),
                    message,
                }
            }
            Err(e) => {
                warn!(error = %e, "request failed without a response");
                RawOutcome::Transport {
                    path: request.path.clone(),
                    message: e.to_string(),
                }
            }
        };

        Dispatched { outcome, bearer }
    }

    /// Check whether the server answers at all after a network failure.
    ///
    /// Returns `None` when no `health_url` is configured. Diagnostic only:
    /// the result is logged and never changes a request's outcome.
    pub async fn probe_health(&self) -> Option<bool> {
        let url = self.config.health_url.as_ref()?;
        let reachable = self
            .http
            .get(url)
            .timeout(Duration::from_secs(HEALTH_PROBE_TIMEOUT_SECS))
            .send()
            .await
            .map(|r| r.status().is_success())
            .unwrap_or(false);
        if reachable {
            info!(url = %url, "server is up, but the API endpoint may be incorrect");
        } else {
            warn!(url = %url, "server health check failed, server is likely down");
        }
        Some(reachable)
    }
}
