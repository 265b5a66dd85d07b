//! Client facade
//!
//! The only entry point callers use. Dispatches, classifies, and hands
//! expired-credential results to the refresh coordinator; every other outcome
//! is returned as is.

use std::sync::Arc;

use credential_store::CredentialStore;
use tracing::debug;

use crate::classify::{Outcome, classify};
use crate::config::ClientConfig;
use crate::coordinator::RefreshCoordinator;
use crate::dispatcher::Dispatcher;
use crate::error::{RequestError, Result};
use crate::request::{RequestDescription, Response};
use crate::session::{Session, SessionListener};

/// Authenticated request client.
///
/// Cheap to clone; clones share one credential store and one refresh
/// coordinator. Separately constructed clients share nothing.
#[derive(Clone)]
pub struct AuthClient {
    dispatcher: Arc<Dispatcher>,
    session: Arc<Session>,
    coordinator: Arc<RefreshCoordinator>,
}

impl AuthClient {
    pub fn new(
        config: ClientConfig,
        store: Arc<CredentialStore>,
        listener: impl SessionListener + 'static,
    ) -> Self {
        Self::with_http_client(reqwest::Client::new(), config, store, listener)
    }

    /// Build on an existing `reqwest::Client` (connection pool, TLS setup).
    pub fn with_http_client(
        http: reqwest::Client,
        config: ClientConfig,
        store: Arc<CredentialStore>,
        listener: impl SessionListener + 'static,
    ) -> Self {
        let dispatcher = Arc::new(Dispatcher::new(http, config, store.clone()));
        let session = Arc::new(Session::new(store, Arc::new(listener)));
        let coordinator = Arc::new(RefreshCoordinator::new(
            dispatcher.clone(),
            session.clone(),
        ));
        Self {
            dispatcher,
            session,
            coordinator,
        }
    }

    /// Issue a request, refreshing the credential and replaying once if the
    /// server reports it expired.
    ///
    /// There is no per-request cancellation once a request is queued behind a
    /// refresh; wrap the call in `tokio::time::timeout` for a deadline.
    pub async fn request(&self, request: RequestDescription) -> Result<Response> {
        let dispatched = self.dispatcher.send(&request).await;
        let outcome = classify(&dispatched.outcome);
        debug!(path = %request.path, outcome = outcome.label(), "request classified");

        if let Outcome::NetworkUnreachable { .. } = outcome {
            self.dispatcher.probe_health().await;
        }

        if self.dispatcher.is_auth_path(&request.path) || request.has_caller_authorization() {
            return unmanaged_credential_result(outcome);
        }

        match outcome {
            Outcome::ExpiredCredential { .. } if !request.retried => {
                self.coordinator.recover(request, dispatched.bearer).await
            }
            other => self.session.settle(other),
        }
    }

    pub async fn get(&self, path: &str) -> Result<Response> {
        self.request(RequestDescription::get(path)).await
    }

    pub async fn post(&self, path: &str, body: serde_json::Value) -> Result<Response> {
        self.request(RequestDescription::post(path, body)).await
    }

    pub async fn put(&self, path: &str, body: serde_json::Value) -> Result<Response> {
        self.request(RequestDescription::put(path, body)).await
    }

    pub async fn delete(&self, path: &str) -> Result<Response> {
        self.request(RequestDescription::delete(path)).await
    }

    pub(crate) fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn store(&self) -> &Arc<CredentialStore> {
        self.session.store()
    }

    pub fn config(&self) -> &ClientConfig {
        self.dispatcher.config()
    }

    pub fn is_refreshing(&self) -> bool {
        self.coordinator.is_refreshing()
    }

    /// Requests currently waiting on a refresh.
    pub fn queued(&self) -> usize {
        self.coordinator.queued()
    }
}

/// A 401 that the stored credential is not responsible for: the
/// credential-issuing endpoints (wrong password, revoked refresh token) and
/// requests sent with the caller's own `Authorization`. That is an ordinary
/// failure of the call, not the end of a session.
fn unmanaged_credential_result(outcome: Outcome) -> Result<Response> {
    match outcome {
        Outcome::ExpiredCredential { message } | Outcome::InvalidCredential { message } => {
            Err(RequestError::Other {
                status: Some(401),
                message,
            })
        }
        other => other.into_result(),
    }
}
