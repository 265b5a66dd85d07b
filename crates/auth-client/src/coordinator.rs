//! Single-flight credential refresh
//!
//! Owns the `Idle | Refreshing` state and the queue of requests waiting for a
//! fresh credential. At most one refresh call is in flight per coordinator.
//!
//! Transitions:
//! - Idle → Refreshing: first expired request with a refresh token in store
//! - Idle → (terminal): expired request but no refresh token; the session
//!   ends without entering Refreshing
//! - Refreshing → Refreshing: further expired requests join the queue (FIFO)
//! - Refreshing → Idle (success): new credential committed, state back to
//!   Idle, then every queued request is replayed marked retried. Replays are
//!   dispatched in FIFO order and complete independently.
//! - Refreshing → Idle (failure): session ended, every queued request fails
//!   with the refresh error
//!
//! An expired reply that arrives after the commit carries the old token and
//! is replayed directly (stale reply), so it never starts a second refresh.
//!
//! The refresh runs in its own task so a caller that gives up (for example a
//! timeout around `request()`) cannot leave the queue stranded. The state
//! lock is only held for check-and-set and never across an await.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use credential_store::{Credential, RefreshRequest, TokenResponse};
use tokio::sync::oneshot;
use tracing::{debug, info, warn};

use crate::classify::{Outcome, classify};
use crate::dispatcher::Dispatcher;
use crate::error::{RequestError, Result};
use crate::request::{RequestDescription, Response};
use crate::session::Session;

/// One caller suspended until the refresh completes.
struct PendingRequest {
    request: RequestDescription,
    resume: oneshot::Sender<Result<Response>>,
}

enum RefreshState {
    Idle,
    Refreshing { queue: VecDeque<PendingRequest> },
}

/// What `recover` decided while holding the state lock.
enum Entry {
    /// The store already holds a newer token than the one this request
    /// carried; replay without refreshing.
    Replay(RequestDescription),
    /// Nothing to refresh with.
    Terminal,
    /// Wait on the handle; start the refresh if a refresh token is given.
    Wait {
        resume: oneshot::Receiver<Result<Response>>,
        start_with: Option<String>,
    },
}

pub struct RefreshCoordinator {
    dispatcher: Arc<Dispatcher>,
    session: Arc<Session>,
    state: Mutex<RefreshState>,
}

impl RefreshCoordinator {
    pub fn new(dispatcher: Arc<Dispatcher>, session: Arc<Session>) -> Self {
        Self {
            dispatcher,
            session,
            state: Mutex::new(RefreshState::Idle),
        }
    }

    pub fn is_refreshing(&self) -> bool {
        matches!(*self.lock_state(), RefreshState::Refreshing { .. })
    }

    /// Requests waiting for the current refresh, including the one that
    /// started it.
    pub fn queued(&self) -> usize {
        match &*self.lock_state() {
            RefreshState::Idle => 0,
            RefreshState::Refreshing { queue } => queue.len(),
        }
    }

    /// Recover a request that came back expired.
    ///
    /// `bearer` is the access token the request was sent with. Resolves with
    /// the replayed request's result, or with the refresh error.
    pub async fn recover(
        self: &Arc<Self>,
        request: RequestDescription,
        bearer: Option<String>,
    ) -> Result<Response> {
        let entry = {
            let mut state = self.lock_state();
            match &mut *state {
                RefreshState::Refreshing { queue } => {
                    let (resume, waiter) = oneshot::channel();
                    queue.push_back(PendingRequest { request, resume });
                    metrics::counter!("auth_requests_queued_total").increment(1);
                    debug!(queued = queue.len(), "refresh in flight, request queued");
                    Entry::Wait {
                        resume: waiter,
                        start_with: None,
                    }
                }
                RefreshState::Idle => match self.session.store().get() {
                    Some(current)
                        if bearer
                            .as_deref()
                            .is_some_and(|sent| sent != current.access_token) =>
                    {
                        Entry::Replay(request)
                    }
                    Some(current) if !current.refresh_token.is_empty() => {
                        let (resume, waiter) = oneshot::channel();
                        let mut queue = VecDeque::new();
                        queue.push_back(PendingRequest { request, resume });
                        metrics::counter!("auth_requests_queued_total").increment(1);
                        *state = RefreshState::Refreshing { queue };
                        Entry::Wait {
                            resume: waiter,
                            start_with: Some(current.refresh_token),
                        }
                    }
                    _ => Entry::Terminal,
                },
            }
        };

        match entry {
            Entry::Replay(request) => {
                debug!("credential was refreshed after this request was sent, replaying");
                self.replay(request).await
            }
            Entry::Terminal => {
                let message = "No refresh token available".to_string();
                self.session.end(&message);
                Err(RequestError::InvalidCredential { message })
            }
            Entry::Wait { resume, start_with } => {
                if let Some(refresh_token) = start_with {
                    let this = Arc::clone(self);
                    tokio::spawn(async move { this.drive(refresh_token).await });
                }
                resume.await.unwrap_or_else(|_| {
                    Err(RequestError::Other {
                        status: None,
                        message: "credential refresh was abandoned".into(),
                    })
                })
            }
        }
    }

    /// Run one refresh cycle to completion.
    async fn drive(self: Arc<Self>, refresh_token: String) {
        info!(queued = self.queued(), "credential expired, refreshing");
        match self.refresh(&refresh_token).await {
            Ok(credential) => {
                if let Err(e) = self.session.store().set(credential) {
                    warn!(error = %e, "failed to persist refreshed credential");
                }
                metrics::counter!("auth_refresh_total", "result" => "success").increment(1);
                info!("credential refresh succeeded");
                self.release_queue();
            }
            Err(error) => {
                metrics::counter!("auth_refresh_total", "result" => "failure").increment(1);
                self.fail_all(error);
            }
        }
    }

    /// Exchange the refresh token for a new credential.
    async fn refresh(&self, refresh_token: &str) -> Result<Credential> {
        let body = serde_json::to_value(RefreshRequest { refresh_token }).map_err(|e| {
            RequestError::Other {
                status: None,
                message: format!("encoding refresh request: {e}"),
            }
        })?;
        let request =
            RequestDescription::post(self.dispatcher.config().refresh_path.clone(), body);

        let response = classify(&self.dispatcher.send(&request).await.outcome).into_result()?;

        TokenResponse::parse(&response.body)
            .and_then(|token| token.into_credential(Some(refresh_token)))
            .map_err(|e| {
                warn!(error = %e, "refresh endpoint returned no usable token");
                RequestError::InvalidCredential {
                    message: "No token received from refresh".into(),
                }
            })
    }

    /// Return to Idle and replay every queued request with the committed
    /// credential. Each replay runs in its own task, spawned in queue order,
    /// and resolves its own caller.
    fn release_queue(self: &Arc<Self>) {
        let queue = self.take_queue();
        debug!(replaying = queue.len(), "replaying queued requests");
        for PendingRequest { request, resume } in queue {
            if resume.is_closed() {
                debug!(path = %request.path, "caller gave up while queued, skipping replay");
                continue;
            }
            let this = Arc::clone(self);
            tokio::spawn(async move {
                let result = this.replay(request).await;
                metrics::counter!("auth_requests_replayed_total").increment(1);
                if resume.send(result).is_err() {
                    debug!("caller gave up before replay completed");
                }
            });
        }
    }

    /// End the session and fail every queued request with `error`.
    fn fail_all(&self, error: RequestError) {
        warn!(error = %error, kind = error.kind(), "credential refresh failed");
        self.session.end(error.message());

        let queue = self.take_queue();
        info!(failed = queue.len(), "failing queued requests");
        for pending in queue {
            let _ = pending.resume.send(Err(error.clone()));
        }
    }

    fn take_queue(&self) -> VecDeque<PendingRequest> {
        match std::mem::replace(&mut *self.lock_state(), RefreshState::Idle) {
            RefreshState::Refreshing { queue } => queue,
            RefreshState::Idle => VecDeque::new(),
        }
    }

    /// Re-dispatch a request once with the current credential. A second
    /// expiry is terminal.
    async fn replay(&self, request: RequestDescription) -> Result<Response> {
        let request = request.mark_retried();
        let outcome = classify(&self.dispatcher.send(&request).await.outcome);
        if let Outcome::ExpiredCredential { .. } = outcome {
            warn!(path = %request.path, "request still expired after refresh");
        }
        self.session.settle(outcome)
    }

    fn lock_state(&self) -> MutexGuard<'_, RefreshState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
