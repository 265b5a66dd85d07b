//! Session lifecycle and the session-termination seam
//!
//! When a credential becomes unrecoverable the client clears local state and
//! tells the host (router, UI, CLI) exactly once. What happens next, such as
//! navigating to a login screen, is the host's decision.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use credential_store::{Credential, CredentialStore};
use tracing::{info, warn};

use crate::classify::Outcome;
use crate::error::{RequestError, Result};
use crate::request::Response;

/// Receives the "session ended, credentials cleared" notification.
pub trait SessionListener: Send + Sync {
    fn session_ended(&self);
}

impl<F> SessionListener for F
where
    F: Fn() + Send + Sync,
{
    fn session_ended(&self) {
        self()
    }
}

/// Listener that ignores the notification.
pub struct NoopListener;

impl SessionListener for NoopListener {
    fn session_ended(&self) {}
}

pub struct Session {
    store: Arc<CredentialStore>,
    listener: Arc<dyn SessionListener>,
    ended: AtomicBool,
}

impl Session {
    pub fn new(store: Arc<CredentialStore>, listener: Arc<dyn SessionListener>) -> Self {
        Self {
            store,
            listener,
            ended: AtomicBool::new(false),
        }
    }

    pub fn store(&self) -> &Arc<CredentialStore> {
        &self.store
    }

    /// Start a session with a freshly issued credential and re-arm the
    /// end-of-session notification.
    pub fn begin(&self, credential: Credential) -> credential_store::Result<()> {
        let persisted = self.store.set(credential);
        self.ended.store(false, Ordering::Release);
        info!("session started");
        persisted
    }

    /// Terminal end: clear credentials and notify the listener. Only the
    /// first call after `begin` notifies.
    pub fn end(&self, reason: &str) {
        if let Err(e) = self.store.clear() {
            warn!(error = %e, "failed to clear persisted credential");
        }
        if !self.ended.swap(true, Ordering::AcqRel) {
            warn!(reason, "session ended, credentials cleared");
            self.listener.session_ended();
        }
    }

    /// Deliberate sign-out. Clears credentials without notifying.
    pub fn sign_out(&self) -> credential_store::Result<()> {
        self.ended.store(true, Ordering::Release);
        info!("signed out");
        self.store.clear()
    }

    pub fn has_ended(&self) -> bool {
        self.ended.load(Ordering::Acquire)
    }

    /// Turn a non-expired outcome into the caller's result, ending the
    /// session if it is terminal for the credential.
    pub(crate) fn settle(&self, outcome: Outcome) -> Result<Response> {
        let result = outcome.into_result();
        if let Err(RequestError::InvalidCredential { message }) = &result {
            self.end(message);
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    fn counting_session() -> (Session, Arc<AtomicUsize>) {
        let count = Arc::new(AtomicUsize::new(0));
        let counter = count.clone();
        let store = Arc::new(CredentialStore::in_memory());
        store.set(Credential::new("at", "rt")).unwrap();
        let session = Session::new(
            store,
            Arc::new(move || {
                counter.fetch_add(1, Ordering::SeqCst);
            }),
        );
        (session, count)
    }

    #[test]
    fn end_clears_store_and_notifies_once() {
        let (session, count) = counting_session();

        session.end("refresh failed");
        session.end("refresh failed again");

        assert!(session.store().is_empty());
        assert!(session.has_ended());
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn begin_rearms_notification() {
        let (session, count) = counting_session();

        session.end("first");
        session.begin(Credential::new("at_2", "rt_2")).unwrap();
        assert!(!session.has_ended());
        session.end("second");

        assert_eq!(count.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn concurrent_ends_notify_once() {
        let (session, count) = counting_session();
        let session = Arc::new(session);

        let handles: Vec<_> = (0..16)
            .map(|_| {
                let session = session.clone();
                std::thread::spawn(move || session.end("concurrent"))
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }

        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn sign_out_is_silent() {
        let (session, count) = counting_session();
        session.sign_out().unwrap();
        session.end("late failure after logout");

        assert!(session.store().is_empty());
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn settle_ends_session_only_on_invalid_credential() {
        let (session, count) = counting_session();

        let forbidden = session.settle(Outcome::Forbidden {
            message: "no".into(),
        });
        assert!(matches!(forbidden, Err(RequestError::Forbidden { .. })));
        assert!(!session.store().is_empty());

        let invalid = session.settle(Outcome::InvalidCredential {
            message: "Invalid token".into(),
        });
        assert!(matches!(invalid, Err(RequestError::InvalidCredential { .. })));
        assert!(session.store().is_empty());
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }
}
