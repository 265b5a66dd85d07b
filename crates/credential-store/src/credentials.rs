//! In-process credential store
//!
//! Keeps the current credential pair in memory and mirrors every change to a
//! `CredentialBackend`. All operations are synchronous: the dispatcher reads
//! the access token immediately before it builds each request, so a refresh
//! committed through `set()` is visible to the very next request.
//!
//! The in-memory copy is the source of truth for the running process. A
//! backend write failure is reported to the caller but does not roll back the
//! in-memory value.

use std::fmt;
use std::sync::{PoisonError, RwLock};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::backend::{CredentialBackend, MemoryBackend};
use crate::error::Result;

/// An access/refresh token pair.
///
/// Replaced wholesale on refresh and cleared wholesale on logout. Field names
/// are persisted as `accessToken` / `refreshToken`.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Credential {
    /// Bearer token attached to API calls
    pub access_token: String,
    /// Token exchanged at the refresh endpoint for a new pair
    pub refresh_token: String,
}

impl Credential {
    pub fn new(access_token: impl Into<String>, refresh_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token: refresh_token.into(),
        }
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("access_token", &"[REDACTED]")
            .field("refresh_token", &"[REDACTED]")
            .finish()
    }
}

/// Process-wide credential holder backed by a persistence backend.
pub struct CredentialStore {
    backend: Box<dyn CredentialBackend>,
    current: RwLock<Option<Credential>>,
}

impl CredentialStore {
    /// Open a store over the given backend, loading whatever it holds.
    pub fn open(backend: impl CredentialBackend + 'static) -> Result<Self> {
        let current = backend.load()?;
        info!(present = current.is_some(), "credential store opened");
        Ok(Self {
            backend: Box::new(backend),
            current: RwLock::new(current),
        })
    }

    /// A store that lives only as long as the process.
    pub fn in_memory() -> Self {
        Self {
            backend: Box::new(MemoryBackend::default()),
            current: RwLock::new(None),
        }
    }

    /// Clone of the current credential pair.
    pub fn get(&self) -> Option<Credential> {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn access_token(&self) -> Option<String> {
        self.get().map(|c| c.access_token)
    }

    pub fn refresh_token(&self) -> Option<String> {
        self.get().map(|c| c.refresh_token)
    }

    /// Replace the credential pair and persist it.
    pub fn set(&self, credential: Credential) -> Result<()> {
        let mut current = self.current.write().unwrap_or_else(PoisonError::into_inner);
        *current = Some(credential.clone());
        debug!("credential committed");
        self.backend.save(&credential)
    }

    /// Drop both tokens, in memory and in the backend.
    pub fn clear(&self) -> Result<()> {
        let mut current = self.current.write().unwrap_or_else(PoisonError::into_inner);
        let had_credential = current.take().is_some();
        debug!(had_credential, "credential cleared");
        self.backend.clear()
    }

    pub fn is_empty(&self) -> bool {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_none()
    }
}
