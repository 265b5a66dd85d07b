//! Persistence backends for the credential store
//!
//! The only contract is synchronous load/save/clear of one credential pair.
//! `FileBackend` writes a small JSON document with atomic temp-file + rename
//! so a crash mid-write never leaves a truncated file behind.

use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use tracing::{debug, info};

use crate::credentials::Credential;
use crate::error::{Error, Result};

/// Durable key-value mechanism behind a `CredentialStore`.
pub trait CredentialBackend: Send + Sync {
    /// Read the stored pair, `None` when nothing is stored.
    fn load(&self) -> Result<Option<Credential>>;

    fn save(&self, credential: &Credential) -> Result<()>;

    fn clear(&self) -> Result<()>;
}

/// Backend that keeps the pair in memory only.
#[derive(Default)]
pub struct MemoryBackend {
    slot: Mutex<Option<Credential>>,
}

impl MemoryBackend {
    /// Backend pre-seeded with a credential.
    pub fn with_credential(credential: Credential) -> Self {
        Self {
            slot: Mutex::new(Some(credential)),
        }
    }
}

impl CredentialBackend for MemoryBackend {
    fn load(&self) -> Result<Option<Credential>> {
        Ok(self
            .slot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone())
    }

    fn save(&self, credential: &Credential) -> Result<()> {
        *self.slot.lock().unwrap_or_else(PoisonError::into_inner) = Some(credential.clone());
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        self.slot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        Ok(())
    }
}

/// Backend persisting the pair as JSON at `path`.
///
/// A missing file means "no credential". `clear()` removes the file.
pub struct FileBackend {
    path: PathBuf,
}

impl FileBackend {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl CredentialBackend for FileBackend {
    fn load(&self) -> Result<Option<Credential>> {
        if !self.path.exists() {
            info!(path = %self.path.display(), "credential file not found, starting signed out");
            return Ok(None);
        }
        let contents = std::fs::read_to_string(&self.path)
            .map_err(|e| Error::Io(format!("reading credential file: {e}")))?;
        let credential: Credential = serde_json::from_str(&contents)
            .map_err(|e| Error::CredentialParse(format!("parsing credential file: {e}")))?;
        Ok(Some(credential))
    }

    fn save(&self, credential: &Credential) -> Result<()> {
        write_atomic(&self.path, credential)
    }

    fn clear(&self) -> Result<()> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => {
                debug!(path = %self.path.display(), "removed credential file");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(Error::Io(format!("removing credential file: {e}"))),
        }
    }
}

/// Write the credential file atomically with 0600 permissions on unix.
fn write_atomic(path: &Path, credential: &Credential) -> Result<()> {
    let json = serde_json::to_string_pretty(credential)
        .map_err(|e| Error::CredentialParse(format!("serializing credential: {e}")))?;

    let dir = path
        .parent()
        .ok_or_else(|| Error::Io("credential path has no parent directory".into()))?;

    let tmp_path = dir.join(format!(".credentials.tmp.{}", std::process::id()));

    std::fs::write(&tmp_path, json.as_bytes())
        .map_err(|e| Error::Io(format!("writing temp credential file: {e}")))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(&tmp_path, std::fs::Permissions::from_mode(0o600))
            .map_err(|e| Error::Io(format!("setting credential file permissions: {e}")))?;
    }

    std::fs::rename(&tmp_path, path)
        .map_err(|e| Error::Io(format!("renaming temp credential file: {e}")))?;

    debug!(path = %path.display(), "persisted credential");
    Ok(())
}
