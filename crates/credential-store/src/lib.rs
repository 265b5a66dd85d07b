//! Credential storage for the authenticated request client
//!
//! Holds the access/refresh token pair the client attaches to outbound
//! requests, plus the wire types of the token-issuing endpoints. This crate
//! has no HTTP dependency; the request client in `auth-client` drives it.
//!
//! Credential flow:
//! 1. A login/registration response is parsed with `token::TokenResponse`
//! 2. The resulting `Credential` is committed via `CredentialStore::set()`
//! 3. Every outbound request reads `CredentialStore::access_token()`
//! 4. On expiry the refresh coordinator sends `RefreshRequest` and commits
//!    the new pair, or calls `CredentialStore::clear()` on terminal failure

pub mod backend;
pub mod constants;
pub mod credentials;
pub mod error;
pub mod token;

pub use backend::{CredentialBackend, FileBackend, MemoryBackend};
pub use constants::*;
pub use credentials::{Credential, CredentialStore};
pub use error::{Error, Result};
pub use token::{RefreshRequest, TokenResponse};
