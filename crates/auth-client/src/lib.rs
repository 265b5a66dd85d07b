//! Authenticated request client
//!
//! Wraps outbound HTTP calls: attaches the bearer credential, detects expiry
//! from server responses, refreshes the credential exactly once when many
//! requests discover expiry together, and replays those requests once a fresh
//! credential is committed.
//!
//! Request flow:
//! 1. `AuthClient::request()` dispatches via `Dispatcher::send()`
//! 2. `classify()` assigns an outcome category
//! 3. Expired credentials go to `RefreshCoordinator::recover()`, which queues
//!    the request, runs one refresh, and replays the queue in FIFO order
//! 4. Terminal credential failures clear the store and notify the
//!    `SessionListener` once

pub mod account;
pub mod classify;
pub mod client;
pub mod config;
pub mod coordinator;
pub mod dispatcher;
pub mod error;
pub mod request;
pub mod session;

#[cfg(test)]
mod mock;

pub use account::SignedIn;
pub use classify::{Outcome, classify};
pub use client::AuthClient;
pub use config::ClientConfig;
pub use coordinator::RefreshCoordinator;
pub use dispatcher::{Dispatched, Dispatcher, RawOutcome};
pub use error::{RequestError, Result};
pub use request::{Method, RequestDescription, Response};
pub use session::{NoopListener, Session, SessionListener};
