//! Endpoint paths and fixed timeouts shared by the store and the client
//!
//! Paths are relative to the configured API base URL.

/// Refresh endpoint: `POST { refreshToken } -> { token, refreshToken }`
pub const REFRESH_PATH: &str = "/auth/refresh-token";

/// Login endpoint, issues a fresh credential pair
pub const LOGIN_PATH: &str = "/auth/login";

/// Registration endpoint, issues a fresh credential pair
pub const REGISTER_PATH: &str = "/auth/register";

/// Server-side session invalidation
pub const LOGOUT_PATH: &str = "/auth/logout";

/// Current user profile
pub const ME_PATH: &str = "/auth/me";

/// Endpoints that issue or refresh credentials. The access token is never
/// attached to these, and a 401 from them never starts a refresh.
pub const DEFAULT_AUTH_PATHS: &[&str] = &[LOGIN_PATH, REGISTER_PATH, REFRESH_PATH];

/// Per-request timeout applied by the dispatcher.
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Timeout for the diagnostic health probe after a network failure.
pub const HEALTH_PROBE_TIMEOUT_SECS: u64 = 3;
