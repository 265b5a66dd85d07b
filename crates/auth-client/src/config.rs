//! Client configuration
//!
//! Deserializable so host applications can embed it in their own config
//! files; every field but `base_url` has a default.

use std::time::Duration;

use credential_store::{DEFAULT_AUTH_PATHS, DEFAULT_TIMEOUT_SECS, REFRESH_PATH};
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct ClientConfig {
    /// API root, e.g. `https://api.example.com/api`. Request paths are
    /// appended to it.
    pub base_url: String,
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
    #[serde(default = "default_refresh_path")]
    pub refresh_path: String,
    /// Paths that issue credentials; never sent with a bearer token.
    #[serde(default = "default_auth_paths")]
    pub auth_paths: Vec<String>,
    /// Absolute URL probed after a network failure, for diagnostics only.
    #[serde(default)]
    pub health_url: Option<String>,
}

fn default_timeout() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

fn default_refresh_path() -> String {
    REFRESH_PATH.to_string()
}

fn default_auth_paths() -> Vec<String> {
    DEFAULT_AUTH_PATHS.iter().map(|p| p.to_string()).collect()
}

impl ClientConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            timeout_secs: default_timeout(),
            refresh_path: default_refresh_path(),
            auth_paths: default_auth_paths(),
            health_url: None,
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Whether `path` issues or refreshes credentials. Query strings are
    /// ignored.
    pub fn is_auth_path(&self, path: &str) -> bool {
        let path = path.split('?').next().unwrap_or(path);
        path == self.refresh_path || self.auth_paths.iter().any(|p| p == path)
    }

    /// Join the base URL and a request path with exactly one slash.
    pub fn url_for(&self, path: &str) -> String {
        let base = self.base_url.trim_end_matches('/');
        if path.starts_with('/') {
            format!("{base}{path}")
        } else {
            format!("{base}/{path}")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_constants() {
        let config = ClientConfig::new("http://localhost");
        assert_eq!(config.timeout(), Duration::from_secs(10));
        assert_eq!(config.refresh_path, "/auth/refresh-token");
        assert!(config.health_url.is_none());
    }

    #[test]
    fn auth_paths_ignore_query_string() {
        let config = ClientConfig::new("http://localhost");
        assert!(config.is_auth_path("/auth/login"));
        assert!(config.is_auth_path("/auth/login?next=/cart"));
        assert!(config.is_auth_path("/auth/refresh-token"));
        assert!(config.is_auth_path("/auth/register"));
        assert!(!config.is_auth_path("/auth/me"));
        assert!(!config.is_auth_path("/orders"));
    }

    #[test]
    fn custom_refresh_path_counts_as_auth_path() {
        let mut config = ClientConfig::new("http://localhost");
        config.refresh_path = "/v2/token/refresh".into();
        config.auth_paths.clear();
        assert!(config.is_auth_path("/v2/token/refresh"));
    }

    #[test]
    fn url_join_handles_slashes() {
        let config = ClientConfig::new("http://localhost:8080/api/");
        assert_eq!(config.url_for("/orders"), "http://localhost:8080/api/orders");
        assert_eq!(config.url_for("orders"), "http://localhost:8080/api/orders");
    }

    #[test]
    fn deserializes_with_defaults() {
        let config: ClientConfig = serde_json::from_str(r#"{"base_url":"http://x"}"#).unwrap();
        assert_eq!(config.timeout_secs, 10);
        assert_eq!(config.auth_paths.len(), 3);
    }
}
