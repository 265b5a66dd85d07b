//! Request descriptions and completed responses

use bytes::Bytes;
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderName, HeaderValue};
use serde::de::DeserializeOwned;

use crate::error::{RequestError, Result};

pub use reqwest::Method;

/// Everything needed to (re)issue one request.
///
/// Headers are built per request; nothing is shared between requests.
/// `retried` marks a request that has already been replayed once after a
/// credential refresh. A second expiry on such a request is terminal.
#[derive(Debug, Clone)]
pub struct RequestDescription {
    pub method: Method,
    pub path: String,
    pub body: Option<serde_json::Value>,
    pub headers: HeaderMap,
    pub retried: bool,
}

impl RequestDescription {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            body: None,
            headers: HeaderMap::new(),
            retried: false,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>, body: serde_json::Value) -> Self {
        Self::new(Method::POST, path).with_body(body)
    }

    pub fn put(path: impl Into<String>, body: serde_json::Value) -> Self {
        Self::new(Method::PUT, path).with_body(body)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    pub fn with_body(mut self, body: serde_json::Value) -> Self {
        self.body = Some(body);
        self
    }

    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    pub fn mark_retried(mut self) -> Self {
        self.retried = true;
        self
    }

    /// The caller supplied its own `Authorization`; the stored credential is
    /// not attached and not responsible for a 401.
    pub fn has_caller_authorization(&self) -> bool {
        self.headers.contains_key(AUTHORIZATION)
    }
}

/// An HTTP response with its body fully read. Callers only ever receive
/// 2xx responses; other statuses are turned into `RequestError`s.
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    pub status: u16,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl Response {
    /// Decode the body as JSON.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_slice(&self.body).map_err(|e| RequestError::Other {
            status: Some(self.status),
            message: format!("invalid response body: {e}"),
        })
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builders_set_method_and_body() {
        let req = RequestDescription::post("/orders", serde_json::json!({"qty": 2}));
        assert_eq!(req.method, Method::POST);
        assert_eq!(req.body.as_ref().unwrap()["qty"], 2);
        assert!(!req.retried);

        let req = RequestDescription::delete("/orders/7");
        assert_eq!(req.method, Method::DELETE);
        assert!(req.body.is_none());
    }

    #[test]
    fn retried_mark_travels_with_clone() {
        let req = RequestDescription::get("/me").mark_retried();
        let copy = req.clone();
        assert!(copy.retried);
    }

    #[test]
    fn caller_headers_are_kept() {
        let req = RequestDescription::get("/me")
            .with_header(AUTHORIZATION, HeaderValue::from_static("Bearer caller"));
        assert_eq!(req.headers.get(AUTHORIZATION).unwrap(), "Bearer caller");
        assert!(req.has_caller_authorization());
        assert!(!RequestDescription::get("/orders").has_caller_authorization());
    }

    #[test]
    fn json_decode_failure_is_other_error() {
        let response = Response {
            status: 200,
            headers: HeaderMap::new(),
            body: Bytes::from_static(b"not json"),
        };
        let err = response.json::<serde_json::Value>().unwrap_err();
        assert!(matches!(err, RequestError::Other { status: Some(200), .. }));
        assert_eq!(response.text(), "not json");
    }
}
