//! Mock API server for tests
//!
//! Accepts `Bearer <valid token>` on any unrouted path and answers 401
//! otherwise. `/delayed` waits before checking the token, so its 401 can
//! arrive after a refresh committed; `/slow-after-refresh` answers a 401 at
//! once but takes its time on success. The refresh endpoint's behavior is scriptable, and can be held
//! open with a gate so tests can queue requests behind an in-flight refresh.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::Json;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tokio::sync::Notify;

#[derive(Debug, Clone)]
pub enum RefreshBehavior {
    Issue { token: String, refresh_token: String },
    /// 401, the refresh token is rejected
    Reject,
    /// 200 without a `token` field
    MissingToken,
}

impl RefreshBehavior {
    pub fn issue(token: &str, refresh_token: &str) -> Self {
        RefreshBehavior::Issue {
            token: token.into(),
            refresh_token: refresh_token.into(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Seen {
    pub path: String,
    pub authorization: Option<String>,
    pub seq: Option<String>,
}

pub struct MockState {
    valid_token: Mutex<String>,
    refresh: Mutex<RefreshBehavior>,
    refresh_gate: Mutex<Option<Arc<Notify>>>,
    refresh_calls: AtomicUsize,
    refresh_tokens: Mutex<Vec<String>>,
    seen: Mutex<Vec<Seen>>,
}

impl MockState {
    pub fn set_refresh(&self, behavior: RefreshBehavior) {
        *self.refresh.lock().unwrap() = behavior;
    }

    /// Hold every refresh call until the returned gate is notified.
    pub fn gate_refresh(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        *self.refresh_gate.lock().unwrap() = Some(gate.clone());
        gate
    }

    pub fn refresh_calls(&self) -> usize {
        self.refresh_calls.load(Ordering::SeqCst)
    }

    pub fn refresh_tokens_received(&self) -> Vec<String> {
        self.refresh_tokens.lock().unwrap().clone()
    }

    /// Authorization headers seen on `path`, in arrival order.
    pub fn auth_seen_for(&self, path: &str) -> Vec<Option<String>> {
        self.seen
            .lock()
            .unwrap()
            .iter()
            .filter(|s| s.path == path)
            .map(|s| s.authorization.clone())
            .collect()
    }

    /// `x-seq` values of requests that arrived with `authorization`.
    pub fn seq_seen_with(&self, authorization: &str) -> Vec<String> {
        self.seen
            .lock()
            .unwrap()
            .iter()
            .filter(|s| s.authorization.as_deref() == Some(authorization))
            .filter_map(|s| s.seq.clone())
            .collect()
    }

    fn record(&self, path: &str, headers: &HeaderMap) {
        let header = |name: &str| {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::to_owned)
        };
        self.seen.lock().unwrap().push(Seen {
            path: path.to_string(),
            authorization: header("authorization"),
            seq: header("x-seq"),
        });
    }
}

pub struct MockApi {
    pub url: String,
    pub state: Arc<MockState>,
    _server: tokio::task::JoinHandle<()>,
}

impl MockApi {
    /// Start the server. An empty `valid_token` rejects every bearer until
    /// a refresh issues one.
    pub async fn start(valid_token: &str) -> Self {
        let state = Arc::new(MockState {
            valid_token: Mutex::new(valid_token.to_string()),
            refresh: Mutex::new(RefreshBehavior::Reject),
            refresh_gate: Mutex::new(None),
            refresh_calls: AtomicUsize::new(0),
            refresh_tokens: Mutex::new(Vec::new()),
            seen: Mutex::new(Vec::new()),
        });

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}", listener.local_addr().unwrap());

        let app = axum::Router::new()
            .route("/auth/refresh-token", post(refresh_handler))
            .route("/auth/login", post(login_handler))
            .route("/auth/register", post(register_handler))
            .route("/health", get(|| async { "ok" }))
            .fallback(api_handler)
            .with_state(state.clone());

        let server = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            url,
            state,
            _server: server,
        }
    }
}

async fn refresh_handler(
    State(state): State<Arc<MockState>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    state.record("/auth/refresh-token", &headers);
    state.refresh_calls.fetch_add(1, Ordering::SeqCst);
    if let Some(rt) = body.get("refreshToken").and_then(|v| v.as_str()) {
        state.refresh_tokens.lock().unwrap().push(rt.to_string());
    }

    let gate = state.refresh_gate.lock().unwrap().clone();
    if let Some(gate) = gate {
        gate.notified().await;
    }

    let behavior = state.refresh.lock().unwrap().clone();
    match behavior {
        RefreshBehavior::Issue {
            token,
            refresh_token,
        } => {
            *state.valid_token.lock().unwrap() = token.clone();
            (
                StatusCode::OK,
                Json(json!({"token": token, "refreshToken": refresh_token})),
            )
                .into_response()
        }
        RefreshBehavior::Reject => (
            StatusCode::UNAUTHORIZED,
            Json(json!({"message": "Refresh token expired"})),
        )
            .into_response(),
        RefreshBehavior::MissingToken => {
            (StatusCode::OK, Json(json!({"refreshToken": "RT9"}))).into_response()
        }
    }
}

async fn login_handler(
    State(state): State<Arc<MockState>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    state.record("/auth/login", &headers);
    if body["password"] == "secret" {
        *state.valid_token.lock().unwrap() = "T1".into();
        (
            StatusCode::OK,
            Json(json!({
                "token": "T1",
                "refreshToken": "RT1",
                "user": {"email": body["email"], "role": "customer"}
            })),
        )
            .into_response()
    } else {
        (
            StatusCode::UNAUTHORIZED,
            Json(json!({"message": "Invalid email or password"})),
        )
            .into_response()
    }
}

async fn register_handler(
    State(state): State<Arc<MockState>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    state.record("/auth/register", &headers);
    if body.get("email").is_none() {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({"error": {"message": "Email is required"}})),
        )
            .into_response();
    }
    *state.valid_token.lock().unwrap() = "T1".into();
    (
        StatusCode::CREATED,
        Json(json!({
            "token": "T1",
            "refreshToken": "RT1",
            "user": {"email": body["email"], "role": body["role"]}
        })),
    )
        .into_response()
}

async fn api_handler(State(state): State<Arc<MockState>>, uri: Uri, headers: HeaderMap) -> Response {
    let path = uri.path().to_string();
    state.record(&path, &headers);

    match path.as_str() {
        "/slow" => {
            tokio::time::sleep(Duration::from_secs(3)).await;
            return (StatusCode::OK, Json(json!({}))).into_response();
        }
        "/boom" => {
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({"message": "Database down"})),
            )
                .into_response();
        }
        "/missing" => return StatusCode::NOT_FOUND.into_response(),
        "/forbidden" => {
            return (
                StatusCode::FORBIDDEN,
                Json(json!({"error": {"message": "Admins only"}})),
            )
                .into_response();
        }
        "/always-401" => {
            return (
                StatusCode::UNAUTHORIZED,
                Json(json!({"message": "Token expired"})),
            )
                .into_response();
        }
        "/tampered" => {
            return (
                StatusCode::UNAUTHORIZED,
                Json(json!({"message": "Invalid token"})),
            )
                .into_response();
        }
        _ => {}
    }

    if path == "/delayed" {
        tokio::time::sleep(Duration::from_millis(300)).await;
    }

    let valid = state.valid_token.lock().unwrap().clone();
    let authorization = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    if !valid.is_empty() && authorization == format!("Bearer {valid}") {
        if path == "/slow-after-refresh" {
            tokio::time::sleep(Duration::from_secs(2)).await;
        }
        (
            StatusCode::OK,
            Json(json!({"path": path, "authorization": authorization})),
        )
            .into_response()
    } else {
        (
            StatusCode::UNAUTHORIZED,
            Json(json!({"message": "Token expired"})),
        )
            .into_response()
    }
}
