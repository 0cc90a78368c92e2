//! In-memory stand-ins for edX, MicroMasters, Open Discussions and its
//! Reddit-style channel backend, serving just the endpoints the load
//! scripts call.
//!
//! Everything runs on one listener, so one cookie jar sees every platform.

mod discussions;
mod edx;
mod reddit;

use std::collections::{BTreeMap, BTreeSet, HashMap, VecDeque};
use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::{Request, State};
use axum::http::{HeaderMap, Method, StatusCode};
use axum::middleware::{self, Next};
use axum::response::Response;
use axum::Router;
use parking_lot::{Mutex, MutexGuard};
use platform_wire::reddit::{Comment, Submission};
use platform_wire::{CSRF_COOKIE, CSRF_HEADER};
use serde_json::{Map, Value};

pub use reddit::ChannelSnapshot;

/// Session cookie shared by the LMS and MicroMasters, holds the username.
pub const SESSION_COOKIE: &str = "sessionid";
pub const DEFAULT_LOG_LIMIT: usize = 10_000;

#[derive(Debug, Clone)]
pub struct MockConfig {
    /// Passwords every account accepts.
    pub passwords: Vec<String>,
    pub jwt_secret: String,
    pub reddit_client_id: String,
    pub reddit_secret: String,
    pub reddit_access_token: String,
    /// Newest requests and problem submissions kept for inspection, 0 keeps none.
    pub log_limit: usize,
}

impl Default for MockConfig {
    fn default() -> Self {
        Self {
            passwords: vec!["test".to_string(), "edx".to_string()],
            jwt_secret: "terribly_unsafe_default_jwt_secret_key".to_string(),
            reddit_client_id: "od_client_id".to_string(),
            reddit_secret: "od_client_secret".to_string(),
            reddit_access_token: "od_access_token".to_string(),
            log_limit: DEFAULT_LOG_LIMIT,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedRequest {
    pub method: Method,
    pub path: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProblemSubmission {
    pub username: String,
    pub course_id: String,
    pub block_id: String,
    pub answers: Vec<(String, String)>,
}

/// Keeps the newest `limit` entries.
#[derive(Debug)]
struct BoundedLog<T> {
    entries: VecDeque<T>,
    limit: usize,
}

impl<T: Clone> BoundedLog<T> {
    fn new(limit: usize) -> Self {
        Self {
            entries: VecDeque::new(),
            limit,
        }
    }

    fn push(&mut self, entry: T) {
        if self.limit == 0 {
            return;
        }
        if self.entries.len() >= self.limit {
            self.entries.pop_front();
        }
        self.entries.push_back(entry);
    }

    fn iter(&self) -> impl Iterator<Item = &T> {
        self.entries.iter()
    }

    fn to_vec(&self) -> Vec<T> {
        self.entries.iter().cloned().collect()
    }
}

impl<T: Clone> Default for BoundedLog<T> {
    fn default() -> Self {
        Self::new(DEFAULT_LOG_LIMIT)
    }
}

#[derive(Debug, Default)]
struct Platforms {
    requests: BoundedLog<RecordedRequest>,
    enrollments: BTreeSet<(String, String)>,
    submissions: BoundedLog<ProblemSubmission>,
    profiles: HashMap<String, Map<String, Value>>,
    program_enrollments: Vec<(String, u64)>,
    users: BTreeMap<String, Map<String, Value>>,
    channels: BTreeMap<String, reddit::Channel>,
    posts: BTreeMap<String, Submission>,
    comments: BTreeMap<String, Comment>,
    next_id: u64,
}

impl Platforms {
    fn next_id(&mut self) -> String {
        self.next_id += 1;
        format!("{:x}", self.next_id + 0x100)
    }
}

/// Shared state of the mock server; clones observe the same platforms.
#[derive(Debug, Clone)]
pub struct MockPlatforms {
    config: Arc<MockConfig>,
    inner: Arc<Mutex<Platforms>>,
}

impl Default for MockPlatforms {
    fn default() -> Self {
        Self::new(MockConfig::default())
    }
}

impl MockPlatforms {
    #[must_use]
    pub fn new(config: MockConfig) -> Self {
        let platforms = Platforms {
            requests: BoundedLog::new(config.log_limit),
            submissions: BoundedLog::new(config.log_limit),
            ..Platforms::default()
        };
        Self {
            config: Arc::new(config),
            inner: Arc::new(Mutex::new(platforms)),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Platforms> {
        self.inner.lock()
    }

    #[must_use]
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.lock().requests.to_vec()
    }

    /// Number of requests whose path starts with `prefix`.
    #[must_use]
    pub fn count_requests(&self, method: &Method, prefix: &str) -> usize {
        self.lock()
            .requests
            .iter()
            .filter(|request| request.method == *method && request.path.starts_with(prefix))
            .count()
    }

    #[must_use]
    pub fn is_enrolled(&self, username: &str, course_id: &str) -> bool {
        self.lock()
            .enrollments
            .contains(&(username.to_string(), course_id.to_string()))
    }

    #[must_use]
    pub fn submissions(&self) -> Vec<ProblemSubmission> {
        self.lock().submissions.to_vec()
    }

    #[must_use]
    pub fn profile(&self, username: &str) -> Option<Map<String, Value>> {
        self.lock().profiles.get(username).cloned()
    }

    #[must_use]
    pub fn program_enrollments(&self) -> Vec<(String, u64)> {
        self.lock().program_enrollments.clone()
    }

    #[must_use]
    pub fn discussion_user(&self, username: &str) -> Option<Map<String, Value>> {
        self.lock().users.get(username).cloned()
    }

    #[must_use]
    pub fn channel(&self, name: &str) -> Option<ChannelSnapshot> {
        self.lock().channels.get(name).map(reddit::Channel::snapshot)
    }

    /// Creates a channel owned by `moderator` without going through the API.
    pub fn seed_channel(&self, name: &str, title: &str, moderator: &str) {
        let mut platforms = self.lock();
        let id = platforms.next_id();
        platforms
            .channels
            .insert(name.to_string(), reddit::Channel::new(&id, name, title, "public", moderator));
    }

    #[must_use]
    pub fn post(&self, id: &str) -> Option<Submission> {
        self.lock().posts.get(id).cloned()
    }

    #[must_use]
    pub fn comment(&self, id: &str) -> Option<Comment> {
        self.lock().comments.get(id).cloned()
    }
}

pub fn router(state: MockPlatforms) -> Router {
    Router::new()
        .merge(edx::routes())
        .merge(discussions::routes())
        .merge(reddit::routes())
        .layer(middleware::from_fn_with_state(state.clone(), record))
        .with_state(state)
}

async fn record(State(state): State<MockPlatforms>, request: Request, next: Next) -> Response {
    tracing::debug!(method = %request.method(), path = request.uri().path(), "mock request");
    state.lock().requests.push(RecordedRequest {
        method: request.method().clone(),
        path: request.uri().path().to_string(),
    });
    next.run(request).await
}

/// Serves the mock on `addr` in a background task and returns the bound address.
pub async fn spawn(addr: &str, state: MockPlatforms) -> anyhow::Result<SocketAddr> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    let local = listener.local_addr()?;
    let router = router(state);
    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, router).await {
            tracing::error!("mock server stopped: {e}");
        }
    });
    Ok(local)
}

fn cookie<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get_all(axum::http::header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value)
}

fn session_user(headers: &HeaderMap) -> Option<String> {
    cookie(headers, SESSION_COOKIE)
        .filter(|username| !username.is_empty())
        .map(str::to_string)
}

/// The anti-forgery header has to echo the cookie.
fn csrf_ok(headers: &HeaderMap) -> bool {
    let header = headers.get(CSRF_HEADER).and_then(|value| value.to_str().ok());
    matches!((header, cookie(headers, CSRF_COOKIE)), (Some(a), Some(b)) if a == b)
}

fn set_cookie(name: &str, value: &str) -> String {
    format!("{name}={value}; Path=/")
}

fn clear_cookie(name: &str) -> String {
    format!("{name}=; Path=/; Max-Age=0")
}

fn status(code: StatusCode) -> Response {
    axum::response::IntoResponse::into_response(code)
}
