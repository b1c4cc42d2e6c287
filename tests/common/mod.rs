//! Shared fixtures for the integration tests.
//!
//! Provides persistence doubles that count calls, a session store that is
//! always down, and a small client that keeps the session cookie and the
//! latest CSRF token between requests the way a browser would.

#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use http::header::{self, HeaderValue};
use http::{Method, StatusCode};
use serde_json::Value;
use snippetbox_core::models::{
    MemorySnippets, MemoryUsers, ModelError, Snippet, SnippetStore, UserId, UserStore,
};
use snippetbox_core::session::{MemoryStore, SessionStore, StoreError};
use snippetbox_core::web::{BoxHandler, Handler, Response};
use snippetbox_core::{Application, Config};

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

// ============================================================================
// Collaborator doubles
// ============================================================================

/// Snippet store that counts every call.
#[derive(Debug, Default)]
pub struct CountingSnippets {
    inner: MemorySnippets,
    calls: AtomicUsize,
}

impl CountingSnippets {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn tick(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
    }
}

impl SnippetStore for CountingSnippets {
    fn insert(&self, title: &str, content: &str, expires_days: i64) -> Result<i64, ModelError> {
        self.tick();
        self.inner.insert(title, content, expires_days)
    }

    fn get(&self, id: i64) -> Result<Snippet, ModelError> {
        self.tick();
        self.inner.get(id)
    }

    fn latest(&self, limit: usize) -> Result<Vec<Snippet>, ModelError> {
        self.tick();
        self.inner.latest(limit)
    }
}

/// User store that counts every call and can be told to forget everyone.
#[derive(Debug, Default)]
pub struct CountingUsers {
    inner: MemoryUsers,
    calls: AtomicUsize,
    forget_all: AtomicBool,
}

impl CountingUsers {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Makes `exists` report every user as deleted.
    pub fn forget_all(&self) {
        self.forget_all.store(true, Ordering::SeqCst);
    }

    fn tick(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
    }
}

impl UserStore for CountingUsers {
    fn insert(&self, name: &str, email: &str, password: &str) -> Result<(), ModelError> {
        self.tick();
        self.inner.insert(name, email, password)
    }

    fn authenticate(&self, email: &str, password: &str) -> Result<UserId, ModelError> {
        self.tick();
        self.inner.authenticate(email, password)
    }

    fn exists(&self, id: UserId) -> Result<bool, ModelError> {
        if self.forget_all.load(Ordering::SeqCst) {
            return Ok(false);
        }
        self.inner.exists(id)
    }
}

/// Snippet store whose reads panic.
#[derive(Debug, Default)]
pub struct PanickingSnippets;

impl SnippetStore for PanickingSnippets {
    fn insert(&self, _: &str, _: &str, _: i64) -> Result<i64, ModelError> {
        panic!("insert exploded")
    }

    fn get(&self, _: i64) -> Result<Snippet, ModelError> {
        panic!("get exploded")
    }

    fn latest(&self, _: usize) -> Result<Vec<Snippet>, ModelError> {
        panic!("latest exploded")
    }
}

/// Session store that is never reachable.
#[derive(Debug, Default)]
pub struct UnavailableStore;

impl SessionStore for UnavailableStore {
    fn load(&self, _: &str) -> Result<Option<Vec<u8>>, StoreError> {
        Err(StoreError::Unavailable("connection refused".into()))
    }

    fn save(&self, _: &str, _: &[u8], _: DateTime<Utc>) -> Result<(), StoreError> {
        Err(StoreError::Unavailable("connection refused".into()))
    }

    fn delete(&self, _: &str) -> Result<(), StoreError> {
        Err(StoreError::Unavailable("connection refused".into()))
    }
}

// ============================================================================
// Harness
// ============================================================================

/// An application over counting doubles, with handles to each of them.
pub struct Harness {
    pub app: Arc<Application>,
    pub snippets: Arc<CountingSnippets>,
    pub users: Arc<CountingUsers>,
    pub sessions: Arc<MemoryStore>,
}

impl Harness {
    pub fn new() -> Self {
        init_tracing();
        let snippets = Arc::new(CountingSnippets::default());
        let users = Arc::new(CountingUsers::default());
        let sessions = Arc::new(MemoryStore::new());
        let app = Arc::new(Application::new(
            Config::default(),
            snippets.clone(),
            users.clone(),
            sessions.clone(),
            Arc::new(snippetbox_core::app::JsonRenderer),
        ));
        Self {
            app,
            snippets,
            users,
            sessions,
        }
    }

    pub fn client(&self) -> TestClient {
        TestClient::new(self.app.routes().expect("routes build"))
    }
}

// ============================================================================
// Client
// ============================================================================

/// Percent-encodes a form value.
pub fn encode(value: &str) -> String {
    value
        .bytes()
        .map(|b| match b {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                (b as char).to_string()
            }
            _ => format!("%{b:02X}"),
        })
        .collect()
}

pub fn form_body(fields: &[(&str, &str)]) -> Vec<u8> {
    fields
        .iter()
        .map(|(k, v)| format!("{}={}", encode(k), encode(v)))
        .collect::<Vec<_>>()
        .join("&")
        .into_bytes()
}

/// Parses a JSON-rendered page.
pub fn json(resp: &Response) -> Value {
    serde_json::from_slice(resp.body()).expect("JSON body")
}

pub fn location(resp: &Response) -> &str {
    resp.headers()[header::LOCATION].to_str().unwrap()
}

/// Browser stand-in: remembers the session cookie and the last CSRF token.
pub struct TestClient {
    handler: BoxHandler,
    session: Option<String>,
    csrf: Option<String>,
}

impl TestClient {
    pub fn new(handler: BoxHandler) -> Self {
        Self {
            handler,
            session: None,
            csrf: None,
        }
    }

    pub fn session_token(&self) -> Option<&str> {
        self.session.as_deref()
    }

    pub fn csrf_token(&self) -> Option<&str> {
        self.csrf.as_deref()
    }

    pub fn get(&mut self, path: &str) -> Response {
        self.send(Method::GET, path, Vec::new())
    }

    /// Posts a form, adding the CSRF token picked up from the last page.
    pub fn post(&mut self, path: &str, fields: &[(&str, &str)]) -> Response {
        let token = self.csrf.clone().unwrap_or_default();
        let mut all = vec![("csrf_token", token.as_str())];
        all.extend_from_slice(fields);
        self.send(Method::POST, path, form_body(&all))
    }

    /// Posts a form exactly as given.
    pub fn post_raw(&mut self, path: &str, body: Vec<u8>) -> Response {
        self.send(Method::POST, path, body)
    }

    pub fn send(&mut self, method: Method, path: &str, body: Vec<u8>) -> Response {
        let mut req = http::Request::builder()
            .method(method)
            .uri(path)
            .header(
                header::CONTENT_TYPE,
                "application/x-www-form-urlencoded",
            )
            .body(body)
            .unwrap();
        if let Some(token) = &self.session {
            req.headers_mut().insert(
                header::COOKIE,
                HeaderValue::from_str(&format!("session={token}")).unwrap(),
            );
        }

        let resp = self.handler.call(req);
        self.observe(&resp);
        resp
    }

    fn observe(&mut self, resp: &Response) {
        for value in resp.headers().get_all(header::SET_COOKIE) {
            let pair = value.to_str().unwrap().split(';').next().unwrap();
            if let Some(("session", token)) = pair.split_once('=') {
                self.session = (!token.is_empty()).then(|| token.to_string());
            }
        }

        if resp.status() != StatusCode::SEE_OTHER {
            if let Ok(doc) = serde_json::from_slice::<Value>(resp.body()) {
                if let Some(token) = doc["data"]["csrf_token"].as_str().filter(|t| !t.is_empty()) {
                    self.csrf = Some(token.to_string());
                }
            }
        }
    }

    /// Signs up and logs in; returns the login response.
    pub fn sign_up_and_log_in(&mut self, email: &str, password: &str) -> Response {
        self.get("/user/signup");
        let resp = self.post(
            "/user/signup",
            &[("name", "Alice"), ("email", email), ("password", password)],
        );
        assert_eq!(resp.status(), StatusCode::SEE_OTHER, "signup failed");

        self.get("/user/login");
        let resp = self.post("/user/login", &[("email", email), ("password", password)]);
        assert_eq!(resp.status(), StatusCode::SEE_OTHER, "login failed");
        resp
    }
}
