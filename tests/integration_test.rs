//! Pipeline tests: layers composed around plain handlers, without the
//! application's routes.

mod common;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;

use http::header::{self, HeaderValue};
use http::{Method, StatusCode};
use snippetbox_core::auth::{
    log_in, log_out, AuthState, RequireAuthentication, AUTHENTICATED_USER_ID,
};
use snippetbox_core::config::{CsrfConfig, SessionConfig};
use snippetbox_core::csrf::CsrfGuard;
use snippetbox_core::session::{LoadAndSave, MemoryStore, SessionManager, SessionStore};
use snippetbox_core::web::{
    status_response, text, BoxHandler, Chain, Handler, Request, RequestExt, Response, Router,
};
use snippetbox_core::UserId;

fn manager(store: &Arc<MemoryStore>) -> Arc<SessionManager> {
    Arc::new(SessionManager::new(store.clone(), SessionConfig::default()))
}

fn request(method: Method, path: &str, cookie: Option<&str>) -> Request {
    let mut req = http::Request::builder()
        .method(method)
        .uri(path)
        .body(Vec::new())
        .unwrap();
    if let Some(token) = cookie {
        req.headers_mut().insert(
            header::COOKIE,
            HeaderValue::from_str(&format!("session={token}")).unwrap(),
        );
    }
    req
}

fn set_cookie(resp: &Response) -> Option<String> {
    resp.headers()
        .get(header::SET_COOKIE)
        .map(|v| v.to_str().unwrap().to_string())
}

fn cookie_token(resp: &Response) -> String {
    let cookie = set_cookie(resp).expect("Set-Cookie");
    let pair = cookie.split(';').next().unwrap();
    pair.strip_prefix("session=").unwrap().to_string()
}

// ============================================================================
// Sessions through LoadAndSave
// ============================================================================

fn session_app(store: &Arc<MemoryStore>) -> BoxHandler {
    let router = Router::new()
        .post("/put", |req: Request| {
            req.session().unwrap().put("colour", "teal").unwrap();
            status_response(StatusCode::OK)
        })
        .unwrap()
        .get("/read", |req: Request| {
            let colour = req
                .session()
                .and_then(|s| s.get::<String>("colour"))
                .unwrap_or_default();
            text(StatusCode::OK, colour)
        })
        .unwrap()
        .post("/destroy", |req: Request| {
            req.session().unwrap().destroy().unwrap();
            status_response(StatusCode::OK)
        })
        .unwrap();

    Chain::new()
        .with(LoadAndSave::new(manager(store)))
        .then(router)
}

#[test]
fn read_only_request_sets_no_cookie() {
    common::init_tracing();
    let store = Arc::new(MemoryStore::new());
    let app = session_app(&store);

    let resp = app.call(request(Method::GET, "/read", None));

    assert_eq!(resp.status(), StatusCode::OK);
    assert!(set_cookie(&resp).is_none());
    assert!(store.is_empty());
}

#[test]
fn written_value_is_visible_on_the_next_request() {
    common::init_tracing();
    let store = Arc::new(MemoryStore::new());
    let app = session_app(&store);

    let resp = app.call(request(Method::POST, "/put", None));
    let token = cookie_token(&resp);
    assert_eq!(store.len(), 1);
    assert!(resp
        .headers()
        .get_all(header::CACHE_CONTROL)
        .iter()
        .any(|v| v == r#"no-cache="Set-Cookie""#));

    let resp = app.call(request(Method::GET, "/read", Some(token.as_str())));
    assert_eq!(resp.body(), b"teal");
    assert!(set_cookie(&resp).is_none());
}

#[test]
fn unknown_token_starts_a_fresh_session() {
    common::init_tracing();
    let store = Arc::new(MemoryStore::new());
    let app = session_app(&store);

    let resp = app.call(request(Method::GET, "/read", Some("forged-token")));
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(resp.body().is_empty());

    let resp = app.call(request(Method::POST, "/put", Some("forged-token")));
    assert_ne!(cookie_token(&resp), "forged-token");
}

#[test]
fn destroyed_session_expires_the_cookie() {
    common::init_tracing();
    let store = Arc::new(MemoryStore::new());
    let app = session_app(&store);
    let token = cookie_token(&app.call(request(Method::POST, "/put", None)));

    let resp = app.call(request(Method::POST, "/destroy", Some(token.as_str())));

    let cookie = set_cookie(&resp).unwrap();
    assert!(cookie.starts_with("session=;"));
    assert!(cookie.contains("Max-Age=0"));
    assert!(store.load(&token).unwrap().is_none());
}

// ============================================================================
// CSRF
// ============================================================================

fn csrf_app(store: &Arc<MemoryStore>, calls: Arc<AtomicUsize>) -> BoxHandler {
    let router = Router::new()
        .get("/form", |req: Request| {
            text(
                StatusCode::OK,
                req.csrf_token().map(|t| t.as_str().to_string()).unwrap_or_default(),
            )
        })
        .unwrap()
        .post("/form", move |_req: Request| {
            calls.fetch_add(1, Ordering::SeqCst);
            status_response(StatusCode::OK)
        })
        .unwrap();

    Chain::new()
        .with(LoadAndSave::new(manager(store)))
        .with(CsrfGuard::new(CsrfConfig::default()))
        .then(router)
}

#[test]
fn csrf_token_in_header_is_accepted() {
    common::init_tracing();
    let store = Arc::new(MemoryStore::new());
    let calls = Arc::new(AtomicUsize::new(0));
    let app = csrf_app(&store, calls.clone());

    let page = app.call(request(Method::GET, "/form", None));
    let session = cookie_token(&page);
    let masked = String::from_utf8(page.body().clone()).unwrap();
    assert_eq!(masked.len(), 128);

    let mut req = request(Method::POST, "/form", Some(session.as_str()));
    req.headers_mut()
        .insert("x-csrf-token", HeaderValue::from_str(&masked).unwrap());

    assert_eq!(app.call(req).status(), StatusCode::OK);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[test]
fn csrf_form_field_is_only_read_from_a_bounded_body() {
    common::init_tracing();
    let store = Arc::new(MemoryStore::new());
    let calls = Arc::new(AtomicUsize::new(0));
    let app = csrf_app(&store, calls.clone());

    let page = app.call(request(Method::GET, "/form", None));
    let session = cookie_token(&page);
    let masked = String::from_utf8(page.body().clone()).unwrap();

    let post = |padding: usize| {
        let mut req = request(Method::POST, "/form", Some(session.as_str()));
        req.headers_mut().insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/x-www-form-urlencoded"),
        );
        *req.body_mut() = format!("csrf_token={masked}&content={}", "a".repeat(padding))
            .into_bytes();
        app.call(req)
    };

    assert_eq!(post(16).status(), StatusCode::OK);
    assert_eq!(post(8192).status(), StatusCode::BAD_REQUEST);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[test]
fn post_without_token_never_reaches_the_handler() {
    common::init_tracing();
    let store = Arc::new(MemoryStore::new());
    let calls = Arc::new(AtomicUsize::new(0));
    let app = csrf_app(&store, calls.clone());
    let session = cookie_token(&app.call(request(Method::GET, "/form", None)));

    let missing = app.call(request(Method::POST, "/form", Some(session.as_str())));

    let mut req = request(Method::POST, "/form", Some(session.as_str()));
    req.headers_mut()
        .insert("x-csrf-token", HeaderValue::from_static("not-hex"));
    let malformed = app.call(req);

    assert_eq!(missing.status(), StatusCode::BAD_REQUEST);
    assert_eq!(malformed.status(), StatusCode::BAD_REQUEST);
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[test]
fn first_request_can_be_unsafe_and_still_rejected() {
    common::init_tracing();
    let store = Arc::new(MemoryStore::new());
    let calls = Arc::new(AtomicUsize::new(0));
    let app = csrf_app(&store, calls.clone());

    let resp = app.call(request(Method::POST, "/form", None));

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[test]
fn csrf_guard_without_a_session_is_a_server_fault() {
    common::init_tracing();
    let handler = Chain::new()
        .with(CsrfGuard::new(CsrfConfig::default()))
        .then(|_req: Request| status_response(StatusCode::OK));

    let resp = handler.call(request(Method::GET, "/", None));
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
}

// ============================================================================
// Authentication guard
// ============================================================================

fn auth_app(store: &Arc<MemoryStore>) -> BoxHandler {
    let dynamic = Chain::new().with(LoadAndSave::new(manager(store)));
    let protected = dynamic.append(RequireAuthentication::new("/login"));

    let login = dynamic.then(|req: Request| {
        log_in(req.session().unwrap(), UserId(7)).unwrap();
        status_response(StatusCode::OK)
    });
    let secret = protected.then(|req: Request| {
        let id = req.auth_state().user_id();
        text(StatusCode::OK, format!("{id:?}"))
    });

    let router = Router::new()
        .route_boxed(Method::POST, "/login", login)
        .unwrap()
        .route_boxed(Method::GET, "/secret", secret)
        .unwrap();
    Chain::new().then(router)
}

#[test]
fn guard_redirects_until_logged_in() {
    common::init_tracing();
    let store = Arc::new(MemoryStore::new());
    let app = auth_app(&store);

    let resp = app.call(request(Method::GET, "/secret", None));
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert_eq!(resp.headers()[header::LOCATION], "/login");
    assert!(set_cookie(&resp).is_none());

    let token = cookie_token(&app.call(request(Method::POST, "/login", None)));
    let resp = app.call(request(Method::GET, "/secret", Some(token.as_str())));

    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.headers()[header::CACHE_CONTROL], "no-store");
    let stored = store.load(&token).unwrap().unwrap();
    assert!(String::from_utf8(stored).unwrap().contains(AUTHENTICATED_USER_ID));
}

#[test]
fn login_moves_an_existing_session_to_a_new_token() {
    common::init_tracing();
    let store = Arc::new(MemoryStore::new());
    let app = auth_app(&store);

    let first = cookie_token(&app.call(request(Method::POST, "/login", None)));
    let second = cookie_token(&app.call(request(Method::POST, "/login", Some(first.as_str()))));

    assert_ne!(first, second);
    assert!(store.load(&first).unwrap().is_none());
    assert!(store.load(&second).unwrap().is_some());
    assert_eq!(store.len(), 1);
}

#[test]
fn logout_is_not_undone_by_a_request_racing_on_the_old_token() {
    common::init_tracing();
    let store = Arc::new(MemoryStore::new());
    let m = manager(&store);
    let session = m.load(None).unwrap();
    log_in(&session, UserId(7)).unwrap();
    let old = m.commit(&session).unwrap().unwrap().value;

    let logout = m.load(Some(old.as_str())).unwrap();
    let racing = m.load(Some(old.as_str())).unwrap();
    assert!(AuthState::of(&racing).is_authenticated());

    log_out(&logout).unwrap();
    let renewed = m.commit(&logout).unwrap().unwrap().value;
    racing.put("flash", "late write").unwrap();
    assert!(m.commit(&racing).unwrap().is_none());

    assert_ne!(old, renewed);
    assert!(store.load(&old).unwrap().is_none());
    assert!(m.load(Some(old.as_str())).unwrap().token().is_none());
    let after = m.load(Some(renewed.as_str())).unwrap();
    assert_eq!(AuthState::of(&after), AuthState::Anonymous);
}

#[test]
fn concurrent_requests_on_one_token_keep_the_logout() {
    common::init_tracing();
    let store = Arc::new(MemoryStore::new());
    let steps = Arc::new(Barrier::new(2));
    let dynamic = Chain::new().with(LoadAndSave::new(manager(&store)));

    let login = dynamic.then(|req: Request| {
        log_in(req.session().unwrap(), UserId(7)).unwrap();
        status_response(StatusCode::OK)
    });
    let logout = dynamic.then(|req: Request| {
        log_out(req.session().unwrap()).unwrap();
        status_response(StatusCode::OK)
    });
    let handler_steps = steps.clone();
    let flash = dynamic.then(move |req: Request| {
        handler_steps.wait();
        handler_steps.wait();
        req.session().unwrap().put("flash", "late write").unwrap();
        status_response(StatusCode::OK)
    });
    let app = Chain::new().then(
        Router::new()
            .route_boxed(Method::POST, "/login", login)
            .unwrap()
            .route_boxed(Method::POST, "/logout", logout)
            .unwrap()
            .route_boxed(Method::POST, "/flash", flash)
            .unwrap(),
    );

    let old = cookie_token(&app.call(request(Method::POST, "/login", None)));

    let slow = {
        let app = app.clone();
        let old = old.clone();
        thread::spawn(move || app.call(request(Method::POST, "/flash", Some(old.as_str()))))
    };
    steps.wait();
    let renewed = cookie_token(&app.call(request(Method::POST, "/logout", Some(old.as_str()))));
    steps.wait();
    let late = slow.join().unwrap();

    assert_eq!(late.status(), StatusCode::OK);
    assert!(set_cookie(&late).is_none());
    assert!(store.load(&old).unwrap().is_none());
    assert_eq!(store.len(), 1);
    let stored = store.load(&renewed).unwrap().unwrap();
    assert!(!String::from_utf8(stored).unwrap().contains(AUTHENTICATED_USER_ID));
}

// ============================================================================
// Router through a chain
// ============================================================================

#[test]
fn path_parameters_reach_the_handler() {
    let router = Router::new()
        .get("/snippet/view/:id", |req: Request| {
            text(StatusCode::OK, req.path_param("id").unwrap_or("none").to_string())
        })
        .unwrap()
        .get("/snippet/view/latest", |_req: Request| {
            text(StatusCode::OK, "literal")
        })
        .unwrap();
    let app = Chain::new().then(router);

    let body = |path: &str| {
        let resp = app.call(request(Method::GET, path, None));
        (resp.status(), String::from_utf8(resp.into_body()).unwrap())
    };

    assert_eq!(body("/snippet/view/42"), (StatusCode::OK, "42".to_string()));
    assert_eq!(body("/snippet/view/latest"), (StatusCode::OK, "literal".to_string()));
    assert_eq!(body("/snippet/view/").0, StatusCode::NOT_FOUND);
    assert_eq!(body("/snippet/view/1/extra").0, StatusCode::NOT_FOUND);
}
