//! Shared helpers for the Adext conformance test suite.
//!
//! Provides [`spawn_fake_api`]: it binds a `TcpListener` on an ephemeral
//! port, serves a small fake of the graph API from a background thread, and
//! returns a [`FakeApi`] handle holding the base URL and every call the
//! server has seen.
//!
//! # Routes
//!
//! | Method | Path | Answer |
//! |--------|------|--------|
//! | GET    | `/{version}/me` | user node with a nested `hometown` page and a `friends` edge; `ETag` and `Adext-API-Version` headers; `304` when `If-None-Match` matches |
//! | GET    | `/{version}/me/friends` | five friends, paged by `limit` / `after` / `before` with cursors and absolute `next` / `previous` URLs; `summary=true` adds `total_count` |
//! | POST   | `/{version}/me/feed` | `{"id": "<user>_<n>"}` |
//! | DELETE | `/{version}/{id}` | `{"success": true}` |
//! | GET    | `/{version}/bare` | the bare number `12345` |
//! | GET    | `/{version}/compressed` | [`COMPRESSED_BODY`] encoded per `encoding=gzip` (default) or `deflate`, with `Content-Encoding` set |
//! | GET    | `/{version}/oauth/access_token` | form-encoded token pair |
//! | GET    | `/{version}/broken` | `400` with a throttling error payload |
//!
//! Every route except `broken` answers `400` with an `OAuthException`
//! payload when no `access_token` is supplied.

use std::collections::HashMap;
use std::io::Write;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex, PoisonError};

use axum::{
    body::Bytes,
    extract::{RawQuery, State},
    http::{header, HeaderMap, HeaderValue, Method, StatusCode, Uri},
    response::{IntoResponse, Response},
    routing::{delete, get, post},
    Json, Router,
};
use flate2::write::{GzEncoder, ZlibEncoder};
use flate2::Compression;
use serde_json::{json, Value};
use url::form_urlencoded;

/// Entity-tag served for `/me`.
pub const ME_ETAG: &str = "\"me-v1\"";

/// JSON served, compressed, by `/{version}/compressed`.
pub const COMPRESSED_BODY: &str = r#"{"id":"1","name":"Ann"}"#;

/// Version the fake reports in `Adext-API-Version`.
pub const SERVED_VERSION: &str = "v1.0";

const FRIENDS: [(&str, &str); 5] = [
    ("201", "Ada"),
    ("202", "Brook"),
    ("203", "Cyd"),
    ("204", "Dale"),
    ("205", "Eve"),
];

/// One request as the fake API received it.
#[derive(Debug, Clone)]
pub struct ReceivedCall {
    pub method: String,
    pub path: String,
    pub query: HashMap<String, String>,
    /// Form fields of the body (POST and DELETE).
    pub form: HashMap<String, String>,
    pub headers: HashMap<String, String>,
}

impl ReceivedCall {
    /// A credential or parameter from the query string, falling back to the body.
    pub fn param(&self, key: &str) -> Option<&str> {
        self.query
            .get(key)
            .or_else(|| self.form.get(key))
            .map(String::as_str)
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }
}

#[derive(Clone)]
struct FakeState {
    base_url: String,
    calls: Arc<Mutex<Vec<ReceivedCall>>>,
}

impl FakeState {
    fn record(&self, call: ReceivedCall) {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(call);
    }
}

/// Handle to a running fake API.
pub struct FakeApi {
    base_url: String,
    calls: Arc<Mutex<Vec<ReceivedCall>>>,
}

impl FakeApi {
    /// Scheme, host and port, e.g. `http://127.0.0.1:51234`.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Every call received so far, oldest first.
    pub fn calls(&self) -> Vec<ReceivedCall> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn last_call(&self) -> Option<ReceivedCall> {
        self.calls().pop()
    }
}

/// Start the fake API on `127.0.0.1` and an OS-assigned port.
///
/// The server owns a tokio runtime on its own thread, so callers can drive
/// it with blocking HTTP clients from plain `#[test]` functions.
///
/// # Panics
///
/// Panics if the runtime cannot be built or the listener cannot be bound.
pub fn spawn_fake_api() -> FakeApi {
    let calls = Arc::new(Mutex::new(Vec::new()));
    let (addr_tx, addr_rx) = std::sync::mpsc::channel::<SocketAddr>();
    let server_calls = Arc::clone(&calls);

    std::thread::spawn(move || {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(1)
            .enable_all()
            .build()
            .expect("build fake api runtime");
        runtime.block_on(async move {
            let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
                .await
                .expect("bind ephemeral port");
            let addr = listener.local_addr().expect("get local addr");
            let state = FakeState {
                base_url: format!("http://{addr}"),
                calls: server_calls,
            };
            addr_tx.send(addr).expect("report fake api address");
            axum::serve(listener, router(state))
                .await
                .expect("fake api error");
        });
    });

    let addr = addr_rx.recv().expect("fake api failed to start");
    FakeApi {
        base_url: format!("http://{addr}"),
        calls,
    }
}

fn router(state: FakeState) -> Router {
    Router::new()
        .route("/{version}/me", get(me))
        .route("/{version}/me/friends", get(friends))
        .route("/{version}/me/feed", post(publish))
        .route("/{version}/bare", get(bare))
        .route("/{version}/compressed", get(compressed))
        .route("/{version}/oauth/access_token", get(oauth_token))
        .route("/{version}/broken", get(broken))
        .route("/{version}/{id}", delete(remove))
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

async fn me(
    State(state): State<FakeState>,
    method: Method,
    uri: Uri,
    RawQuery(query): RawQuery,
    headers: HeaderMap,
) -> Response {
    let call = capture(&state, &method, &uri, query, &headers, &[]);
    if let Some(denied) = require_token(&call) {
        return denied;
    }
    if call.header("if-none-match") == Some(ME_ETAG) {
        return with_meta_headers(StatusCode::NOT_MODIFIED.into_response());
    }

    let body = json!({
        "id": "100",
        "name": "Fake User",
        "updated_time": "2016-04-26T13:22:05+0000",
        "hometown": {"id": "300", "name": "Springfield"},
        "friends": {
            "data": [{"id": "201", "name": "Ada"}],
            "paging": {"cursors": {"before": "c0", "after": "c1"}},
            "summary": {"total_count": FRIENDS.len()}
        }
    });
    with_meta_headers(Json(body).into_response())
}

async fn friends(
    State(state): State<FakeState>,
    method: Method,
    uri: Uri,
    RawQuery(query): RawQuery,
    headers: HeaderMap,
) -> Response {
    let call = capture(&state, &method, &uri, query, &headers, &[]);
    if let Some(denied) = require_token(&call) {
        return denied;
    }

    let limit = call
        .param("limit")
        .and_then(|l| l.parse::<usize>().ok())
        .filter(|l| *l > 0)
        .unwrap_or(2);
    let (start, end) = match (call.param("after"), call.param("before")) {
        (Some(after), _) => {
            let start = cursor_index(after).map_or(0, |i| i + 1);
            (start, (start + limit).min(FRIENDS.len()))
        }
        (None, Some(before)) => {
            let end = cursor_index(before).unwrap_or(0);
            (end.saturating_sub(limit), end)
        }
        (None, None) => (0, limit.min(FRIENDS.len())),
    };

    let data: Vec<Value> = FRIENDS[start.min(end)..end]
        .iter()
        .map(|(id, name)| json!({"id": id, "name": name}))
        .collect();

    let mut paging = serde_json::Map::new();
    if start < end {
        paging.insert(
            "cursors".into(),
            json!({"before": cursor(start), "after": cursor(end - 1)}),
        );
    }
    let token = call.param("access_token").unwrap_or_default();
    let page_url = |key: &str, value: String| {
        format!(
            "{}/{SERVED_VERSION}/me/friends?access_token={token}&limit={limit}&{key}={value}",
            state.base_url
        )
    };
    if end < FRIENDS.len() && start < end {
        paging.insert("next".into(), Value::String(page_url("after", cursor(end - 1))));
    }
    if start > 0 && start < end {
        paging.insert("previous".into(), Value::String(page_url("before", cursor(start))));
    }

    let mut body = json!({"data": data, "paging": paging});
    if call.param("summary") == Some("true") {
        body["summary"] = json!({"total_count": FRIENDS.len()});
    }
    with_meta_headers(Json(body).into_response())
}

async fn publish(
    State(state): State<FakeState>,
    method: Method,
    uri: Uri,
    RawQuery(query): RawQuery,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let call = capture(&state, &method, &uri, query, &headers, &body);
    if let Some(denied) = require_token(&call) {
        return denied;
    }
    let n = state
        .calls
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .iter()
        .filter(|c| c.method == "POST")
        .count();
    with_meta_headers(Json(json!({"id": format!("100_{n}")})).into_response())
}

async fn remove(
    State(state): State<FakeState>,
    method: Method,
    uri: Uri,
    RawQuery(query): RawQuery,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let call = capture(&state, &method, &uri, query, &headers, &body);
    if let Some(denied) = require_token(&call) {
        return denied;
    }
    with_meta_headers(Json(json!({"success": true})).into_response())
}

async fn bare(
    State(state): State<FakeState>,
    method: Method,
    uri: Uri,
    RawQuery(query): RawQuery,
    headers: HeaderMap,
) -> Response {
    let call = capture(&state, &method, &uri, query, &headers, &[]);
    if let Some(denied) = require_token(&call) {
        return denied;
    }
    (
        [(header::CONTENT_TYPE, HeaderValue::from_static("text/javascript"))],
        "12345",
    )
        .into_response()
}

async fn compressed(
    State(state): State<FakeState>,
    method: Method,
    uri: Uri,
    RawQuery(query): RawQuery,
    headers: HeaderMap,
) -> Response {
    let call = capture(&state, &method, &uri, query, &headers, &[]);
    if let Some(denied) = require_token(&call) {
        return denied;
    }
    let (encoding, body) = match call.param("encoding") {
        Some("deflate") => ("deflate", zlib(COMPRESSED_BODY.as_bytes())),
        _ => ("gzip", gzip(COMPRESSED_BODY.as_bytes())),
    };
    (
        [
            (header::CONTENT_TYPE, HeaderValue::from_static("application/json")),
            (header::CONTENT_ENCODING, HeaderValue::from_static(encoding)),
        ],
        body,
    )
        .into_response()
}

async fn oauth_token(
    State(state): State<FakeState>,
    method: Method,
    uri: Uri,
    RawQuery(query): RawQuery,
    headers: HeaderMap,
) -> Response {
    let call = capture(&state, &method, &uri, query, &headers, &[]);
    if let Some(denied) = require_token(&call) {
        return denied;
    }
    (
        [(header::CONTENT_TYPE, HeaderValue::from_static("text/plain"))],
        "access_token=long_lived_token&expires=5183999",
    )
        .into_response()
}

async fn broken(
    State(state): State<FakeState>,
    method: Method,
    uri: Uri,
    RawQuery(query): RawQuery,
    headers: HeaderMap,
) -> Response {
    capture(&state, &method, &uri, query, &headers, &[]);
    let body = json!({
        "error": {
            "message": "(#4) Application request limit reached",
            "type": "OAuthException",
            "code": 4,
            "error_subcode": 2446079,
            "fbtrace_id": "AbCdEf123"
        }
    });
    (StatusCode::BAD_REQUEST, Json(body)).into_response()
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn capture(
    state: &FakeState,
    method: &Method,
    uri: &Uri,
    query: Option<String>,
    headers: &HeaderMap,
    body: &[u8],
) -> ReceivedCall {
    let call = ReceivedCall {
        method: method.as_str().to_string(),
        path: uri.path().to_string(),
        query: parse_form(query.as_deref().unwrap_or_default().as_bytes()),
        form: parse_form(body),
        headers: headers
            .iter()
            .filter_map(|(k, v)| v.to_str().ok().map(|v| (k.as_str().to_string(), v.to_string())))
            .collect(),
    };
    state.record(call.clone());
    call
}

fn require_token(call: &ReceivedCall) -> Option<Response> {
    if call.param("access_token").is_some_and(|t| !t.is_empty()) {
        return None;
    }
    let body = json!({
        "error": {
            "message": "An active access token must be used to query information about the current user.",
            "type": "OAuthException",
            "code": 2500,
            "fbtrace_id": "NoToken1"
        }
    });
    Some((StatusCode::BAD_REQUEST, Json(body)).into_response())
}

fn with_meta_headers(mut response: Response) -> Response {
    let headers = response.headers_mut();
    headers.insert(header::ETAG, HeaderValue::from_static(ME_ETAG));
    headers.insert("adext-api-version", HeaderValue::from_static(SERVED_VERSION));
    response
}

fn gzip(raw: &[u8]) -> Vec<u8> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(raw).expect("gzip into memory");
    encoder.finish().expect("finish gzip stream")
}

fn zlib(raw: &[u8]) -> Vec<u8> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(raw).expect("deflate into memory");
    encoder.finish().expect("finish deflate stream")
}

fn cursor(index: usize) -> String {
    format!("c{index}")
}

fn cursor_index(cursor: &str) -> Option<usize> {
    cursor.strip_prefix('c')?.parse().ok()
}

fn parse_form(raw: &[u8]) -> HashMap<String, String> {
    form_urlencoded::parse(raw).into_owned().collect()
}
