#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::{Path, State};
use axum::http::{header, HeaderMap, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use chosung_admin_core::auth::{
    CookieError, CookieScope, CookieStore, MemoryCookieStore, StoredCookie, ACCESS_TOKEN_COOKIE,
};
use chosung_admin_core::guard::RecordingNavigator;
use chosung_admin_core::{AdminClient, TokenManager};
use serde_json::{json, Value};

pub const ADMIN_EMAIL: &str = "admin@143.kr";
pub const ADMIN_PASSWORD: &str = "chosung!";
pub const RENEWED_TOKEN: &str = "xyz";
pub const REFRESH_TOKEN: &str = "refresh-1";
/// How long `/admin/slow` holds a request before checking it.
pub const SLOW_ROUTE_DELAY: Duration = Duration::from_millis(200);

/// How the mock answers `/admin/reissue`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReissueMode {
    Grant,
    Reject,
    NoHeader,
}

/// A request as the mock server saw it.
#[derive(Debug, Clone)]
pub struct SeenRequest {
    pub path: String,
    pub authorization: Vec<String>,
    pub cookie: Option<String>,
}

pub struct MockState {
    pub valid_token: Mutex<String>,
    pub reissue_mode: Mutex<ReissueMode>,
    pub reissue_delay: Duration,
    pub reissue_calls: AtomicUsize,
    pub logout_status: Mutex<StatusCode>,
    pub seen: Mutex<Vec<SeenRequest>>,
    /// Shared with `LoggingCookieStore` to check write/replay ordering.
    pub events: Arc<Mutex<Vec<String>>>,
}

impl MockState {
    pub fn new(valid_token: &str) -> Arc<Self> {
        Arc::new(Self {
            valid_token: Mutex::new(valid_token.to_string()),
            reissue_mode: Mutex::new(ReissueMode::Grant),
            reissue_delay: Duration::from_millis(100),
            reissue_calls: AtomicUsize::new(0),
            logout_status: Mutex::new(StatusCode::OK),
            seen: Mutex::new(Vec::new()),
            events: Arc::new(Mutex::new(Vec::new())),
        })
    }

    pub fn set_reissue_mode(&self, mode: ReissueMode) {
        *self.reissue_mode.lock().unwrap() = mode;
    }

    pub fn reissue_calls(&self) -> usize {
        self.reissue_calls.load(Ordering::SeqCst)
    }

    pub fn seen_for(&self, path: &str) -> Vec<SeenRequest> {
        self.seen
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.path == path)
            .cloned()
            .collect()
    }

    fn record(&self, path: &str, headers: &HeaderMap) {
        let authorization: Vec<String> = headers
            .get_all(header::AUTHORIZATION)
            .iter()
            .filter_map(|v| v.to_str().ok().map(str::to_string))
            .collect();
        for auth in &authorization {
            self.events
                .lock()
                .unwrap()
                .push(format!("server {} {}", path, auth));
        }
        self.seen.lock().unwrap().push(SeenRequest {
            path: path.to_string(),
            authorization,
            cookie: headers
                .get(header::COOKIE)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string),
        });
    }

    fn is_authorized(&self, headers: &HeaderMap) -> bool {
        let expected = format!("Bearer {}", self.valid_token.lock().unwrap());
        headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .map(|v| v == expected)
            .unwrap_or(false)
    }
}

fn unauthorized() -> Response {
    (StatusCode::UNAUTHORIZED, Json(json!({"message": "token expired"}))).into_response()
}

async fn users(State(state): State<Arc<MockState>>, headers: HeaderMap) -> Response {
    state.record("/admin/users", &headers);
    if !state.is_authorized(&headers) {
        return unauthorized();
    }
    Json(json!({
        "sort": "userIdAsc",
        "pageNumber": 0,
        "pageSize": 10,
        "totalPage": 1,
        "totalCount": 1,
        "users": [{"userId": 1, "email": "player@143.kr", "nickname": "초성왕", "birthYear": 1999,
                   "age": 25, "gender": "F", "location": "Seoul", "active": "Y"}]
    }))
    .into_response()
}

async fn dashboard(State(state): State<Arc<MockState>>, headers: HeaderMap) -> Response {
    state.record("/admin/stat/dashboard", &headers);
    if !state.is_authorized(&headers) {
        return unauthorized();
    }
    Json(json!({
        "totalVisitors": 1500, "dailyActiveUsers": 42, "dailyGamePlays": 310,
        "totalUsers": 900, "averageRating": 4.5
    }))
    .into_response()
}

async fn topics(
    State(state): State<Arc<MockState>>,
    headers: HeaderMap,
    uri: axum::http::Uri,
) -> Response {
    state.record("/admin/topics", &headers);
    if !state.is_authorized(&headers) {
        return unauthorized();
    }
    Json(json!({
        "query": uri.query().unwrap_or_default(),
        "topics": [{"topicId": 7, "topicText": "과일", "topicStatus": "활성",
                    "topicCreationDate": "2024-05-01", "topicUpdateDate": "2024-05-20",
                    "topicQuestionCount": 12}],
        "totalPage": 3
    }))
    .into_response()
}

async fn delete_topic(
    State(state): State<Arc<MockState>>,
    Path(id): Path<i64>,
    headers: HeaderMap,
) -> Response {
    state.record(&format!("/admin/topic/{}", id), &headers);
    if !state.is_authorized(&headers) {
        return unauthorized();
    }
    Json(json!({"deleted": id})).into_response()
}

async fn slow(State(state): State<Arc<MockState>>, headers: HeaderMap) -> Response {
    state.record("/admin/slow", &headers);
    tokio::time::sleep(SLOW_ROUTE_DELAY).await;
    if !state.is_authorized(&headers) {
        return unauthorized();
    }
    Json(json!({"ok": true})).into_response()
}

async fn busy(State(state): State<Arc<MockState>>, headers: HeaderMap) -> Response {
    let first = state.seen_for("/admin/busy").is_empty();
    state.record("/admin/busy", &headers);
    if first {
        return (StatusCode::TOO_MANY_REQUESTS, "slow down").into_response();
    }
    Json(json!({"ok": true})).into_response()
}

async fn delete_admins(
    State(state): State<Arc<MockState>>,
    Path(ids): Path<String>,
    headers: HeaderMap,
) -> Response {
    state.record(&format!("/admin/delete/{}", ids), &headers);
    if !state.is_authorized(&headers) {
        return unauthorized();
    }
    Json(json!({"deleted": ids})).into_response()
}

async fn always_unauthorized(State(state): State<Arc<MockState>>, headers: HeaderMap) -> Response {
    state.record("/admin/always-401", &headers);
    unauthorized()
}

async fn forbidden(State(state): State<Arc<MockState>>, headers: HeaderMap) -> Response {
    state.record("/admin/forbidden", &headers);
    (StatusCode::FORBIDDEN, "not an admin").into_response()
}

async fn reissue(State(state): State<Arc<MockState>>, headers: HeaderMap) -> Response {
    state.record("/admin/reissue", &headers);
    state.reissue_calls.fetch_add(1, Ordering::SeqCst);
    tokio::time::sleep(state.reissue_delay).await;

    let mode = *state.reissue_mode.lock().unwrap();
    match mode {
        ReissueMode::Grant => {
            *state.valid_token.lock().unwrap() = RENEWED_TOKEN.to_string();
            let mut out = HeaderMap::new();
            out.insert(
                header::AUTHORIZATION,
                HeaderValue::from_str(&format!("Bearer {}", RENEWED_TOKEN)).unwrap(),
            );
            out.insert(
                header::SET_COOKIE,
                HeaderValue::from_static("refreshToken=refresh-2; Path=/; Max-Age=1209600; HttpOnly; Secure; SameSite=Strict"),
            );
            (StatusCode::OK, out).into_response()
        }
        ReissueMode::Reject => unauthorized(),
        ReissueMode::NoHeader => StatusCode::OK.into_response(),
    }
}

async fn login(
    State(state): State<Arc<MockState>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    state.record("/admin/login", &headers);
    if body["email"].as_str().map_or(true, str::is_empty) {
        return (StatusCode::BAD_REQUEST, Json(json!({"message": "email is required"})))
            .into_response();
    }
    if body["email"] != ADMIN_EMAIL || body["password"] != ADMIN_PASSWORD {
        return (StatusCode::UNAUTHORIZED, Json(json!({"message": "bad credentials"})))
            .into_response();
    }
    let token = state.valid_token.lock().unwrap().clone();
    let mut out = HeaderMap::new();
    out.insert(
        header::AUTHORIZATION,
        HeaderValue::from_str(&format!("Bearer {}", token)).unwrap(),
    );
    out.insert(
        header::SET_COOKIE,
        HeaderValue::from_str(&format!(
            "refreshToken={}; Path=/; Max-Age=1209600; HttpOnly; Secure; SameSite=Strict",
            REFRESH_TOKEN
        ))
        .unwrap(),
    );
    (StatusCode::OK, out).into_response()
}

async fn logout(State(state): State<Arc<MockState>>, headers: HeaderMap) -> Response {
    state.record("/admin/logout", &headers);
    let status = *state.logout_status.lock().unwrap();
    status.into_response()
}

/// Start the mock admin API on an ephemeral port. Returns its base URL.
pub async fn spawn(state: Arc<MockState>) -> String {
    let app = Router::new()
        .route("/admin/users", get(users))
        .route("/admin/stat/dashboard", get(dashboard))
        .route("/admin/topics", get(topics))
        .route("/admin/topic/{id}", delete(delete_topic))
        .route("/admin/slow", get(slow))
        .route("/admin/busy", get(busy))
        .route("/admin/delete/{ids}", delete(delete_admins))
        .route("/admin/always-401", get(always_unauthorized))
        .route("/admin/forbidden", get(forbidden))
        .route("/admin/reissue", get(reissue))
        .route("/admin/login", post(login))
        .route("/admin/logout", delete(logout))
        .with_state(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind mock server");
    let addr = listener.local_addr().expect("Mock server has no address");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("Mock server failed");
    });
    format!("http://{}", addr)
}

/// Cookie store that logs credential writes into the shared event list.
pub struct LoggingCookieStore {
    inner: MemoryCookieStore,
    events: Arc<Mutex<Vec<String>>>,
}

impl LoggingCookieStore {
    pub fn new(events: Arc<Mutex<Vec<String>>>) -> Self {
        Self {
            inner: MemoryCookieStore::new(),
            events,
        }
    }
}

impl CookieStore for LoggingCookieStore {
    fn get(&self, name: &str) -> Result<Option<String>, CookieError> {
        self.inner.get(name)
    }

    fn set(&self, cookie: StoredCookie) -> Result<(), CookieError> {
        self.events
            .lock()
            .unwrap()
            .push(format!("store {}={}", cookie.name, cookie.value));
        self.inner.set(cookie)
    }

    fn remove(&self, name: &str) -> Result<(), CookieError> {
        self.events.lock().unwrap().push(format!("remove {}", name));
        self.inner.remove(name)
    }

    fn remove_scoped(&self, name: &str, scope: &CookieScope) -> Result<bool, CookieError> {
        self.inner.remove_scoped(name, scope)
    }

    fn clear(&self) -> Result<(), CookieError> {
        self.inner.clear()
    }
}

/// Cookie store whose access-token reads stall while a renewal is open.
/// The value is read before the stall, so a stalled caller sees old data.
pub struct StallingCookieStore {
    inner: MemoryCookieStore,
    tokens: Arc<TokenManager>,
    stall: Duration,
}

impl StallingCookieStore {
    pub fn new(token: &str, tokens: Arc<TokenManager>, stall: Duration) -> Self {
        Self {
            inner: MemoryCookieStore::with_access_token(token),
            tokens,
            stall,
        }
    }
}

impl CookieStore for StallingCookieStore {
    fn get(&self, name: &str) -> Result<Option<String>, CookieError> {
        let value = self.inner.get(name);
        if name == ACCESS_TOKEN_COOKIE && self.tokens.is_renewing() {
            std::thread::sleep(self.stall);
        }
        value
    }

    fn set(&self, cookie: StoredCookie) -> Result<(), CookieError> {
        self.inner.set(cookie)
    }

    fn remove(&self, name: &str) -> Result<(), CookieError> {
        self.inner.remove(name)
    }

    fn remove_scoped(&self, name: &str, scope: &CookieScope) -> Result<bool, CookieError> {
        self.inner.remove_scoped(name, scope)
    }

    fn clear(&self) -> Result<(), CookieError> {
        self.inner.clear()
    }
}

pub struct TestClient {
    pub client: AdminClient,
    pub cookies: Arc<MemoryCookieStore>,
    pub navigator: Arc<RecordingNavigator>,
    pub state: Arc<MockState>,
}

/// Mock server whose valid token is `server_token`, plus a client whose
/// cookie jar holds `stored_token` (if any).
pub async fn setup(server_token: &str, stored_token: Option<&str>) -> TestClient {
    let state = MockState::new(server_token);
    let base_url = spawn(Arc::clone(&state)).await;

    let cookies = Arc::new(match stored_token {
        Some(token) => MemoryCookieStore::with_access_token(token),
        None => MemoryCookieStore::new(),
    });
    let navigator = Arc::new(RecordingNavigator::new());
    let client = AdminClient::new(&base_url, cookies.clone(), navigator.clone())
        .expect("Failed to build client");

    TestClient {
        client,
        cookies,
        navigator,
        state,
    }
}
