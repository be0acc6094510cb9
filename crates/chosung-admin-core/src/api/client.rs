//! Authenticated HTTP client for the admin API.
//!
//! Every call goes through [`AdminClient::send`], which applies the
//! outbound interception (bearer injection) and the inbound interception
//! (silent renewal on 401, forced logout on 403) around the actual
//! network request.

use std::sync::Arc;
use std::time::Duration;

use reqwest::{header, Client, Method, StatusCode};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::auth::{
    CookieStore, Renewal, RenewalError, SessionState, StoredCookie, TokenManager,
    ACCESS_TOKEN_COOKIE, REFRESH_TOKEN_COOKIE,
};
use crate::config::Config;
use crate::guard::{login_path, Navigator};

use super::ApiError;

// ============================================================================
// Constants
// ============================================================================

/// Token reissue endpoint. Authenticated by the refresh cookie only.
pub const REISSUE_PATH: &str = "/admin/reissue";

/// Logout endpoint. Sent with the refresh cookie so the server can revoke it.
pub const LOGOUT_PATH: &str = "/admin/logout";

/// Path suffixes that never get a bearer header and never trigger renewal.
/// Renewing on either would be circular.
pub const EXCLUDED_PATH_SUFFIXES: &[&str] = &["/login", REISSUE_PATH];

/// Paths that carry the refresh cookie.
const CREDENTIALED_PATHS: &[&str] = &[REISSUE_PATH, LOGOUT_PATH];

/// HTTP request timeout in milliseconds.
const DEFAULT_TIMEOUT_MS: u64 = 5000;

/// What to do with a protected request when no credential is stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum MissingCredentialPolicy {
    /// Send the request without a bearer header and let the server decide.
    #[default]
    Lenient,
    /// Fail locally and redirect to login.
    Strict,
}

/// True if requests to `path` must not be authenticated or renewed.
pub fn is_excluded(path: &str) -> bool {
    let path = path.split('?').next().unwrap_or(path);
    EXCLUDED_PATH_SUFFIXES
        .iter()
        .any(|suffix| path.ends_with(suffix))
}

/// Pull the credential out of an `authorization` header value.
///
/// The server sends `Bearer <token>`; the stored credential is the bare
/// token so that the outbound header is never double-prefixed.
pub fn extract_bearer(value: &str) -> Option<String> {
    let value = value.trim();
    let token = match value.split_once(char::is_whitespace) {
        Some((scheme, rest)) if scheme.eq_ignore_ascii_case("bearer") => rest.trim(),
        _ if value.eq_ignore_ascii_case("bearer") => return None,
        _ => value,
    };
    if token.is_empty() || token.contains(char::is_whitespace) {
        None
    } else {
        Some(token.to_string())
    }
}

/// An outbound request, kept by value so it can be replayed after renewal.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    method: Method,
    path: String,
    query: Vec<(String, String)>,
    body: Option<serde_json::Value>,
    retried: bool,
    credential: Option<String>,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            body: None,
            retried: false,
            credential: None,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    pub fn query(mut self, key: &str, value: impl ToString) -> Self {
        self.query.push((key.to_string(), value.to_string()));
        self
    }

    pub fn json(mut self, body: serde_json::Value) -> Self {
        self.body = Some(body);
        self
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Whether this request has already been replayed after a renewal.
    pub fn is_retried(&self) -> bool {
        self.retried
    }
}

/// A successful response with its body already read.
#[derive(Debug, Clone)]
pub struct ApiResponse {
    status: StatusCode,
    headers: header::HeaderMap,
    body: Vec<u8>,
}

impl ApiResponse {
    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    pub fn json<T: DeserializeOwned>(&self) -> Result<T, ApiError> {
        serde_json::from_slice(&self.body)
            .map_err(|e| ApiError::MalformedResponse(format!("invalid JSON body: {}", e)))
    }
}

/// API client for the admin service.
/// Clone is cheap - every field is reference counted, and clones share the
/// connection pool, the cookie store and the renewal episode.
#[derive(Clone)]
pub struct AdminClient {
    client: Client,
    base_url: String,
    login_path: String,
    policy: MissingCredentialPolicy,
    cookies: Arc<dyn CookieStore>,
    tokens: Arc<TokenManager>,
    navigator: Arc<dyn Navigator>,
}

impl AdminClient {
    /// Create a client with default timeout and lenient credential policy.
    pub fn new(
        base_url: &str,
        cookies: Arc<dyn CookieStore>,
        navigator: Arc<dyn Navigator>,
    ) -> Result<Self, ApiError> {
        Self::build(base_url, DEFAULT_TIMEOUT_MS, cookies, navigator)
    }

    pub fn from_config(
        config: &Config,
        cookies: Arc<dyn CookieStore>,
        navigator: Arc<dyn Navigator>,
    ) -> Result<Self, ApiError> {
        let client = Self::build(&config.api_url, config.timeout_ms, cookies, navigator)?;
        Ok(client
            .with_public_url(&config.public_url)
            .with_policy(config.missing_credential_policy))
    }

    fn build(
        base_url: &str,
        timeout_ms: u64,
        cookies: Arc<dyn CookieStore>,
        navigator: Arc<dyn Navigator>,
    ) -> Result<Self, ApiError> {
        let client = Client::builder()
            .timeout(Duration::from_millis(timeout_ms))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            login_path: login_path(""),
            policy: MissingCredentialPolicy::default(),
            cookies,
            tokens: TokenManager::new(),
            navigator,
        })
    }

    pub fn with_policy(mut self, policy: MissingCredentialPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Prefix the login redirect with a deployment base path.
    pub fn with_public_url(mut self, public_url: &str) -> Self {
        self.login_path = login_path(public_url);
        self
    }

    /// Share a renewal episode owner with other clients.
    pub fn with_token_manager(mut self, tokens: Arc<TokenManager>) -> Self {
        self.tokens = tokens;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn login_path(&self) -> &str {
        &self.login_path
    }

    pub fn cookies(&self) -> &Arc<dyn CookieStore> {
        &self.cookies
    }

    pub fn token_manager(&self) -> &Arc<TokenManager> {
        &self.tokens
    }

    pub fn session_state(&self) -> SessionState {
        SessionState::from_cookies(self.cookies.as_ref())
    }

    /// Store a new access credential (1 day, secure, strict same-site).
    pub fn store_credential(&self, token: &str) -> Result<(), ApiError> {
        self.cookies.set(StoredCookie::access_token(token))?;
        Ok(())
    }

    /// Drop both credentials without contacting the server.
    pub fn clear_credentials(&self) -> Result<(), ApiError> {
        self.cookies.remove(ACCESS_TOKEN_COOKIE)?;
        self.cookies.remove(REFRESH_TOKEN_COOKIE)?;
        Ok(())
    }

    /// Force navigation to the login view.
    pub fn redirect_to_login(&self) {
        self.navigator.redirect_to_login(&self.login_path);
    }

    /// Send a request through the interception pipeline.
    pub async fn send(&self, request: ApiRequest) -> Result<ApiResponse, ApiError> {
        let credential = self.outbound_credential(&request)?;

        match self.dispatch(&request, credential.as_deref()).await {
            Err(ApiError::Unauthorized) if !request.retried && !is_excluded(&request.path) => {
                self.renew_and_replay(request, credential).await
            }
            other => other,
        }
    }

    pub async fn get_json<T: DeserializeOwned>(&self, request: ApiRequest) -> Result<T, ApiError> {
        self.send(request).await?.json()
    }

    /// Outbound interception: which credential, if any, goes on this request.
    fn outbound_credential(&self, request: &ApiRequest) -> Result<Option<String>, ApiError> {
        if is_excluded(&request.path) {
            return Ok(None);
        }
        if let Some(ref credential) = request.credential {
            return Ok(Some(credential.clone()));
        }

        let stored = self.current_credential()?;
        if stored.is_none() && self.policy == MissingCredentialPolicy::Strict {
            warn!(path = %request.path, "No credential for protected request");
            self.redirect_to_login();
            return Err(ApiError::NotAuthenticated);
        }
        Ok(stored)
    }

    fn current_credential(&self) -> Result<Option<String>, ApiError> {
        Ok(self
            .cookies
            .get(ACCESS_TOKEN_COOKIE)?
            .filter(|token| !token.is_empty()))
    }

    /// Inbound 401 handling: join or open a renewal episode, then replay.
    async fn renew_and_replay(
        &self,
        mut request: ApiRequest,
        sent: Option<String>,
    ) -> Result<ApiResponse, ApiError> {
        request.retried = true;

        let credential = match self.tokens.join_or_begin() {
            Renewal::Leader(ticket) => {
                // Any earlier episode stored its credential before closing, so
                // a credential that differs from the one sent is already fresh.
                if let Some(current) = self.stored_if_changed(sent.as_deref()) {
                    debug!(path = %request.path, "Replaying with credential renewed in flight");
                    self.tokens.resolve_renewal(ticket, current.clone());
                    current
                } else {
                    info!(path = %request.path, episode = ticket.episode_id(), "Access token expired, reissuing");
                    match self.reissue().await {
                        Ok(token) => {
                            self.tokens.resolve_renewal(ticket, token.clone());
                            token
                        }
                        Err(err) => {
                            warn!(error = %err, "Token reissue failed, ending session");
                            self.tokens.fail_renewal(ticket, err.clone());
                            self.end_session();
                            return Err(err.into());
                        }
                    }
                }
            }
            Renewal::Follower(waiter) => {
                debug!(path = %request.path, "Waiting on in-flight token reissue");
                waiter.wait().await?
            }
        };

        request.credential = Some(credential);
        self.replay(request).await
    }

    /// The stored credential, if it is not the one `sent` carried.
    fn stored_if_changed(&self, sent: Option<&str>) -> Option<String> {
        match self.current_credential() {
            Ok(Some(current)) if sent != Some(current.as_str()) => Some(current),
            Ok(_) => None,
            Err(e) => {
                warn!(error = %e, "Failed to read stored credential");
                None
            }
        }
    }

    async fn replay(&self, request: ApiRequest) -> Result<ApiResponse, ApiError> {
        let credential = request.credential.clone();
        self.dispatch(&request, credential.as_deref()).await
    }

    /// Call the reissue endpoint and persist the new credential.
    ///
    /// The credential is written to the cookie store before this returns,
    /// so it is stored before any waiter is released.
    async fn reissue(&self) -> Result<String, RenewalError> {
        let request = ApiRequest::get(REISSUE_PATH);
        let response = self
            .execute(&request, None)
            .await
            .map_err(|e| RenewalError::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(RenewalError::Request(format!("status {}", status)));
        }

        let token = response
            .headers()
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(extract_bearer)
            .ok_or(RenewalError::MissingCredential)?;

        self.cookies
            .set(StoredCookie::access_token(&token))
            .map_err(|e| RenewalError::Storage(e.to_string()))?;

        info!("Access token reissued");
        Ok(token)
    }

    /// Unrecoverable auth failure: drop the credential and go to login.
    fn end_session(&self) {
        if let Err(e) = self.cookies.remove(ACCESS_TOKEN_COOKIE) {
            warn!(error = %e, "Failed to remove access token cookie");
        }
        self.redirect_to_login();
    }

    /// Send once, then run the inbound checks. Statuses other than 401 and
    /// 403 reach the caller unchanged, 429 included.
    async fn dispatch(
        &self,
        request: &ApiRequest,
        credential: Option<&str>,
    ) -> Result<ApiResponse, ApiError> {
        let response = self.execute(request, credential).await?;
        self.intercept(request, response).await
    }

    /// Put the request on the wire.
    async fn execute(
        &self,
        request: &ApiRequest,
        credential: Option<&str>,
    ) -> Result<reqwest::Response, ApiError> {
        let url = format!("{}{}", self.base_url, request.path);
        let mut builder = self.client.request(request.method.clone(), &url);

        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some(ref body) = request.body {
            builder = builder.json(body);
        }
        if let Some(token) = credential {
            builder = builder.bearer_auth(token);
        }
        if CREDENTIALED_PATHS.contains(&request.path.as_str()) {
            if let Some(refresh) = self.cookies.get(REFRESH_TOKEN_COOKIE)? {
                builder = builder.header(
                    header::COOKIE,
                    format!("{}={}", REFRESH_TOKEN_COOKIE, refresh),
                );
            }
        }

        debug!(
            method = %request.method,
            path = %request.path,
            authenticated = credential.is_some(),
            retried = request.retried,
            "Sending request"
        );

        let response = builder.send().await?;
        self.capture_refresh_cookie(&response);
        Ok(response)
    }

    /// Keep the refresh cookie in sync with whatever the server sets.
    fn capture_refresh_cookie(&self, response: &reqwest::Response) {
        for value in response.headers().get_all(header::SET_COOKIE) {
            let Some(cookie) = value.to_str().ok().and_then(StoredCookie::from_set_cookie) else {
                continue;
            };
            if cookie.name != REFRESH_TOKEN_COOKIE {
                continue;
            }
            if let Err(e) = self.cookies.set(cookie) {
                warn!(error = %e, "Failed to store refresh cookie");
            }
        }
    }

    /// Inbound interception for everything except the 401 renewal path.
    async fn intercept(
        &self,
        request: &ApiRequest,
        response: reqwest::Response,
    ) -> Result<ApiResponse, ApiError> {
        let status = response.status();
        let headers = response.headers().clone();

        if status.is_success() {
            let body = response.bytes().await?.to_vec();
            return Ok(ApiResponse {
                status,
                headers,
                body,
            });
        }

        let body = response.text().await.unwrap_or_default();
        if status == StatusCode::FORBIDDEN {
            warn!(path = %request.path, "Access denied, redirecting to login");
            self.redirect_to_login();
        }
        Err(ApiError::from_status(status, &body))
    }
}
