//! Client-side cookie storage for the session credentials.
//!
//! Cookies are keyed by name *and* scope (domain + path), the same way a
//! browser keys them. Removing a cookie by name clears it under every
//! scope it was written with, so a removal never silently misses a cookie
//! that was created with a different domain/path pair. Use
//! [`CookieStore::remove_scoped`] when only one exact scope should go.

use std::path::PathBuf;
use std::sync::Mutex;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

/// Cookie holding the short-lived access credential.
pub const ACCESS_TOKEN_COOKIE: &str = "accessToken";

/// Cookie holding the longer-lived refresh credential.
pub const REFRESH_TOKEN_COOKIE: &str = "refreshToken";

/// Access credential lifetime when written by the client.
const ACCESS_TOKEN_EXPIRY_DAYS: i64 = 1;

#[derive(Error, Debug)]
pub enum CookieError {
    #[error("Failed to read cookie file: {0}")]
    Read(#[source] std::io::Error),

    #[error("Failed to write cookie file: {0}")]
    Write(#[source] std::io::Error),

    #[error("Cookie file is corrupt: {0}")]
    Corrupt(#[from] serde_json::Error),

    #[error("Cookie store lock poisoned")]
    Poisoned,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum SameSite {
    #[default]
    Strict,
    Lax,
    None,
}

impl From<cookie::SameSite> for SameSite {
    fn from(value: cookie::SameSite) -> Self {
        match value {
            cookie::SameSite::Strict => SameSite::Strict,
            cookie::SameSite::Lax => SameSite::Lax,
            cookie::SameSite::None => SameSite::None,
        }
    }
}

/// Domain/path pair a cookie is stored under.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CookieScope {
    pub domain: Option<String>,
    pub path: String,
}

impl Default for CookieScope {
    fn default() -> Self {
        Self {
            domain: None,
            path: "/".to_string(),
        }
    }
}

impl CookieScope {
    pub fn new(domain: Option<&str>, path: &str) -> Self {
        Self {
            domain: domain.map(|d| d.trim_start_matches('.').to_ascii_lowercase()),
            path: if path.is_empty() { "/".to_string() } else { path.to_string() },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredCookie {
    pub name: String,
    pub value: String,
    #[serde(default)]
    pub scope: CookieScope,
    pub expires_at: Option<DateTime<Utc>>,
    pub secure: bool,
    pub same_site: SameSite,
}

impl StoredCookie {
    /// The access credential cookie: 1-day expiry, secure, strict same-site.
    pub fn access_token(token: &str) -> Self {
        Self {
            name: ACCESS_TOKEN_COOKIE.to_string(),
            value: token.to_string(),
            scope: CookieScope::default(),
            expires_at: Some(Utc::now() + Duration::days(ACCESS_TOKEN_EXPIRY_DAYS)),
            secure: true,
            same_site: SameSite::Strict,
        }
    }

    /// Build a stored cookie from a `Set-Cookie` header value.
    ///
    /// Returns `None` for headers that don't parse. A `Max-Age` wins over
    /// `Expires`, matching browser behaviour.
    pub fn from_set_cookie(header: &str) -> Option<Self> {
        let parsed = cookie::Cookie::parse(header.to_string()).ok()?;

        let expires_at = if let Some(max_age) = parsed.max_age() {
            Some(Utc::now() + Duration::seconds(max_age.whole_seconds()))
        } else {
            parsed
                .expires_datetime()
                .and_then(|t| DateTime::<Utc>::from_timestamp(t.unix_timestamp(), 0))
        };

        Some(Self {
            name: parsed.name().to_string(),
            value: parsed.value().to_string(),
            scope: CookieScope::new(parsed.domain(), parsed.path().unwrap_or("/")),
            expires_at,
            secure: parsed.secure().unwrap_or(false),
            same_site: parsed.same_site().map(SameSite::from).unwrap_or(SameSite::Lax),
        })
    }

    pub fn is_expired(&self) -> bool {
        self.expires_at.map(|at| Utc::now() >= at).unwrap_or(false)
    }

    /// A zero max-age or past expiry means the server asked for deletion.
    fn is_deletion(&self) -> bool {
        self.value.is_empty() || self.is_expired()
    }
}

/// Storage backend for credential cookies.
pub trait CookieStore: Send + Sync {
    /// Value of a live cookie with this name, from any scope.
    fn get(&self, name: &str) -> Result<Option<String>, CookieError>;

    /// Store a cookie, replacing any cookie with the same name and scope.
    fn set(&self, cookie: StoredCookie) -> Result<(), CookieError>;

    /// Remove the cookie under every scope. Idempotent.
    fn remove(&self, name: &str) -> Result<(), CookieError>;

    /// Remove the cookie only where name, domain and path all match.
    /// Returns whether anything was removed.
    fn remove_scoped(&self, name: &str, scope: &CookieScope) -> Result<bool, CookieError>;

    /// Remove every cookie.
    fn clear(&self) -> Result<(), CookieError>;
}

/// Apply a `set` to an in-memory cookie list.
fn upsert(cookies: &mut Vec<StoredCookie>, cookie: StoredCookie) {
    cookies.retain(|c| !(c.name == cookie.name && c.scope == cookie.scope));
    if !cookie.is_deletion() {
        cookies.push(cookie);
    }
}

fn lookup(cookies: &[StoredCookie], name: &str) -> Option<String> {
    // Most recently written wins when a name exists under several scopes.
    cookies
        .iter()
        .rev()
        .find(|c| c.name == name && !c.is_expired())
        .map(|c| c.value.clone())
}

/// Cookie store kept in process memory.
#[derive(Debug, Default)]
pub struct MemoryCookieStore {
    cookies: Mutex<Vec<StoredCookie>>,
}

impl MemoryCookieStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Convenience for seeding an access credential.
    pub fn with_access_token(token: &str) -> Self {
        Self {
            cookies: Mutex::new(vec![StoredCookie::access_token(token)]),
        }
    }
}

impl CookieStore for MemoryCookieStore {
    fn get(&self, name: &str) -> Result<Option<String>, CookieError> {
        let cookies = self.cookies.lock().map_err(|_| CookieError::Poisoned)?;
        Ok(lookup(&cookies, name))
    }

    fn set(&self, cookie: StoredCookie) -> Result<(), CookieError> {
        let mut cookies = self.cookies.lock().map_err(|_| CookieError::Poisoned)?;
        upsert(&mut cookies, cookie);
        Ok(())
    }

    fn remove(&self, name: &str) -> Result<(), CookieError> {
        let mut cookies = self.cookies.lock().map_err(|_| CookieError::Poisoned)?;
        cookies.retain(|c| c.name != name);
        Ok(())
    }

    fn remove_scoped(&self, name: &str, scope: &CookieScope) -> Result<bool, CookieError> {
        let mut cookies = self.cookies.lock().map_err(|_| CookieError::Poisoned)?;
        let before = cookies.len();
        cookies.retain(|c| !(c.name == name && &c.scope == scope));
        Ok(cookies.len() != before)
    }

    fn clear(&self) -> Result<(), CookieError> {
        self.cookies.lock().map_err(|_| CookieError::Poisoned)?.clear();
        Ok(())
    }
}

/// Cookie store persisted as JSON on disk, so a session survives restarts.
pub struct FileCookieStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileCookieStore {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    fn load(&self) -> Result<Vec<StoredCookie>, CookieError> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let contents = std::fs::read_to_string(&self.path).map_err(CookieError::Read)?;
        if contents.trim().is_empty() {
            return Ok(Vec::new());
        }
        Ok(serde_json::from_str(&contents)?)
    }

    fn save(&self, cookies: &[StoredCookie]) -> Result<(), CookieError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(CookieError::Write)?;
        }
        let live: Vec<&StoredCookie> = cookies.iter().filter(|c| !c.is_expired()).collect();
        let contents = serde_json::to_string_pretty(&live)?;
        std::fs::write(&self.path, contents).map_err(CookieError::Write)?;
        debug!(path = %self.path.display(), count = live.len(), "Cookie file saved");
        Ok(())
    }

    fn modify<R>(&self, f: impl FnOnce(&mut Vec<StoredCookie>) -> R) -> Result<R, CookieError> {
        let _guard = self.lock.lock().map_err(|_| CookieError::Poisoned)?;
        let mut cookies = self.load()?;
        let result = f(&mut cookies);
        self.save(&cookies)?;
        Ok(result)
    }
}

impl CookieStore for FileCookieStore {
    fn get(&self, name: &str) -> Result<Option<String>, CookieError> {
        let _guard = self.lock.lock().map_err(|_| CookieError::Poisoned)?;
        Ok(lookup(&self.load()?, name))
    }

    fn set(&self, cookie: StoredCookie) -> Result<(), CookieError> {
        self.modify(|cookies| upsert(cookies, cookie))
    }

    fn remove(&self, name: &str) -> Result<(), CookieError> {
        self.modify(|cookies| cookies.retain(|c| c.name != name))
    }

    fn remove_scoped(&self, name: &str, scope: &CookieScope) -> Result<bool, CookieError> {
        self.modify(|cookies| {
            let before = cookies.len();
            cookies.retain(|c| !(c.name == name && &c.scope == scope));
            cookies.len() != before
        })
    }

    fn clear(&self) -> Result<(), CookieError> {
        self.modify(|cookies| cookies.clear())
    }
}
