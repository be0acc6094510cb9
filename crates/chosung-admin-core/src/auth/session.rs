use super::cookies::{CookieStore, ACCESS_TOKEN_COOKIE};

/// Whether the client currently holds a session credential.
///
/// Only the credential's presence is checked; its validity is the
/// server's business and is handled by token renewal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Authenticated,
    Unauthenticated,
}

impl SessionState {
    pub fn from_credential(credential: Option<&str>) -> Self {
        match credential {
            Some(token) if !token.is_empty() => SessionState::Authenticated,
            _ => SessionState::Unauthenticated,
        }
    }

    /// Read the access credential cookie. Storage errors count as logged out.
    pub fn from_cookies(store: &dyn CookieStore) -> Self {
        match store.get(ACCESS_TOKEN_COOKIE) {
            Ok(token) => Self::from_credential(token.as_deref()),
            Err(e) => {
                tracing::warn!(error = %e, "Could not read credential cookie");
                SessionState::Unauthenticated
            }
        }
    }

    pub fn is_authenticated(self) -> bool {
        self == SessionState::Authenticated
    }
}
