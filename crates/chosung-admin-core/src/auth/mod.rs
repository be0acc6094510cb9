//! Authentication module for the admin session credentials.
//!
//! This module provides:
//! - `CookieStore`: scoped cookie storage for the access/refresh credentials
//! - `SessionState`: the authenticated/unauthenticated flag derived from cookies
//! - `TokenManager`: single-flight coordination of access-token renewal

pub mod cookies;
pub mod renewal;
pub mod session;

pub use cookies::{
    CookieError, CookieScope, CookieStore, FileCookieStore, MemoryCookieStore, SameSite,
    StoredCookie, ACCESS_TOKEN_COOKIE, REFRESH_TOKEN_COOKIE,
};
pub use renewal::{Renewal, RenewalError, RenewalTicket, RenewalWaiter, TokenManager};
pub use session::SessionState;
