//! Navigation gate for protected views.
//!
//! `RouteGuard` decides per navigation whether a view may render or the
//! user must be sent to the login view. `Navigator` is the side-effecting
//! half: the request client calls it when a session ends mid-request.

use std::sync::Mutex;

use tracing::warn;

use crate::auth::SessionState;

/// Login view path relative to the deployment base path.
pub const LOGIN_PATH: &str = "/login";

/// Absolute login path under an optional deployment base path.
pub fn login_path(public_url: &str) -> String {
    format!("{}{}", public_url.trim_end_matches('/'), LOGIN_PATH)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardDecision {
    /// Render the requested view.
    Render,
    /// Send the user to this path instead. The requested path is not kept.
    Redirect(String),
}

#[derive(Debug, Clone)]
pub struct RouteGuard {
    login_path: String,
}

impl RouteGuard {
    pub fn new(public_url: &str) -> Self {
        Self {
            login_path: login_path(public_url),
        }
    }

    pub fn login_path(&self) -> &str {
        &self.login_path
    }

    fn is_login_view(&self, path: &str) -> bool {
        let path = path.split(['?', '#']).next().unwrap_or(path);
        let path = path.trim_end_matches('/');
        path == self.login_path || path == LOGIN_PATH
    }

    pub fn evaluate(&self, state: SessionState, requested_path: &str) -> GuardDecision {
        if self.is_login_view(requested_path) {
            return GuardDecision::Render;
        }
        match state {
            SessionState::Authenticated => GuardDecision::Render,
            SessionState::Unauthenticated => GuardDecision::Redirect(self.login_path.clone()),
        }
    }
}

/// Performs the forced redirect to the login view.
pub trait Navigator: Send + Sync {
    fn redirect_to_login(&self, login_path: &str);
}

/// Navigator for headless use: the redirect becomes a warning.
#[derive(Debug, Default)]
pub struct TracingNavigator;

impl Navigator for TracingNavigator {
    fn redirect_to_login(&self, login_path: &str) {
        warn!(login_path, "Session ended, login required");
    }
}

/// Navigator that remembers every redirect it was asked to perform.
#[derive(Debug, Default)]
pub struct RecordingNavigator {
    redirects: Mutex<Vec<String>>,
}

impl RecordingNavigator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn redirects(&self) -> Vec<String> {
        self.redirects.lock().map(|r| r.clone()).unwrap_or_default()
    }

    pub fn redirect_count(&self) -> usize {
        self.redirects.lock().map(|r| r.len()).unwrap_or(0)
    }
}

impl Navigator for RecordingNavigator {
    fn redirect_to_login(&self, login_path: &str) {
        if let Ok(mut redirects) = self.redirects.lock() {
            redirects.push(login_path.to_string());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unauthenticated_redirects_to_login() {
        let guard = RouteGuard::new("");
        assert_eq!(
            guard.evaluate(SessionState::Unauthenticated, "/admin/users"),
            GuardDecision::Redirect("/login".to_string())
        );
    }

    #[test]
    fn test_authenticated_renders_root() {
        let guard = RouteGuard::new("");
        let state = SessionState::from_credential(Some("abc"));
        assert_eq!(guard.evaluate(state, "/"), GuardDecision::Render);
    }

    #[test]
    fn test_login_view_always_renders() {
        let guard = RouteGuard::new("/dashboard");
        assert_eq!(
            guard.evaluate(SessionState::Unauthenticated, "/dashboard/login"),
            GuardDecision::Render
        );
        assert_eq!(
            guard.evaluate(SessionState::Unauthenticated, "/login?next=x"),
            GuardDecision::Render
        );
    }

    #[test]
    fn test_login_path_with_base() {
        assert_eq!(login_path(""), "/login");
        assert_eq!(login_path("/admin-web/"), "/admin-web/login");
        assert_eq!(
            RouteGuard::new("/admin-web").evaluate(SessionState::Unauthenticated, "/"),
            GuardDecision::Redirect("/admin-web/login".to_string())
        );
    }

    #[test]
    fn test_recording_navigator() {
        let nav = RecordingNavigator::new();
        nav.redirect_to_login("/login");
        nav.redirect_to_login("/login");
        assert_eq!(nav.redirect_count(), 2);
        assert_eq!(nav.redirects()[0], "/login");
    }
}
