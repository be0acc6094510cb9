//! Core library for the 143 chosung admin dashboard.
//!
//! - [`api`]: authenticated admin API client with silent token renewal
//! - [`auth`]: credential cookies, session state and the renewal coordinator
//! - [`guard`]: route guard and login navigation
//! - [`config`]: configuration file and environment overrides
//! - [`models`]: admin API response types

pub mod api;
pub mod auth;
pub mod config;
pub mod guard;
pub mod models;

pub use api::{AdminClient, ApiError, ApiRequest, ApiResponse};
pub use auth::{CookieStore, FileCookieStore, MemoryCookieStore, SessionState, TokenManager};
pub use config::Config;
pub use guard::{GuardDecision, Navigator, RouteGuard};
