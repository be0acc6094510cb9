//! REST API client module for the admin service.
//!
//! This module provides the `AdminClient` for communicating with the
//! admin API to fetch statistics and manage users and topics.
//!
//! The API uses bearer token authentication. Tokens come from the login
//! endpoint and are silently reissued when the server answers 401.

pub mod admin;
pub mod client;
pub mod error;

pub use admin::{PageRequest, SortDirection, DEFAULT_PAGE_SIZE, LOGIN_PATH};
pub use client::{
    extract_bearer, is_excluded, AdminClient, ApiRequest, ApiResponse, MissingCredentialPolicy,
    LOGOUT_PATH, REISSUE_PATH,
};
pub use error::ApiError;
