//! Typed admin endpoints.
//!
//! Thin wrappers over [`AdminClient::send`]; every call here gets bearer
//! injection and silent renewal for free.

use reqwest::header;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::models::{
    AdminPage, DashboardStats, GameStatPage, TopicPage, TotalVisitors, UserPage, UserRanking,
    VisitorCount, VisitorPeriod, VisitorsResponse,
};

use super::client::{extract_bearer, AdminClient, ApiRequest, LOGOUT_PATH};
use super::ApiError;

/// Primary-credential login endpoint.
pub const LOGIN_PATH: &str = "/admin/login";

/// Rows per page in every paged listing.
pub const DEFAULT_PAGE_SIZE: u32 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDirection {
    #[default]
    Ascending,
    Descending,
}

impl SortDirection {
    fn suffix(self) -> &'static str {
        match self {
            SortDirection::Ascending => "Asc",
            SortDirection::Descending => "Desc",
        }
    }

    /// Clicking the same column again flips the direction.
    pub fn toggled(self) -> Self {
        match self {
            SortDirection::Ascending => SortDirection::Descending,
            SortDirection::Descending => SortDirection::Ascending,
        }
    }
}

/// Server-side paging and sorting for the listing endpoints.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRequest {
    pub sort_key: String,
    pub direction: SortDirection,
    /// One-based page number as shown to the user.
    pub page: u32,
    pub page_size: u32,
}

impl PageRequest {
    pub fn new(sort_key: &str) -> Self {
        Self {
            sort_key: sort_key.to_string(),
            direction: SortDirection::Ascending,
            page: 1,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }

    pub fn page(mut self, page: u32) -> Self {
        self.page = page.max(1);
        self
    }

    pub fn sorted(mut self, sort_key: &str, direction: SortDirection) -> Self {
        self.sort_key = sort_key.to_string();
        self.direction = direction;
        self
    }

    /// `sort` parameter, e.g. `topicIdAsc`.
    pub fn sort_param(&self) -> String {
        format!("{}{}", self.sort_key, self.direction.suffix())
    }

    /// The server counts pages from zero.
    pub fn page_number(&self) -> u32 {
        self.page.saturating_sub(1)
    }

    fn apply(&self, request: ApiRequest) -> ApiRequest {
        request
            .query("sort", self.sort_param())
            .query("pageNumber", self.page_number())
            .query("pageSize", self.page_size)
    }
}

/// Bulk admin deletion takes the ids comma-joined in the path.
fn admin_delete_path(admin_ids: &[i64]) -> String {
    let ids: Vec<String> = admin_ids.iter().map(i64::to_string).collect();
    format!("/admin/delete/{}", ids.join(","))
}

#[derive(Debug, Serialize)]
struct LoginBody<'a> {
    email: &'a str,
    password: &'a str,
}

impl AdminClient {
    /// Log in with primary credentials and store the returned access token.
    pub async fn login(&self, email: &str, password: &str) -> Result<(), ApiError> {
        let body = serde_json::to_value(LoginBody { email, password })
            .map_err(|e| ApiError::InvalidResponse(e.to_string()))?;

        let response = match self.send(ApiRequest::post(LOGIN_PATH).json(body)).await {
            Ok(response) => response,
            Err(ApiError::Unauthorized) => {
                return Err(ApiError::LoginFailed(
                    "email or password does not match".to_string(),
                ));
            }
            Err(e) => return Err(e),
        };

        let token = response
            .header(header::AUTHORIZATION.as_str())
            .and_then(extract_bearer)
            .ok_or_else(|| ApiError::LoginFailed("no access token received".to_string()))?;

        self.store_credential(&token)?;
        info!("Logged in");
        Ok(())
    }

    /// Invalidate the server session and clear local credentials.
    ///
    /// Local cleanup and the login redirect happen whatever the server
    /// says; the server's error, if any, is returned afterwards.
    pub async fn logout(&self) -> Result<(), ApiError> {
        let result = self.send(ApiRequest::delete(LOGOUT_PATH)).await;

        self.clear_credentials()?;
        self.redirect_to_login();

        match result {
            Ok(_) => {
                info!("Logged out");
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, "Logout call failed, local session cleared anyway");
                Err(e)
            }
        }
    }

    pub async fn dashboard_stats(&self) -> Result<DashboardStats, ApiError> {
        self.get_json(ApiRequest::get("/admin/stat/dashboard")).await
    }

    pub async fn visitors(&self, period: VisitorPeriod) -> Result<Vec<VisitorCount>, ApiError> {
        let response: VisitorsResponse = self.get_json(ApiRequest::get(period.endpoint())).await?;
        debug!(period = period.label(), buckets = response.visitors.len(), "Visitors fetched");
        Ok(response.visitors)
    }

    pub async fn total_visitors(&self) -> Result<u64, ApiError> {
        let response: TotalVisitors = self
            .get_json(ApiRequest::get("/admin/stat/totalVisitors"))
            .await?;
        Ok(response.total_visitors)
    }

    pub async fn user_ranking(&self) -> Result<Vec<UserRanking>, ApiError> {
        self.get_json(ApiRequest::get("/admin/stat/userRanking")).await
    }

    pub async fn game_stats(&self, page: &PageRequest) -> Result<GameStatPage, ApiError> {
        self.get_json(page.apply(ApiRequest::get("/admin/stat/game")))
            .await
    }

    pub async fn topics(&self, page: &PageRequest) -> Result<TopicPage, ApiError> {
        self.get_json(page.apply(ApiRequest::get("/admin/topics")))
            .await
    }

    pub async fn delete_topic(&self, topic_id: i64) -> Result<(), ApiError> {
        self.send(ApiRequest::delete(format!("/admin/topic/{}", topic_id)))
            .await?;
        info!(topic_id, "Topic deleted");
        Ok(())
    }

    pub async fn users(&self, page: &PageRequest) -> Result<UserPage, ApiError> {
        self.get_json(page.apply(ApiRequest::get("/admin/users")))
            .await
    }

    pub async fn delete_user(&self, user_id: i64) -> Result<(), ApiError> {
        self.send(ApiRequest::delete(format!("/admin/user/{}", user_id)))
            .await?;
        info!(user_id, "User deleted");
        Ok(())
    }

    /// Delete several administrator accounts in one call.
    pub async fn delete_admins(&self, admin_ids: &[i64]) -> Result<(), ApiError> {
        if admin_ids.is_empty() {
            return Ok(());
        }
        self.send(ApiRequest::delete(admin_delete_path(admin_ids)))
            .await?;
        info!(count = admin_ids.len(), "Admins deleted");
        Ok(())
    }

    pub async fn admins(&self) -> Result<AdminPage, ApiError> {
        self.get_json(ApiRequest::get("/admin/")).await
    }
}
