//! Data models for the admin API.
//!
//! This module contains the response types of the dashboard endpoints:
//!
//! - Statistics: `DashboardStats`, `VisitorCount`, `UserRanking`, `GameStat`
//! - Managed entities: `Topic`, `User`, `Admin` and their page wrappers

pub mod accounts;
pub mod stats;

pub use accounts::{Admin, AdminPage, Topic, TopicPage, User, UserPage};
pub use stats::{
    DashboardStats, GameStat, GameStatPage, TotalVisitors, UserRanking, VisitorCount,
    VisitorPeriod, VisitorsResponse,
};
