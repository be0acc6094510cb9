use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub total_visitors: u64,
    pub daily_active_users: u64,
    pub daily_game_plays: u64,
    pub total_users: u64,
    #[serde(deserialize_with = "deserialize_rate")]
    pub average_rating: f64,
}

/// Visitor count buckets served by the statistics endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VisitorPeriod {
    Daily,
    Weekly,
    Monthly,
}

impl VisitorPeriod {
    pub fn endpoint(self) -> &'static str {
        match self {
            VisitorPeriod::Daily => "/admin/stat/dailyVisitors",
            VisitorPeriod::Weekly => "/admin/stat/weeklyVisitors",
            VisitorPeriod::Monthly => "/admin/stat/monthlyVisitors",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            VisitorPeriod::Daily => "daily",
            VisitorPeriod::Weekly => "weekly",
            VisitorPeriod::Monthly => "monthly",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VisitorCount {
    /// Bucket label as sent by the server (a date, week or month).
    pub date: String,
    pub count: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VisitorsResponse {
    #[serde(default)]
    pub visitors: Vec<VisitorCount>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TotalVisitors {
    pub total_visitors: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRanking {
    pub user_id: i64,
    pub nickname: String,
    pub total_badges: u32,
    pub total_hearts: u32,
    pub rank: u32,
}

// Per-topic play statistics
// Note: the rate fields arrive either as numbers or as numeric strings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameStat {
    pub topic_id: i64,
    pub title: String,
    pub usage_count: u64,
    pub question_count: u64,
    #[serde(deserialize_with = "deserialize_rate")]
    pub average_complete_play_rate: f64,
    #[serde(deserialize_with = "deserialize_rate")]
    pub average_correction_rate: f64,
    pub complete_count: u64,
    #[serde(default)]
    pub total_play_time: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameStatPage {
    #[serde(default)]
    pub stats: Vec<GameStat>,
    #[serde(default)]
    pub total_page: u32,
}

// Helper to deserialize a number or a numeric string as f64
fn deserialize_rate<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: serde::Deserializer<'de>,
{
    use serde::de;

    struct RateVisitor;

    impl<'de> de::Visitor<'de> for RateVisitor {
        type Value = f64;

        fn expecting(&self, formatter: &mut std::fmt::Formatter) -> std::fmt::Result {
            formatter.write_str("a number or numeric string")
        }

        fn visit_f64<E>(self, v: f64) -> Result<Self::Value, E> {
            Ok(v)
        }

        fn visit_i64<E>(self, v: i64) -> Result<Self::Value, E> {
            Ok(v as f64)
        }

        fn visit_u64<E>(self, v: u64) -> Result<Self::Value, E> {
            Ok(v as f64)
        }

        fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            let v = v.trim();
            if v.is_empty() {
                return Ok(0.0);
            }
            v.parse().map_err(|_| E::invalid_value(de::Unexpected::Str(v), &self))
        }

        fn visit_unit<E>(self) -> Result<Self::Value, E> {
            Ok(0.0)
        }
    }

    deserializer.deserialize_any(RateVisitor)
}
