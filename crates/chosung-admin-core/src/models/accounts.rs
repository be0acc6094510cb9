use serde::{Deserialize, Serialize};

/// Status string the server uses for soft-deleted topics.
pub const DELETED_TOPIC_STATUS: &str = "삭제된 주제";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Topic {
    pub topic_id: i64,
    pub topic_text: String,
    pub topic_status: String,
    pub topic_creation_date: String,
    pub topic_update_date: String,
    pub topic_question_count: u32,
    #[serde(default)]
    pub image_url: Option<String>,
}

impl Topic {
    pub fn is_deleted(&self) -> bool {
        self.topic_status == DELETED_TOPIC_STATUS
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TopicPage {
    #[serde(default)]
    pub topics: Vec<Topic>,
    #[serde(default)]
    pub total_page: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub user_id: i64,
    pub email: String,
    pub nickname: String,
    pub birth_year: Option<i32>,
    pub age: Option<u32>,
    pub gender: Option<String>,
    pub location: Option<String>,
    pub active: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserPage {
    #[serde(default)]
    pub sort: Option<String>,
    #[serde(default)]
    pub page_number: u32,
    #[serde(default)]
    pub page_size: u32,
    #[serde(default)]
    pub total_page: u32,
    #[serde(default)]
    pub total_count: u64,
    #[serde(default)]
    pub users: Vec<User>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Admin {
    pub admin_id: i64,
    pub admin_email: String,
    pub admin_active: String,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminPage {
    #[serde(default)]
    pub admins: Vec<Admin>,
    #[serde(default)]
    pub total_page: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_topic_page() {
        let json = r#"{"topics":[{"topicId":7,"topicText":"과일","topicStatus":"삭제된 주제","topicCreationDate":"2024-05-01","topicUpdateDate":"2024-05-20","topicQuestionCount":12}],"totalPage":2}"#;
        let page: TopicPage = serde_json::from_str(json).unwrap();
        assert_eq!(page.total_page, 2);
        assert!(page.topics[0].is_deleted());
        assert_eq!(page.topics[0].image_url, None);
    }

    #[test]
    fn test_parse_user_page_with_missing_fields() {
        let json = r#"{"totalPage":1,"totalCount":1,"users":[{"userId":5,"email":"a@b.kr","nickname":"초성왕"}]}"#;
        let page: UserPage = serde_json::from_str(json).unwrap();
        assert_eq!(page.users[0].nickname, "초성왕");
        assert_eq!(page.users[0].birth_year, None);
        assert_eq!(page.page_size, 0);
    }
}
