use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Article {
    pub id: String,
    pub feed_id: i64,
    pub title: Option<String>,
    pub link: Option<String>,
    pub summary: Option<String>,
    pub author: Option<String>,
    pub published_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub is_read: bool,
    #[serde(default)]
    pub is_starred: bool,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl Article {
    pub fn new(id: impl Into<String>, feed_id: i64) -> Self {
        Self {
            id: id.into(),
            feed_id,
            title: None,
            link: None,
            summary: None,
            author: None,
            published_at: None,
            is_read: false,
            is_starred: false,
            tags: Vec::new(),
        }
    }

    pub fn display_title(&self) -> &str {
        self.title.as_deref().unwrap_or("(Untitled)")
    }
}
