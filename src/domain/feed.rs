use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Feed {
    pub id: i64,
    pub url: String,
    pub title: Option<String>,
    #[serde(default)]
    pub unread_count: u32,
}

impl Feed {
    pub fn new(id: i64, url: String) -> Self {
        Self {
            id,
            url,
            title: None,
            unread_count: 0,
        }
    }

    pub fn display_title(&self) -> &str {
        self.title.as_deref().unwrap_or(&self.url)
    }
}
