pub mod snapshot;
pub mod sqlite;

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::app::Result;
use crate::domain::{Article, Feed, Tag};

pub use snapshot::{StoreSnapshot, StoreSnapshotManager};
pub use sqlite::SqliteCache;

/// Everything the client keeps locally between syncs.
///
/// All fields are owned, so `clone()` yields a copy that shares nothing with
/// the original.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheData {
    pub feeds: BTreeMap<i64, Feed>,
    pub articles: BTreeMap<String, Article>,
    pub tags: BTreeMap<String, Tag>,
    pub last_update: Option<DateTime<Utc>>,
}

impl CacheData {
    pub fn with_feeds(mut self, feeds: impl IntoIterator<Item = Feed>) -> Self {
        self.feeds = feeds.into_iter().map(|f| (f.id, f)).collect();
        self
    }

    pub fn with_articles(mut self, articles: impl IntoIterator<Item = Article>) -> Self {
        self.articles = articles.into_iter().map(|a| (a.id.clone(), a)).collect();
        self
    }

    pub fn with_tags(mut self, tags: impl IntoIterator<Item = Tag>) -> Self {
        self.tags = tags.into_iter().map(|t| (t.name.clone(), t)).collect();
        self
    }

    pub fn with_last_update(mut self, at: DateTime<Utc>) -> Self {
        self.last_update = Some(at);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.feeds.is_empty() && self.articles.is_empty() && self.tags.is_empty()
    }
}

/// Durable backing for [`CacheData`].
pub trait CachePersistence {
    fn load(&self) -> Result<CacheData>;
    fn save(&self, data: &CacheData) -> Result<()>;
}

/// The live, in-memory cache read by the front end.
///
/// Only the sync coordinator writes to it, replacing the whole contents when
/// an attempt commits or rolls back.
#[derive(Debug, Default)]
pub struct CacheStore {
    data: Mutex<CacheData>,
}

impl CacheStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_data(data: CacheData) -> Self {
        Self {
            data: Mutex::new(data),
        }
    }

    fn lock(&self) -> MutexGuard<'_, CacheData> {
        self.data.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Copy of the whole cache.
    pub fn data(&self) -> CacheData {
        self.lock().clone()
    }

    /// Swaps in a whole new cache under one lock, so readers see either the
    /// old contents or the new ones.
    pub fn replace(&self, data: CacheData) {
        *self.lock() = data;
    }

    pub fn last_update(&self) -> Option<DateTime<Utc>> {
        self.lock().last_update
    }

    pub fn feeds(&self) -> Vec<Feed> {
        let mut feeds: Vec<Feed> = self.lock().feeds.values().cloned().collect();
        feeds.sort_by(|a, b| a.display_title().cmp(b.display_title()));
        feeds
    }

    pub fn tags(&self) -> Vec<Tag> {
        self.lock().tags.values().cloned().collect()
    }

    pub fn article(&self, id: &str) -> Option<Article> {
        self.lock().articles.get(id).cloned()
    }

    /// Articles newest first; undated articles sort last.
    pub fn articles(&self, unread_only: bool) -> Vec<Article> {
        let mut articles: Vec<Article> = self
            .lock()
            .articles
            .values()
            .filter(|a| !unread_only || !a.is_read)
            .cloned()
            .collect();
        articles.sort_by(|a, b| b.published_at.cmp(&a.published_at));
        articles
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn article(id: &str, day: u32, is_read: bool) -> Article {
        let mut a = Article::new(id, 1);
        a.published_at = Some(Utc.with_ymd_and_hms(2024, 1, day, 0, 0, 0).unwrap());
        a.is_read = is_read;
        a
    }

    #[test]
    fn test_replace_drops_stale_entries() {
        let store = CacheStore::from_data(CacheData::default().with_feeds(vec![
            Feed::new(1, "https://a.example/rss".into()),
            Feed::new(2, "https://b.example/rss".into()),
        ]));
        store.replace(
            CacheData::default().with_feeds(vec![Feed::new(3, "https://c.example/rss".into())]),
        );

        let feeds = store.feeds();
        assert_eq!(feeds.len(), 1);
        assert_eq!(feeds[0].id, 3);
    }

    #[test]
    fn test_articles_newest_first_and_unread_filter() {
        let store = CacheStore::from_data(CacheData::default().with_articles(vec![
            article("old", 1, false),
            article("new", 20, true),
            article("mid", 10, false),
        ]));

        let ids: Vec<String> = store.articles(false).into_iter().map(|a| a.id).collect();
        assert_eq!(ids, vec!["new", "mid", "old"]);

        let unread: Vec<String> = store.articles(true).into_iter().map(|a| a.id).collect();
        assert_eq!(unread, vec!["mid", "old"]);
    }

    #[test]
    fn test_data_is_a_detached_copy() {
        let store = CacheStore::from_data(CacheData::default().with_tags(vec![Tag::new("rust")]));

        let mut copy = store.data();
        copy.tags.clear();

        assert_eq!(store.tags().len(), 1);
        assert!(!store.is_empty());
    }

    #[test]
    fn test_last_update_round_trip() {
        let store = CacheStore::new();
        assert!(store.last_update().is_none());

        let now = Utc::now();
        store.replace(CacheData::default().with_last_update(now));
        assert_eq!(store.last_update(), Some(now));
    }
}
