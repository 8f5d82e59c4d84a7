use crate::store::{CacheData, CacheStore};

/// Point-in-time copy of the cache taken before a sync attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreSnapshot {
    data: CacheData,
}

impl StoreSnapshot {
    pub fn data(&self) -> &CacheData {
        &self.data
    }
}

/// Captures and restores [`StoreSnapshot`]s of a [`CacheStore`].
#[derive(Debug, Default, Clone, Copy)]
pub struct StoreSnapshotManager;

impl StoreSnapshotManager {
    pub fn new() -> Self {
        Self
    }

    pub fn capture(&self, store: &CacheStore) -> StoreSnapshot {
        StoreSnapshot { data: store.data() }
    }

    /// Puts feeds, articles, tags and the last-update marker back exactly as
    /// captured, discarding anything written since.
    pub fn restore(&self, store: &CacheStore, snapshot: StoreSnapshot) {
        store.replace(snapshot.data);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Article, Feed, Tag};
    use chrono::Utc;

    fn seeded() -> CacheStore {
        let mut article = Article::new("a1", 1);
        article.tags = vec!["rust".into()];
        CacheStore::from_data(
            CacheData::default()
                .with_feeds(vec![Feed::new(1, "https://a.example/rss".into())])
                .with_articles(vec![article])
                .with_tags(vec![Tag::new("rust")])
                .with_last_update(Utc::now()),
        )
    }

    #[test]
    fn test_snapshot_independent_of_live_store() {
        let store = seeded();
        let manager = StoreSnapshotManager::new();
        let snapshot = manager.capture(&store);

        store.replace(CacheData::default().with_articles(vec![Article::new("a2", 9)]));

        assert_eq!(snapshot.data().feeds.len(), 1);
        assert!(snapshot.data().articles.contains_key("a1"));
        assert_eq!(snapshot.data().articles["a1"].tags, vec!["rust".to_string()]);
        assert!(snapshot.data().last_update.is_some());
    }

    #[test]
    fn test_restore_discards_partial_writes() {
        let store = seeded();
        let before = store.data();
        let manager = StoreSnapshotManager::new();
        let snapshot = manager.capture(&store);

        let mut partial = store.data();
        partial.tags = CacheData::default()
            .with_tags(vec![Tag::new("go"), Tag::new("zig")])
            .tags;
        partial.articles.clear();
        store.replace(partial);

        manager.restore(&store, snapshot);
        assert_eq!(store.data(), before);
    }

    #[test]
    fn test_restore_empty_snapshot_clears_store() {
        let store = CacheStore::new();
        let manager = StoreSnapshotManager::new();
        let snapshot = manager.capture(&store);

        store.replace(
            CacheData::default()
                .with_feeds(vec![Feed::new(5, "https://e.example/rss".into())])
                .with_last_update(Utc::now()),
        );
        manager.restore(&store, snapshot);

        assert!(store.is_empty());
        assert!(store.last_update().is_none());
    }
}
