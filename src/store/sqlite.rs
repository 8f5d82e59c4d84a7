use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use rusqlite_migration::{Migrations, M};

use crate::app::{BrookError, Result};
use crate::domain::{Article, Feed, Tag};
use crate::store::{CacheData, CachePersistence};

const LAST_UPDATE_KEY: &str = "last_update";

/// Offline copy of the cache, so the reader has content before the first sync.
pub struct SqliteCache {
    conn: Mutex<Connection>,
}

impl SqliteCache {
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = Connection::open(path)?;
        let cache = Self {
            conn: Mutex::new(conn),
        };
        cache.run_migrations()?;
        Ok(cache)
    }

    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let cache = Self {
            conn: Mutex::new(conn),
        };
        cache.run_migrations()?;
        Ok(cache)
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|e| {
            BrookError::Database(rusqlite::Error::SqliteFailure(
                rusqlite::ffi::Error::new(1),
                Some(e.to_string()),
            ))
        })
    }

    fn run_migrations(&self) -> Result<()> {
        let migrations = Migrations::new(vec![M::up(include_str!(
            "../../migrations/001-initial/up.sql"
        ))]);

        let mut conn = self.conn()?;
        migrations.to_latest(&mut conn)?;
        Ok(())
    }

    fn parse_datetime(s: &str) -> Option<DateTime<Utc>> {
        DateTime::parse_from_rfc3339(s)
            .map(|dt| dt.with_timezone(&Utc))
            .ok()
    }

    fn load_feeds(conn: &Connection) -> Result<Vec<Feed>> {
        let mut stmt = conn.prepare("SELECT id, url, title, unread_count FROM feeds")?;
        let feeds = stmt
            .query_map([], |row| {
                Ok(Feed {
                    id: row.get(0)?,
                    url: row.get(1)?,
                    title: row.get(2)?,
                    unread_count: row.get(3)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(feeds)
    }

    fn load_articles(conn: &Connection) -> Result<Vec<Article>> {
        let mut stmt = conn.prepare(
            "SELECT id, feed_id, title, link, summary, author, published_at, is_read, is_starred, tags
             FROM articles",
        )?;
        let rows = stmt
            .query_map([], |row| {
                let article = Article {
                    id: row.get(0)?,
                    feed_id: row.get(1)?,
                    title: row.get(2)?,
                    link: row.get(3)?,
                    summary: row.get(4)?,
                    author: row.get(5)?,
                    published_at: row
                        .get::<_, Option<String>>(6)?
                        .and_then(|s| Self::parse_datetime(&s)),
                    is_read: row.get(7)?,
                    is_starred: row.get(8)?,
                    tags: Vec::new(),
                };
                Ok((article, row.get::<_, String>(9)?))
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        rows.into_iter()
            .map(|(mut article, tags)| -> Result<Article> {
                article.tags = serde_json::from_str(&tags)?;
                Ok(article)
            })
            .collect()
    }

    fn load_tags(conn: &Connection) -> Result<Vec<Tag>> {
        let mut stmt = conn.prepare("SELECT name, article_count FROM tags")?;
        let tags = stmt
            .query_map([], |row| {
                Ok(Tag {
                    name: row.get(0)?,
                    article_count: row.get(1)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(tags)
    }
}

impl CachePersistence for SqliteCache {
    fn load(&self) -> Result<CacheData> {
        let conn = self.conn()?;

        let last_update = conn
            .query_row(
                "SELECT value FROM sync_meta WHERE key = ?1",
                params![LAST_UPDATE_KEY],
                |row| row.get::<_, Option<String>>(0),
            )
            .optional()?
            .flatten()
            .and_then(|s| Self::parse_datetime(&s));

        Ok(CacheData {
            feeds: Self::load_feeds(&conn)?
                .into_iter()
                .map(|f| (f.id, f))
                .collect(),
            articles: Self::load_articles(&conn)?
                .into_iter()
                .map(|a| (a.id.clone(), a))
                .collect(),
            tags: Self::load_tags(&conn)?
                .into_iter()
                .map(|t| (t.name.clone(), t))
                .collect(),
            last_update,
        })
    }

    /// Replaces the stored cache in a single transaction.
    fn save(&self, data: &CacheData) -> Result<()> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;

        tx.execute("DELETE FROM feeds", [])?;
        tx.execute("DELETE FROM articles", [])?;
        tx.execute("DELETE FROM tags", [])?;

        for feed in data.feeds.values() {
            tx.execute(
                "INSERT INTO feeds (id, url, title, unread_count) VALUES (?1, ?2, ?3, ?4)",
                params![feed.id, feed.url, feed.title, feed.unread_count],
            )?;
        }

        for article in data.articles.values() {
            tx.execute(
                "INSERT INTO articles (id, feed_id, title, link, summary, author, published_at, is_read, is_starred, tags)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
                params![
                    article.id,
                    article.feed_id,
                    article.title,
                    article.link,
                    article.summary,
                    article.author,
                    article.published_at.map(|dt| dt.to_rfc3339()),
                    article.is_read,
                    article.is_starred,
                    serde_json::to_string(&article.tags)?,
                ],
            )?;
        }

        for tag in data.tags.values() {
            tx.execute(
                "INSERT INTO tags (name, article_count) VALUES (?1, ?2)",
                params![tag.name, tag.article_count],
            )?;
        }

        tx.execute(
            "INSERT OR REPLACE INTO sync_meta (key, value) VALUES (?1, ?2)",
            params![LAST_UPDATE_KEY, data.last_update.map(|dt| dt.to_rfc3339())],
        )?;

        tx.commit()?;
        Ok(())
    }
}
