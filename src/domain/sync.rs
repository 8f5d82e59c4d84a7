use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{Article, Feed, Tag};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncStatus {
    Running,
    Completed,
    Partial,
    Failed,
}

impl SyncStatus {
    pub fn is_terminal(self) -> bool {
        !matches!(self, SyncStatus::Running)
    }
}

/// Counters reported by the sync service for one attempt.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SyncMetrics {
    pub new_articles: u32,
    pub deleted_articles: u32,
    pub new_tags: u32,
    pub failed_feeds: u32,
}

impl SyncMetrics {
    fn made_progress(&self) -> bool {
        self.new_articles > 0 || self.deleted_articles > 0 || self.new_tags > 0
    }

    /// Feed failures alongside any progress make a partial sync; failures
    /// with no progress at all make a failed one.
    pub fn classify(&self) -> SyncStatus {
        match (self.failed_feeds > 0, self.made_progress()) {
            (true, true) => SyncStatus::Partial,
            (true, false) => SyncStatus::Failed,
            (false, _) => SyncStatus::Completed,
        }
    }
}

/// Body returned by the sync endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncResponse {
    pub sync_id: String,
    pub status: SyncStatus,
    #[serde(default)]
    pub metrics: SyncMetrics,
}

/// Everything one sync brought back from the server.
///
/// Collections are complete replacements for the cached ones; nothing is
/// applied until the coordinator commits the whole payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncPayload {
    pub response: SyncResponse,
    pub feeds: Vec<Feed>,
    pub tags: Vec<Tag>,
    pub articles: Vec<Article>,
}

/// One run of the sync pipeline.
///
/// An attempt is created in [`SyncStatus::Running`] and finalized by one of
/// the consuming methods [`complete`](Self::complete) or [`fail`](Self::fail),
/// so a finalized attempt cannot be finalized again.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncAttempt {
    pub sync_id: String,
    pub started_at: DateTime<Utc>,
    pub status: SyncStatus,
    pub metrics: SyncMetrics,
}

impl SyncAttempt {
    pub fn begin() -> Self {
        let started_at = Utc::now();
        Self {
            sync_id: format!("local-{}", started_at.timestamp_millis()),
            started_at,
            status: SyncStatus::Running,
            metrics: SyncMetrics::default(),
        }
    }

    pub fn complete(self, sync_id: String, metrics: SyncMetrics) -> Self {
        debug_assert!(!self.status.is_terminal());
        Self {
            sync_id,
            status: metrics.classify(),
            metrics,
            ..self
        }
    }

    pub fn fail(self, metrics: SyncMetrics) -> Self {
        debug_assert!(!self.status.is_terminal());
        Self {
            status: SyncStatus::Failed,
            metrics,
            ..self
        }
    }
}
