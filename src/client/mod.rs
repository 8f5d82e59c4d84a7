pub mod http_client;

use async_trait::async_trait;

use crate::app::Result;
use crate::domain::SyncPayload;

/// Remote side of a sync attempt.
#[async_trait]
pub trait SyncApi {
    /// Runs one sync on the server and fetches the refreshed collections.
    /// Fails as a whole if any part of the exchange fails.
    async fn perform_sync(&self) -> Result<SyncPayload>;
}

#[async_trait]
pub trait MarkReadApi {
    async fn mark_as_read(&self, article_id: &str) -> Result<()>;
}
