pub mod article;
pub mod feed;
pub mod sync;
pub mod tag;

pub use article::Article;
pub use feed::Feed;
pub use sync::{SyncAttempt, SyncMetrics, SyncPayload, SyncResponse, SyncStatus};
pub use tag::Tag;
