use thiserror::Error;

#[derive(Error, Debug)]
pub enum BrookError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] rusqlite_migration::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Server responded with {status}: {message}")]
    Api { status: u16, message: String },

    #[error("All {0} feeds failed to update")]
    AllFeedsFailed(u32),

    #[error("Sync {0} failed")]
    SyncFailed(String),

    #[error("Article not found: {0}")]
    ArticleNotFound(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("{0}")]
    Other(String),
}

impl From<serde_json::Error> for BrookError {
    fn from(e: serde_json::Error) -> Self {
        BrookError::Other(format!("Malformed JSON: {}", e))
    }
}

pub type Result<T> = std::result::Result<T, BrookError>;
