use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use url::Url;

use crate::app::{BrookError, Result};
use crate::client::{MarkReadApi, SyncApi};
use crate::domain::{Article, Feed, SyncPayload, SyncResponse, Tag};

/// JSON-over-HTTP client for the feed service.
pub struct HttpApiClient {
    client: Client,
    base_url: Url,
    token: Option<String>,
}

impl HttpApiClient {
    pub fn new(base_url: &str, token: Option<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .gzip(true)
            .brotli(true)
            .user_agent(concat!("brook/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            base_url: Self::normalize_base(base_url)?,
            token,
        })
    }

    /// `Url::join` drops the last path segment unless it ends with a slash.
    fn normalize_base(base_url: &str) -> Result<Url> {
        if base_url.ends_with('/') {
            Ok(Url::parse(base_url)?)
        } else {
            Ok(Url::parse(&format!("{}/", base_url))?)
        }
    }

    pub fn endpoint(&self, path: &str) -> Result<Url> {
        Ok(self.base_url.join(path)?)
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn check(response: Response) -> Result<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let message = response
            .text()
            .await
            .ok()
            .filter(|body| !body.trim().is_empty())
            .unwrap_or_else(|| status.canonical_reason().unwrap_or("unknown").to_string());

        Err(BrookError::Api {
            status: status.as_u16(),
            message,
        })
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = self.endpoint(path)?;
        let response = self.authorize(self.client.get(url)).send().await?;
        let response = Self::check(response).await?;
        Ok(response.json().await?)
    }
}

#[async_trait]
impl SyncApi for HttpApiClient {
    async fn perform_sync(&self) -> Result<SyncPayload> {
        let url = self.endpoint("sync")?;
        let response = self.authorize(self.client.post(url)).send().await?;
        let response: SyncResponse = Self::check(response).await?.json().await?;
        tracing::debug!(
            "Server finished sync {} ({:?})",
            response.sync_id,
            response.status
        );

        let (feeds, tags, articles) = futures::try_join!(
            self.get_json::<Vec<Feed>>("feeds"),
            self.get_json::<Vec<Tag>>("tags"),
            self.get_json::<Vec<Article>>("articles")
        )?;

        Ok(SyncPayload {
            response,
            feeds,
            tags,
            articles,
        })
    }
}

#[async_trait]
impl MarkReadApi for HttpApiClient {
    async fn mark_as_read(&self, article_id: &str) -> Result<()> {
        let url = self.endpoint(&format!("articles/{}/read", article_id))?;
        let response = self.authorize(self.client.post(url)).send().await?;
        Self::check(response).await?;
        tracing::debug!("Marked article {} as read", article_id);
        Ok(())
    }
}
