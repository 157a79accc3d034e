use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, StatusCode};
use serde::Deserialize;
use tracing::debug;
use url::Url;

use crate::app::{FeedError, Result};
use crate::config::{ApiConfig, ConfigError};
use crate::fetcher::{Envelope, Fetcher, PageResponse};

pub struct HttpFetcher {
    client: Client,
    base_url: Url,
    token: Option<String>,
}

/// Body of a mutation response. Only an explicit `success: false` counts
/// as a rejection.
#[derive(Debug, Deserialize)]
struct Acknowledgement {
    success: Option<bool>,
    #[serde(default)]
    message: String,
}

impl HttpFetcher {
    pub fn new(config: &ApiConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .gzip(true)
            .brotli(true)
            .user_agent(concat!("notifeed/", env!("CARGO_PKG_VERSION")))
            .build()?;

        let base_url = Url::parse(&config.base_url)?;
        if base_url.cannot_be_a_base() {
            return Err(ConfigError::Invalid(format!("{base_url} cannot be used as a base URL")).into());
        }

        Ok(Self {
            client,
            base_url,
            token: config.token.clone(),
        })
    }

    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().push("notifications").extend(segments);
        }
        url
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        let builder = self.client.request(method, url);
        match &self.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    async fn send(&self, builder: RequestBuilder) -> Result<Vec<u8>> {
        let response = builder.send().await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Err(FeedError::NotFound(response.url().path().to_string()));
        }

        response.error_for_status_ref()?;
        Ok(response.bytes().await?.to_vec())
    }

    async fn confirm(&self, method: Method, url: Url) -> Result<()> {
        let body = self.send(self.request(method, url)).await?;
        if let Ok(ack) = serde_json::from_slice::<Acknowledgement>(&body) {
            if ack.success == Some(false) {
                return Err(FeedError::Remote(ack.message));
            }
        }
        Ok(())
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch_page(&self, page: u32, limit: u32) -> Result<PageResponse> {
        let mut url = self.endpoint(&[]);
        url.query_pairs_mut()
            .append_pair("page", &page.to_string())
            .append_pair("limit", &limit.to_string());

        let body = self.send(self.request(Method::GET, url)).await?;
        let envelope: Envelope<PageResponse> = serde_json::from_slice(&body)?;
        let response = envelope.into_result()?.unwrap_or_default();

        debug!(
            page,
            unseen = response.unseen.len(),
            seen = response.seen.len(),
            total_pages = response.total_pages,
            "fetched notification page"
        );
        Ok(response)
    }

    async fn mark_seen(&self, id: &str) -> Result<()> {
        self.confirm(Method::PATCH, self.endpoint(&[id, "seen"])).await
    }

    async fn remove(&self, id: &str) -> Result<()> {
        self.confirm(Method::DELETE, self.endpoint(&[id])).await
    }

    async fn clear_all(&self) -> Result<()> {
        self.confirm(Method::DELETE, self.endpoint(&[])).await
    }
}
