use crate::error::{config_error, feed_error, BotResult};
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use url::Url;

/// Where the iCalendar text comes from
#[async_trait]
pub trait FeedSource: Send + Sync {
    /// Fetch the raw feed body
    async fn fetch(&self) -> BotResult<String>;
}

/// Feed fetched with a plain GET
#[derive(Debug, Clone)]
pub struct HttpFeedSource {
    client: Client,
    url: Url,
}

impl HttpFeedSource {
    /// Create a source for `url` with every request bounded by `timeout`
    pub fn new(url: &str, timeout: Duration) -> BotResult<Self> {
        let url = Url::parse(url)
            .map_err(|e| config_error(&format!("Invalid feed URL '{}': {}", url, e)))?;
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| config_error(&format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self { client, url })
    }
}

#[async_trait]
impl FeedSource for HttpFeedSource {
    async fn fetch(&self) -> BotResult<String> {
        let response = self
            .client
            .get(self.url.clone())
            .send()
            .await
            .map_err(|e| feed_error(&format!("Failed to fetch feed: {}", e)))?;

        if !response.status().is_success() {
            return Err(feed_error(&format!(
                "Failed to fetch feed: HTTP {}",
                response.status()
            )));
        }

        response
            .text()
            .await
            .map_err(|e| feed_error(&format!("Failed to read feed body: {}", e)))
    }
}
