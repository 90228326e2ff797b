use crate::error::{config_error, BotResult};
use async_trait::async_trait;
use lazy_static::lazy_static;
use regex::Regex;
use reqwest::Client;
use std::time::Duration;
use thiserror::Error;
use tracing::{info, warn};
use url::Url;

lazy_static! {
    /// `[✅ set task status completed](<url>)` as written by the task tool
    static ref COMPLETION_LINK: Regex =
        Regex::new(r"\[✅ set task status\s*completed\]\((https?://[^\s)]+)\)")
            .expect("completion link pattern is valid");
    static ref BARE_URL: Regex =
        Regex::new(r"https?://[^\s)\]>]+").expect("url pattern is valid");
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CompletionError {
    #[error("completion endpoint returned HTTP {status}")]
    Http { status: u16 },
    #[error("completion request failed: {0}")]
    Transport(String),
}

/// Marks a task complete in the external system
#[async_trait]
pub trait CompletionGateway: Send + Sync {
    /// Request `url` once. Never retried.
    async fn complete(&self, url: &str) -> Result<(), CompletionError>;
}

/// Gateway issuing a single GET per completion
#[derive(Debug, Clone)]
pub struct HttpCompletionGateway {
    client: Client,
}

impl HttpCompletionGateway {
    pub fn new(timeout: Duration) -> BotResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| config_error(&format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl CompletionGateway for HttpCompletionGateway {
    async fn complete(&self, url: &str) -> Result<(), CompletionError> {
        let url = Url::parse(url).map_err(|e| CompletionError::Transport(e.to_string()))?;

        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| CompletionError::Transport(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            info!("Completion request to {} succeeded", url.host_str().unwrap_or("?"));
            Ok(())
        } else {
            warn!("Completion request to {} returned {}", url, status);
            Err(CompletionError::Http {
                status: status.as_u16(),
            })
        }
    }
}

/// Find the completion link in an event description.
///
/// Prefers the explicit task-status link; otherwise takes the first bare URL
/// that mentions `complete`.
pub fn extract_completion_url(description: &str) -> Option<String> {
    if let Some(captures) = COMPLETION_LINK.captures(description) {
        return captures.get(1).map(|m| m.as_str().to_string());
    }

    BARE_URL
        .find_iter(description)
        .map(|m| m.as_str())
        .find(|candidate| candidate.to_ascii_lowercase().contains("complete"))
        .map(str::to_string)
}
