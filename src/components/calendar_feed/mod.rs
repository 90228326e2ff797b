pub mod cache;
pub mod models;
pub mod parser;
pub mod source;

pub use cache::{CacheRead, EventCache};
pub use models::{CacheSnapshot, Event, RawEvent};
pub use source::{FeedSource, HttpFeedSource};

use super::BotServices;
use crate::error::BotResult;
use async_trait::async_trait;
use poise::serenity_prelude as serenity;
use std::sync::Arc;
use tracing::{info, warn};

/// Calendar feed component, warms the event cache on startup
#[derive(Default)]
pub struct CalendarFeed;

impl CalendarFeed {
    /// Create a new calendar feed component
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl super::Component for CalendarFeed {
    fn name(&self) -> &'static str {
        "calendar_feed"
    }

    async fn init(&self, _ctx: &serenity::Context, services: Arc<BotServices>) -> BotResult<()> {
        let read = services.cache.get(services.settings.cache_max_age).await;
        if read.is_stale {
            warn!(
                "Calendar feed unavailable at startup: {}",
                services
                    .cache
                    .last_error()
                    .await
                    .unwrap_or_else(|| "unknown error".to_string())
            );
        } else {
            info!("Calendar feed loaded with {} events", read.events().len());
        }
        Ok(())
    }

    async fn shutdown(&self) -> BotResult<()> {
        Ok(())
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}
