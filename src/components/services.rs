use super::calendar_feed::{EventCache, HttpFeedSource};
use super::interactions::{CallbackDispatcher, CompletionGateway, HttpCompletionGateway};
use super::reminders::{NotificationDeduper, ReminderSettings};
use crate::config::Config;
use crate::error::BotResult;
use chrono_tz::Tz;
use std::fmt;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::info;

/// Zone the single recipient reads their calendar in
#[derive(Debug)]
pub struct RecipientSettings {
    zone: RwLock<Tz>,
}

impl RecipientSettings {
    pub fn new(zone: Tz) -> Self {
        Self {
            zone: RwLock::new(zone),
        }
    }

    pub async fn zone(&self) -> Tz {
        *self.zone.read().await
    }

    pub async fn set_zone(&self, zone: Tz) {
        let mut current = self.zone.write().await;
        info!("Recipient timezone changed from {} to {}", *current, zone);
        *current = zone;
    }
}

/// Shared state handed to components, commands and the event handler
pub struct BotServices {
    pub config: Arc<Config>,
    pub cache: Arc<EventCache>,
    pub deduper: Arc<NotificationDeduper>,
    pub dispatcher: Arc<CallbackDispatcher>,
    pub recipient: Arc<RecipientSettings>,
    pub settings: ReminderSettings,
}

impl fmt::Debug for BotServices {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BotServices")
            .field("feed_url", &self.config.ics_url)
            .field("settings", &self.settings)
            .finish()
    }
}

impl BotServices {
    /// Wire up the HTTP-backed services described by `config`
    pub fn new(config: Config) -> BotResult<Self> {
        let timeout = config.http_timeout();
        let source = Arc::new(HttpFeedSource::new(&config.ics_url, timeout)?);
        let cache = Arc::new(EventCache::new(source, config.default_timezone));
        let gateway: Arc<dyn CompletionGateway> = Arc::new(HttpCompletionGateway::new(timeout)?);

        Self::with_parts(config, cache, gateway)
    }

    /// Build the services around an existing cache and gateway
    pub fn with_parts(
        config: Config,
        cache: Arc<EventCache>,
        gateway: Arc<dyn CompletionGateway>,
    ) -> BotResult<Self> {
        let settings = config.notification_settings()?;
        let deduper = Arc::new(NotificationDeduper::new());
        let dispatcher = Arc::new(CallbackDispatcher::new(
            Arc::clone(&cache),
            gateway,
            Arc::clone(&deduper),
            settings.cache_max_age,
        ));
        let recipient = Arc::new(RecipientSettings::new(config.default_timezone));

        Ok(Self {
            config: Arc::new(config),
            cache,
            deduper,
            dispatcher,
            recipient,
            settings,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_recipient_zone_update() {
        let recipient = RecipientSettings::new(chrono_tz::UTC);
        assert_eq!(recipient.zone().await, chrono_tz::UTC);

        recipient.set_zone(chrono_tz::America::New_York).await;
        assert_eq!(recipient.zone().await, chrono_tz::America::New_York);
    }
}
