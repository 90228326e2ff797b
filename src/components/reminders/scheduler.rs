use super::dedup::{NotificationCategory, NotificationDeduper};
use super::notifications::{send_completion_prompt, send_daily_summary, send_reminder, ChatSink};
use super::triggers::{ReminderSettings, WindowTrigger};
use crate::components::calendar_feed::{Event, EventCache};
use crate::components::services::RecipientSettings;
use crate::utils::scheduler::Scheduler;
use crate::utils::time::{calculate_wait_duration, next_daily_time};
use chrono::{DateTime, NaiveDate, Utc};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio::time::{interval, sleep, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Polls the event cache on window and daily triggers and sends what is due
pub struct ReminderScheduler {
    cache: Arc<EventCache>,
    deduper: Arc<NotificationDeduper>,
    recipient: Arc<RecipientSettings>,
    sink: Arc<dyn ChatSink>,
    settings: ReminderSettings,
}

impl ReminderScheduler {
    pub fn new(
        cache: Arc<EventCache>,
        deduper: Arc<NotificationDeduper>,
        recipient: Arc<RecipientSettings>,
        sink: Arc<dyn ChatSink>,
        settings: ReminderSettings,
    ) -> Self {
        Self {
            cache,
            deduper,
            recipient,
            sink,
            settings,
        }
    }

    pub fn settings(&self) -> &ReminderSettings {
        &self.settings
    }

    /// Events inside the trigger's window that passed the dedup gate.
    ///
    /// Passing the gate records the send, so call this only when the caller
    /// is going to send.
    pub async fn due_in_window(&self, trigger: &WindowTrigger, now: DateTime<Utc>) -> Vec<Event> {
        let read = self.cache.get_at(self.settings.cache_max_age, now).await;
        if read.is_stale {
            debug!("{} tick using a stale snapshot", trigger.category);
        }

        let mut due = Vec::new();
        for event in read.events() {
            if !trigger.contains(event, now) {
                continue;
            }
            if self
                .deduper
                .should_notify_at(trigger.category, &event.uid, trigger.suppression, now)
                .await
            {
                due.push(event.clone());
            }
        }
        due
    }

    /// One tick of a window trigger. Returns the number of messages sent.
    pub async fn run_window_tick(&self, trigger: &WindowTrigger, now: DateTime<Utc>) -> usize {
        let zone = self.recipient.zone().await;
        let mut sent = 0;

        for event in self.due_in_window(trigger, now).await {
            let result = match trigger.category {
                NotificationCategory::CompletionPrompt => {
                    send_completion_prompt(self.sink.as_ref(), &event, zone).await
                }
                _ => send_reminder(self.sink.as_ref(), &event, zone).await,
            };

            match result {
                Ok(()) => {
                    info!("Sent {} notification for {}", trigger.category, event.uid);
                    sent += 1;
                }
                // Already recorded in the deduper, so this one is lost
                Err(e) => error!(
                    "Failed to send {} notification for {}: {}",
                    trigger.category, event.uid, e
                ),
            }
        }
        sent
    }

    /// Events starting today in the recipient's zone that passed the dedup gate
    pub async fn due_today(&self, now: DateTime<Utc>) -> (NaiveDate, Vec<Event>) {
        let zone = self.recipient.zone().await;
        let today = now.with_timezone(&zone).date_naive();
        let daily = &self.settings.daily;
        let read = self.cache.get_at(self.settings.cache_max_age, now).await;

        let mut due = Vec::new();
        for event in read.events() {
            if !event.starts_on(today, zone) {
                continue;
            }
            if self
                .deduper
                .should_notify_at(daily.category, &event.uid, daily.suppression, now)
                .await
            {
                due.push(event.clone());
            }
        }
        (today, due)
    }

    /// Send the daily summary. Returns the number of events included.
    pub async fn run_daily(&self, now: DateTime<Utc>) -> usize {
        let zone = self.recipient.zone().await;
        let (today, events) = self.due_today(now).await;
        if events.is_empty() {
            info!("No events for the daily summary on {}", today);
            return 0;
        }

        match send_daily_summary(self.sink.as_ref(), today, &events, zone).await {
            Ok(()) => {
                info!("Sent daily summary with {} events", events.len());
                events.len()
            }
            Err(e) => {
                error!("Failed to send daily summary: {}", e);
                0
            }
        }
    }

    async fn run_window_loop(self: Arc<Self>, trigger: WindowTrigger, cancel: CancellationToken) {
        let mut ticker = interval(self.settings.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        info!(
            "Starting {} trigger every {:?}",
            trigger.category, self.settings.poll_interval
        );

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {
                    self.run_window_tick(&trigger, Utc::now()).await;
                }
            }
        }
        info!("{} trigger stopped", trigger.category);
    }

    async fn run_daily_loop(self: Arc<Self>, cancel: CancellationToken) {
        let daily = self.settings.daily.clone();

        loop {
            let now = Utc::now();
            let Some(next) = next_daily_time(now, &daily.time, daily.reference_zone) else {
                warn!("Invalid daily summary time '{}', daily trigger disabled", daily.time);
                return;
            };
            info!("Next daily summary scheduled for {}", next);

            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = sleep(calculate_wait_duration(now, next)) => {
                    self.run_daily(Utc::now()).await;
                }
            }
        }
        info!("Daily trigger stopped");
    }
}

impl Scheduler for ReminderScheduler {
    fn start(self: Arc<Self>, cancel: CancellationToken) -> Vec<JoinHandle<()>> {
        let mut handles = Vec::new();

        for trigger in self.settings.window_triggers() {
            let scheduler = Arc::clone(&self);
            handles.push(tokio::spawn(
                scheduler.run_window_loop(trigger.clone(), cancel.clone()),
            ));
        }
        handles.push(tokio::spawn(self.run_daily_loop(cancel)));

        handles
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::calendar_feed::FeedSource;
    use crate::components::interactions::RenderedMessage;
    use crate::components::reminders::triggers::{Anchor, DailyTrigger};
    use crate::error::{BotResult, Error};
    use async_trait::async_trait;
    use chrono::{Duration, TimeZone};
    use tokio::sync::Mutex;

    const FEED: &str = "BEGIN:VCALENDAR\r\n\
BEGIN:VEVENT\r\n\
UID:late-night\r\n\
SUMMARY:Late night\r\n\
DTSTART:20240101T230000Z\r\n\
DTEND:20240101T233000Z\r\n\
END:VEVENT\r\n\
BEGIN:VEVENT\r\n\
UID:morning\r\n\
SUMMARY:Morning\r\n\
DTSTART:20240101T090000Z\r\n\
DTEND:20240101T093000Z\r\n\
END:VEVENT\r\n\
END:VCALENDAR\r\n";

    struct StaticFeed;

    #[async_trait]
    impl FeedSource for StaticFeed {
        async fn fetch(&self) -> BotResult<String> {
            Ok(FEED.to_string())
        }
    }

    #[derive(Default)]
    struct RecordingSink {
        sent: Mutex<Vec<RenderedMessage>>,
        fail: bool,
    }

    #[async_trait]
    impl ChatSink for RecordingSink {
        async fn send(&self, message: RenderedMessage) -> BotResult<()> {
            if self.fail {
                return Err(Error::Other("channel gone".to_string()));
            }
            self.sent.lock().await.push(message);
            Ok(())
        }
    }

    fn settings() -> ReminderSettings {
        ReminderSettings {
            poll_interval: std::time::Duration::from_secs(60),
            cache_max_age: Duration::seconds(60),
            upcoming: WindowTrigger {
                category: NotificationCategory::Upcoming,
                anchor: Anchor::Start,
                lead: Duration::minutes(15),
                lag: Duration::minutes(15),
                suppression: Duration::minutes(30),
            },
            completion_prompt: WindowTrigger {
                category: NotificationCategory::CompletionPrompt,
                anchor: Anchor::End,
                lead: Duration::zero(),
                lag: Duration::minutes(30),
                suppression: Duration::hours(12),
            },
            daily: DailyTrigger {
                category: NotificationCategory::DailySummary,
                time: "07:00".to_string(),
                reference_zone: chrono_tz::UTC,
                suppression: Duration::hours(20),
            },
        }
    }

    fn scheduler(sink: Arc<RecordingSink>, zone: chrono_tz::Tz) -> ReminderScheduler {
        ReminderScheduler::new(
            Arc::new(EventCache::new(Arc::new(StaticFeed), chrono_tz::UTC)),
            Arc::new(NotificationDeduper::new()),
            Arc::new(RecipientSettings::new(zone)),
            sink,
            settings(),
        )
    }

    fn at(hour: u32, minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, hour, minute, 0).unwrap()
    }

    #[tokio::test]
    async fn test_completion_prompt_uses_end_window() {
        let sink = Arc::new(RecordingSink::default());
        let scheduler = scheduler(sink.clone(), chrono_tz::UTC);
        let trigger = scheduler.settings().completion_prompt.clone();

        assert_eq!(scheduler.run_window_tick(&trigger, at(9, 0)).await, 0);
        assert_eq!(scheduler.run_window_tick(&trigger, at(9, 40)).await, 1);
        assert_eq!(scheduler.run_window_tick(&trigger, at(9, 50)).await, 0);

        let sent = sink.sent.lock().await;
        assert!(sent[0].content.starts_with(&*t!("completion_prompt_heading")));
    }

    #[tokio::test]
    async fn test_daily_summary_uses_recipient_date() {
        let sink = Arc::new(RecordingSink::default());
        // 23:00Z on Jan 1st is already Jan 2nd in Helsinki
        let scheduler = scheduler(sink.clone(), chrono_tz::Europe::Helsinki);

        assert_eq!(scheduler.run_daily(at(6, 0)).await, 1);
        {
            let sent = sink.sent.lock().await;
            assert_eq!(sent.len(), 2);
            assert!(sent[1].content.contains("Morning"));
        }

        // Same day again is suppressed
        assert_eq!(scheduler.run_daily(at(6, 30)).await, 0);
        assert_eq!(sink.sent.lock().await.len(), 2);
    }

    #[tokio::test]
    async fn test_failed_send_is_not_retried() {
        let sink = Arc::new(RecordingSink {
            fail: true,
            ..Default::default()
        });
        let scheduler = scheduler(sink, chrono_tz::UTC);
        let trigger = scheduler.settings().upcoming.clone();

        assert_eq!(scheduler.run_window_tick(&trigger, at(8, 50)).await, 0);
        assert!(scheduler.due_in_window(&trigger, at(8, 51)).await.is_empty());
    }

    #[tokio::test]
    async fn test_start_stops_on_cancel() {
        let sink = Arc::new(RecordingSink::default());
        let scheduler = Arc::new(scheduler(sink, chrono_tz::UTC));
        let cancel = CancellationToken::new();

        let handles = scheduler.start(cancel.clone());
        assert_eq!(handles.len(), 3);

        cancel.cancel();
        for handle in handles {
            handle.await.unwrap();
        }
    }
}
