use super::dedup::NotificationCategory;
use crate::components::calendar_feed::Event;
use chrono::{DateTime, Duration, Utc};
use chrono_tz::Tz;

/// Which instant of an event a window is built around
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Anchor {
    Start,
    End,
}

/// Fires on a fixed interval for events whose anchor is near `now`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WindowTrigger {
    pub category: NotificationCategory,
    pub anchor: Anchor,
    /// How long before the anchor the window opens
    pub lead: Duration,
    /// How long after the anchor the window stays open
    pub lag: Duration,
    pub suppression: Duration,
}

impl WindowTrigger {
    /// Inclusive `[anchor - lead, anchor + lag]` window for `event`
    pub fn window(&self, event: &Event) -> (DateTime<Utc>, DateTime<Utc>) {
        let anchor = match self.anchor {
            Anchor::Start => event.start,
            Anchor::End => event.end,
        };
        (anchor - self.lead, anchor + self.lag)
    }

    pub fn contains(&self, event: &Event, now: DateTime<Utc>) -> bool {
        let (window_start, window_end) = self.window(event);
        window_start <= now && now <= window_end
    }
}

/// Fires once a day at a wall-clock time in a reference zone
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DailyTrigger {
    pub category: NotificationCategory,
    /// `HH:MM`
    pub time: String,
    pub reference_zone: Tz,
    pub suppression: Duration,
}

/// Everything the reminder scheduler needs to know about timing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReminderSettings {
    pub poll_interval: std::time::Duration,
    pub cache_max_age: Duration,
    pub upcoming: WindowTrigger,
    pub completion_prompt: WindowTrigger,
    pub daily: DailyTrigger,
}

impl ReminderSettings {
    pub fn window_triggers(&self) -> [&WindowTrigger; 2] {
        [&self.upcoming, &self.completion_prompt]
    }
}
