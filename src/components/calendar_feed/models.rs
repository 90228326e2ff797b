use crate::utils::timezone::{normalize, FeedTimestamp};
use chrono::{DateTime, Duration, NaiveDate, Utc};
use chrono_tz::Tz;

/// A VEVENT as read from the feed, before its times are normalized
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawEvent {
    pub uid: String,
    pub summary: String,
    pub description: String,
    pub start: FeedTimestamp,
    pub end: FeedTimestamp,
}

impl RawEvent {
    /// Normalize start and end into absolute instants. Zone-less values are
    /// read as local time in `default_zone`.
    pub fn normalize(self, default_zone: Tz) -> Event {
        Event {
            start: normalize(&self.start, default_zone),
            end: normalize(&self.end, default_zone),
            uid: self.uid,
            summary: self.summary,
            description: self.description,
        }
    }
}

/// Calendar event with absolute start and end
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    pub uid: String,
    pub summary: String,
    pub description: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl Event {
    /// Whether the event starts on `date` as seen from `zone`
    pub fn starts_on(&self, date: NaiveDate, zone: Tz) -> bool {
        self.start.with_timezone(&zone).date_naive() == date
    }
}

/// One parsed, normalized view of the feed
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheSnapshot {
    pub events: Vec<Event>,
    /// `None` until a fetch has succeeded, or after the snapshot was invalidated
    pub fetched_at: Option<DateTime<Utc>>,
}

impl CacheSnapshot {
    pub fn find(&self, uid: &str) -> Option<&Event> {
        self.events.iter().find(|event| event.uid == uid)
    }

    pub fn is_fresh(&self, now: DateTime<Utc>, max_age: Duration) -> bool {
        self.fetched_at
            .is_some_and(|fetched_at| now - fetched_at < max_age)
    }
}
