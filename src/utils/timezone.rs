//! Zone lookup and normalization of feed timestamps into absolute instants.
//!
//! Lookups go against the zone database compiled into `chrono-tz`, so the
//! same name is always accepted or rejected the same way.

use chrono::{DateTime, Duration, LocalResult, NaiveDate, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Tz;
use thiserror::Error;
use tracing::warn;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TimezoneError {
    #[error("unknown timezone '{0}'")]
    InvalidZone(String),
}

/// A timestamp as it appears in the feed, before normalization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedTimestamp {
    /// Already absolute (`...Z`).
    Utc(DateTime<Utc>),
    /// Wall-clock time tagged with a `TZID`.
    Zoned { local: NaiveDateTime, tzid: String },
    /// Wall-clock time without zone information.
    Floating(NaiveDateTime),
    /// All-day value; treated as local midnight.
    Date(NaiveDate),
}

/// Resolve an IANA zone name.
pub fn resolve(name: &str) -> Result<Tz, TimezoneError> {
    let trimmed = name.trim();
    // Some producers emit TZIDs as "/Europe/Berlin"
    let candidate = trimmed.strip_prefix('/').unwrap_or(trimmed);
    candidate
        .parse::<Tz>()
        .map_err(|_| TimezoneError::InvalidZone(name.to_string()))
}

/// Convert a feed timestamp into an absolute instant. Zone-less values are
/// interpreted as wall-clock time in `zone`.
pub fn normalize(timestamp: &FeedTimestamp, zone: Tz) -> DateTime<Utc> {
    match timestamp {
        FeedTimestamp::Utc(instant) => *instant,
        FeedTimestamp::Zoned { local, tzid } => match resolve(tzid) {
            Ok(event_zone) => localize(*local, event_zone),
            Err(_) => {
                warn!("Unknown TZID '{}', falling back to {}", tzid, zone.name());
                localize(*local, zone)
            }
        },
        FeedTimestamp::Floating(local) => localize(*local, zone),
        FeedTimestamp::Date(date) => localize(date.and_time(chrono::NaiveTime::MIN), zone),
    }
}

/// Interpret a wall-clock time in `zone`.
///
/// Ambiguous times (DST fall-back) take the earlier instant. Times inside a
/// DST gap are shifted forward by an hour.
pub fn localize(local: NaiveDateTime, zone: Tz) -> DateTime<Utc> {
    match zone.from_local_datetime(&local) {
        LocalResult::Single(dt) => dt.with_timezone(&Utc),
        LocalResult::Ambiguous(earliest, _) => earliest.with_timezone(&Utc),
        LocalResult::None => match zone.from_local_datetime(&(local + Duration::hours(1))) {
            LocalResult::Single(dt) | LocalResult::Ambiguous(dt, _) => dt.with_timezone(&Utc),
            LocalResult::None => Utc.from_utc_datetime(&local),
        },
    }
}
