//! iCalendar parsing on top of the `icalendar` crate's parser.

use super::models::RawEvent;
use crate::error::{feed_error, BotResult};
use crate::utils::timezone::FeedTimestamp;
use icalendar::parser::{read_calendar, unfold, Component};
use icalendar::{CalendarDateTime, DatePerhapsTime};
use std::collections::HashSet;
use tracing::warn;

/// Parse feed text into raw events, in feed order.
///
/// VEVENTs without a UID or DTSTART are skipped. A repeated UID keeps its
/// first occurrence.
pub fn parse_feed(text: &str) -> BotResult<Vec<RawEvent>> {
    let unfolded = unfold(text);
    if !unfolded
        .trim_start_matches('\u{feff}')
        .trim_start()
        .starts_with("BEGIN:VCALENDAR")
    {
        return Err(feed_error("Feed is not an iCalendar document"));
    }
    let calendar = read_calendar(&unfolded)
        .map_err(|e| feed_error(&format!("Failed to parse calendar: {}", e)))?;

    let mut vevents = Vec::new();
    collect_vevents(&calendar.components, &mut vevents);

    let mut seen = HashSet::new();
    let mut events = Vec::with_capacity(vevents.len());
    for vevent in vevents {
        let Some(event) = parse_vevent(vevent) else {
            warn!("Skipping VEVENT without UID or DTSTART");
            continue;
        };
        if !seen.insert(event.uid.clone()) {
            warn!("Skipping duplicate VEVENT with UID {}", event.uid);
            continue;
        }
        events.push(event);
    }

    Ok(events)
}

fn collect_vevents<'a, 'b>(components: &'b [Component<'a>], out: &mut Vec<&'b Component<'a>>) {
    for component in components {
        if component.name == "VEVENT" {
            out.push(component);
        } else {
            collect_vevents(&component.components, out);
        }
    }
}

fn parse_vevent(vevent: &Component<'_>) -> Option<RawEvent> {
    let uid = vevent.find_prop("UID")?.val.to_string();
    if uid.trim().is_empty() {
        return None;
    }

    let start = to_feed_timestamp(DatePerhapsTime::try_from(vevent.find_prop("DTSTART")?).ok()?);
    // A VEVENT without DTEND is a point in time
    let end = vevent
        .find_prop("DTEND")
        .and_then(|p| DatePerhapsTime::try_from(p).ok())
        .map(to_feed_timestamp)
        .unwrap_or_else(|| start.clone());

    let summary = vevent
        .find_prop("SUMMARY")
        .map(|p| unescape_text(p.val.as_ref()))
        .unwrap_or_default();
    let description = vevent
        .find_prop("DESCRIPTION")
        .map(|p| unescape_text(p.val.as_ref()))
        .unwrap_or_default();

    Some(RawEvent {
        uid,
        summary,
        description,
        start,
        end,
    })
}

fn to_feed_timestamp(value: DatePerhapsTime) -> FeedTimestamp {
    match value {
        DatePerhapsTime::Date(date) => FeedTimestamp::Date(date),
        DatePerhapsTime::DateTime(CalendarDateTime::Utc(instant)) => FeedTimestamp::Utc(instant),
        DatePerhapsTime::DateTime(CalendarDateTime::Floating(local)) => {
            FeedTimestamp::Floating(local)
        }
        DatePerhapsTime::DateTime(CalendarDateTime::WithTimezone { date_time, tzid }) => {
            FeedTimestamp::Zoned {
                local: date_time,
                tzid,
            }
        }
    }
}

/// Undo RFC 5545 TEXT escaping
fn unescape_text(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') | Some('N') => out.push('\n'),
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, TimeZone, Utc};

    const FEED: &str = "BEGIN:VCALENDAR\r\n\
VERSION:2.0\r\n\
PRODID:-//test//EN\r\n\
BEGIN:VEVENT\r\n\
UID:E1\r\n\
SUMMARY:Standup\r\n\
DESCRIPTION:Daily sync\\, short\\nSecond line\r\n\
DTSTART:20240101T090000Z\r\n\
DTEND:20240101T091500Z\r\n\
END:VEVENT\r\n\
BEGIN:VEVENT\r\n\
UID:E2\r\n\
SUMMARY:Lunch\r\n\
DTSTART;TZID=Europe/Helsinki:20240101T120000\r\n\
DTEND;TZID=Europe/Helsinki:20240101T130000\r\n\
END:VEVENT\r\n\
BEGIN:VEVENT\r\n\
UID:E3\r\n\
SUMMARY:Holiday\r\n\
DTSTART;VALUE=DATE:20240102\r\n\
DTEND;VALUE=DATE:20240103\r\n\
END:VEVENT\r\n\
BEGIN:VEVENT\r\n\
SUMMARY:No uid\r\n\
DTSTART:20240101T090000Z\r\n\
END:VEVENT\r\n\
BEGIN:VEVENT\r\n\
UID:E1\r\n\
SUMMARY:Duplicate\r\n\
DTSTART:20240105T090000Z\r\n\
END:VEVENT\r\n\
END:VCALENDAR\r\n";

    #[test]
    fn test_parse_feed() {
        let events = parse_feed(FEED).unwrap();
        let uids: Vec<&str> = events.iter().map(|e| e.uid.as_str()).collect();
        assert_eq!(uids, vec!["E1", "E2", "E3"]);

        let standup = &events[0];
        assert_eq!(standup.summary, "Standup");
        assert_eq!(standup.description, "Daily sync, short\nSecond line");
        assert_eq!(
            standup.start,
            FeedTimestamp::Utc(Utc.with_ymd_and_hms(2024, 1, 1, 9, 0, 0).unwrap())
        );

        match &events[1].start {
            FeedTimestamp::Zoned { tzid, .. } => assert_eq!(tzid, "Europe/Helsinki"),
            other => panic!("expected zoned start, got {:?}", other),
        }
        assert_eq!(events[1].description, "");

        assert_eq!(
            events[2].start,
            FeedTimestamp::Date(NaiveDate::from_ymd_opt(2024, 1, 2).unwrap())
        );
    }

    #[test]
    fn test_missing_dtend_defaults_to_start() {
        let feed = "BEGIN:VCALENDAR\r\nBEGIN:VEVENT\r\nUID:P1\r\nDTSTART:20240301T090000\r\nEND:VEVENT\r\nEND:VCALENDAR\r\n";
        let events = parse_feed(feed).unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].start, events[0].end);
        assert!(matches!(events[0].start, FeedTimestamp::Floating(_)));
    }

    #[test]
    fn test_rejects_non_calendar_body() {
        assert!(parse_feed("<html>Service unavailable</html>").is_err());
        assert!(parse_feed("").is_err());
    }

    #[test]
    fn test_unescape_text() {
        assert_eq!(unescape_text(r"a\;b\,c\\d\Ne"), "a;b,c\\d\ne");
        assert_eq!(unescape_text("trailing\\"), "trailing\\");
    }
}
