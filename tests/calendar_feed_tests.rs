mod mocks;

use chrono::{Duration, TimeZone, Utc};
use ics_notifier::components::calendar_feed::{EventCache, HttpFeedSource};
use mocks::{single_event_feed, ScriptedFeed};
use std::sync::Arc;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn http_source(server: &MockServer) -> Arc<HttpFeedSource> {
    Arc::new(
        HttpFeedSource::new(
            &format!("{}/feed.ics", server.uri()),
            std::time::Duration::from_secs(5),
        )
        .unwrap(),
    )
}

#[tokio::test]
async fn test_http_feed_serves_stale_snapshot_after_failure() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/feed.ics"))
        .respond_with(ResponseTemplate::new(200).set_body_string(single_event_feed(
            "E1",
            "20240101T090000Z",
            "20240101T093000Z",
            "",
        )))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/feed.ics"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let cache = EventCache::new(http_source(&server), chrono_tz::UTC);
    let max_age = Duration::seconds(60);
    let t0 = Utc.with_ymd_and_hms(2024, 1, 1, 8, 0, 0).unwrap();

    let first = cache.get_at(max_age, t0).await;
    assert!(!first.is_stale);
    assert_eq!(first.events().len(), 1);

    // Within max_age: same snapshot, no request
    let second = cache.get_at(max_age, t0 + Duration::seconds(30)).await;
    assert!(Arc::ptr_eq(&first.snapshot, &second.snapshot));
    assert_eq!(server.received_requests().await.unwrap().len(), 1);

    // Expired and the server fails: previous events, flagged stale
    let third = cache.get_at(max_age, t0 + Duration::minutes(2)).await;
    assert!(third.is_stale);
    assert_eq!(third.find("E1").map(|e| e.summary.as_str()), Some("Event E1"));
    assert!(cache.last_error().await.unwrap().contains("500"));
    assert_eq!(server.received_requests().await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_first_fetch_failure_gives_empty_stale_snapshot() {
    let feed = Arc::new(ScriptedFeed::new(vec![Err("connection refused".to_string())]));
    let cache = EventCache::new(feed.clone(), chrono_tz::UTC);

    let read = cache.get(Duration::seconds(60)).await;
    assert!(read.is_stale);
    assert!(read.events().is_empty());
    assert_eq!(feed.calls(), 1);
}

#[tokio::test]
async fn test_parse_failure_keeps_previous_snapshot() {
    let feed = Arc::new(ScriptedFeed::new(vec![
        Ok(single_event_feed("E1", "20240101T090000Z", "20240101T093000Z", "")),
        Ok("this is not a calendar".to_string()),
    ]));
    let cache = EventCache::new(feed, chrono_tz::UTC);
    let t0 = Utc.with_ymd_and_hms(2024, 1, 1, 8, 0, 0).unwrap();

    assert!(!cache.get_at(Duration::seconds(60), t0).await.is_stale);
    cache.invalidate().await;

    let read = cache.get_at(Duration::seconds(60), t0).await;
    assert!(read.is_stale);
    assert!(read.find("E1").is_some());
}

#[tokio::test]
async fn test_floating_times_use_default_zone() {
    let body = single_event_feed("E1", "20240301T090000", "20240301T100000", "");
    let t0 = Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap();

    let utc = EventCache::new(Arc::new(mocks::StaticFeed(body.clone())), chrono_tz::UTC);
    let read = utc.get_at(Duration::seconds(60), t0).await;
    assert_eq!(
        read.find("E1").unwrap().start,
        Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap()
    );

    let new_york = EventCache::new(
        Arc::new(mocks::StaticFeed(body)),
        chrono_tz::America::New_York,
    );
    let read = new_york.get_at(Duration::seconds(60), t0).await;
    assert_eq!(
        read.find("E1").unwrap().start,
        Utc.with_ymd_and_hms(2024, 3, 1, 14, 0, 0).unwrap()
    );
}
