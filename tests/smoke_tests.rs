mod mocks;

use ics_notifier::components::calendar_feed::EventCache;
use ics_notifier::components::{BotServices, Reminders};
use ics_notifier::startup::build_component_manager;
use mocks::{single_event_feed, test_config, RecordingSink, StaticFeed, UnusedGateway};
use std::sync::Arc;

/// Smoke test to verify that the config can be loaded
#[test]
fn test_config_loads() {
    let config = test_config(&[("DEFAULT_TIMEZONE", "Europe/Helsinki")]);

    assert_eq!(config.calendar_channel_id, 42);
    assert_eq!(config.default_timezone, chrono_tz::Europe::Helsinki);
    assert!(config.is_component_enabled("reminders"));
}

#[tokio::test]
async fn test_services_start_in_default_zone() {
    let config = test_config(&[("DEFAULT_TIMEZONE", "America/New_York")]);
    let services = BotServices::new(config).unwrap();

    assert_eq!(services.recipient.zone().await, chrono_tz::America::New_York);
    assert_eq!(services.cache.default_zone(), chrono_tz::America::New_York);
    assert!(services.deduper.is_empty().await);
}

#[tokio::test]
async fn test_component_manager_respects_toggles() {
    let services = Arc::new(BotServices::new(test_config(&[])).unwrap());
    let manager = build_component_manager(Arc::clone(&services));
    assert_eq!(manager.component_names(), vec!["calendar_feed", "reminders"]);

    let mut config = test_config(&[]);
    config
        .apply_components_toml("[components]\nreminders = false\n")
        .unwrap();
    let manager = build_component_manager(Arc::new(BotServices::new(config).unwrap()));
    assert_eq!(manager.component_names(), vec!["calendar_feed"]);
    assert!(manager.get_component_by_name("reminders").is_none());
}

#[tokio::test]
async fn test_reminders_component_shuts_down() {
    let feed = single_event_feed("E1", "20240101T090000Z", "20240101T093000Z", "");
    let cache = Arc::new(EventCache::new(Arc::new(StaticFeed(feed)), chrono_tz::UTC));
    let services = Arc::new(
        BotServices::with_parts(test_config(&[]), cache, Arc::new(UnusedGateway)).unwrap(),
    );
    let manager = build_component_manager(Arc::clone(&services));

    let reminders = manager
        .get_component_by_name("reminders")
        .and_then(|component| component.as_any().downcast_ref::<Reminders>())
        .unwrap();

    reminders
        .start_with_sink(&services, Arc::new(RecordingSink::default()))
        .await;
    // A second start is ignored
    reminders
        .start_with_sink(&services, Arc::new(RecordingSink::default()))
        .await;
    assert_eq!(reminders.running_tasks().await, 3);

    manager.shutdown_all().await.unwrap();
    assert_eq!(reminders.running_tasks().await, 0);
}
