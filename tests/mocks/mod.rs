#![allow(dead_code)]

use async_trait::async_trait;
use ics_notifier::components::calendar_feed::FeedSource;
use ics_notifier::components::interactions::{CompletionError, CompletionGateway, RenderedMessage};
use ics_notifier::components::reminders::ChatSink;
use ics_notifier::config::Config;
use ics_notifier::error::{feed_error, BotResult};
use std::collections::HashMap;
use std::sync::Mutex;

/// Feed that always serves the same document
pub struct StaticFeed(pub String);

#[async_trait]
impl FeedSource for StaticFeed {
    async fn fetch(&self) -> BotResult<String> {
        Ok(self.0.clone())
    }
}

/// Feed returning queued responses, failing once the queue is empty
#[derive(Default)]
pub struct ScriptedFeed {
    responses: Mutex<Vec<Result<String, String>>>,
    calls: Mutex<usize>,
}

impl ScriptedFeed {
    pub fn new(responses: Vec<Result<String, String>>) -> Self {
        let mut responses = responses;
        responses.reverse();
        Self {
            responses: Mutex::new(responses),
            calls: Mutex::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        *self.calls.lock().unwrap()
    }
}

#[async_trait]
impl FeedSource for ScriptedFeed {
    async fn fetch(&self) -> BotResult<String> {
        *self.calls.lock().unwrap() += 1;
        match self.responses.lock().unwrap().pop() {
            Some(Ok(body)) => Ok(body),
            Some(Err(message)) => Err(feed_error(&message)),
            None => Err(feed_error("no scripted response left")),
        }
    }
}

/// Sink remembering everything it was asked to send
#[derive(Default)]
pub struct RecordingSink {
    sent: Mutex<Vec<RenderedMessage>>,
}

impl RecordingSink {
    pub fn sent(&self) -> Vec<RenderedMessage> {
        self.sent.lock().unwrap().clone()
    }

    pub fn count_containing(&self, needle: &str) -> usize {
        self.sent()
            .iter()
            .filter(|message| message.content.contains(needle))
            .count()
    }
}

#[async_trait]
impl ChatSink for RecordingSink {
    async fn send(&self, message: RenderedMessage) -> BotResult<()> {
        self.sent.lock().unwrap().push(message);
        Ok(())
    }
}

/// Gateway that never expects to be called
pub struct UnusedGateway;

#[async_trait]
impl CompletionGateway for UnusedGateway {
    async fn complete(&self, url: &str) -> Result<(), CompletionError> {
        panic!("unexpected completion call to {}", url);
    }
}

/// One-event iCalendar document. An empty description leaves the property out.
pub fn single_event_feed(uid: &str, start: &str, end: &str, description: &str) -> String {
    let description = if description.is_empty() {
        String::new()
    } else {
        format!("DESCRIPTION:{description}\r\n")
    };
    format!(
        "BEGIN:VCALENDAR\r\nVERSION:2.0\r\nPRODID:-//tests//EN\r\n\
BEGIN:VEVENT\r\nUID:{uid}\r\nSUMMARY:Event {uid}\r\n{description}\
DTSTART:{start}\r\nDTEND:{end}\r\nEND:VEVENT\r\nEND:VCALENDAR\r\n"
    )
}

/// Minimal valid configuration with overrides
pub fn test_config(overrides: &[(&str, &str)]) -> Config {
    let mut values: HashMap<String, String> = [
        ("DISCORD_TOKEN", "token"),
        ("CALENDAR_CHANNEL_ID", "42"),
        ("ICS_URL", "https://calendar.example/feed.ics"),
    ]
    .iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect();
    for (key, value) in overrides {
        values.insert(key.to_string(), value.to_string());
    }

    Config::from_lookup(|key| values.get(key).cloned()).unwrap()
}
