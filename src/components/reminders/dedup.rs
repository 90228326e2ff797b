use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::fmt;
use tokio::sync::Mutex;
use tracing::debug;

/// Separator between category and uid in a dedup key; never part of a category name
const KEY_SEPARATOR: char = '\u{1f}';

/// Purpose of a notification. Each category has its own suppression window per event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NotificationCategory {
    Upcoming,
    CompletionPrompt,
    DailySummary,
}

impl NotificationCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationCategory::Upcoming => "upcoming",
            NotificationCategory::CompletionPrompt => "completion-prompt",
            NotificationCategory::DailySummary => "daily-summary",
        }
    }
}

impl fmt::Display for NotificationCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn dedup_key(category: NotificationCategory, uid: &str) -> String {
    format!("{}{}{}", category.as_str(), KEY_SEPARATOR, uid)
}

/// Tracks when each `(category, uid)` was last notified.
///
/// Entries are never removed; the map is bounded by live events times categories.
#[derive(Debug, Default)]
pub struct NotificationDeduper {
    entries: Mutex<HashMap<String, DateTime<Utc>>>,
}

impl NotificationDeduper {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true and records the send when nothing was sent for the key
    /// within `window`
    pub async fn should_notify(
        &self,
        category: NotificationCategory,
        uid: &str,
        window: Duration,
    ) -> bool {
        self.should_notify_at(category, uid, window, Utc::now()).await
    }

    pub async fn should_notify_at(
        &self,
        category: NotificationCategory,
        uid: &str,
        window: Duration,
        now: DateTime<Utc>,
    ) -> bool {
        let key = dedup_key(category, uid);
        let mut entries = self.entries.lock().await;

        if let Some(last) = entries.get(&key) {
            if now - *last < window {
                debug!("Suppressing {} notification for {}", category, uid);
                return false;
            }
        }

        entries.insert(key, now);
        true
    }

    /// Record a notification without checking the window
    pub async fn record_at(&self, category: NotificationCategory, uid: &str, now: DateTime<Utc>) {
        self.entries
            .lock()
            .await
            .insert(dedup_key(category, uid), now);
    }

    pub async fn last_notified(
        &self,
        category: NotificationCategory,
        uid: &str,
    ) -> Option<DateTime<Utc>> {
        self.entries
            .lock()
            .await
            .get(&dedup_key(category, uid))
            .copied()
    }

    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.lock().await.is_empty()
    }
}
