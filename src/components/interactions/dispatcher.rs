//! Button press state machine.
//!
//! ```text
//! Toggle(expanded=X) : flip expanded, keep completed
//! Complete           : call the completion link; 2xx -> completed + expanded,
//!                      otherwise keep the state and show a notice
//! Noop               : nothing
//! ```

use super::codec::{build_token, CallbackToken, EventRef};
use super::completion::{extract_completion_url, CompletionError, CompletionGateway};
use super::render::{render_event, DisplayState, Notice, RenderedMessage};
use crate::components::calendar_feed::{Event, EventCache};
use crate::components::reminders::dedup::{NotificationCategory, NotificationDeduper};
use chrono::{DateTime, Duration, Utc};
use chrono_tz::Tz;
use std::sync::Arc;
use tracing::{info, warn};

/// What the caller should do with the pressed message
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// Re-render the event in `state`
    Updated {
        event: Event,
        state: DisplayState,
        notice: Option<Notice>,
    },
    /// The event is gone from the current snapshot
    EventNotFound { uid: String },
    /// Acknowledge without changing the message
    Unchanged,
}

impl DispatchOutcome {
    /// Message to replace the pressed one with, if any
    pub fn render(&self, zone: Tz) -> Option<RenderedMessage> {
        match self {
            DispatchOutcome::Updated {
                event,
                state,
                notice,
            } => Some(render_event(event, *state, zone, notice.as_ref())),
            DispatchOutcome::EventNotFound { .. } => {
                Some(RenderedMessage::text(t!("event_not_found").to_string()))
            }
            DispatchOutcome::Unchanged => None,
        }
    }
}

pub struct CallbackDispatcher {
    cache: Arc<EventCache>,
    gateway: Arc<dyn CompletionGateway>,
    deduper: Arc<NotificationDeduper>,
    cache_max_age: Duration,
}

impl CallbackDispatcher {
    pub fn new(
        cache: Arc<EventCache>,
        gateway: Arc<dyn CompletionGateway>,
        deduper: Arc<NotificationDeduper>,
        cache_max_age: Duration,
    ) -> Self {
        Self {
            cache,
            gateway,
            deduper,
            cache_max_age,
        }
    }

    /// Decode a raw payload and dispatch it. Malformed payloads are a no-op.
    pub async fn handle_payload(&self, payload: &str, prior: DisplayState) -> DispatchOutcome {
        self.handle_payload_at(payload, prior, Utc::now()).await
    }

    pub async fn handle_payload_at(
        &self,
        payload: &str,
        prior: DisplayState,
        now: DateTime<Utc>,
    ) -> DispatchOutcome {
        match build_token(payload) {
            Ok(token) => self.dispatch_at(&token, prior, now).await,
            Err(e) => {
                warn!("Ignoring callback payload '{}': {}", payload, e);
                DispatchOutcome::Unchanged
            }
        }
    }

    pub async fn dispatch_at(
        &self,
        token: &CallbackToken,
        prior: DisplayState,
        now: DateTime<Utc>,
    ) -> DispatchOutcome {
        match token {
            CallbackToken::Noop { .. } => DispatchOutcome::Unchanged,
            CallbackToken::Toggle { event, expanded } => match self.find_event(event, now).await {
                Ok(event) => DispatchOutcome::Updated {
                    event,
                    state: DisplayState {
                        expanded: !expanded,
                        completed: prior.completed,
                    },
                    notice: None,
                },
                Err(outcome) => outcome,
            },
            CallbackToken::Complete { event } => {
                let event = match self.find_event(event, now).await {
                    Ok(event) => event,
                    Err(outcome) => return outcome,
                };
                if prior.completed {
                    return DispatchOutcome::Unchanged;
                }
                self.complete(event, prior, now).await
            }
        }
    }

    async fn complete(&self, event: Event, prior: DisplayState, now: DateTime<Utc>) -> DispatchOutcome {
        let Some(url) = extract_completion_url(&event.description) else {
            return DispatchOutcome::Updated {
                event,
                state: prior,
                notice: Some(Notice::MissingCompletionUrl),
            };
        };

        match self.gateway.complete(&url).await {
            Ok(()) => {
                info!("Marked event {} as completed", event.uid);
                // No point prompting for something already done
                self.deduper
                    .record_at(NotificationCategory::CompletionPrompt, &event.uid, now)
                    .await;
                DispatchOutcome::Updated {
                    event,
                    state: DisplayState {
                        expanded: true,
                        completed: true,
                    },
                    notice: None,
                }
            }
            Err(CompletionError::Http { status }) => DispatchOutcome::Updated {
                event,
                state: prior,
                notice: Some(Notice::CompletionFailed { status }),
            },
            Err(CompletionError::Transport(e)) => {
                warn!("Completion request for {} failed: {}", event.uid, e);
                DispatchOutcome::Updated {
                    event,
                    state: prior,
                    notice: Some(Notice::CompletionUnavailable),
                }
            }
        }
    }

    /// Resolve a button's event against the current snapshot. A stale empty
    /// snapshot means nothing has loaded yet, so the press is left unanswered
    /// instead of declaring the event gone.
    async fn find_event(
        &self,
        event_ref: &EventRef,
        now: DateTime<Utc>,
    ) -> Result<Event, DispatchOutcome> {
        let read = self.cache.get_at(self.cache_max_age, now).await;
        let found = match event_ref {
            EventRef::Uid(uid) => read.find(uid),
            EventRef::Digest(_) => read.events().iter().find(|e| event_ref.matches(&e.uid)),
        };
        if let Some(event) = found {
            return Ok(event.clone());
        }
        if read.is_stale && read.events().is_empty() {
            warn!("Calendar not loaded yet, ignoring callback for {}", event_ref);
            return Err(DispatchOutcome::Unchanged);
        }
        info!("Callback for unknown event {}", event_ref);
        Err(DispatchOutcome::EventNotFound {
            uid: event_ref.to_string(),
        })
    }
}
