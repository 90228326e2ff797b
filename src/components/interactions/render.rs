use super::codec::{build_token, CallbackToken};
use crate::components::calendar_feed::Event;
use chrono_tz::Tz;
use poise::serenity_prelude as serenity;

/// Discord rejects message content longer than this
const MAX_CONTENT_CHARS: usize = 2000;

/// How a rendered event message currently looks
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DisplayState {
    pub expanded: bool,
    pub completed: bool,
}

impl DisplayState {
    pub fn toggled(self) -> Self {
        Self {
            expanded: !self.expanded,
            completed: self.completed,
        }
    }

    /// Re-derive the state of a message from the payloads of its buttons.
    /// A completed message carries a `noop` button instead of `complete`.
    pub fn from_payloads<'a>(payloads: impl IntoIterator<Item = &'a str>) -> Self {
        let mut state = Self::default();
        for payload in payloads {
            match build_token(payload) {
                Ok(CallbackToken::Noop { .. }) => state.completed = true,
                Ok(CallbackToken::Toggle { expanded, .. }) => state.expanded = expanded,
                _ => {}
            }
        }
        state
    }
}

/// Inline message shown under an event after a failed action
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    CompletionFailed { status: u16 },
    CompletionUnavailable,
    MissingCompletionUrl,
}

impl Notice {
    pub fn text(&self) -> String {
        match self {
            Notice::CompletionFailed { status } => {
                t!("notice_completion_failed", status = status).to_string()
            }
            Notice::CompletionUnavailable => t!("notice_completion_unavailable").to_string(),
            Notice::MissingCompletionUrl => t!("notice_missing_completion_url").to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ButtonKind {
    Primary,
    Secondary,
    Success,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ButtonSpec {
    pub label: String,
    pub payload: String,
    pub kind: ButtonKind,
}

/// Platform-neutral message with its buttons
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedMessage {
    pub content: String,
    pub buttons: Vec<ButtonSpec>,
}

impl RenderedMessage {
    /// Plain message without buttons
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: truncate(content.into()),
            buttons: Vec::new(),
        }
    }

    /// Put a heading line above the content
    pub fn with_heading(mut self, heading: &str) -> Self {
        self.content = truncate(format!("{}\n\n{}", heading, self.content));
        self
    }

    pub fn action_rows(&self) -> Vec<serenity::CreateActionRow> {
        if self.buttons.is_empty() {
            return Vec::new();
        }

        let buttons = self
            .buttons
            .iter()
            .map(|button| {
                let style = match button.kind {
                    ButtonKind::Primary => serenity::ButtonStyle::Primary,
                    ButtonKind::Secondary => serenity::ButtonStyle::Secondary,
                    ButtonKind::Success => serenity::ButtonStyle::Success,
                };
                serenity::CreateButton::new(button.payload.clone())
                    .label(button.label.clone())
                    .style(style)
            })
            .collect();

        vec![serenity::CreateActionRow::Buttons(buttons)]
    }
}

/// Render an event as an interactive message
pub fn render_event(
    event: &Event,
    state: DisplayState,
    zone: Tz,
    notice: Option<&Notice>,
) -> RenderedMessage {
    let start = event.start.with_timezone(&zone).format("%d.%m.%Y %H:%M");
    let end = event.end.with_timezone(&zone).format("%H:%M");
    let checkbox = if state.completed { "✅ " } else { "" };

    let mut content = format!("**{}{} - {}** {}", checkbox, start, end, event.summary);
    if state.expanded && !event.description.is_empty() {
        content.push('\n');
        content.push_str(&event.description);
    }
    if let Some(notice) = notice {
        content.push_str("\n\n⚠️ ");
        content.push_str(&notice.text());
    }

    let status_button = if state.completed {
        ButtonSpec {
            label: t!("button_completed").to_string(),
            payload: CallbackToken::noop(&event.uid).to_payload(),
            kind: ButtonKind::Success,
        }
    } else {
        ButtonSpec {
            label: t!("button_complete").to_string(),
            payload: CallbackToken::complete(&event.uid).to_payload(),
            kind: ButtonKind::Primary,
        }
    };

    let toggle_button = ButtonSpec {
        label: if state.expanded {
            t!("button_collapse").to_string()
        } else {
            t!("button_expand").to_string()
        },
        payload: CallbackToken::toggle(&event.uid, state.expanded).to_payload(),
        kind: ButtonKind::Secondary,
    };

    RenderedMessage {
        content: truncate(content),
        buttons: vec![status_button, toggle_button],
    }
}

fn truncate(mut content: String) -> String {
    if content.chars().count() <= MAX_CONTENT_CHARS {
        return content;
    }
    let cut = content
        .char_indices()
        .nth(MAX_CONTENT_CHARS - 1)
        .map(|(index, _)| index)
        .unwrap_or(content.len());
    content.truncate(cut);
    content.push('…');
    content
}
