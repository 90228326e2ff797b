use crate::components::calendar_feed::Event;
use crate::components::interactions::{render_event, DisplayState, RenderedMessage};
use crate::error::BotResult;
use async_trait::async_trait;
use chrono::NaiveDate;
use chrono_tz::Tz;
use poise::serenity_prelude as serenity;
use std::sync::Arc;

/// Outbound side of the bot: somewhere rendered messages can be posted
#[async_trait]
pub trait ChatSink: Send + Sync {
    async fn send(&self, message: RenderedMessage) -> BotResult<()>;
}

/// Posts messages into a single Discord channel
#[derive(Clone)]
pub struct DiscordSink {
    http: Arc<serenity::Http>,
    channel_id: serenity::ChannelId,
}

impl DiscordSink {
    pub fn new(http: Arc<serenity::Http>, channel_id: u64) -> Self {
        Self {
            http,
            channel_id: serenity::ChannelId::new(channel_id),
        }
    }
}

#[async_trait]
impl ChatSink for DiscordSink {
    async fn send(&self, message: RenderedMessage) -> BotResult<()> {
        let builder = serenity::CreateMessage::new()
            .content(message.content.clone())
            .components(message.action_rows());
        self.channel_id
            .send_message(self.http.as_ref(), builder)
            .await?;
        Ok(())
    }
}

/// Send an upcoming-event reminder
pub async fn send_reminder(sink: &dyn ChatSink, event: &Event, zone: Tz) -> BotResult<()> {
    let message = render_event(event, DisplayState::default(), zone, None)
        .with_heading(&t!("reminder_heading"));
    sink.send(message).await
}

/// Ask whether a finished event was completed
pub async fn send_completion_prompt(sink: &dyn ChatSink, event: &Event, zone: Tz) -> BotResult<()> {
    let message = render_event(event, DisplayState::default(), zone, None)
        .with_heading(&t!("completion_prompt_heading"));
    sink.send(message).await
}

/// Greeting followed by one interactive message per event.
///
/// Stops at the first failed send.
pub async fn send_daily_summary(
    sink: &dyn ChatSink,
    date: NaiveDate,
    events: &[Event],
    zone: Tz,
) -> BotResult<()> {
    if events.is_empty() {
        return Ok(());
    }

    let greeting = t!(
        "daily_summary_greeting",
        date = date.format("%d.%m.%Y").to_string()
    );
    sink.send(RenderedMessage::text(greeting.to_string())).await?;

    for event in events {
        sink.send(render_event(event, DisplayState::default(), zone, None))
            .await?;
    }
    Ok(())
}
