use crate::commands::{create_error_embed, create_success_embed, CommandResult, Context};
use crate::components::calendar_feed::Event;
use crate::components::interactions::{render_event, DisplayState};
use crate::utils::timezone;
use chrono::{NaiveDate, Utc};
use chrono_tz::Tz;
use tracing::{info, warn};

/// Events starting on `date` in `zone`, in feed order
pub fn events_on(events: &[Event], date: NaiveDate, zone: Tz) -> Vec<&Event> {
    events
        .iter()
        .filter(|event| event.starts_on(date, zone))
        .collect()
}

/// Show today's events as interactive messages
#[poise::command(slash_command, prefix_command)]
pub async fn showtoday(ctx: Context<'_>) -> CommandResult {
    let services = &ctx.data().services;
    let zone = services.recipient.zone().await;
    let today = Utc::now().with_timezone(&zone).date_naive();

    let read = services.cache.get(services.settings.cache_max_age).await;
    if read.is_stale {
        warn!("Serving today's events from a stale snapshot");
    }

    let today_events = events_on(read.events(), today, zone);
    if today_events.is_empty() {
        let mut content = t!("today_no_events").to_string();
        if read.is_stale {
            content.push('\n');
            content.push_str(&t!("today_stale_notice"));
        }
        ctx.say(content).await?;
        return Ok(());
    }

    if read.is_stale {
        ctx.say(t!("today_stale_notice")).await?;
    }

    for event in today_events {
        let message = render_event(event, DisplayState::default(), zone, None);
        ctx.send(
            poise::CreateReply::default()
                .content(message.content.clone())
                .components(message.action_rows()),
        )
        .await?;
    }
    Ok(())
}

/// Set the timezone used for reminders and summaries
#[poise::command(slash_command, prefix_command)]
pub async fn settimezone(
    ctx: Context<'_>,
    #[description = "IANA timezone name (e.g. 'Europe/Helsinki')"] name: String,
) -> CommandResult {
    let services = &ctx.data().services;

    match timezone::resolve(&name) {
        Ok(zone) => {
            services.recipient.set_zone(zone).await;
            ctx.send(poise::CreateReply::default().embed(create_success_embed(
                &t!("timezone_set_title"),
                &t!("timezone_set", timezone = zone.name()),
            )))
            .await?;
        }
        Err(e) => {
            info!("Rejected timezone '{}': {}", name, e);
            ctx.send(
                poise::CreateReply::default()
                    .embed(create_error_embed(
                        &t!("error_title", context = "settimezone"),
                        &t!("timezone_invalid", timezone = name),
                    ))
                    .ephemeral(true),
            )
            .await?;
        }
    }
    Ok(())
}
