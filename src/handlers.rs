use crate::commands::CommandContext;
use crate::components::interactions::{DisplayState, RenderedMessage};
use crate::components::BotServices;
use crate::error::{BotResult, Error};
use poise::serenity_prelude as serenity;
use tracing::{debug, info};

/// Gateway events the framework does not handle itself
pub async fn event_handler(
    ctx: &serenity::Context,
    event: &serenity::FullEvent,
    _framework: poise::FrameworkContext<'_, CommandContext, Error>,
    data: &CommandContext,
) -> BotResult<()> {
    if let serenity::FullEvent::InteractionCreate { interaction } = event {
        if let Some(component) = interaction.as_message_component() {
            handle_button(ctx, component, &data.services).await?;
        }
    }
    Ok(())
}

/// Custom ids of all non-link buttons on a message
pub fn button_payloads(components: &[serenity::ActionRow]) -> Vec<String> {
    components
        .iter()
        .flat_map(|row| row.components.iter())
        .filter_map(|component| match component {
            serenity::ActionRowComponent::Button(button) => match &button.data {
                serenity::ButtonKind::NonLink { custom_id, .. } => Some(custom_id.clone()),
                _ => None,
            },
            _ => None,
        })
        .collect()
}

async fn handle_button(
    ctx: &serenity::Context,
    component: &serenity::ComponentInteraction,
    services: &BotServices,
) -> BotResult<()> {
    let payload = component.data.custom_id.as_str();

    if !services.config.is_component_enabled("interactions") {
        debug!("Interactions disabled, acknowledging '{}'", payload);
        component
            .create_response(&ctx.http, serenity::CreateInteractionResponse::Acknowledge)
            .await?;
        return Ok(());
    }

    let payloads = button_payloads(&component.message.components);
    let prior = DisplayState::from_payloads(payloads.iter().map(String::as_str));
    debug!("Button '{}' pressed on message in state {:?}", payload, prior);

    let outcome = services.dispatcher.handle_payload(payload, prior).await;
    let zone = services.recipient.zone().await;

    let response = match outcome.render(zone) {
        Some(message) => {
            info!("Updating message {} after '{}'", component.message.id, payload);
            serenity::CreateInteractionResponse::UpdateMessage(update_message(message))
        }
        None => serenity::CreateInteractionResponse::Acknowledge,
    };

    component.create_response(&ctx.http, response).await?;
    Ok(())
}

fn update_message(message: RenderedMessage) -> serenity::CreateInteractionResponseMessage {
    let components = message.action_rows();
    serenity::CreateInteractionResponseMessage::new()
        .content(message.content)
        .components(components)
}
