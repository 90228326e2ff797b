use crate::components::BotServices;
use crate::error::BotResult;
use poise::serenity_prelude as serenity;
use std::sync::Arc;

// Export submodules
pub mod calendar;
pub mod util;

/// Shared context for all commands
#[derive(Debug)]
pub struct CommandContext {
    pub services: Arc<BotServices>,
}

impl CommandContext {
    /// Create a new command context
    pub fn new(services: Arc<BotServices>) -> Self {
        Self { services }
    }
}

/// Type alias for command result
pub type CommandResult = BotResult<()>;

/// Type alias for poise context
pub type Context<'a> = poise::Context<'a, CommandContext, crate::error::Error>;

/// Red embed for failures
pub fn create_error_embed(title: &str, description: &str) -> serenity::CreateEmbed {
    serenity::CreateEmbed::new()
        .title(title)
        .description(description)
        .colour(serenity::Colour::RED)
}

/// Green embed for successful replies
pub fn create_success_embed(title: &str, description: &str) -> serenity::CreateEmbed {
    serenity::CreateEmbed::new()
        .title(title)
        .description(description)
        .colour(serenity::Colour::DARK_GREEN)
}

/// All application commands
pub fn get_all_application_commands() -> Vec<poise::Command<CommandContext, crate::error::Error>> {
    vec![
        // Utility commands
        util::ping(),
        // Calendar commands
        calendar::showtoday(),
        calendar::settimezone(),
    ]
}
