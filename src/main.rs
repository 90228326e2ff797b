use ics_notifier::startup;
use tracing::info;

#[tokio::main]
async fn main() -> miette::Result<()> {
    // Initialize logging
    startup::init_logging()?;

    info!("Starting ics-notifier");

    // Load configuration
    let config = startup::load_config()?;

    // Start the bot
    startup::start_bot(config).await
}
