pub mod dedup;
pub mod notifications;
pub mod scheduler;
pub mod triggers;

pub use dedup::{NotificationCategory, NotificationDeduper};
pub use notifications::{ChatSink, DiscordSink};
pub use scheduler::ReminderScheduler;
pub use triggers::{Anchor, DailyTrigger, ReminderSettings, WindowTrigger};

use super::BotServices;
use crate::error::BotResult;
use crate::utils::scheduler::Scheduler;
use async_trait::async_trait;
use futures::future::join_all;
use poise::serenity_prelude as serenity;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

/// Reminder component, owns the trigger tasks
#[derive(Default)]
pub struct Reminders {
    started: AtomicBool,
    cancel: CancellationToken,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl Reminders {
    /// Create a new reminders component
    pub fn new() -> Self {
        Self::default()
    }

    /// Start the triggers sending through `sink`. Later calls are ignored.
    pub async fn start_with_sink(&self, services: &BotServices, sink: Arc<dyn ChatSink>) {
        if self.started.swap(true, Ordering::SeqCst) {
            info!("Reminder scheduler already running");
            return;
        }

        let scheduler = Arc::new(ReminderScheduler::new(
            Arc::clone(&services.cache),
            Arc::clone(&services.deduper),
            Arc::clone(&services.recipient),
            sink,
            services.settings.clone(),
        ));

        info!("Starting reminder scheduler");
        let handles = scheduler.start(self.cancel.child_token());
        self.tasks.lock().await.extend(handles);
    }

    pub async fn running_tasks(&self) -> usize {
        self.tasks
            .lock()
            .await
            .iter()
            .filter(|handle| !handle.is_finished())
            .count()
    }
}

#[async_trait]
impl super::Component for Reminders {
    fn name(&self) -> &'static str {
        "reminders"
    }

    async fn init(&self, ctx: &serenity::Context, services: Arc<BotServices>) -> BotResult<()> {
        let sink = DiscordSink::new(Arc::clone(&ctx.http), services.config.calendar_channel_id);
        self.start_with_sink(&services, Arc::new(sink)).await;
        Ok(())
    }

    async fn shutdown(&self) -> BotResult<()> {
        self.cancel.cancel();

        let handles: Vec<_> = self.tasks.lock().await.drain(..).collect();
        for result in join_all(handles).await {
            if let Err(e) = result {
                error!("Reminder task ended abnormally: {}", e);
            }
        }
        info!("Reminder scheduler stopped");
        Ok(())
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}
