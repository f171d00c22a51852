mod custom;
mod resets;

use crate::game::Region;
use poise::serenity_prelude::{self as serenity, ChannelId, Http};
use sqlx::SqlitePool;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::{Mutex, Notify};
use tokio::task::JoinHandle;
use tracing::info;

/// Background tasks delivering reset pings and custom reminders.
///
/// Owned by the session and restarted when the `timers` module is reloaded.
pub struct Scheduler {
    pool: SqlitePool,
    wake: Arc<Notify>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl Scheduler {
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            pool,
            wake: Arc::new(Notify::new()),
            tasks: Mutex::new(Vec::new()),
        }
    }

    /// Spawns one reset timer per region plus the custom reminder loop.
    /// Does nothing when already running.
    pub async fn start(&self, http: Arc<Http>) {
        let mut tasks = self.tasks.lock().await;
        if !tasks.is_empty() {
            info!("Reminder scheduler is already running");
            return;
        }

        for region in Region::ALL {
            tasks.push(tokio::spawn(resets::run(
                http.clone(),
                self.pool.clone(),
                region,
            )));
        }
        tasks.push(tokio::spawn(custom::run(
            http,
            self.pool.clone(),
            self.wake.clone(),
        )));

        info!("Reminder scheduler started");
    }

    pub async fn stop(&self) {
        let mut tasks = self.tasks.lock().await;
        if tasks.is_empty() {
            return;
        }

        for task in tasks.drain(..) {
            task.abort();
        }
        info!("Reminder scheduler stopped");
    }

    pub async fn is_running(&self) -> bool {
        !self.tasks.lock().await.is_empty()
    }

    /// Makes the custom reminder loop re-read the queue, e.g. after a new reminder was added.
    pub fn wake(&self) {
        self.wake.notify_one();
    }
}

/// Delivers scheduled messages to channels.
pub(crate) trait Messenger: Send + Sync + 'static {
    fn send(
        &self,
        channel_id: i64,
        content: String,
    ) -> impl Future<Output = Result<(), DeliveryError>> + Send;
}

#[derive(Debug, thiserror::Error)]
pub(crate) enum DeliveryError {
    #[error("channel not found")]
    ChannelGone,

    #[error(transparent)]
    Discord(#[from] serenity::Error),
}

impl Messenger for Http {
    async fn send(&self, channel_id: i64, content: String) -> Result<(), DeliveryError> {
        match ChannelId::new(channel_id as u64).say(self, content).await {
            Ok(_) => Ok(()),
            Err(e) if is_not_found(&e) => Err(DeliveryError::ChannelGone),
            Err(e) => Err(e.into()),
        }
    }
}

fn is_not_found(err: &serenity::Error) -> bool {
    match err {
        serenity::Error::Http(http) => http.status_code().map(|code| code.as_u16()) == Some(404),
        _ => false,
    }
}
