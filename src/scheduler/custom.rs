use super::{DeliveryError, Messenger};
use crate::database::models::CustomReminder;
use crate::database::queries;
use crate::utils::time::relative;
use anyhow::Result;
use chrono::Utc;
use sqlx::SqlitePool;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;
use tracing::{debug, error, warn};

/// Only reminders due within this many days are waited on.
const HORIZON_DAYS: i64 = 40;
const IDLE_RECHECK: Duration = Duration::from_secs(60 * 60);
const RETRY_DELAY: Duration = Duration::from_secs(5);

pub(super) async fn run<M: Messenger>(messenger: Arc<M>, pool: SqlitePool, wake: Arc<Notify>) {
    loop {
        if let Err(e) = dispatch_next(messenger.as_ref(), &pool, &wake).await {
            error!("Custom reminder loop failed, retrying: {:?}", e);
            tokio::time::sleep(RETRY_DELAY).await;
        }
    }
}

/// Waits for the earliest reminder and delivers it. Returns early when woken,
/// so a reminder added in the meantime is picked up if it is due sooner.
async fn dispatch_next<M: Messenger>(messenger: &M, pool: &SqlitePool, wake: &Notify) -> Result<()> {
    let horizon = Utc::now() + chrono::Duration::days(HORIZON_DAYS);
    let Some(reminder) = queries::next_custom_reminder(pool, horizon).await? else {
        tokio::select! {
            _ = wake.notified() => {}
            _ = tokio::time::sleep(IDLE_RECHECK) => {}
        }
        return Ok(());
    };

    let wait = (reminder.target - Utc::now()).to_std().unwrap_or_default();
    tokio::select! {
        _ = wake.notified() => return Ok(()),
        _ = tokio::time::sleep(wait) => {}
    }

    // cancelled while we slept
    if !queries::delete_custom_reminder(pool, reminder.id).await? {
        debug!("Custom reminder {} vanished before it was due", reminder.id);
        return Ok(());
    }

    match messenger
        .send(reminder.channel_id, reminder_message(&reminder))
        .await
    {
        Ok(()) => {}
        Err(DeliveryError::ChannelGone) => warn!(
            "Dropping custom reminder {}: channel {} is gone",
            reminder.id, reminder.channel_id
        ),
        Err(e) => error!("Failed to send custom reminder {}: {:?}", reminder.id, e),
    }

    Ok(())
}

fn reminder_message(reminder: &CustomReminder) -> String {
    format!(
        "<@{}>, {}: {}",
        reminder.user_id,
        relative(reminder.created_at),
        reminder.message
    )
}
