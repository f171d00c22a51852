use super::{DeliveryError, Messenger};
use crate::database::models::{ReminderKind, ResetSubscription};
use crate::database::queries;
use crate::game::Region;
use crate::utils::paginator::{DEFAULT_MAX_SIZE, Paginator};
use anyhow::Result;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use std::sync::Arc;
use tracing::{error, info, warn};

pub(super) async fn run<M: Messenger>(messenger: Arc<M>, pool: SqlitePool, region: Region) {
    let mut next = region.next_daily_reset(Utc::now());

    loop {
        let wait = (next - Utc::now()).to_std().unwrap_or_default();
        info!("Next {} reset at {}", region.title(), next);
        tokio::time::sleep(wait).await;

        if let Err(e) = announce(messenger.as_ref(), &pool, region, next).await {
            error!("Failed to announce the {} reset: {:?}", region.title(), e);
        }

        next = region.next_daily_reset(next.max(Utc::now()));
    }
}

async fn announce<M: Messenger>(
    messenger: &M,
    pool: &SqlitePool,
    region: Region,
    at: DateTime<Utc>,
) -> Result<()> {
    let weekly = region.is_weekly_reset(at);
    let notified = notify_subscribers(messenger, pool, region, weekly).await;

    // one-shot subscriptions are removed even when notifying failed, so they never fire twice
    let mut purged = queries::purge_non_repeating(pool, ReminderKind::Daily, region).await?;
    if weekly {
        purged += queries::purge_non_repeating(pool, ReminderKind::Weekly, region).await?;
    }

    info!(
        "{} reset announced ({} one-shot subscriptions removed)",
        region.title(),
        purged
    );
    notified
}

async fn notify_subscribers<M: Messenger>(
    messenger: &M,
    pool: &SqlitePool,
    region: Region,
    weekly: bool,
) -> Result<()> {
    let daily = queries::reset_subscribers(pool, ReminderKind::Daily, region).await?;
    notify(messenger, pool, &daily, &reset_message(region, ReminderKind::Daily)).await?;

    if weekly {
        let subscribers = queries::reset_subscribers(pool, ReminderKind::Weekly, region).await?;
        notify(
            messenger,
            pool,
            &subscribers,
            &reset_message(region, ReminderKind::Weekly),
        )
        .await?;
    }
    Ok(())
}

async fn notify<M: Messenger>(
    messenger: &M,
    pool: &SqlitePool,
    subscribers: &[ResetSubscription],
    message: &str,
) -> Result<()> {
    for (channel_id, users) in by_channel(subscribers) {
        for content in mention_messages(&users, message) {
            match messenger.send(channel_id, content).await {
                Ok(()) => {}
                Err(DeliveryError::ChannelGone) => {
                    let deleted = queries::delete_channel_reminders(pool, channel_id).await?;
                    error!(
                        "Channel {} no longer exists, removed {} reminders",
                        channel_id, deleted
                    );
                    break;
                }
                Err(e) => {
                    warn!("Failed to send reset reminder to {}: {:?}", channel_id, e);
                }
            }
        }
    }

    Ok(())
}

fn reset_message(region: Region, kind: ReminderKind) -> String {
    match kind {
        ReminderKind::Daily => format!("the {} server dailies have reset!", region.title()),
        ReminderKind::Weekly => format!(
            "the {} server weeklies (and dailies) have reset!",
            region.title()
        ),
    }
}

/// Groups subscriptions by channel, keeping first-seen channel order.
fn by_channel(subscribers: &[ResetSubscription]) -> Vec<(i64, Vec<i64>)> {
    let mut groups: Vec<(i64, Vec<i64>)> = Vec::new();
    for sub in subscribers {
        match groups.iter_mut().find(|(channel, _)| *channel == sub.channel_id) {
            Some((_, users)) => users.push(sub.user_id),
            None => groups.push((sub.channel_id, vec![sub.user_id])),
        }
    }
    groups
}

/// Mentions followed by `message`, split so every part fits in one Discord message.
fn mention_messages(users: &[i64], message: &str) -> Vec<String> {
    let mut paginator = Paginator::new(DEFAULT_MAX_SIZE, None, Some(message));
    for user in users {
        if paginator.append(&format!("<@{}> ", user)).is_err() {
            break;
        }
    }
    paginator.pages()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::test_pool;
    use crate::scheduler::testing::RecordingMessenger;
    use chrono::NaiveDate;

    fn sub(user_id: i64, channel_id: i64) -> ResetSubscription {
        ResetSubscription {
            user_id,
            channel_id,
            repeat: false,
        }
    }

    #[test]
    fn messages_name_the_region() {
        assert_eq!(
            reset_message(Region::America, ReminderKind::Daily),
            "the America server dailies have reset!"
        );
        assert_eq!(
            reset_message(Region::Europe, ReminderKind::Weekly),
            "the Europe server weeklies (and dailies) have reset!"
        );
    }

    #[test]
    fn groups_subscribers_per_channel() {
        let groups = by_channel(&[sub(1, 10), sub(2, 20), sub(3, 10)]);
        assert_eq!(groups, vec![(10, vec![1, 3]), (20, vec![2])]);
    }

    #[test]
    fn one_message_for_few_mentions() {
        let messages = mention_messages(&[1, 2], "the Asia server dailies have reset!");
        assert_eq!(
            messages,
            vec!["<@1> <@2> the Asia server dailies have reset!".to_string()]
        );
    }

    #[test]
    fn long_mention_lists_are_split() {
        let users: Vec<i64> = (0..200).map(|i| 100_000_000_000_000_000 + i).collect();
        let messages = mention_messages(&users, "the Asia server dailies have reset!");

        assert!(messages.len() > 1);
        for message in &messages {
            assert!(message.chars().count() <= DEFAULT_MAX_SIZE);
            assert!(message.ends_with("have reset!"));
        }
        let mentioned: usize = messages.iter().map(|m| m.matches("<@").count()).sum();
        assert_eq!(mentioned, users.len());
    }

    async fn subscribe(
        pool: &SqlitePool,
        kind: ReminderKind,
        user: i64,
        channel: i64,
        repeat: bool,
    ) {
        queries::set_user_region(pool, user, Region::America).await.unwrap();
        queries::toggle_reset_reminder(pool, kind, user, channel, repeat)
            .await
            .unwrap();
    }

    async fn subscription_count(pool: &SqlitePool, user: i64) -> usize {
        queries::user_subscriptions(pool, user).await.unwrap().len()
    }

    fn reset_on(year: i32, month: u32, day: u32) -> DateTime<Utc> {
        Region::America.reset_at(NaiveDate::from_ymd_opt(year, month, day).unwrap())
    }

    #[tokio::test]
    async fn monday_reset_notifies_daily_and_weekly() {
        let pool = test_pool().await.unwrap();
        subscribe(&pool, ReminderKind::Daily, 1, 10, false).await;
        subscribe(&pool, ReminderKind::Daily, 2, 10, true).await;
        subscribe(&pool, ReminderKind::Weekly, 3, 20, false).await;
        subscribe(&pool, ReminderKind::Weekly, 4, 20, true).await;
        queries::set_user_region(&pool, 5, Region::Asia).await.unwrap();
        queries::toggle_reset_reminder(&pool, ReminderKind::Daily, 5, 10, false)
            .await
            .unwrap();

        let messenger = RecordingMessenger::default();
        announce(&messenger, &pool, Region::America, reset_on(2024, 3, 11))
            .await
            .unwrap();

        let sent = messenger.sent();
        assert_eq!(sent.len(), 2);
        let (channel, daily) = &sent[0];
        assert_eq!(*channel, 10);
        assert!(daily.contains("<@1>") && daily.contains("<@2>") && !daily.contains("<@5>"));
        assert!(daily.ends_with("the America server dailies have reset!"));
        let (channel, weekly) = &sent[1];
        assert_eq!(*channel, 20);
        assert!(weekly.contains("<@3>") && weekly.contains("<@4>"));
        assert!(weekly.ends_with("the America server weeklies (and dailies) have reset!"));

        assert_eq!(subscription_count(&pool, 1).await, 0);
        assert_eq!(subscription_count(&pool, 2).await, 1);
        assert_eq!(subscription_count(&pool, 3).await, 0);
        assert_eq!(subscription_count(&pool, 4).await, 1);
        // other regions reset on their own timer
        assert_eq!(subscription_count(&pool, 5).await, 1);
    }

    #[tokio::test]
    async fn weekday_reset_leaves_weeklies_alone() {
        let pool = test_pool().await.unwrap();
        subscribe(&pool, ReminderKind::Daily, 1, 10, false).await;
        subscribe(&pool, ReminderKind::Weekly, 3, 20, false).await;

        let messenger = RecordingMessenger::default();
        announce(&messenger, &pool, Region::America, reset_on(2024, 3, 12))
            .await
            .unwrap();

        assert_eq!(
            messenger.sent(),
            vec![(10, "<@1> the America server dailies have reset!".to_string())]
        );
        assert_eq!(subscription_count(&pool, 1).await, 0);
        assert_eq!(subscription_count(&pool, 3).await, 1);
    }

    #[tokio::test]
    async fn deleted_channels_lose_their_subscriptions() {
        let pool = test_pool().await.unwrap();
        subscribe(&pool, ReminderKind::Daily, 1, 10, true).await;
        subscribe(&pool, ReminderKind::Daily, 2, 20, true).await;

        let messenger = RecordingMessenger::with_gone(vec![10]);
        announce(&messenger, &pool, Region::America, reset_on(2024, 3, 12))
            .await
            .unwrap();

        assert_eq!(messenger.sent().len(), 1);
        assert_eq!(subscription_count(&pool, 1).await, 0);
        assert_eq!(subscription_count(&pool, 2).await, 1);
    }

    #[tokio::test]
    async fn one_shot_subscriptions_are_purged_when_notifying_fails() {
        let pool = test_pool().await.unwrap();
        subscribe(&pool, ReminderKind::Daily, 1, 10, false).await;
        sqlx::query("DROP TABLE weekly_reminder")
            .execute(&pool)
            .await
            .unwrap();

        let messenger = RecordingMessenger::default();
        let result = announce(&messenger, &pool, Region::America, reset_on(2024, 3, 11)).await;

        assert!(result.is_err());
        assert_eq!(messenger.sent().len(), 1);
        let remaining: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM daily_reminder")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(remaining, 0);
    }
}
