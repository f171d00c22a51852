use crate::bot::interactions::ReactivePaginator;
use crate::bot::{Context, Error};
use crate::database::models::{CustomReminder, ReminderKind, ResetSubscription, Subscription};
use crate::database::queries;
use crate::utils::format::{format_error_message, trim};
use crate::utils::paginator::Paginator;
use crate::utils::time::relative;
use crate::utils::validation::{
    DEFAULT_RESIN_LIMIT, RESIN_CAP, parse_when, resin_target, validate_resin,
};
use chrono::{DateTime, Offset, Utc};

/// Commands to help remind you about stuff.
#[poise::command(
    slash_command,
    category = "timers",
    subcommands("daily", "weekly", "resin", "custom", "list", "cancel")
)]
pub async fn reminder(_ctx: Context<'_>) -> Result<(), Error> {
    Ok(())
}

/// Set up a reminder to ping you when the daily server reset occurs.
#[poise::command(slash_command, category = "timers", ephemeral)]
pub async fn daily(
    ctx: Context<'_>,
    #[description = "Whether to remind you every day. If `true`, re-run this command to disable the reminder."]
    repeat: Option<bool>,
) -> Result<(), Error> {
    toggle(ctx, ReminderKind::Daily, repeat.unwrap_or(false)).await
}

/// Set up a reminder to ping you when the weekly server reset occurs.
#[poise::command(slash_command, category = "timers", ephemeral)]
pub async fn weekly(
    ctx: Context<'_>,
    #[description = "Whether to remind you every week. If `true`, re-run this command to disable the reminder."]
    repeat: Option<bool>,
) -> Result<(), Error> {
    toggle(ctx, ReminderKind::Weekly, repeat.unwrap_or(false)).await
}

async fn toggle(ctx: Context<'_>, kind: ReminderKind, repeat: bool) -> Result<(), Error> {
    ctx.defer_ephemeral().await?;

    let result = queries::toggle_reset_reminder(
        &ctx.data().pool,
        kind,
        ctx.author().id.get() as i64,
        ctx.channel_id().get() as i64,
        repeat,
    )
    .await?;

    ctx.say(subscription_reply(kind, result, repeat, Utc::now()))
        .await?;
    Ok(())
}

fn subscription_reply(
    kind: ReminderKind,
    result: Subscription,
    repeat: bool,
    now: DateTime<Utc>,
) -> String {
    match result {
        Subscription::MissingRegion => "Failed to set up a reminder. Make sure you have a server specified via `/server update <region>`".to_string(),
        Subscription::Cancelled => "The reminder was cancelled.".to_string(),
        Subscription::Created(region) => {
            let (reset, every) = match kind {
                ReminderKind::Daily => (region.next_daily_reset(now), " every day"),
                ReminderKind::Weekly => (region.next_weekly_reset(now), " every week"),
            };
            format!(
                "Okay, I will mention you when the {} server resets {}{}.",
                region.title(),
                relative(reset),
                if repeat { every } else { "" }
            )
        }
    }
}

/// Set up a reminder to ping you when your resin is close to the limit.
#[poise::command(slash_command, category = "timers", ephemeral)]
pub async fn resin(
    ctx: Context<'_>,
    #[description = "The current amount of resin you have."]
    #[min = 0]
    #[max = 160]
    current: i64,
    #[description = "The maximum amount of resin before pinging. Defaults to 155."]
    #[min = 1]
    #[max = 160]
    limit: Option<i64>,
) -> Result<(), Error> {
    let limit = limit.unwrap_or(DEFAULT_RESIN_LIMIT);
    if let Err(e) = validate_resin(current, limit) {
        ctx.say(e.to_string()).await?;
        return Ok(());
    }

    let target = resin_target(Utc::now(), current, limit);
    let reminder = queries::create_custom_reminder(
        &ctx.data().pool,
        ctx.author().id.get() as i64,
        ctx.channel_id().get() as i64,
        &format!("Your resin has reached {}/{}!", limit, RESIN_CAP),
        target,
    )
    .await?;
    ctx.data().scheduler.wake();

    ctx.say(format!(
        "Okay, I will remind you when your resin reaches {} {}.",
        limit,
        relative(reminder.target)
    ))
    .await?;
    Ok(())
}

/// Set up a custom reminder to ping you at a certain time.
#[poise::command(slash_command, category = "timers", ephemeral)]
pub async fn custom(
    ctx: Context<'_>,
    #[description = "When you want to be reminded, e.g. `1h30m`, `2d` or `18:00`."] when: String,
    #[description = "What to remind you of."]
    #[max_length = 1000]
    what: Option<String>,
) -> Result<(), Error> {
    let user_id = ctx.author().id.get() as i64;
    let offset = queries::get_user_region(&ctx.data().pool, user_id)
        .await?
        .map_or(Utc.fix(), |region| region.offset());

    let target = match parse_when(&when, offset, Utc::now()) {
        Ok(target) => target,
        Err(e) => {
            ctx.say(format_error_message(&e.to_string())).await?;
            return Ok(());
        }
    };

    let what = what.unwrap_or_else(|| "…".to_string());
    let reminder = queries::create_custom_reminder(
        &ctx.data().pool,
        user_id,
        ctx.channel_id().get() as i64,
        &what,
        target,
    )
    .await?;
    ctx.data().scheduler.wake();

    ctx.say(format!(
        "Okay, I will remind you {}: {} (ID `{}`)",
        relative(reminder.target),
        trim(&what, Some(100), false, "…"),
        reminder.id
    ))
    .await?;
    Ok(())
}

/// Lists your active reminders.
#[poise::command(slash_command, category = "timers")]
pub async fn list(ctx: Context<'_>) -> Result<(), Error> {
    let user_id = ctx.author().id.get() as i64;
    let pool = &ctx.data().pool;

    let subscriptions = queries::user_subscriptions(pool, user_id).await?;
    let customs = queries::user_custom_reminders(pool, user_id).await?;

    if subscriptions.is_empty() && customs.is_empty() {
        ctx.send(
            poise::CreateReply::default()
                .content("You have no reminders.")
                .ephemeral(true),
        )
        .await?;
        return Ok(());
    }

    let mut paginator = Paginator::default();
    for line in list_lines(&subscriptions, &customs) {
        paginator.append_line(&trim(&line, Some(1000), false, "…"))?;
    }

    ReactivePaginator::new(paginator.pages())
        .allowed_users(vec![ctx.author().id])
        .ephemeral(true)
        .send(ctx)
        .await
}

fn list_lines(
    subscriptions: &[(ReminderKind, ResetSubscription)],
    customs: &[CustomReminder],
) -> Vec<String> {
    let mut lines = Vec::new();

    if !subscriptions.is_empty() {
        lines.push("**Server resets**".to_string());
        for (kind, sub) in subscriptions {
            lines.push(format!(
                "- {} in <#{}>{}",
                kind.as_str(),
                sub.channel_id,
                if sub.repeat { " (repeating)" } else { "" }
            ));
        }
    }

    if !customs.is_empty() {
        lines.push("**Custom reminders**".to_string());
        for reminder in customs {
            lines.push(format!(
                "- `{}` {} in <#{}>: {}",
                reminder.id,
                relative(reminder.target),
                reminder.channel_id,
                reminder.message
            ));
        }
    }

    lines
}

/// Cancels one of your custom reminders.
#[poise::command(slash_command, category = "timers", ephemeral)]
pub async fn cancel(
    ctx: Context<'_>,
    #[description = "The reminder ID shown by `/reminder list`."] id: i64,
) -> Result<(), Error> {
    let user_id = ctx.author().id.get() as i64;

    if queries::cancel_custom_reminder(&ctx.data().pool, user_id, id).await? {
        ctx.data().scheduler.wake();
        ctx.say(format!("Reminder `{}` was cancelled.", id)).await?;
    } else {
        ctx.say(format!("You have no reminder with ID `{}`.", id))
            .await?;
    }
    Ok(())
}
