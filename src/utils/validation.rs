use crate::utils::time::{next_occurrence, parse_duration, parse_time_string};
use anyhow::Result;
use chrono::{DateTime, Duration, FixedOffset, Utc};

pub const RESIN_CAP: i64 = 160;
pub const DEFAULT_RESIN_LIMIT: i64 = 155;
/// Minutes it takes for one point of resin to regenerate.
pub const RESIN_MINUTES: i64 = 8;
pub const MAX_REMINDER_DAYS: i64 = 365;

pub fn validate_resin(current: i64, limit: i64) -> Result<()> {
    if !(0..=RESIN_CAP).contains(&current) || !(1..=RESIN_CAP).contains(&limit) {
        return Err(anyhow::anyhow!("Resin must be between 0 and {}", RESIN_CAP));
    }
    if current >= limit {
        return Err(anyhow::anyhow!("You're already at the limit!"));
    }
    Ok(())
}

/// When resin regenerates from `current` up to `limit`.
pub fn resin_target(now: DateTime<Utc>, current: i64, limit: i64) -> DateTime<Utc> {
    now + Duration::minutes((limit - current).max(0) * RESIN_MINUTES)
}

pub fn validate_reminder_target(target: DateTime<Utc>, now: DateTime<Utc>) -> Result<()> {
    if target <= now {
        return Err(anyhow::anyhow!("The reminder time must be in the future"));
    }
    if target - now > Duration::days(MAX_REMINDER_DAYS) {
        return Err(anyhow::anyhow!(
            "Reminders can be at most {} days ahead",
            MAX_REMINDER_DAYS
        ));
    }
    Ok(())
}

/// Resolves a `when` argument: either a clock time (`HH:MM`, next occurrence in
/// `offset`) or a duration from now (`1h30m`).
pub fn parse_when(input: &str, offset: FixedOffset, now: DateTime<Utc>) -> Result<DateTime<Utc>> {
    let target = match parse_time_string(input) {
        Ok(time) => next_occurrence(time, offset, now),
        Err(_) => {
            let duration = parse_duration(input)?;
            now.checked_add_signed(duration)
                .ok_or_else(|| anyhow::anyhow!("Duration is too long"))?
        }
    };

    validate_reminder_target(target, now)?;
    Ok(target)
}
