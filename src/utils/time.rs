use anyhow::Result;
use chrono::{DateTime, Days, Duration, FixedOffset, NaiveTime, TimeZone, Utc};

pub fn parse_time_string(time_str: &str) -> Result<NaiveTime> {
    let time_str = time_str.trim();

    if let Ok(time) = NaiveTime::parse_from_str(time_str, "%H:%M") {
        return Ok(time);
    }

    if let Ok(time) = NaiveTime::parse_from_str(time_str, "%H:%M:%S") {
        return Ok(time);
    }

    Err(anyhow::anyhow!("Invalid time format. Use HH:MM or HH:MM:SS"))
}

/// Parses durations such as `90m`, `1h30m`, `2d 4h` or `1w`.
pub fn parse_duration(input: &str) -> Result<Duration> {
    let input = input.trim();
    if input.is_empty() {
        return Err(anyhow::anyhow!("Duration is empty"));
    }

    let mut total = Duration::zero();
    let mut number = String::new();

    for c in input.chars() {
        if c.is_ascii_digit() {
            number.push(c);
            continue;
        }
        if c.is_whitespace() {
            continue;
        }

        let amount: i64 = number
            .parse()
            .map_err(|_| anyhow::anyhow!("Expected a number before '{}'", c))?;
        number.clear();

        let part = match c.to_ascii_lowercase() {
            'w' => Duration::try_weeks(amount),
            'd' => Duration::try_days(amount),
            'h' => Duration::try_hours(amount),
            'm' => Duration::try_minutes(amount),
            's' => Duration::try_seconds(amount),
            other => return Err(anyhow::anyhow!("Unknown duration unit '{}'", other)),
        }
        .ok_or_else(|| anyhow::anyhow!("Duration is too long"))?;

        total = total
            .checked_add(&part)
            .ok_or_else(|| anyhow::anyhow!("Duration is too long"))?;
    }

    if !number.is_empty() {
        return Err(anyhow::anyhow!(
            "Missing unit after '{}'. Use w, d, h, m or s",
            number
        ));
    }

    Ok(total)
}

/// Next instant strictly after `now` at which the clock in `offset` shows `time`.
pub fn next_occurrence(time: NaiveTime, offset: FixedOffset, now: DateTime<Utc>) -> DateTime<Utc> {
    let local_now = now.with_timezone(&offset);
    let mut date = local_now.date_naive();
    if local_now.time() >= time {
        date = date.checked_add_days(Days::new(1)).unwrap_or(date);
    }

    let local = date.and_time(time);
    offset
        .from_local_datetime(&local)
        .single()
        .map(|dt| dt.to_utc())
        .unwrap_or_else(|| local.and_utc())
}

/// Discord timestamp markup, rendered in each reader's own timezone.
pub fn discord_timestamp(datetime: DateTime<Utc>, style: char) -> String {
    format!("<t:{}:{}>", datetime.timestamp(), style)
}

pub fn relative(datetime: DateTime<Utc>) -> String {
    discord_timestamp(datetime, 'R')
}

/// Drops sub-second precision so stored timestamps compare and sort consistently.
pub fn truncate_to_seconds(datetime: DateTime<Utc>) -> DateTime<Utc> {
    DateTime::from_timestamp(datetime.timestamp(), 0).unwrap_or(datetime)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_compound_durations() {
        assert_eq!(parse_duration("90m").unwrap(), Duration::minutes(90));
        assert_eq!(
            parse_duration("1h30m").unwrap(),
            Duration::hours(1) + Duration::minutes(30)
        );
        assert_eq!(
            parse_duration("2d 4H").unwrap(),
            Duration::days(2) + Duration::hours(4)
        );
        assert_eq!(parse_duration("1w").unwrap(), Duration::weeks(1));
    }

    #[test]
    fn rejects_malformed_durations() {
        assert!(parse_duration("").is_err());
        assert!(parse_duration("10").is_err());
        assert!(parse_duration("h").is_err());
        assert!(parse_duration("3y").is_err());
        assert!(parse_duration("99999999999999999w").is_err());
    }

    #[test]
    fn parses_clock_times() {
        assert_eq!(
            parse_time_string(" 09:30 ").unwrap(),
            NaiveTime::from_hms_opt(9, 30, 0).unwrap()
        );
        assert!(parse_time_string("9h").is_err());
    }

    #[test]
    fn next_occurrence_rolls_to_tomorrow() {
        let utc = FixedOffset::east_opt(0).unwrap();
        let now = Utc.with_ymd_and_hms(2024, 3, 5, 10, 0, 0).unwrap();
        let nine = NaiveTime::from_hms_opt(9, 0, 0).unwrap();
        let eleven = NaiveTime::from_hms_opt(11, 0, 0).unwrap();

        assert_eq!(
            next_occurrence(eleven, utc, now),
            Utc.with_ymd_and_hms(2024, 3, 5, 11, 0, 0).unwrap()
        );
        assert_eq!(
            next_occurrence(nine, utc, now),
            Utc.with_ymd_and_hms(2024, 3, 6, 9, 0, 0).unwrap()
        );
    }

    #[test]
    fn next_occurrence_respects_offset() {
        let asia = FixedOffset::east_opt(8 * 3600).unwrap();
        let now = Utc.with_ymd_and_hms(2024, 3, 5, 10, 0, 0).unwrap();
        // 18:00 local is 10:00 UTC, which is not strictly after now
        let six_pm = NaiveTime::from_hms_opt(18, 0, 0).unwrap();
        assert_eq!(
            next_occurrence(six_pm, asia, now),
            Utc.with_ymd_and_hms(2024, 3, 6, 10, 0, 0).unwrap()
        );
    }

    #[test]
    fn formats_discord_timestamps() {
        let at = Utc.with_ymd_and_hms(2024, 3, 5, 10, 0, 0).unwrap();
        assert_eq!(relative(at), format!("<t:{}:R>", at.timestamp()));
    }
}
