use chrono::{
    DateTime, Datelike, Days, FixedOffset, NaiveDate, NaiveTime, Offset, TimeZone, Utc, Weekday,
};

/// Local hour at which every server resets its dailies.
pub const RESET_HOUR: u32 = 4;

/// A game server region. Each region resets at a fixed local time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, poise::ChoiceParameter)]
pub enum Region {
    #[name = "America (GMT-5)"]
    America,
    #[name = "Asia (GMT+8)"]
    Asia,
    #[name = "Europe (GMT+1)"]
    Europe,
}

impl Region {
    pub const ALL: [Region; 3] = [Region::America, Region::Asia, Region::Europe];

    pub fn as_str(&self) -> &'static str {
        match self {
            Region::America => "america",
            Region::Asia => "asia",
            Region::Europe => "europe",
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            Region::America => "America",
            Region::Asia => "Asia",
            Region::Europe => "Europe",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "america" => Some(Region::America),
            "asia" => Some(Region::Asia),
            "europe" => Some(Region::Europe),
            _ => None,
        }
    }

    pub fn offset(&self) -> FixedOffset {
        let hours = match self {
            Region::America => -5,
            Region::Asia => 8,
            Region::Europe => 1,
        };
        FixedOffset::east_opt(hours * 3600).unwrap_or_else(|| Utc.fix())
    }

    /// Date of the game day `now` falls in. A game day starts at the reset hour.
    pub fn game_day(&self, now: DateTime<Utc>) -> NaiveDate {
        let local = now.with_timezone(&self.offset());
        let date = local.date_naive();
        if local.time() < reset_time() {
            date.pred_opt().unwrap_or(date)
        } else {
            date
        }
    }

    /// First daily reset strictly after `now`.
    pub fn next_daily_reset(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        let day = self.game_day(now);
        let next = day.checked_add_days(Days::new(1)).unwrap_or(day);
        self.reset_at(next)
    }

    /// End of the game day `now` falls in.
    pub fn today_reset(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        self.next_daily_reset(now)
    }

    /// First Monday reset strictly after `now`.
    pub fn next_weekly_reset(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        let day = self.game_day(now);
        let until_monday = 7 - day.weekday().num_days_from_monday() as u64;
        let next = day.checked_add_days(Days::new(until_monday)).unwrap_or(day);
        self.reset_at(next)
    }

    /// Whether the reset at `at` is also the weekly reset.
    pub fn is_weekly_reset(&self, at: DateTime<Utc>) -> bool {
        self.game_day(at).weekday() == Weekday::Mon
    }

    /// The UTC instant at which `date`'s game day begins.
    pub fn reset_at(&self, date: NaiveDate) -> DateTime<Utc> {
        let local = date.and_time(reset_time());
        self.offset()
            .from_local_datetime(&local)
            .single()
            .map(|dt| dt.to_utc())
            .unwrap_or_else(|| local.and_utc())
    }
}

fn reset_time() -> NaiveTime {
    NaiveTime::from_hms_opt(RESET_HOUR, 0, 0).unwrap_or(NaiveTime::MIN)
}
