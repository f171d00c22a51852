use crate::game::Region;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReminderKind {
    Daily,
    Weekly,
}

impl ReminderKind {
    pub fn table(&self) -> &'static str {
        match self {
            ReminderKind::Daily => "daily_reminder",
            ReminderKind::Weekly => "weekly_reminder",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ReminderKind::Daily => "daily",
            ReminderKind::Weekly => "weekly",
        }
    }
}

/// A user's subscription to a daily or weekly reset ping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResetSubscription {
    pub user_id: i64,
    pub channel_id: i64,
    pub repeat: bool,
}

/// Result of `/reminder daily` and `/reminder weekly`, which toggle a subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Subscription {
    Created(Region),
    Cancelled,
    /// The user has not picked a server region yet.
    MissingRegion,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomReminder {
    pub id: i64,
    pub user_id: i64,
    pub channel_id: i64,
    pub message: String,
    pub target: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StoredArtifact {
    pub id: i64,
    pub set_key: String,
    pub slot_key: String,
    pub rarity: i64,
    pub level: i64,
    pub main_stat_key: String,
    pub location: String,
    pub locked: bool,
    pub substats: Vec<(String, f64)>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InventoryCounts {
    pub artifacts: u64,
    pub weapons: u64,
    pub characters: u64,
}

/// A bind parameter for an ad-hoc SQL statement.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlArg {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl SqlArg {
    /// Interprets one literal: `null`, `true`/`false`, a number, or a (optionally quoted) string.
    pub fn parse(literal: &str) -> Self {
        let literal = literal.trim();
        match literal {
            "null" | "NULL" => return SqlArg::Null,
            "true" => return SqlArg::Bool(true),
            "false" => return SqlArg::Bool(false),
            _ => {}
        }

        if let Ok(i) = literal.parse::<i64>() {
            return SqlArg::Int(i);
        }
        if let Ok(f) = literal.parse::<f64>() {
            return SqlArg::Float(f);
        }

        let unquoted = ['\'', '"'].iter().find_map(|q| {
            literal
                .strip_prefix(*q)
                .and_then(|rest| rest.strip_suffix(*q))
        });
        SqlArg::Text(unquoted.unwrap_or(literal).to_string())
    }

    /// Splits a semicolon separated argument list. An empty list has no arguments.
    pub fn parse_list(input: &str) -> Vec<Self> {
        if input.trim().is_empty() {
            return Vec::new();
        }
        input.split(';').map(SqlArg::parse).collect()
    }
}

/// Column names and stringified values of an ad-hoc query.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryOutput {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Option<String>>>,
    pub rows_affected: u64,
}
