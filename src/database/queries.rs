use crate::database::models::{
    CustomReminder, InventoryCounts, QueryOutput, ReminderKind, ResetSubscription, SqlArg,
    StoredArtifact, Subscription,
};
use crate::database::{ConstraintViolation, constraint_violation};
use crate::game::Region;
use crate::game::artifact::{Artifact, ScannedCharacter, ScannedWeapon};
use crate::utils::time::truncate_to_seconds;
use anyhow::Result;
use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{Column, Executor, Row, SqlitePool, Statement, TypeInfo, ValueRef};

// User configuration
pub async fn set_user_region(pool: &SqlitePool, user_id: i64, region: Region) -> Result<()> {
    sqlx::query(
        "INSERT INTO user_config (user_id, server) VALUES (?, ?)
         ON CONFLICT (user_id) DO UPDATE SET server = excluded.server",
    )
    .bind(user_id)
    .bind(region.as_str())
    .execute(pool)
    .await?;

    Ok(())
}

pub async fn get_user_region(pool: &SqlitePool, user_id: i64) -> Result<Option<Region>> {
    let server: Option<String> =
        sqlx::query_scalar("SELECT server FROM user_config WHERE user_id = ?")
            .bind(user_id)
            .fetch_optional(pool)
            .await?;

    Ok(server.as_deref().and_then(Region::parse))
}

// Reset subscriptions
pub async fn toggle_reset_reminder(
    pool: &SqlitePool,
    kind: ReminderKind,
    user_id: i64,
    channel_id: i64,
    repeat: bool,
) -> Result<Subscription> {
    let mut tx = pool.begin().await?;

    let inserted = sqlx::query(&format!(
        "INSERT INTO {} (user_id, repeat, channel_id, created_at) VALUES (?, ?, ?, ?)",
        kind.table()
    ))
    .bind(user_id)
    .bind(repeat)
    .bind(channel_id)
    .bind(truncate_to_seconds(Utc::now()))
    .execute(&mut *tx)
    .await;

    if let Err(err) = inserted {
        tx.rollback().await?;
        return match constraint_violation(&err) {
            Some(ConstraintViolation::ForeignKey) => Ok(Subscription::MissingRegion),
            Some(ConstraintViolation::Unique) => {
                sqlx::query(&format!("DELETE FROM {} WHERE user_id = ?", kind.table()))
                    .bind(user_id)
                    .execute(pool)
                    .await?;
                Ok(Subscription::Cancelled)
            }
            None => Err(err.into()),
        };
    }

    let server: String = sqlx::query_scalar("SELECT server FROM user_config WHERE user_id = ?")
        .bind(user_id)
        .fetch_one(&mut *tx)
        .await?;
    tx.commit().await?;

    let region = Region::parse(&server)
        .ok_or_else(|| anyhow::anyhow!("Unknown server '{}' for user {}", server, user_id))?;
    Ok(Subscription::Created(region))
}

/// Subscribers of `region`, ordered by channel so they can be grouped per message.
pub async fn reset_subscribers(
    pool: &SqlitePool,
    kind: ReminderKind,
    region: Region,
) -> Result<Vec<ResetSubscription>> {
    let rows = sqlx::query(&format!(
        "SELECT r.user_id, r.channel_id, r.repeat FROM {} r
         JOIN user_config u ON u.user_id = r.user_id
         WHERE u.server = ?
         ORDER BY r.channel_id, r.id",
        kind.table()
    ))
    .bind(region.as_str())
    .fetch_all(pool)
    .await?;

    Ok(rows.iter().map(subscription_from_row).collect())
}

pub async fn user_subscriptions(
    pool: &SqlitePool,
    user_id: i64,
) -> Result<Vec<(ReminderKind, ResetSubscription)>> {
    let mut subscriptions = Vec::new();

    for kind in [ReminderKind::Daily, ReminderKind::Weekly] {
        let row = sqlx::query(&format!(
            "SELECT user_id, channel_id, repeat FROM {} WHERE user_id = ?",
            kind.table()
        ))
        .bind(user_id)
        .fetch_optional(pool)
        .await?;

        if let Some(row) = row {
            subscriptions.push((kind, subscription_from_row(&row)));
        }
    }

    Ok(subscriptions)
}

/// Drops the one-shot subscriptions of `region` after its reset went out.
pub async fn purge_non_repeating(
    pool: &SqlitePool,
    kind: ReminderKind,
    region: Region,
) -> Result<u64> {
    let result = sqlx::query(&format!(
        "DELETE FROM {} WHERE NOT repeat
         AND user_id IN (SELECT user_id FROM user_config WHERE server = ?)",
        kind.table()
    ))
    .bind(region.as_str())
    .execute(pool)
    .await?;

    Ok(result.rows_affected())
}

pub async fn delete_channel_reminders(pool: &SqlitePool, channel_id: i64) -> Result<u64> {
    let mut deleted = 0;
    for kind in [ReminderKind::Daily, ReminderKind::Weekly] {
        let result = sqlx::query(&format!("DELETE FROM {} WHERE channel_id = ?", kind.table()))
            .bind(channel_id)
            .execute(pool)
            .await?;
        deleted += result.rows_affected();
    }

    Ok(deleted)
}

fn subscription_from_row(row: &SqliteRow) -> ResetSubscription {
    ResetSubscription {
        user_id: row.get("user_id"),
        channel_id: row.get("channel_id"),
        repeat: row.get("repeat"),
    }
}

// Custom reminders
pub async fn create_custom_reminder(
    pool: &SqlitePool,
    user_id: i64,
    channel_id: i64,
    message: &str,
    target: DateTime<Utc>,
) -> Result<CustomReminder> {
    let created_at = truncate_to_seconds(Utc::now());
    let target = truncate_to_seconds(target);

    let result = sqlx::query(
        "INSERT INTO custom_reminder (user_id, channel_id, message, target, created_at)
         VALUES (?, ?, ?, ?, ?)",
    )
    .bind(user_id)
    .bind(channel_id)
    .bind(message)
    .bind(target)
    .bind(created_at)
    .execute(pool)
    .await?;

    Ok(CustomReminder {
        id: result.last_insert_rowid(),
        user_id,
        channel_id,
        message: message.to_string(),
        target,
        created_at,
    })
}

/// The earliest reminder whose target is before `horizon`.
pub async fn next_custom_reminder(
    pool: &SqlitePool,
    horizon: DateTime<Utc>,
) -> Result<Option<CustomReminder>> {
    let row = sqlx::query(
        "SELECT id, user_id, channel_id, message, target, created_at FROM custom_reminder
         WHERE target < ? ORDER BY target, id LIMIT 1",
    )
    .bind(truncate_to_seconds(horizon))
    .fetch_optional(pool)
    .await?;

    Ok(row.as_ref().map(custom_reminder_from_row))
}

pub async fn delete_custom_reminder(pool: &SqlitePool, id: i64) -> Result<bool> {
    let result = sqlx::query("DELETE FROM custom_reminder WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}

/// Deletes reminder `id` only when it belongs to `user_id`.
pub async fn cancel_custom_reminder(pool: &SqlitePool, user_id: i64, id: i64) -> Result<bool> {
    let result = sqlx::query("DELETE FROM custom_reminder WHERE id = ? AND user_id = ?")
        .bind(id)
        .bind(user_id)
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}

pub async fn user_custom_reminders(pool: &SqlitePool, user_id: i64) -> Result<Vec<CustomReminder>> {
    let rows = sqlx::query(
        "SELECT id, user_id, channel_id, message, target, created_at FROM custom_reminder
         WHERE user_id = ? ORDER BY target, id",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?;

    Ok(rows.iter().map(custom_reminder_from_row).collect())
}

fn custom_reminder_from_row(row: &SqliteRow) -> CustomReminder {
    CustomReminder {
        id: row.get("id"),
        user_id: row.get("user_id"),
        channel_id: row.get("channel_id"),
        message: row.get("message"),
        target: row.get("target"),
        created_at: row.get("created_at"),
    }
}

// Imported inventory
/// Replaces everything previously imported by `user_id` in one transaction.
pub async fn replace_inventory(
    pool: &SqlitePool,
    user_id: i64,
    artifacts: &[Artifact],
    weapons: &[ScannedWeapon],
    characters: &[ScannedCharacter],
) -> Result<InventoryCounts> {
    let mut tx = pool.begin().await?;

    for table in ["artifacts", "weapons", "characters"] {
        sqlx::query(&format!("DELETE FROM {table} WHERE user_id = ?"))
            .bind(user_id)
            .execute(&mut *tx)
            .await?;
    }

    for artifact in artifacts {
        sqlx::query(
            "INSERT INTO artifacts
             (user_id, set_key, slot_key, rarity, level, main_stat_key, location, locked, substats)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(user_id)
        .bind(&artifact.set_key)
        .bind(&artifact.slot_key)
        .bind(artifact.rarity.stars() as i64)
        .bind(artifact.level as i64)
        .bind(&artifact.main_stat_key)
        .bind(&artifact.location)
        .bind(artifact.locked)
        .bind(serde_json::to_string(&artifact.substats)?)
        .execute(&mut *tx)
        .await?;
    }

    for weapon in weapons {
        sqlx::query(
            "INSERT INTO weapons (user_id, key, level, ascension, refinement, location, locked)
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(user_id)
        .bind(&weapon.key)
        .bind(weapon.level as i64)
        .bind(weapon.ascension as i64)
        .bind(weapon.refinement as i64)
        .bind(&weapon.location)
        .bind(weapon.lock)
        .execute(&mut *tx)
        .await?;
    }

    for character in characters {
        sqlx::query(
            "INSERT INTO characters
             (user_id, key, level, constellation, ascension, talent_auto, talent_skill, talent_burst)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(user_id)
        .bind(&character.key)
        .bind(character.level as i64)
        .bind(character.constellation as i64)
        .bind(character.ascension as i64)
        .bind(character.talent.auto as i64)
        .bind(character.talent.skill as i64)
        .bind(character.talent.burst as i64)
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;

    Ok(InventoryCounts {
        artifacts: artifacts.len() as u64,
        weapons: weapons.len() as u64,
        characters: characters.len() as u64,
    })
}

pub async fn purge_inventory(pool: &SqlitePool, user_id: i64) -> Result<InventoryCounts> {
    let mut tx = pool.begin().await?;
    let mut deleted = [0u64; 3];

    for (count, table) in deleted.iter_mut().zip(["artifacts", "weapons", "characters"]) {
        let result = sqlx::query(&format!("DELETE FROM {table} WHERE user_id = ?"))
            .bind(user_id)
            .execute(&mut *tx)
            .await?;
        *count = result.rows_affected();
    }

    tx.commit().await?;

    let [artifacts, weapons, characters] = deleted;
    Ok(InventoryCounts {
        artifacts,
        weapons,
        characters,
    })
}

pub async fn user_artifacts(
    pool: &SqlitePool,
    user_id: i64,
    slot: Option<&str>,
    set_key: Option<&str>,
) -> Result<Vec<StoredArtifact>> {
    let rows = sqlx::query(
        "SELECT id, set_key, slot_key, rarity, level, main_stat_key, location, locked, substats
         FROM artifacts
         WHERE user_id = ?
           AND (? IS NULL OR slot_key = ?)
           AND (? IS NULL OR set_key = ?)
         ORDER BY rarity DESC, level DESC, id",
    )
    .bind(user_id)
    .bind(slot)
    .bind(slot)
    .bind(set_key)
    .bind(set_key)
    .fetch_all(pool)
    .await?;

    rows.iter()
        .map(|row| {
            let substats: String = row.get("substats");
            Ok(StoredArtifact {
                id: row.get("id"),
                set_key: row.get("set_key"),
                slot_key: row.get("slot_key"),
                rarity: row.get("rarity"),
                level: row.get("level"),
                main_stat_key: row.get("main_stat_key"),
                location: row.get("location"),
                locked: row.get("locked"),
                substats: serde_json::from_str(&substats)?,
            })
        })
        .collect()
}

// Developer console
/// Runs an ad-hoc statement inside a transaction and stringifies every column.
///
/// `rows_affected` is only set for statements that return no columns; `changes()`
/// would otherwise report whatever the last write on this connection touched.
pub async fn run_statement(pool: &SqlitePool, sql: &str, args: &[SqlArg]) -> Result<QueryOutput> {
    let mut tx = pool.begin().await?;

    let columns: Vec<String> = (&mut *tx)
        .prepare(sql)
        .await?
        .columns()
        .iter()
        .map(|c| c.name().to_string())
        .collect();

    let mut query = sqlx::query(sql);
    for arg in args {
        query = match arg {
            SqlArg::Null => query.bind(None::<String>),
            SqlArg::Bool(b) => query.bind(*b),
            SqlArg::Int(i) => query.bind(*i),
            SqlArg::Float(f) => query.bind(*f),
            SqlArg::Text(s) => query.bind(s.clone()),
        };
    }

    let rows = query.fetch_all(&mut *tx).await?;
    let rows_affected: u64 = if columns.is_empty() {
        sqlx::query_scalar::<_, i64>("SELECT changes()")
            .fetch_one(&mut *tx)
            .await?
            .try_into()
            .unwrap_or(0)
    } else {
        0
    };
    tx.commit().await?;

    let rows = rows.iter().map(stringify_row).collect::<Result<Vec<_>>>()?;

    Ok(QueryOutput {
        columns,
        rows,
        rows_affected,
    })
}

fn stringify_row(row: &SqliteRow) -> Result<Vec<Option<String>>> {
    (0..row.columns().len())
        .map(|i| {
            let raw = row.try_get_raw(i)?;
            if raw.is_null() {
                return Ok(None);
            }
            let value = match raw.type_info().name() {
                "INTEGER" | "BOOLEAN" => row.try_get::<i64, _>(i)?.to_string(),
                "REAL" => row.try_get::<f64, _>(i)?.to_string(),
                "BLOB" => format!("<{} bytes>", row.try_get::<Vec<u8>, _>(i)?.len()),
                _ => row.try_get::<String, _>(i)?,
            };
            Ok(Some(value))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::test_pool;
    use crate::game::artifact::ScanData;
    use chrono::Duration;

    #[tokio::test]
    async fn region_upsert_overwrites() {
        let pool = test_pool().await.unwrap();

        assert_eq!(get_user_region(&pool, 1).await.unwrap(), None);
        set_user_region(&pool, 1, Region::Asia).await.unwrap();
        set_user_region(&pool, 1, Region::Europe).await.unwrap();
        assert_eq!(get_user_region(&pool, 1).await.unwrap(), Some(Region::Europe));
    }

    #[tokio::test]
    async fn subscription_requires_region() {
        let pool = test_pool().await.unwrap();

        let result = toggle_reset_reminder(&pool, ReminderKind::Daily, 7, 100, false)
            .await
            .unwrap();
        assert_eq!(result, Subscription::MissingRegion);
        assert!(user_subscriptions(&pool, 7).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn subscribing_twice_cancels() {
        let pool = test_pool().await.unwrap();
        set_user_region(&pool, 7, Region::America).await.unwrap();

        let first = toggle_reset_reminder(&pool, ReminderKind::Weekly, 7, 100, true)
            .await
            .unwrap();
        assert_eq!(first, Subscription::Created(Region::America));
        assert_eq!(user_subscriptions(&pool, 7).await.unwrap().len(), 1);

        let second = toggle_reset_reminder(&pool, ReminderKind::Weekly, 7, 100, true)
            .await
            .unwrap();
        assert_eq!(second, Subscription::Cancelled);
        assert!(user_subscriptions(&pool, 7).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn purge_keeps_repeating_and_other_regions() {
        let pool = test_pool().await.unwrap();
        set_user_region(&pool, 1, Region::America).await.unwrap();
        set_user_region(&pool, 2, Region::America).await.unwrap();
        set_user_region(&pool, 3, Region::Asia).await.unwrap();
        for (user, repeat) in [(1, true), (2, false), (3, false)] {
            toggle_reset_reminder(&pool, ReminderKind::Daily, user, 100, repeat)
                .await
                .unwrap();
        }

        let subscribers = reset_subscribers(&pool, ReminderKind::Daily, Region::America)
            .await
            .unwrap();
        assert_eq!(subscribers.len(), 2);

        let purged = purge_non_repeating(&pool, ReminderKind::Daily, Region::America)
            .await
            .unwrap();
        assert_eq!(purged, 1);

        let left = reset_subscribers(&pool, ReminderKind::Daily, Region::America)
            .await
            .unwrap();
        assert_eq!(left.iter().map(|s| s.user_id).collect::<Vec<_>>(), vec![1]);
        assert_eq!(
            reset_subscribers(&pool, ReminderKind::Daily, Region::Asia)
                .await
                .unwrap()
                .len(),
            1
        );
    }

    #[tokio::test]
    async fn deleting_a_channel_drops_both_kinds() {
        let pool = test_pool().await.unwrap();
        set_user_region(&pool, 1, Region::Europe).await.unwrap();
        toggle_reset_reminder(&pool, ReminderKind::Daily, 1, 55, true)
            .await
            .unwrap();
        toggle_reset_reminder(&pool, ReminderKind::Weekly, 1, 55, true)
            .await
            .unwrap();

        assert_eq!(delete_channel_reminders(&pool, 55).await.unwrap(), 2);
        assert!(user_subscriptions(&pool, 1).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn next_custom_reminder_respects_horizon_and_order() {
        let pool = test_pool().await.unwrap();
        let now = truncate_to_seconds(Utc::now());

        let later = create_custom_reminder(&pool, 1, 10, "later", now + Duration::hours(2))
            .await
            .unwrap();
        let sooner = create_custom_reminder(&pool, 2, 10, "sooner", now + Duration::hours(1))
            .await
            .unwrap();
        create_custom_reminder(&pool, 3, 10, "far", now + Duration::days(100))
            .await
            .unwrap();

        let next = next_custom_reminder(&pool, now + Duration::days(40))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(next, sooner);

        assert!(delete_custom_reminder(&pool, sooner.id).await.unwrap());
        let next = next_custom_reminder(&pool, now + Duration::days(40))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(next.id, later.id);

        assert!(
            next_custom_reminder(&pool, now + Duration::minutes(30))
                .await
                .unwrap()
                .is_none()
        );
    }

    #[tokio::test]
    async fn cancel_only_touches_own_reminders() {
        let pool = test_pool().await.unwrap();
        let target = Utc::now() + Duration::hours(1);
        let reminder = create_custom_reminder(&pool, 1, 10, "…", target)
            .await
            .unwrap();

        assert!(!cancel_custom_reminder(&pool, 2, reminder.id).await.unwrap());
        assert_eq!(user_custom_reminders(&pool, 1).await.unwrap().len(), 1);
        assert!(cancel_custom_reminder(&pool, 1, reminder.id).await.unwrap());
        assert!(user_custom_reminders(&pool, 1).await.unwrap().is_empty());
    }

    const SCAN: &str = r#"{
        "format": "GOOD",
        "artifacts": [
            {"setKey": "GladiatorsFinale", "slotKey": "flower", "level": 20, "rarity": 5,
             "mainStatKey": "hp", "location": "Diluc", "lock": true,
             "substats": [{"key": "critRate_", "value": 3.9}, {"key": "", "value": 0}]},
            {"setKey": "WanderersTroupe", "slotKey": "sands", "level": 0, "rarity": 4,
             "mainStatKey": "atk_", "location": "", "lock": false, "substats": []}
        ],
        "weapons": [
            {"key": "Skyward Harp", "level": 90, "ascension": 6, "refinement": 1,
             "location": "Diluc", "lock": true}
        ],
        "characters": []
    }"#;

    #[tokio::test]
    async fn import_replaces_previous_inventory() {
        let pool = test_pool().await.unwrap();
        let scan = ScanData::parse(SCAN.as_bytes()).unwrap();
        let artifacts = scan.validate().unwrap();

        let counts = replace_inventory(&pool, 9, &artifacts, &scan.weapons, &scan.characters)
            .await
            .unwrap();
        assert_eq!(counts.artifacts, 2);
        let counts = replace_inventory(&pool, 9, &artifacts[..1], &[], &[])
            .await
            .unwrap();
        assert_eq!(counts.artifacts, 1);

        let stored = user_artifacts(&pool, 9, None, None).await.unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].set_key, "GladiatorsFinale");
        assert_eq!(stored[0].substats, vec![("critRate_".to_string(), 3.9)]);

        let purged = purge_inventory(&pool, 9).await.unwrap();
        assert_eq!(
            purged,
            InventoryCounts {
                artifacts: 1,
                weapons: 0,
                characters: 0
            }
        );
    }

    #[tokio::test]
    async fn artifact_filters() {
        let pool = test_pool().await.unwrap();
        let scan = ScanData::parse(SCAN.as_bytes()).unwrap();
        let artifacts = scan.validate().unwrap();
        replace_inventory(&pool, 9, &artifacts, &[], &[])
            .await
            .unwrap();

        let sands = user_artifacts(&pool, 9, Some("sands"), None).await.unwrap();
        assert_eq!(sands.len(), 1);
        assert_eq!(sands[0].set_key, "WanderersTroupe");

        let none = user_artifacts(&pool, 9, Some("sands"), Some("GladiatorsFinale"))
            .await
            .unwrap();
        assert!(none.is_empty());
        assert!(user_artifacts(&pool, 10, None, None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn run_statement_stringifies_rows() {
        let pool = test_pool().await.unwrap();
        set_user_region(&pool, 42, Region::Asia).await.unwrap();

        let output = run_statement(
            &pool,
            "SELECT user_id, server, NULL AS empty FROM user_config WHERE user_id = ?",
            &[SqlArg::Int(42)],
        )
        .await
        .unwrap();

        assert_eq!(output.columns, vec!["user_id", "server", "empty"]);
        assert_eq!(
            output.rows,
            vec![vec![Some("42".to_string()), Some("asia".to_string()), None]]
        );
    }

    #[tokio::test]
    async fn run_statement_reports_changes() {
        let pool = test_pool().await.unwrap();
        set_user_region(&pool, 1, Region::Asia).await.unwrap();
        set_user_region(&pool, 2, Region::Asia).await.unwrap();

        let output = run_statement(
            &pool,
            "UPDATE user_config SET server = ? WHERE server = 'asia'",
            &[SqlArg::Text("europe".into())],
        )
        .await
        .unwrap();

        assert!(output.rows.is_empty());
        assert_eq!(output.rows_affected, 2);

        let output = run_statement(
            &pool,
            "SELECT user_id FROM user_config WHERE user_id = ?",
            &[SqlArg::Int(99)],
        )
        .await
        .unwrap();

        assert_eq!(output.columns, vec!["user_id"]);
        assert!(output.rows.is_empty());
        assert_eq!(output.rows_affected, 0);
    }
}
