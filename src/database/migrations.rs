use anyhow::Result;
use sqlx::SqlitePool;
use tracing::info;

pub async fn run_migrations(pool: &SqlitePool) -> Result<()> {
    info!("Running database migrations...");

    create_user_config_table(pool).await?;
    create_reset_reminder_table(pool, "daily_reminder").await?;
    create_reset_reminder_table(pool, "weekly_reminder").await?;
    create_custom_reminder_table(pool).await?;
    create_inventory_tables(pool).await?;

    info!("Database migrations completed successfully");
    Ok(())
}

async fn create_user_config_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS user_config (
            id INTEGER PRIMARY KEY,
            user_id INTEGER UNIQUE NOT NULL,
            server TEXT NOT NULL CHECK (server IN ('america', 'asia', 'europe')),
            created_at DATETIME DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_reset_reminder_table(pool: &SqlitePool, table: &str) -> Result<()> {
    sqlx::query(&format!(
        r#"
        CREATE TABLE IF NOT EXISTS {table} (
            id INTEGER PRIMARY KEY,
            user_id INTEGER UNIQUE NOT NULL,
            repeat BOOLEAN NOT NULL DEFAULT FALSE,
            channel_id INTEGER NOT NULL,
            created_at DATETIME NOT NULL,
            FOREIGN KEY (user_id) REFERENCES user_config (user_id) ON DELETE CASCADE
        )
        "#
    ))
    .execute(pool)
    .await?;

    sqlx::query(&format!(
        "CREATE INDEX IF NOT EXISTS {table}_channel ON {table} (channel_id)"
    ))
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_custom_reminder_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS custom_reminder (
            id INTEGER PRIMARY KEY,
            user_id INTEGER NOT NULL,
            channel_id INTEGER NOT NULL,
            message TEXT NOT NULL DEFAULT '…',
            target DATETIME NOT NULL,
            created_at DATETIME NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS custom_reminder_target ON custom_reminder (target)")
        .execute(pool)
        .await?;

    Ok(())
}

async fn create_inventory_tables(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS artifacts (
            id INTEGER PRIMARY KEY,
            user_id INTEGER NOT NULL,
            set_key TEXT NOT NULL,
            slot_key TEXT NOT NULL,
            rarity INTEGER NOT NULL CHECK (rarity BETWEEN 1 AND 5),
            level INTEGER NOT NULL,
            main_stat_key TEXT NOT NULL,
            location TEXT NOT NULL DEFAULT '',
            locked BOOLEAN NOT NULL DEFAULT FALSE,
            substats TEXT NOT NULL DEFAULT '[]'
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS weapons (
            id INTEGER PRIMARY KEY,
            user_id INTEGER NOT NULL,
            key TEXT NOT NULL,
            level INTEGER NOT NULL,
            ascension INTEGER NOT NULL,
            refinement INTEGER NOT NULL,
            location TEXT NOT NULL DEFAULT '',
            locked BOOLEAN NOT NULL DEFAULT FALSE
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS characters (
            id INTEGER PRIMARY KEY,
            user_id INTEGER NOT NULL,
            key TEXT NOT NULL,
            level INTEGER NOT NULL,
            constellation INTEGER NOT NULL,
            ascension INTEGER NOT NULL,
            talent_auto INTEGER NOT NULL,
            talent_skill INTEGER NOT NULL,
            talent_burst INTEGER NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    for table in ["artifacts", "weapons", "characters"] {
        sqlx::query(&format!(
            "CREATE INDEX IF NOT EXISTS {table}_user ON {table} (user_id)"
        ))
        .execute(pool)
        .await?;
    }

    Ok(())
}
