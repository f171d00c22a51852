pub mod migrations;
pub mod models;
pub mod queries;

use anyhow::Result;
use sqlx::{SqlitePool, sqlite::SqliteConnectOptions};
use std::str::FromStr;

pub async fn create_connection(database_url: &str) -> Result<SqlitePool> {
    let connect_options = SqliteConnectOptions::from_str(database_url)?
        .create_if_missing(true)
        .foreign_keys(true);

    let pool = SqlitePool::connect_with(connect_options).await?;

    // Run migrations
    migrations::run_migrations(&pool).await?;

    Ok(pool)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConstraintViolation {
    ForeignKey,
    Unique,
}

/// Classifies a failed statement by the constraint it broke, if any.
pub fn constraint_violation(err: &sqlx::Error) -> Option<ConstraintViolation> {
    match err {
        sqlx::Error::Database(db) if db.is_foreign_key_violation() => {
            Some(ConstraintViolation::ForeignKey)
        }
        sqlx::Error::Database(db) if db.is_unique_violation() => Some(ConstraintViolation::Unique),
        _ => None,
    }
}

/// A migrated single-connection in-memory database.
#[cfg(test)]
pub async fn test_pool() -> Result<SqlitePool> {
    use sqlx::sqlite::SqlitePoolOptions;

    let connect_options = SqliteConnectOptions::from_str("sqlite::memory:")?.foreign_keys(true);
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(connect_options)
        .await?;
    migrations::run_migrations(&pool).await?;

    Ok(pool)
}
