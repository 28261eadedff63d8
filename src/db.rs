use std::str::FromStr;

use anyhow::Context;
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    SqlitePool,
};
use tracing::info;

use crate::{
    config::AppConfig,
    users::{password, repo},
};

const SAMPLE_USERS: [(&str, &str, &str); 3] = [
    ("John Doe", "john@example.com", "password123"),
    ("Jane Smith", "jane@example.com", "secret456"),
    ("Bob Johnson", "bob@example.com", "qwerty789"),
];

pub async fn connect(config: &AppConfig) -> anyhow::Result<SqlitePool> {
    let options = SqliteConnectOptions::from_str(&config.database_url)
        .with_context(|| format!("parse DATABASE_URL {}", config.database_url))?
        .create_if_missing(true);

    let db = SqlitePoolOptions::new()
        .max_connections(config.max_connections)
        .connect_with(options)
        .await
        .context("connect to database")?;
    Ok(db)
}

/// Single long-lived connection: every new connection to `:memory:` is a fresh database.
#[cfg(test)]
pub async fn connect_in_memory() -> anyhow::Result<SqlitePool> {
    let options = SqliteConnectOptions::from_str("sqlite::memory:")?;
    let db = SqlitePoolOptions::new()
        .max_connections(1)
        .min_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect_with(options)
        .await
        .context("open in-memory database")?;
    Ok(db)
}

pub async fn migrate(db: &SqlitePool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations")
        .run(db)
        .await
        .context("run migrations")?;
    Ok(())
}

/// Insert the demo accounts when the table is empty. Returns how many were added.
pub async fn seed_sample_users(db: &SqlitePool) -> anyhow::Result<usize> {
    let mut conn = db.acquire().await.context("acquire connection")?;
    if repo::count(&mut conn).await? > 0 {
        info!("users table already has data; skipping sample users");
        return Ok(0);
    }

    for (name, email, plain) in SAMPLE_USERS {
        let hash = password::hash_password(plain)?;
        repo::create(&mut conn, name, email, &hash).await?;
    }
    info!(count = SAMPLE_USERS.len(), "inserted sample users");
    Ok(SAMPLE_USERS.len())
}
