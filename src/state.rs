use std::sync::Arc;

use sqlx::{pool::PoolConnection, Sqlite, SqlitePool};
use tracing::info;

use crate::{config::AppConfig, db};

#[derive(Clone)]
pub struct AppState {
    pub db: SqlitePool,
    pub config: Arc<AppConfig>,
}

impl AppState {
    pub async fn init() -> anyhow::Result<Self> {
        let config = Arc::new(AppConfig::from_env()?);
        let db = db::connect(&config).await?;
        db::migrate(&db).await?;
        info!(database_url = %config.database_url, "database ready");

        if config.seed_sample_users {
            db::seed_sample_users(&db).await?;
        }

        Ok(Self { db, config })
    }

    /// Connection for the duration of one request; returned to the pool on drop.
    pub async fn conn(&self) -> Result<PoolConnection<Sqlite>, sqlx::Error> {
        self.db.acquire().await
    }

    #[cfg(test)]
    pub async fn for_tests() -> Self {
        let db = db::connect_in_memory().await.expect("in-memory pool");
        db::migrate(&db).await.expect("migrations");
        let config = Arc::new(AppConfig {
            database_url: "sqlite::memory:".into(),
            host: "127.0.0.1".into(),
            port: 0,
            max_connections: 1,
            seed_sample_users: false,
        });
        Self { db, config }
    }
}
