use std::collections::HashMap;
use std::str::FromStr;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::{QueryBuilder, Row, Sqlite};
use tracing::{debug, warn};

use curator_common::{CacheStats, CachedPage};

use crate::CacheStore;

/// SQLite caps bound parameters per statement; stay well under it.
const MAX_KEYS_PER_QUERY: usize = 500;

const SCHEMA: &str = "CREATE TABLE IF NOT EXISTS catalog_cache (
    key        TEXT    PRIMARY KEY,
    payload    TEXT    NOT NULL,
    created_at INTEGER NOT NULL,
    updated_at INTEGER NOT NULL
)";

/// Durable cache backed by a single SQLite table. Timestamps are unix millis.
#[derive(Clone)]
pub struct SqliteCache {
    pool: SqlitePool,
}

impl SqliteCache {
    /// Open (creating if needed) the database at `url` and ensure the schema.
    /// Failure here is fatal for a run.
    pub async fn connect(url: &str) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(url)
            .with_context(|| format!("Invalid cache URL: {url}"))?
            .create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .connect_with(options)
            .await
            .with_context(|| format!("Failed to open cache store: {url}"))?;
        Self::from_pool(pool).await
    }

    /// Private in-memory database. A single connection keeps it alive for the
    /// pool's lifetime.
    pub async fn in_memory() -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect("sqlite::memory:")
            .await
            .context("Failed to open in-memory cache store")?;
        Self::from_pool(pool).await
    }

    async fn from_pool(pool: SqlitePool) -> Result<Self> {
        sqlx::query(SCHEMA)
            .execute(&pool)
            .await
            .context("Failed to create catalog_cache table")?;
        Ok(Self { pool })
    }

    /// Close the pool. Subsequent calls degrade to misses.
    pub async fn close(&self) {
        self.pool.close().await;
    }

    async fn try_get_many(&self, keys: &[String]) -> Result<HashMap<String, CachedPage>> {
        let mut found = HashMap::new();
        for chunk in keys.chunks(MAX_KEYS_PER_QUERY) {
            let mut qb: QueryBuilder<Sqlite> =
                QueryBuilder::new("SELECT key, payload FROM catalog_cache WHERE key IN (");
            let mut separated = qb.separated(", ");
            for key in chunk {
                separated.push_bind(key.as_str());
            }
            separated.push_unseparated(")");

            let rows = qb.build().fetch_all(&self.pool).await?;
            for row in rows {
                let key: String = row.try_get("key")?;
                let payload: String = row.try_get("payload")?;
                match serde_json::from_str::<CachedPage>(&payload) {
                    Ok(page) => {
                        found.insert(key, page);
                    }
                    Err(e) => {
                        warn!(key = key.as_str(), error = %e, "Skipping undecodable cache payload")
                    }
                }
            }
        }
        Ok(found)
    }

    async fn try_set_many(&self, pairs: &[(String, CachedPage)]) -> Result<()> {
        let now = Utc::now().timestamp_millis();
        let mut tx = self.pool.begin().await?;
        for (key, page) in pairs {
            let payload = serde_json::to_string(page)?;
            sqlx::query(
                "INSERT INTO catalog_cache (key, payload, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?3)
                 ON CONFLICT (key)
                 DO UPDATE SET payload = excluded.payload,
                               updated_at = excluded.updated_at",
            )
            .bind(key)
            .bind(payload)
            .bind(now)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        Ok(())
    }

    async fn try_stats(&self) -> Result<CacheStats> {
        let row = sqlx::query(
            "SELECT COUNT(*) AS count, MIN(created_at) AS oldest, MAX(created_at) AS newest
             FROM catalog_cache",
        )
        .fetch_one(&self.pool)
        .await?;
        let count: i64 = row.try_get("count")?;
        let oldest: Option<i64> = row.try_get("oldest")?;
        let newest: Option<i64> = row.try_get("newest")?;
        Ok(CacheStats {
            count: count.max(0) as u64,
            oldest: oldest.and_then(DateTime::from_timestamp_millis),
            newest: newest.and_then(DateTime::from_timestamp_millis),
        })
    }
}

#[async_trait]
impl CacheStore for SqliteCache {
    async fn get(&self, key: &str) -> Option<CachedPage> {
        self.get_many(&[key.to_string()]).await.remove(key)
    }

    async fn get_many(&self, keys: &[String]) -> HashMap<String, CachedPage> {
        if keys.is_empty() {
            return HashMap::new();
        }
        match self.try_get_many(keys).await {
            Ok(found) => {
                debug!(requested = keys.len(), hits = found.len(), "Cache lookup");
                found
            }
            Err(e) => {
                warn!(error = %e, keys = keys.len(), "Cache read failed, treating as miss");
                HashMap::new()
            }
        }
    }

    async fn set(&self, key: &str, page: &CachedPage) {
        self.set_many(&[(key.to_string(), page.clone())]).await;
    }

    async fn set_many(&self, pairs: &[(String, CachedPage)]) {
        if pairs.is_empty() {
            return;
        }
        if let Err(e) = self.try_set_many(pairs).await {
            warn!(error = %e, pairs = pairs.len(), "Cache write failed, dropping batch");
        }
    }

    async fn stats(&self) -> CacheStats {
        self.try_stats().await.unwrap_or_else(|e| {
            warn!(error = %e, "Cache stats unavailable");
            CacheStats::default()
        })
    }
}
