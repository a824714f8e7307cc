use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::collections::BTreeMap;
use std::str::FromStr;

use crate::error::StoreResult;

/// Request parameters that never take part in a cache key
const CREDENTIAL_PARAMS: &[&str] = &["api-key", "apikey", "api_key", "appid", "key"];

/// SQLite-backed cache for upstream responses, price history and forecasts
#[derive(Clone)]
pub struct AgriStore {
    pool: SqlitePool,
}

/// Row counts per table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheStats {
    pub api_cache_count: i64,
    pub price_records_count: i64,
    pub forecast_cache_count: i64,
}

impl AgriStore {
    /// Open (creating if needed) the database at `database_url` and apply the schema
    pub async fn new(database_url: &str) -> StoreResult<Self> {
        let options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);

        // An in-memory database lives and dies with its single connection
        let pool = if database_url.contains(":memory:") {
            SqlitePoolOptions::new()
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
                .connect_with(options)
                .await?
        } else {
            SqlitePoolOptions::new()
                .max_connections(5)
                .connect_with(options)
                .await?
        };

        let store = Self { pool };
        store.init_schema().await?;

        Ok(store)
    }

    async fn init_schema(&self) -> StoreResult<()> {
        let schema = include_str!("../schema.sql");

        // sqlx executes one statement per query
        let mut applied = 0;
        for statement in schema.split(';') {
            let stmt = statement.trim();
            if !stmt.is_empty() {
                sqlx::query(stmt).execute(&self.pool).await?;
                applied += 1;
            }
        }

        tracing::debug!("Cache schema ready ({} statements)", applied);
        Ok(())
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub async fn stats(&self) -> StoreResult<CacheStats> {
        let (api_cache_count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM api_cache")
            .fetch_one(&self.pool)
            .await?;
        let (price_records_count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM price_history")
            .fetch_one(&self.pool)
            .await?;
        let (forecast_cache_count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM forecast_cache")
            .fetch_one(&self.pool)
            .await?;

        Ok(CacheStats {
            api_cache_count,
            price_records_count,
            forecast_cache_count,
        })
    }

    /// Empty the two expiring caches. Price history is kept.
    /// Returns (api responses removed, forecasts removed).
    pub async fn clear_caches(&self) -> StoreResult<(u64, u64)> {
        let api = sqlx::query("DELETE FROM api_cache").execute(&self.pool).await?;
        let forecasts = sqlx::query("DELETE FROM forecast_cache").execute(&self.pool).await?;
        tracing::debug!(
            "Cleared {} API responses and {} forecasts",
            api.rows_affected(),
            forecasts.rows_affected()
        );
        Ok((api.rows_affected(), forecasts.rows_affected()))
    }

    /// Drop expired rows from the expiring caches
    pub async fn purge_expired(&self) -> StoreResult<u64> {
        let now = crate::now();
        let api = sqlx::query("DELETE FROM api_cache WHERE expires_at <= ?")
            .bind(now)
            .execute(&self.pool)
            .await?;
        let forecasts = sqlx::query("DELETE FROM forecast_cache WHERE expires_at <= ?")
            .bind(now)
            .execute(&self.pool)
            .await?;

        if api.rows_affected() + forecasts.rows_affected() > 0 {
            tracing::info!(
                "Purged {} expired API responses and {} expired forecasts",
                api.rows_affected(),
                forecasts.rows_affected()
            );
        }
        Ok(api.rows_affected() + forecasts.rows_affected())
    }
}

/// Cache key for a set of request parameters: SHA-256 over the key-sorted JSON object.
/// Credential parameters are left out.
pub fn fingerprint(params: &[(String, String)]) -> String {
    let canonical: BTreeMap<&str, &str> = params
        .iter()
        .filter(|(k, _)| !CREDENTIAL_PARAMS.contains(&k.to_ascii_lowercase().as_str()))
        .map(|(k, v)| (k.as_str(), v.as_str()))
        .collect();

    let json = serde_json::to_string(&canonical).unwrap_or_default();
    hex::encode(Sha256::digest(json.as_bytes()))
}
