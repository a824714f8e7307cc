use chrono::Duration;

use crate::db::AgriStore;
use crate::error::StoreResult;

impl AgriStore {
    /// Cached upstream response for `cache_key`. Expired entries are treated as absent.
    pub async fn get_api_response(&self, cache_key: &str) -> StoreResult<Option<serde_json::Value>> {
        let row: Option<(String,)> =
            sqlx::query_as("SELECT data FROM api_cache WHERE cache_key = ? AND expires_at > ?")
                .bind(cache_key)
                .bind(crate::now())
                .fetch_optional(self.pool())
                .await?;

        match row {
            Some((data,)) => Ok(Some(serde_json::from_str(&data)?)),
            None => Ok(None),
        }
    }

    /// Store an upstream response for `ttl`, replacing any previous entry
    pub async fn put_api_response(&self, cache_key: &str, data: &serde_json::Value, ttl: Duration) -> StoreResult<()> {
        let now = crate::now();
        sqlx::query(
            r#"
            INSERT INTO api_cache (cache_key, data, created_at, expires_at)
            VALUES (?, ?, ?, ?)
            ON CONFLICT(cache_key) DO UPDATE SET
                data = excluded.data,
                created_at = excluded.created_at,
                expires_at = excluded.expires_at
            "#,
        )
        .bind(cache_key)
        .bind(serde_json::to_string(data)?)
        .bind(now)
        .bind(now + ttl)
        .execute(self.pool())
        .await?;

        Ok(())
    }
}
