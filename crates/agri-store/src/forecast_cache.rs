use chrono::{Duration, NaiveDate};

use crate::db::AgriStore;
use crate::error::StoreResult;

impl AgriStore {
    /// Cached forecast payload, `None` when absent or expired
    pub async fn get_forecast(
        &self,
        state: &str,
        district: &str,
        commodity: &str,
        target_date: NaiveDate,
    ) -> StoreResult<Option<serde_json::Value>> {
        let row: Option<(String,)> = sqlx::query_as(
            r#"
            SELECT forecast_data FROM forecast_cache
            WHERE state = ? AND district = ? AND commodity = ? AND target_date = ? AND expires_at > ?
            "#,
        )
        .bind(state)
        .bind(district)
        .bind(commodity)
        .bind(target_date)
        .bind(crate::now())
        .fetch_optional(self.pool())
        .await?;

        match row {
            Some((data,)) => Ok(Some(serde_json::from_str(&data)?)),
            None => Ok(None),
        }
    }

    pub async fn put_forecast(
        &self,
        state: &str,
        district: &str,
        commodity: &str,
        target_date: NaiveDate,
        data: &serde_json::Value,
        ttl: Duration,
    ) -> StoreResult<()> {
        let now = crate::now();
        sqlx::query(
            r#"
            INSERT INTO forecast_cache
                (state, district, commodity, target_date, forecast_data, created_at, expires_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(state, district, commodity, target_date) DO UPDATE SET
                forecast_data = excluded.forecast_data,
                created_at = excluded.created_at,
                expires_at = excluded.expires_at
            "#,
        )
        .bind(state)
        .bind(district)
        .bind(commodity)
        .bind(target_date)
        .bind(serde_json::to_string(data)?)
        .bind(now)
        .bind(now + ttl)
        .execute(self.pool())
        .await?;

        Ok(())
    }
}
