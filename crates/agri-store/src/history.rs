use agri_core::PriceObservation;
use chrono::NaiveDate;

use crate::db::AgriStore;
use crate::error::StoreResult;

#[derive(Debug, sqlx::FromRow)]
struct HistoryRow {
    state: String,
    district: String,
    commodity: String,
    arrival_date: NaiveDate,
    market: String,
    min_price: Option<f64>,
    max_price: Option<f64>,
    modal_price: f64,
}

impl From<HistoryRow> for PriceObservation {
    fn from(row: HistoryRow) -> Self {
        Self {
            state: row.state,
            district: row.district,
            commodity: row.commodity,
            arrival_date: row.arrival_date,
            market: row.market,
            min_price: row.min_price,
            max_price: row.max_price,
            modal_price: row.modal_price,
        }
    }
}

impl AgriStore {
    /// Insert observations, replacing prices already stored for the same
    /// (state, district, commodity, date, market). Returns the number written.
    pub async fn upsert_observations(&self, observations: &[PriceObservation]) -> StoreResult<usize> {
        if observations.is_empty() {
            return Ok(0);
        }

        let mut tx = self.pool().begin().await?;
        for obs in observations {
            sqlx::query(
                r#"
                INSERT INTO price_history
                    (state, district, commodity, arrival_date, market, min_price, max_price, modal_price)
                VALUES (?, ?, ?, ?, ?, ?, ?, ?)
                ON CONFLICT(state, district, commodity, arrival_date, market) DO UPDATE SET
                    min_price = excluded.min_price,
                    max_price = excluded.max_price,
                    modal_price = excluded.modal_price
                "#,
            )
            .bind(&obs.state)
            .bind(&obs.district)
            .bind(&obs.commodity)
            .bind(obs.arrival_date)
            .bind(&obs.market)
            .bind(obs.min_price)
            .bind(obs.max_price)
            .bind(obs.modal_price)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;

        Ok(observations.len())
    }

    /// Stored observations dated after `since`, oldest first
    pub async fn load_observations(
        &self,
        state: &str,
        district: &str,
        commodity: &str,
        since: NaiveDate,
    ) -> StoreResult<Vec<PriceObservation>> {
        let rows = sqlx::query_as::<_, HistoryRow>(
            r#"
            SELECT state, district, commodity, arrival_date, market, min_price, max_price, modal_price
            FROM price_history
            WHERE state = ? AND district = ? AND commodity = ? AND arrival_date > ?
            ORDER BY arrival_date ASC, id ASC
            "#,
        )
        .bind(state)
        .bind(district)
        .bind(commodity)
        .bind(since)
        .fetch_all(self.pool())
        .await?;

        Ok(rows.into_iter().map(PriceObservation::from).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn obs(day: u32, market: &str, modal: f64) -> PriceObservation {
        PriceObservation {
            state: "Maharashtra".into(),
            district: "Nashik".into(),
            commodity: "Onion".into(),
            arrival_date: NaiveDate::from_ymd_opt(2024, 5, day).unwrap(),
            market: market.into(),
            min_price: Some(modal - 200.0),
            max_price: Some(modal + 200.0),
            modal_price: modal,
        }
    }

    #[tokio::test]
    async fn test_upsert_replaces_same_key() {
        let store = AgriStore::new("sqlite::memory:").await.unwrap();
        store
            .upsert_observations(&[obs(1, "Lasalgaon", 1500.0), obs(1, "Pimpalgaon", 1450.0)])
            .await
            .unwrap();
        store.upsert_observations(&[obs(1, "Lasalgaon", 1600.0)]).await.unwrap();

        assert_eq!(store.stats().await.unwrap().price_records_count, 2);

        let since = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let rows = store.load_observations("Maharashtra", "Nashik", "Onion", since).await.unwrap();
        let lasalgaon = rows.iter().find(|o| o.market == "Lasalgaon").unwrap();
        assert_eq!(lasalgaon.modal_price, 1600.0);
    }

    #[tokio::test]
    async fn test_load_filters_and_orders() {
        let store = AgriStore::new("sqlite::memory:").await.unwrap();
        let mut other = obs(2, "Pune", 900.0);
        other.commodity = "Tomato".into();
        store
            .upsert_observations(&[obs(3, "A", 3.0), obs(1, "A", 1.0), obs(2, "A", 2.0), other])
            .await
            .unwrap();

        let since = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap();
        let rows = store.load_observations("Maharashtra", "Nashik", "Onion", since).await.unwrap();
        let prices: Vec<f64> = rows.iter().map(|o| o.modal_price).collect();
        assert_eq!(prices, vec![2.0, 3.0]);
    }
}
