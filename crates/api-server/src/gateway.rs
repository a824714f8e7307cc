//! Price records through the response cache, with graceful degradation.

use agri_core::{PriceObservation, PriceQuery, PriceRecordSource, RawPriceRecord};
use agri_store::{fingerprint, AgriStore};
use chrono::{Duration, Local};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::task::JoinHandle;

/// Shape of a cached feed page
#[derive(Debug, Default, Serialize, Deserialize)]
struct CachedPage {
    #[serde(default)]
    records: Vec<RawPriceRecord>,
}

#[derive(Clone)]
pub struct PriceGateway {
    source: Arc<dyn PriceRecordSource>,
    store: AgriStore,
    cache_ttl: Duration,
}

impl PriceGateway {
    pub fn new(source: Arc<dyn PriceRecordSource>, store: AgriStore, cache_ttl: Duration) -> Self {
        Self { source, store, cache_ttl }
    }

    /// Records for `query`, served from the cache when fresh.
    ///
    /// Upstream failures and cache errors never surface: the caller gets whatever could
    /// be found, possibly nothing.
    pub async fn fetch(&self, query: &PriceQuery) -> Vec<RawPriceRecord> {
        let key = fingerprint(&query.to_params());

        match self.store.get_api_response(&key).await {
            Ok(Some(value)) => match serde_json::from_value::<CachedPage>(value) {
                Ok(page) => {
                    tracing::debug!("Cache hit {} ({} records)", &key[..8], page.records.len());
                    return page.records;
                }
                Err(e) => tracing::warn!("Discarding unreadable cache entry {}: {}", &key[..8], e),
            },
            Ok(None) => tracing::debug!("Cache miss {}", &key[..8]),
            Err(e) => tracing::warn!("Cache read failed, treating as miss: {}", e),
        }

        let records = match self.source.fetch_records(query).await {
            Ok(records) => records,
            Err(e) => {
                tracing::warn!("{} unavailable, continuing without data: {}", self.source.source_name(), e);
                return Vec::new();
            }
        };

        if !records.is_empty() {
            let page = CachedPage { records };
            match serde_json::to_value(&page) {
                Ok(value) => {
                    if let Err(e) = self.store.put_api_response(&key, &value, self.cache_ttl).await {
                        tracing::warn!("Cache write failed: {}", e);
                    }
                }
                Err(e) => tracing::warn!("Could not serialise page for cache: {}", e),
            }
            return page.records;
        }

        records
    }
}

/// Persist fetched records as price history without holding up the request.
///
/// Records that do not type-check as observations are skipped. Failures are logged only.
pub fn persist_history_in_background(
    store: AgriStore,
    records: Vec<RawPriceRecord>,
    state: String,
    district: String,
    commodity: String,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let observations: Vec<PriceObservation> = records
            .iter()
            .filter_map(|r| PriceObservation::from_raw(r, &state, &district, &commodity))
            .collect();

        match store.upsert_observations(&observations).await {
            Ok(saved) => tracing::info!(
                "Saved {} of {} records to price history ({} / {})",
                saved,
                records.len(),
                district,
                commodity
            ),
            Err(e) => tracing::warn!("Price history save failed for {} / {}: {}", district, commodity, e),
        }
    })
}

/// Stored history within the lookback window, as feed-shaped records
pub async fn load_history_records(
    store: &AgriStore,
    state: &str,
    district: &str,
    commodity: &str,
    window_days: i64,
) -> Vec<RawPriceRecord> {
    let since = Local::now().date_naive() - Duration::days(window_days);
    match store.load_observations(state, district, commodity, since).await {
        Ok(observations) => observations.iter().map(RawPriceRecord::from_observation).collect(),
        Err(e) => {
            tracing::warn!("Price history read failed: {}", e);
            Vec::new()
        }
    }
}
