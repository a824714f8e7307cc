use agri_core::{AgriError, PriceQuery, PriceRecordSource, RawPriceRecord};
use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, VecDeque};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

pub mod news;
pub mod videos;
pub mod weather;

pub use news::{NewsArticle, NewsClient};
pub use videos::{VideoClient, VideoItem};
pub use weather::{DailyWeather, WeatherClient, WeatherLocation};

/// data.gov.in "Variety-wise Daily Market Prices" resource
pub const DEFAULT_BASE_URL: &str =
    "https://api.data.gov.in/resource/35985678-0d79-46b4-9ed6-6f13308a1d24";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// Sliding-window rate limiter: at most `max_requests` per `window` duration.
#[derive(Clone)]
struct RateLimiter {
    timestamps: Arc<Mutex<VecDeque<Instant>>>,
    max_requests: usize,
    window: Duration,
}

impl RateLimiter {
    fn new(max_requests: usize, window: Duration) -> Self {
        Self {
            timestamps: Arc::new(Mutex::new(VecDeque::new())),
            max_requests: max_requests.max(1),
            window,
        }
    }

    async fn acquire(&self) {
        loop {
            let mut ts = self.timestamps.lock().await;
            let now = Instant::now();

            // Remove timestamps outside the window
            while let Some(&front) = ts.front() {
                if now.duration_since(front) >= self.window {
                    ts.pop_front();
                } else {
                    break;
                }
            }

            if ts.len() < self.max_requests {
                ts.push_back(now);
                return;
            }

            // Wait until the oldest request falls out of the window
            let sleep_dur = match ts.front() {
                Some(&oldest) => (oldest + self.window).saturating_duration_since(now) + Duration::from_millis(50),
                None => Duration::from_millis(50),
            };
            drop(ts);
            tracing::debug!("Rate limiter: waiting {:.1}s for price feed slot", sleep_dur.as_secs_f64());
            tokio::time::sleep(sleep_dur).await;
        }
    }
}

#[derive(Debug, Deserialize, Serialize)]
struct FeedResponse {
    #[serde(default)]
    records: Vec<RawPriceRecord>,
}

/// Client for the government mandi price feed
#[derive(Clone)]
pub struct AgmarkClient {
    api_key: String,
    base_url: String,
    client: Client,
    rate_limiter: RateLimiter,
}

impl AgmarkClient {
    pub fn new(api_key: String, base_url: String, requests_per_minute: usize) -> Self {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .unwrap_or_else(|_| Client::new());

        Self {
            api_key,
            base_url,
            client,
            rate_limiter: RateLimiter::new(requests_per_minute, Duration::from_secs(60)),
        }
    }

    /// Send a request with rate limiting and automatic 429 retry.
    async fn send_request(&self, builder: reqwest::RequestBuilder) -> Result<reqwest::Response, AgriError> {
        let request = builder.build().map_err(|e| AgriError::ApiError(e.to_string()))?;

        for attempt in 0..3u32 {
            self.rate_limiter.acquire().await;
            let req_clone = request
                .try_clone()
                .ok_or_else(|| AgriError::ApiError("Cannot clone request".to_string()))?;
            let response = self
                .client
                .execute(req_clone)
                .await
                .map_err(|e| AgriError::ApiError(e.to_string()))?;

            if response.status().as_u16() != 429 {
                return Ok(response);
            }

            let wait_secs = 5u64;
            tracing::warn!("Price feed 429 rate limited, waiting {}s before retry {}/3", wait_secs, attempt + 1);
            tokio::time::sleep(Duration::from_secs(wait_secs)).await;
        }

        Err(AgriError::ApiError("Rate limited by price feed after 3 retries".to_string()))
    }

    /// Fetch price records matching `query`
    pub async fn get_records(&self, query: &PriceQuery) -> Result<Vec<RawPriceRecord>, AgriError> {
        let mut params = query.to_params();
        params.push(("api-key".to_string(), self.api_key.clone()));

        let response = self
            .send_request(self.client.get(&self.base_url).query(&params))
            .await?;

        if !response.status().is_success() {
            return Err(AgriError::ApiError(format!(
                "HTTP {}: {}",
                response.status(),
                response.text().await.unwrap_or_default()
            )));
        }

        let feed: FeedResponse = response
            .json()
            .await
            .map_err(|e| AgriError::ApiError(e.to_string()))?;

        tracing::debug!(
            "Price feed returned {} records (district={:?}, commodity={:?}, date={:?})",
            feed.records.len(),
            query.district,
            query.commodity,
            query.arrival_date
        );

        Ok(feed.records)
    }
}

#[async_trait]
impl PriceRecordSource for AgmarkClient {
    async fn fetch_records(&self, query: &PriceQuery) -> Result<Vec<RawPriceRecord>, AgriError> {
        self.get_records(query).await
    }

    fn source_name(&self) -> &'static str {
        "agmarknet"
    }
}

/// The `n` most recent distinct arrival dates, newest first. Unparseable dates are ignored.
pub fn recent_arrival_dates(records: &[RawPriceRecord], n: usize) -> Vec<NaiveDate> {
    let dates: BTreeSet<NaiveDate> = records.iter().filter_map(|r| r.parsed_date()).collect();
    dates.into_iter().rev().take(n).collect()
}

/// Sorted distinct non-empty values of one record field
pub fn distinct_values(records: &[RawPriceRecord], field: fn(&RawPriceRecord) -> Option<&str>) -> Vec<String> {
    records
        .iter()
        .filter_map(field)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}
