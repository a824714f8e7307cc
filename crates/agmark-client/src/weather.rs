//! OpenWeather client: current conditions and a per-day summary of the 5-day forecast.

use agri_core::stats::{mean, round_to};
use agri_core::AgriError;
use chrono::{DateTime, NaiveDate, TimeZone};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "https://api.openweathermap.org/data/2.5";

/// Number of days summarised from the 3-hourly forecast
const FORECAST_DAYS: usize = 5;

/// Where to look up the weather. Pincodes are resolved within India.
#[derive(Debug, Clone, PartialEq)]
pub enum WeatherLocation {
    City(String),
    Pincode(String),
}

impl WeatherLocation {
    /// Build from the `type` / `location` pair sent by the frontend.
    /// Anything other than `city` is treated as a pincode.
    pub fn from_request(kind: &str, location: &str) -> Self {
        if kind.eq_ignore_ascii_case("city") {
            WeatherLocation::City(location.trim().to_string())
        } else {
            WeatherLocation::Pincode(location.trim().to_string())
        }
    }

    fn query(&self) -> (&'static str, String) {
        match self {
            WeatherLocation::City(city) => ("q", city.clone()),
            WeatherLocation::Pincode(pin) => ("zip", format!("{},IN", pin)),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ForecastEntry {
    pub dt: i64,
    pub main: EntryMain,
    pub wind: EntryWind,
    #[serde(default)]
    pub weather: Vec<EntryCondition>,
    /// Probability of precipitation, 0..1
    #[serde(default)]
    pub pop: Option<f64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EntryMain {
    pub temp: f64,
    pub humidity: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EntryWind {
    pub speed: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EntryCondition {
    pub description: String,
}

#[derive(Debug, Deserialize)]
struct ForecastResponse {
    #[serde(default)]
    list: Vec<ForecastEntry>,
}

/// One day of the summarised forecast
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyWeather {
    pub date: NaiveDate,
    pub min_temp: f64,
    pub max_temp: f64,
    pub humidity: f64,
    /// km/h
    pub wind: f64,
    /// percent
    pub rain_chance: f64,
    pub condition: String,
}

#[derive(Clone)]
pub struct WeatherClient {
    api_key: String,
    base_url: String,
    client: Client,
}

impl WeatherClient {
    pub fn new(api_key: String) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .unwrap_or_else(|_| Client::new());

        Self {
            api_key,
            base_url: DEFAULT_BASE_URL.to_string(),
            client,
        }
    }

    async fn get(&self, endpoint: &str, location: &WeatherLocation) -> Result<reqwest::Response, AgriError> {
        let (key, value) = location.query();
        let response = self
            .client
            .get(format!("{}/{}", self.base_url, endpoint))
            .query(&[(key, value.as_str()), ("appid", self.api_key.as_str()), ("units", "metric")])
            .send()
            .await
            .map_err(|e| AgriError::ApiError(e.to_string()))?;

        if !response.status().is_success() {
            tracing::debug!("Weather lookup for {:?} failed: HTTP {}", location, response.status());
            return Err(AgriError::ApiError("Location not found".to_string()));
        }
        Ok(response)
    }

    /// Current conditions, passed through as returned by the API
    pub async fn current(&self, location: &WeatherLocation) -> Result<serde_json::Value, AgriError> {
        self.get("weather", location)
            .await?
            .json()
            .await
            .map_err(|e| AgriError::ApiError(e.to_string()))
    }

    /// Five-day forecast summarised per local calendar day
    pub async fn daily_forecast(&self, location: &WeatherLocation) -> Result<Vec<DailyWeather>, AgriError> {
        let forecast: ForecastResponse = self
            .get("forecast", location)
            .await?
            .json()
            .await
            .map_err(|e| AgriError::ApiError(e.to_string()))?;

        Ok(aggregate_daily(&forecast.list, &chrono::Local, FORECAST_DAYS))
    }
}

/// Group 3-hourly entries by calendar day in `tz`, keeping the first `days` days in order.
pub fn aggregate_daily<Tz: TimeZone>(entries: &[ForecastEntry], tz: &Tz, days: usize) -> Vec<DailyWeather> {
    struct DayAccumulator {
        date: NaiveDate,
        temps: Vec<f64>,
        humidity: Vec<f64>,
        wind: Vec<f64>,
        rain: Vec<f64>,
        condition: String,
    }

    let mut grouped: Vec<DayAccumulator> = Vec::new();

    for entry in entries {
        let Some(utc) = DateTime::from_timestamp(entry.dt, 0) else {
            continue;
        };
        let date = utc.with_timezone(tz).date_naive();

        let idx = match grouped.iter().position(|d| d.date == date) {
            Some(idx) => idx,
            None => {
                grouped.push(DayAccumulator {
                    date,
                    temps: Vec::new(),
                    humidity: Vec::new(),
                    wind: Vec::new(),
                    rain: Vec::new(),
                    condition: entry
                        .weather
                        .first()
                        .map(|w| w.description.clone())
                        .unwrap_or_default(),
                });
                grouped.len() - 1
            }
        };

        let day = &mut grouped[idx];
        day.temps.push(entry.main.temp);
        day.humidity.push(entry.main.humidity);
        day.wind.push(entry.wind.speed);
        day.rain.push(entry.pop.unwrap_or(0.0) * 100.0);
    }

    grouped
        .into_iter()
        .take(days)
        .map(|day| DailyWeather {
            date: day.date,
            min_temp: round_to(day.temps.iter().cloned().fold(f64::INFINITY, f64::min), 1),
            max_temp: round_to(day.temps.iter().cloned().fold(f64::NEG_INFINITY, f64::max), 1),
            humidity: round_to(mean(&day.humidity), 1),
            // m/s to km/h
            wind: round_to(mean(&day.wind) * 3.6, 1),
            rain_chance: round_to(mean(&day.rain), 1),
            condition: day.condition,
        })
        .collect()
}
