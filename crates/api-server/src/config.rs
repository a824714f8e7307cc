use anyhow::{Context, Result};
use chrono::Duration;
use std::env;

/// Runtime configuration, read once at startup and shared through `AppState`
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub bind_addr: String,
    /// Region every market and forecast query is scoped to
    pub default_state: String,

    // Mandi price feed
    pub agmark_api_key: String,
    pub agmark_api_url: String,
    pub agmark_rate_limit: usize,

    // Optional services; a missing key disables the feature
    pub weather_api_key: Option<String>,
    pub news_api_key: Option<String>,
    pub youtube_api_key: Option<String>,
    pub gemini_api_key: Option<String>,
    pub gemini_model: String,

    pub api_cache_ttl: Duration,
    pub forecast_cache_ttl: Duration,
    /// Fixes the forecast variation stream when set
    pub forecast_seed: Option<u64>,

    /// Allowed CORS origins, empty means any
    pub cors_origins: Vec<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database_url: "sqlite:agri_cache.db".to_string(),
            bind_addr: "0.0.0.0:5000".to_string(),
            default_state: "Maharashtra".to_string(),
            agmark_api_key: String::new(),
            agmark_api_url: agmark_client::DEFAULT_BASE_URL.to_string(),
            agmark_rate_limit: 60,
            weather_api_key: None,
            news_api_key: None,
            youtube_api_key: None,
            gemini_api_key: None,
            gemini_model: assistant_client::DEFAULT_MODEL.to_string(),
            api_cache_ttl: Duration::hours(24),
            forecast_cache_ttl: Duration::hours(12),
            forecast_seed: None,
            cors_origins: Vec::new(),
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();

        let config = Self {
            database_url: env::var("DATABASE_URL").unwrap_or(defaults.database_url),
            bind_addr: env::var("BIND_ADDR").unwrap_or(defaults.bind_addr),
            default_state: env::var("DEFAULT_STATE").unwrap_or(defaults.default_state),

            agmark_api_key: optional_key("AGMARK_API_KEY").context("AGMARK_API_KEY not set")?,
            agmark_api_url: env::var("AGMARK_API_URL").unwrap_or(defaults.agmark_api_url),
            agmark_rate_limit: env::var("AGMARK_RATE_LIMIT")
                .unwrap_or_else(|_| "60".to_string())
                .parse()
                .context("AGMARK_RATE_LIMIT must be a whole number of requests per minute")?,

            weather_api_key: optional_key("WEATHER_API_KEY"),
            news_api_key: optional_key("NEWS_API_KEY"),
            youtube_api_key: optional_key("YOUTUBE_API_KEY"),
            gemini_api_key: optional_key("GEMINI_API_KEY"),
            gemini_model: env::var("GEMINI_MODEL").unwrap_or(defaults.gemini_model),

            api_cache_ttl: Duration::hours(
                env::var("API_CACHE_HOURS")
                    .unwrap_or_else(|_| "24".to_string())
                    .parse()
                    .context("API_CACHE_HOURS must be a whole number")?,
            ),
            forecast_cache_ttl: Duration::hours(
                env::var("FORECAST_CACHE_HOURS")
                    .unwrap_or_else(|_| "12".to_string())
                    .parse()
                    .context("FORECAST_CACHE_HOURS must be a whole number")?,
            ),
            forecast_seed: match optional_key("FORECAST_SEED") {
                Some(seed) => Some(seed.parse().context("FORECAST_SEED must be an unsigned integer")?),
                None => None,
            },

            cors_origins: env::var("CORS_ORIGINS")
                .map(|v| {
                    v.split(',')
                        .map(|s| s.trim().to_string())
                        .filter(|s| !s.is_empty())
                        .collect()
                })
                .unwrap_or_default(),
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.agmark_rate_limit == 0 {
            anyhow::bail!("AGMARK_RATE_LIMIT must be at least 1");
        }
        if self.api_cache_ttl <= Duration::zero() || self.forecast_cache_ttl <= Duration::zero() {
            anyhow::bail!("cache lifetimes must be positive");
        }
        Ok(())
    }
}

/// Non-empty value of an environment variable
fn optional_key(name: &str) -> Option<String> {
    env::var(name).ok().map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}
