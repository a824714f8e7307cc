use agri_core::{Forecast, ForecastPoint};
use chrono::{Duration, NaiveDate};
use rand::rngs::StdRng;
use rand::SeedableRng;
use statrs::statistics::Statistics;

use crate::error::{ForecastError, ForecastResult};
use crate::sarima::{FittedModel, ModelSpec};
use crate::series::{PriceSeries, MIN_SERIES_LEN};
use crate::variation::{cap_daily_moves, clamp_to_band, synthesize};

/// Observations used for the recent-trend secant
const TREND_WINDOW: usize = 30;

/// Produces day-by-day price paths from a prepared series.
///
/// Without a seed every call draws fresh randomness, so two identical calls usually
/// differ. With a seed each call restarts the same stream.
#[derive(Debug, Clone)]
pub struct ForecastEngine {
    seed: Option<u64>,
    strategies: Vec<ModelSpec>,
}

impl Default for ForecastEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl ForecastEngine {
    pub fn new() -> Self {
        Self {
            seed: None,
            strategies: ModelSpec::default_strategies(),
        }
    }

    pub fn with_seed(seed: u64) -> Self {
        Self {
            seed: Some(seed),
            ..Self::new()
        }
    }

    /// Replace the ordered list of model variants to try
    pub fn with_strategies(mut self, strategies: Vec<ModelSpec>) -> Self {
        self.strategies = strategies;
        self
    }

    pub fn seed(&self) -> Option<u64> {
        self.seed
    }

    pub fn forecast(&self, series: &PriceSeries, target: NaiveDate) -> ForecastResult<Forecast> {
        if series.len() < MIN_SERIES_LEN {
            return Err(ForecastError::InsufficientData {
                found: series.len(),
                required: MIN_SERIES_LEN,
            });
        }

        let last = series.last();
        let horizon = (target - last.date).num_days();
        if horizon <= 0 {
            return Err(ForecastError::NonPositiveHorizon { target, last: last.date });
        }
        let steps = horizon as usize;

        let prices = series.prices();
        let last_price = last.price;
        let volatility = historical_volatility(&prices);
        let trend = recent_trend(&prices);

        tracing::debug!(
            "Forecasting {} days from {} ({} points, last={:.2}, volatility={:.4}, trend={:.2}/day)",
            steps,
            last.date,
            prices.len(),
            last_price,
            volatility,
            trend
        );

        let (model, base) = self.fit_first(&prices, steps)?;

        let mut rng = match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let mut path = synthesize(&base, volatility, trend, &mut rng);
        clamp_to_band(&mut path, last_price);
        cap_daily_moves(&mut path, last_price);

        let forecast: Vec<ForecastPoint> = path
            .into_iter()
            .enumerate()
            .map(|(i, predicted_price)| ForecastPoint {
                date: last.date + Duration::days(i as i64 + 1),
                predicted_price,
            })
            .collect();

        let predicted_price = forecast
            .iter()
            .find(|p| p.date == target)
            .map(|p| p.predicted_price)
            .ok_or(ForecastError::PredictionUnavailable(target))?;

        tracing::info!(
            "{} forecast for {}: {:.2} (last {:.2})",
            model.spec.variant,
            target,
            predicted_price,
            last_price
        );

        Ok(Forecast {
            historical: series.points().to_vec(),
            forecast,
            target_date: target,
            predicted_price,
            current_price: last_price,
            model: model.spec.variant,
        })
    }

    /// Fit each strategy in order and return the first that also forecasts cleanly
    fn fit_first(&self, prices: &[f64], steps: usize) -> ForecastResult<(FittedModel, Vec<f64>)> {
        let mut failures = Vec::with_capacity(self.strategies.len());

        for spec in &self.strategies {
            match spec.fit(prices).and_then(|model| model.forecast(steps).map(|base| (model, base))) {
                Ok(fitted) => return Ok(fitted),
                Err(e) => {
                    tracing::warn!("{} fit failed: {}, trying next model", spec.variant, e);
                    failures.push((spec.variant, e));
                }
            }
        }

        Err(ForecastError::ModelFit { failures })
    }
}

/// Sample standard deviation of day-over-day fractional changes
pub fn historical_volatility(prices: &[f64]) -> f64 {
    let changes = agri_core::stats::pct_changes(prices);
    if changes.len() < 2 {
        return 0.0;
    }
    changes.std_dev()
}

/// Average daily change across the last `TREND_WINDOW` observations
pub fn recent_trend(prices: &[f64]) -> f64 {
    if prices.len() < TREND_WINDOW {
        return 0.0;
    }
    let n = prices.len();
    (prices[n - 1] - prices[n - TREND_WINDOW]) / TREND_WINDOW as f64
}
