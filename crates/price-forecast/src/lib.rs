pub mod engine;
pub mod error;
pub mod sarima;
pub mod series;
pub mod variation;

pub use engine::{historical_volatility, recent_trend, ForecastEngine};
pub use error::{FitError, ForecastError, ForecastResult};
pub use sarima::{FittedModel, ModelOrder, ModelSpec};
pub use series::{
    prepare, prepare_at, DiscardReason, Discarded, Preparation, PriceSeries, MIN_SERIES_LEN, WINDOW_DAYS,
};
