use agri_core::ModelVariant;
use chrono::NaiveDate;
use thiserror::Error;

/// Why a single model variant could not be estimated
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FitError {
    #[error("{rows} usable rows for {params} parameters")]
    TooFewObservations { rows: usize, params: usize },

    #[error("normal equations are singular")]
    Singular,

    #[error("non-finite coefficient estimates")]
    NonFinite,

    #[error("forecast diverged at step {step}")]
    Diverged { step: usize },
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ForecastError {
    #[error("Insufficient historical data: {found} usable points, need at least {required}")]
    InsufficientData { found: usize, required: usize },

    #[error("Target date {target} is not after the last observation ({last})")]
    NonPositiveHorizon { target: NaiveDate, last: NaiveDate },

    #[error("Forecasting model failed to generate predictions ({})", describe_failures(.failures))]
    ModelFit { failures: Vec<(ModelVariant, FitError)> },

    #[error("No prediction available for {0}")]
    PredictionUnavailable(NaiveDate),
}

fn describe_failures(failures: &[(ModelVariant, FitError)]) -> String {
    failures
        .iter()
        .map(|(variant, err)| format!("{}: {}", variant, err))
        .collect::<Vec<_>>()
        .join("; ")
}

pub type ForecastResult<T> = Result<T, ForecastError>;
