//! Seasonal ARIMA estimation by two-stage least squares (Hannan-Rissanen).
//!
//! The series is differenced once. A long autoregression gives a proxy for the
//! innovations; the final model then regresses each difference on its own lags and on
//! lagged innovations. Seasonal terms are extra lags at multiples of the period, so
//! `(p,1,q)(P,0,Q)_s` is estimated as a subset ARMA on the differences. The normal
//! equations are solved by Cholesky with a small ridge term so that perfectly
//! collinear inputs (a straight-line series) still resolve.

use agri_core::ModelVariant;
use nalgebra::{DMatrix, DVector};

use crate::error::FitError;

/// Extra rows required beyond the parameter count
const MIN_EXTRA_ROWS: usize = 5;
const MAX_LONG_AR: usize = 24;
/// Relative ridge applied to the diagonal of X'X
const RIDGE: f64 = 1e-6;
/// A forecast step further than this multiple of the largest observed level diverged
const DIVERGENCE_FACTOR: f64 = 100.0;

/// Orders of a (p,1,q)(P,0,Q)_s model
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModelOrder {
    pub p: usize,
    pub q: usize,
    pub seasonal_p: usize,
    pub seasonal_q: usize,
    pub period: usize,
}

impl ModelOrder {
    /// (5,1,2)(1,0,1)_7
    pub const SEASONAL_WEEKLY: ModelOrder = ModelOrder { p: 5, q: 2, seasonal_p: 1, seasonal_q: 1, period: 7 };
    /// (5,1,2)
    pub const NON_SEASONAL: ModelOrder = ModelOrder { p: 5, q: 2, seasonal_p: 0, seasonal_q: 0, period: 0 };

    fn lags(order: usize, seasonal: usize, period: usize) -> Vec<usize> {
        let mut lags: Vec<usize> = (1..=order).collect();
        for k in 1..=seasonal {
            let lag = k * period;
            if lag > 0 && !lags.contains(&lag) {
                lags.push(lag);
            }
        }
        lags
    }

    pub fn ar_lags(&self) -> Vec<usize> {
        Self::lags(self.p, self.seasonal_p, self.period)
    }

    pub fn ma_lags(&self) -> Vec<usize> {
        Self::lags(self.q, self.seasonal_q, self.period)
    }
}

/// One entry of the fallback list
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModelSpec {
    pub variant: ModelVariant,
    pub order: ModelOrder,
}

impl ModelSpec {
    pub const SARIMA: ModelSpec = ModelSpec { variant: ModelVariant::Sarima, order: ModelOrder::SEASONAL_WEEKLY };
    pub const ARIMA: ModelSpec = ModelSpec { variant: ModelVariant::Arima, order: ModelOrder::NON_SEASONAL };

    /// Tried in order, first successful fit wins
    pub fn default_strategies() -> Vec<ModelSpec> {
        vec![Self::SARIMA, Self::ARIMA]
    }

    pub fn fit(&self, levels: &[f64]) -> Result<FittedModel, FitError> {
        FittedModel::fit(*self, levels)
    }
}

#[derive(Debug, Clone)]
pub struct FittedModel {
    pub spec: ModelSpec,
    /// (lag, coefficient)
    pub ar: Vec<(usize, f64)>,
    pub ma: Vec<(usize, f64)>,
    diffs: Vec<f64>,
    residuals: Vec<f64>,
    last_level: f64,
    scale: f64,
}

impl FittedModel {
    pub fn fit(spec: ModelSpec, levels: &[f64]) -> Result<Self, FitError> {
        let ar_lags = spec.order.ar_lags();
        let ma_lags = spec.order.ma_lags();
        let params = ar_lags.len() + ma_lags.len();
        let max_lag = ar_lags.iter().chain(ma_lags.iter()).copied().max().unwrap_or(0);

        let last_level = match levels.last() {
            Some(&level) => level,
            None => return Err(FitError::TooFewObservations { rows: 0, params }),
        };
        let diffs = difference(levels);
        let n = diffs.len();

        // Stage 1: long autoregression for an innovation proxy
        let long_order = (n / 4).max(max_lag + 1).min(MAX_LONG_AR);
        let stage1_rows = n.saturating_sub(long_order);
        if stage1_rows < long_order + MIN_EXTRA_ROWS {
            return Err(FitError::TooFewObservations { rows: stage1_rows, params: long_order });
        }
        let long_lags: Vec<usize> = (1..=long_order).collect();
        let x1 = DMatrix::from_fn(stage1_rows, long_order, |r, c| diffs[r + long_order - long_lags[c]]);
        let y1 = DVector::from_fn(stage1_rows, |r, _| diffs[r + long_order]);
        let phi_long = solve_ridge(&x1, &y1)?;

        let mut innovations = vec![0.0; n];
        for t in long_order..n {
            let fitted: f64 = long_lags.iter().zip(phi_long.iter()).map(|(&l, c)| c * diffs[t - l]).sum();
            innovations[t] = diffs[t] - fitted;
        }

        // Stage 2: regress on own lags and lagged innovations
        let start = long_order + max_lag;
        let rows = n.saturating_sub(start);
        if rows < params + MIN_EXTRA_ROWS {
            return Err(FitError::TooFewObservations { rows, params });
        }
        let x2 = DMatrix::from_fn(rows, params, |r, c| {
            let t = r + start;
            if c < ar_lags.len() {
                diffs[t - ar_lags[c]]
            } else {
                innovations[t - ma_lags[c - ar_lags.len()]]
            }
        });
        let y2 = DVector::from_fn(rows, |r, _| diffs[r + start]);
        let coef = solve_ridge(&x2, &y2)?;

        let ar: Vec<(usize, f64)> = ar_lags.iter().copied().zip(coef.iter().copied()).collect();
        let ma: Vec<(usize, f64)> = ma_lags
            .iter()
            .copied()
            .zip(coef.iter().skip(ar_lags.len()).copied())
            .collect();

        let residuals = css_residuals(&diffs, &ar, &ma);
        let scale = levels.iter().fold(0.0_f64, |m, v| m.max(v.abs())).max(1.0);

        tracing::debug!(
            "{} fit on {} differences: ar={:?} ma={:?}",
            spec.variant,
            n,
            ar,
            ma
        );

        Ok(Self { spec, ar, ma, diffs, residuals, last_level, scale })
    }

    /// Point forecast of the next `steps` levels, future innovations set to zero
    pub fn forecast(&self, steps: usize) -> Result<Vec<f64>, FitError> {
        let n = self.diffs.len();
        let mut diffs = self.diffs.clone();
        let mut residuals = self.residuals.clone();
        diffs.reserve(steps);
        residuals.resize(n + steps, 0.0);

        let mut level = self.last_level;
        let mut path = Vec::with_capacity(steps);
        for step in 0..steps {
            let t = n + step;
            let next = lagged_sum(&diffs, t, &self.ar) + lagged_sum(&residuals, t, &self.ma);
            diffs.push(next);
            level += next;
            if !level.is_finite() || level.abs() > self.scale * DIVERGENCE_FACTOR {
                return Err(FitError::Diverged { step });
            }
            path.push(level);
        }
        Ok(path)
    }
}

fn difference(levels: &[f64]) -> Vec<f64> {
    levels.windows(2).map(|w| w[1] - w[0]).collect()
}

/// sum of coef * values[t - lag], treating pre-sample values as zero
fn lagged_sum(values: &[f64], t: usize, terms: &[(usize, f64)]) -> f64 {
    terms
        .iter()
        .filter(|(lag, _)| *lag <= t)
        .map(|(lag, coef)| coef * values[t - lag])
        .sum()
}

/// Conditional-sum-of-squares residuals of the fitted ARMA on the differences
fn css_residuals(diffs: &[f64], ar: &[(usize, f64)], ma: &[(usize, f64)]) -> Vec<f64> {
    let mut residuals = vec![0.0; diffs.len()];
    for t in 0..diffs.len() {
        residuals[t] = diffs[t] - lagged_sum(diffs, t, ar) - lagged_sum(&residuals, t, ma);
    }
    residuals
}

fn solve_ridge(x: &DMatrix<f64>, y: &DVector<f64>) -> Result<DVector<f64>, FitError> {
    let xt = x.transpose();
    let mut xtx = &xt * x;
    let xty = &xt * y;

    let p = xtx.nrows().max(1) as f64;
    let lambda = (RIDGE * xtx.trace() / p).max(f64::EPSILON);
    for i in 0..xtx.nrows() {
        xtx[(i, i)] += lambda;
    }

    let chol = xtx.cholesky().ok_or(FitError::Singular)?;
    let beta = chol.solve(&xty);
    if beta.iter().any(|b| !b.is_finite()) {
        return Err(FitError::NonFinite);
    }
    Ok(beta)
}
