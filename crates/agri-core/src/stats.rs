//! Small statistics helpers shared by the market summaries and the forecaster.

use serde::{Deserialize, Serialize};

use crate::types::{parse_price, RawPriceRecord};

/// Compute the mean of a data slice.
pub fn mean(data: &[f64]) -> f64 {
    if data.is_empty() {
        return 0.0;
    }
    data.iter().sum::<f64>() / data.len() as f64
}

/// Day-over-day fractional changes. A zero previous value yields no entry.
pub fn pct_changes(prices: &[f64]) -> Vec<f64> {
    prices
        .windows(2)
        .filter(|w| w[0] != 0.0)
        .map(|w| (w[1] - w[0]) / w[0])
        .collect()
}

/// Round to a fixed number of decimal places.
pub fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}

/// Average min / max / modal prices over a set of records, rounded to 2 places.
/// Non-numeric fields are skipped; a column with no numbers averages to `None`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceAverages {
    pub min_avg: Option<f64>,
    pub max_avg: Option<f64>,
    pub modal_avg: Option<f64>,
}

pub fn price_averages(records: &[RawPriceRecord]) -> PriceAverages {
    let column_mean = |field: fn(&RawPriceRecord) -> Option<&String>| -> Option<f64> {
        let values: Vec<f64> = records
            .iter()
            .filter_map(|r| field(r).and_then(|s| parse_price(s)))
            .collect();
        if values.is_empty() {
            None
        } else {
            Some(round_to(mean(&values), 2))
        }
    };

    PriceAverages {
        min_avg: column_mean(|r| r.min_price.as_ref()),
        max_avg: column_mean(|r| r.max_price.as_ref()),
        modal_avg: column_mean(|r| r.modal_price.as_ref()),
    }
}
