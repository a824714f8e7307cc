//! Turns raw feed records into a clean, date-ordered modal price series.
//!
//! Records are never rejected as a whole: each bad record is set aside with the reason
//! it was dropped, and the caller decides what (if anything) to report.

use agri_core::{parse_arrival_date, PricePoint, RawPriceRecord};
use chrono::{Duration, Local, NaiveDate};
use serde::Serialize;

use crate::error::{ForecastError, ForecastResult};

/// Minimum number of points a series needs before a model is fitted
pub const MIN_SERIES_LEN: usize = 30;

/// Lookback window, in days, counted back from the preparation date
pub const WINDOW_DAYS: i64 = 3650;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DiscardReason {
    MissingDate,
    UnparseableDate,
    NonNumericModalPrice,
    /// Zero, negative or non-finite
    InvalidModalPrice,
    OutsideWindow,
}

/// A dropped record, by its position in the input
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Discarded {
    pub index: usize,
    pub reason: DiscardReason,
}

/// Output of the preparer: what was kept (sorted) and what was dropped (by input index)
#[derive(Debug, Clone, PartialEq)]
pub struct Preparation {
    pub kept: Vec<PricePoint>,
    pub discarded: Vec<Discarded>,
}

impl Preparation {
    pub fn count(&self, reason: DiscardReason) -> usize {
        self.discarded.iter().filter(|d| d.reason == reason).count()
    }

    pub fn into_series(self) -> ForecastResult<PriceSeries> {
        PriceSeries::new(self.kept)
    }
}

/// Date-ordered modal prices with at least [`MIN_SERIES_LEN`] points.
///
/// Several markets can report on the same day; those points are all kept, in feed order.
#[derive(Debug, Clone, PartialEq)]
pub struct PriceSeries {
    points: Vec<PricePoint>,
}

impl PriceSeries {
    pub fn new(points: Vec<PricePoint>) -> ForecastResult<Self> {
        if points.len() < MIN_SERIES_LEN {
            return Err(ForecastError::InsufficientData {
                found: points.len(),
                required: MIN_SERIES_LEN,
            });
        }

        let mut points = points;
        if !points.windows(2).all(|w| w[0].date <= w[1].date) {
            points.sort_by_key(|p| p.date);
        }
        Ok(Self { points })
    }

    pub fn points(&self) -> &[PricePoint] {
        &self.points
    }

    pub fn prices(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.price).collect()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Most recent point. A series is never empty.
    pub fn last(&self) -> PricePoint {
        self.points[self.points.len() - 1]
    }

    pub fn into_points(self) -> Vec<PricePoint> {
        self.points
    }
}

/// Prepare records against today's local date
pub fn prepare(records: &[RawPriceRecord]) -> Preparation {
    prepare_at(records, Local::now().date_naive())
}

/// Prepare records as if run on `today`.
///
/// A record is kept when its date parses as `dd/mm/yyyy`, its modal price is a finite
/// positive number and its date is strictly later than `today - WINDOW_DAYS`.
pub fn prepare_at(records: &[RawPriceRecord], today: NaiveDate) -> Preparation {
    let cutoff = today - Duration::days(WINDOW_DAYS);
    let mut kept = Vec::with_capacity(records.len());
    let mut discarded = Vec::new();

    for (index, record) in records.iter().enumerate() {
        match classify(record, cutoff) {
            Ok(point) => kept.push(point),
            Err(reason) => discarded.push(Discarded { index, reason }),
        }
    }

    // stable: same-day points stay in feed order
    kept.sort_by_key(|p| p.date);

    Preparation { kept, discarded }
}

fn classify(record: &RawPriceRecord, cutoff: NaiveDate) -> Result<PricePoint, DiscardReason> {
    let raw_date = match record.arrival_date.as_deref().map(str::trim) {
        None | Some("") => return Err(DiscardReason::MissingDate),
        Some(raw) => raw,
    };
    let date = parse_arrival_date(raw_date).ok_or(DiscardReason::UnparseableDate)?;

    let price = record
        .modal_price
        .as_deref()
        .and_then(|raw| raw.trim().parse::<f64>().ok())
        .ok_or(DiscardReason::NonNumericModalPrice)?;
    if !price.is_finite() || price <= 0.0 {
        return Err(DiscardReason::InvalidModalPrice);
    }

    if date <= cutoff {
        return Err(DiscardReason::OutsideWindow);
    }

    Ok(PricePoint { date, price })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(date: Option<&str>, modal: Option<&str>) -> RawPriceRecord {
        RawPriceRecord {
            arrival_date: date.map(str::to_string),
            modal_price: modal.map(str::to_string),
            ..Default::default()
        }
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 30).unwrap()
    }

    #[test]
    fn test_discard_reasons() {
        let records = vec![
            record(Some("01/06/2024"), Some("1500")),
            record(None, Some("1500")),
            record(Some("2024-06-01"), Some("1500")),
            record(Some("02/06/2024"), Some("abc")),
            record(Some("03/06/2024"), Some("0")),
            record(Some("04/06/2024"), Some("-5")),
            record(Some("05/06/2024"), Some("inf")),
            record(Some("01/01/2000"), Some("900")),
            record(Some("06/06/2024"), None),
        ];

        let prep = prepare_at(&records, today());
        assert_eq!(prep.kept.len(), 1);
        assert_eq!(prep.kept.len() + prep.discarded.len(), records.len());
        assert_eq!(prep.count(DiscardReason::MissingDate), 1);
        assert_eq!(prep.count(DiscardReason::UnparseableDate), 1);
        assert_eq!(prep.count(DiscardReason::NonNumericModalPrice), 2);
        assert_eq!(prep.count(DiscardReason::InvalidModalPrice), 3);
        assert_eq!(prep.count(DiscardReason::OutsideWindow), 1);
        assert_eq!(prep.discarded[0], Discarded { index: 1, reason: DiscardReason::MissingDate });
    }

    #[test]
    fn test_window_boundary_is_excluded() {
        let boundary = today() - Duration::days(WINDOW_DAYS);
        let inside = boundary + Duration::days(1);
        let fmt = |d: NaiveDate| d.format("%d/%m/%Y").to_string();

        let records = vec![
            record(Some(fmt(boundary).as_str()), Some("100")),
            record(Some(fmt(inside).as_str()), Some("100")),
        ];
        let prep = prepare_at(&records, today());
        assert_eq!(prep.kept, vec![PricePoint { date: inside, price: 100.0 }]);
        assert_eq!(prep.discarded, vec![Discarded { index: 0, reason: DiscardReason::OutsideWindow }]);
    }

    #[test]
    fn test_sorted_and_same_day_order_kept() {
        let records = vec![
            record(Some("03/06/2024"), Some("300")),
            record(Some("01/06/2024"), Some("100")),
            record(Some("03/06/2024"), Some("310")),
            record(Some("02/06/2024"), Some("200")),
        ];
        let prep = prepare_at(&records, today());
        let prices: Vec<f64> = prep.kept.iter().map(|p| p.price).collect();
        assert_eq!(prices, vec![100.0, 200.0, 300.0, 310.0]);
    }

    #[test]
    fn test_prepare_is_idempotent() {
        let records: Vec<RawPriceRecord> = (1..=28)
            .rev()
            .map(|d| record(Some(format!("{:02}/02/2024", d).as_str()), Some(format!("{}", 1000 + d).as_str())))
            .chain(std::iter::once(record(Some("bad"), Some("1"))))
            .collect();
        assert_eq!(prepare_at(&records, today()), prepare_at(&records, today()));
    }

    #[test]
    fn test_into_series_requires_minimum() {
        let records: Vec<RawPriceRecord> = (1..=10)
            .map(|d| record(Some(format!("{:02}/05/2024", d).as_str()), Some("1000")))
            .collect();
        let err = prepare_at(&records, today()).into_series().unwrap_err();
        assert_eq!(err, ForecastError::InsufficientData { found: 10, required: MIN_SERIES_LEN });

        let records: Vec<RawPriceRecord> = (1..=30)
            .map(|d| record(Some(format!("{:02}/05/2024", d).as_str()), Some("1000")))
            .collect();
        let series = prepare_at(&records, today()).into_series().unwrap();
        assert_eq!(series.len(), 30);
        assert_eq!(series.last().date, NaiveDate::from_ymd_opt(2024, 5, 30).unwrap());
    }
}
