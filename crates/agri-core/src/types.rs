use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};

/// Date format used by the mandi price feed (`Arrival_Date`)
pub const ARRIVAL_DATE_FORMAT: &str = "%d/%m/%Y";

/// Default page size requested from the price feed
pub const DEFAULT_PAGE_LIMIT: u32 = 150_000;

/// A price record as returned by the upstream feed.
///
/// Every field is optional and kept as text: the feed mixes strings and numbers and
/// occasionally sends garbage, so typing happens later and record by record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawPriceRecord {
    #[serde(rename = "State", default, deserialize_with = "lenient_string", skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(rename = "District", default, deserialize_with = "lenient_string", skip_serializing_if = "Option::is_none")]
    pub district: Option<String>,
    #[serde(rename = "Market", default, deserialize_with = "lenient_string", skip_serializing_if = "Option::is_none")]
    pub market: Option<String>,
    #[serde(rename = "Commodity", default, deserialize_with = "lenient_string", skip_serializing_if = "Option::is_none")]
    pub commodity: Option<String>,
    #[serde(rename = "Variety", default, deserialize_with = "lenient_string", skip_serializing_if = "Option::is_none")]
    pub variety: Option<String>,
    #[serde(rename = "Grade", default, deserialize_with = "lenient_string", skip_serializing_if = "Option::is_none")]
    pub grade: Option<String>,
    #[serde(rename = "Arrival_Date", default, deserialize_with = "lenient_string", skip_serializing_if = "Option::is_none")]
    pub arrival_date: Option<String>,
    #[serde(rename = "Min_Price", default, deserialize_with = "lenient_string", skip_serializing_if = "Option::is_none")]
    pub min_price: Option<String>,
    #[serde(rename = "Max_Price", default, deserialize_with = "lenient_string", skip_serializing_if = "Option::is_none")]
    pub max_price: Option<String>,
    #[serde(rename = "Modal_Price", default, deserialize_with = "lenient_string", skip_serializing_if = "Option::is_none")]
    pub modal_price: Option<String>,
}

fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::String(s)) => Some(s),
        Some(serde_json::Value::Number(n)) => Some(n.to_string()),
        Some(serde_json::Value::Bool(b)) => Some(b.to_string()),
        _ => None,
    })
}

impl RawPriceRecord {
    /// Parsed arrival date, `None` when missing or not `dd/mm/yyyy`
    pub fn parsed_date(&self) -> Option<NaiveDate> {
        self.arrival_date.as_deref().and_then(parse_arrival_date)
    }

    /// Rebuild a feed-shaped record from a stored observation
    pub fn from_observation(obs: &PriceObservation) -> Self {
        Self {
            state: Some(obs.state.clone()),
            district: Some(obs.district.clone()),
            market: Some(obs.market.clone()),
            commodity: Some(obs.commodity.clone()),
            variety: None,
            grade: None,
            arrival_date: Some(obs.arrival_date.format(ARRIVAL_DATE_FORMAT).to_string()),
            min_price: obs.min_price.map(|p| p.to_string()),
            max_price: obs.max_price.map(|p| p.to_string()),
            modal_price: Some(obs.modal_price.to_string()),
        }
    }
}

/// Parse a feed date (`dd/mm/yyyy`, surrounding whitespace ignored)
pub fn parse_arrival_date(raw: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), ARRIVAL_DATE_FORMAT).ok()
}

/// Parse a feed price. Returns `None` for anything that is not a finite number.
pub fn parse_price(raw: &str) -> Option<f64> {
    raw.trim()
        .parse::<f64>()
        .ok()
        .filter(|p| p.is_finite())
}

/// A single market's prices for a commodity on one day.
///
/// Identified by (state, district, commodity, arrival_date, market).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceObservation {
    pub state: String,
    pub district: String,
    pub commodity: String,
    pub arrival_date: NaiveDate,
    pub market: String,
    pub min_price: Option<f64>,
    pub max_price: Option<f64>,
    pub modal_price: f64,
}

impl PriceObservation {
    /// Type a raw record for storage.
    ///
    /// Empty price fields count as zero; any non-numeric price drops the record, as does
    /// a missing date or a zero modal price.
    pub fn from_raw(record: &RawPriceRecord, state: &str, district: &str, commodity: &str) -> Option<Self> {
        let arrival_date = record.parsed_date()?;

        let price_or_zero = |field: &Option<String>| -> Option<f64> {
            match field.as_deref().map(str::trim) {
                None | Some("") => Some(0.0),
                Some(raw) => parse_price(raw),
            }
        };

        let min_price = price_or_zero(&record.min_price)?;
        let max_price = price_or_zero(&record.max_price)?;
        let modal_price = price_or_zero(&record.modal_price)?;

        if modal_price <= 0.0 {
            return None;
        }

        Some(Self {
            state: state.to_string(),
            district: district.to_string(),
            commodity: commodity.to_string(),
            arrival_date,
            market: record.market.clone().unwrap_or_default(),
            min_price: Some(min_price),
            max_price: Some(max_price),
            modal_price,
        })
    }
}

/// Filters for a price feed request
#[derive(Debug, Clone, PartialEq)]
pub struct PriceQuery {
    pub state: String,
    pub district: Option<String>,
    pub commodity: Option<String>,
    pub arrival_date: Option<NaiveDate>,
    pub newest_first: bool,
    pub limit: u32,
}

impl PriceQuery {
    pub fn for_state(state: impl Into<String>) -> Self {
        Self {
            state: state.into(),
            district: None,
            commodity: None,
            arrival_date: None,
            newest_first: false,
            limit: DEFAULT_PAGE_LIMIT,
        }
    }

    pub fn district(mut self, district: impl Into<String>) -> Self {
        self.district = Some(district.into());
        self
    }

    pub fn commodity(mut self, commodity: impl Into<String>) -> Self {
        self.commodity = Some(commodity.into());
        self
    }

    pub fn on_date(mut self, date: NaiveDate) -> Self {
        self.arrival_date = Some(date);
        self
    }

    pub fn newest_first(mut self) -> Self {
        self.newest_first = true;
        self
    }

    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = limit;
        self
    }

    /// Query-string parameters understood by the feed, without credentials
    pub fn to_params(&self) -> Vec<(String, String)> {
        let mut params = vec![
            ("format".to_string(), "json".to_string()),
            ("limit".to_string(), self.limit.to_string()),
            ("filters[State]".to_string(), self.state.clone()),
        ];
        if let Some(district) = &self.district {
            params.push(("filters[District]".to_string(), district.clone()));
        }
        if let Some(commodity) = &self.commodity {
            params.push(("filters[Commodity]".to_string(), commodity.clone()));
        }
        if let Some(date) = self.arrival_date {
            params.push((
                "filters[Arrival_Date]".to_string(),
                date.format(ARRIVAL_DATE_FORMAT).to_string(),
            ));
        }
        if self.newest_first {
            params.push(("sort[Arrival_Date]".to_string(), "desc".to_string()));
        }
        params
    }
}

/// A (date, modal price) point of a prepared series
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    pub date: NaiveDate,
    pub price: f64,
}

/// One day of a forecast path
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ForecastPoint {
    pub date: NaiveDate,
    pub predicted_price: f64,
}

/// Which time-series model produced the base forecast
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ModelVariant {
    #[serde(rename = "SARIMA")]
    Sarima,
    #[serde(rename = "ARIMA")]
    Arima,
}

impl ModelVariant {
    pub fn label(&self) -> &'static str {
        match self {
            ModelVariant::Sarima => "SARIMA",
            ModelVariant::Arima => "ARIMA",
        }
    }
}

impl std::fmt::Display for ModelVariant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// A generated price forecast for one (state, district, commodity, target date)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Forecast {
    pub historical: Vec<PricePoint>,
    pub forecast: Vec<ForecastPoint>,
    pub target_date: NaiveDate,
    pub predicted_price: f64,
    pub current_price: f64,
    pub model: ModelVariant,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raw_record_accepts_numbers_and_strings() {
        let record: RawPriceRecord = serde_json::from_value(serde_json::json!({
            "Market": "Pune",
            "Arrival_Date": "05/01/2024",
            "Min_Price": 1200,
            "Max_Price": "1800",
            "Modal_Price": 1500.5,
            "Grade": null
        }))
        .unwrap();

        assert_eq!(record.min_price.as_deref(), Some("1200"));
        assert_eq!(record.max_price.as_deref(), Some("1800"));
        assert_eq!(record.modal_price.as_deref(), Some("1500.5"));
        assert_eq!(record.grade, None);
        assert_eq!(record.parsed_date(), NaiveDate::from_ymd_opt(2024, 1, 5));
    }

    #[test]
    fn test_parse_arrival_date_is_day_first() {
        assert_eq!(parse_arrival_date("02/03/2024"), NaiveDate::from_ymd_opt(2024, 3, 2));
        assert_eq!(parse_arrival_date("2024-03-02"), None);
        assert_eq!(parse_arrival_date("31/02/2024"), None);
    }

    #[test]
    fn test_observation_from_raw_skips_zero_modal() {
        let mut record = RawPriceRecord {
            arrival_date: Some("10/10/2024".into()),
            market: Some("Nashik".into()),
            modal_price: Some("0".into()),
            ..Default::default()
        };
        assert!(PriceObservation::from_raw(&record, "Maharashtra", "Nashik", "Onion").is_none());

        record.modal_price = Some("2100".into());
        let obs = PriceObservation::from_raw(&record, "Maharashtra", "Nashik", "Onion").unwrap();
        assert_eq!(obs.modal_price, 2100.0);
        assert_eq!(obs.min_price, Some(0.0));

        record.max_price = Some("n/a".into());
        assert!(PriceObservation::from_raw(&record, "Maharashtra", "Nashik", "Onion").is_none());
    }

    #[test]
    fn test_observation_round_trips_to_feed_shape() {
        let obs = PriceObservation {
            state: "Maharashtra".into(),
            district: "Pune".into(),
            commodity: "Tomato".into(),
            arrival_date: NaiveDate::from_ymd_opt(2024, 7, 9).unwrap(),
            market: "Pune".into(),
            min_price: Some(800.0),
            max_price: Some(1200.0),
            modal_price: 1000.0,
        };
        let raw = RawPriceRecord::from_observation(&obs);
        assert_eq!(raw.arrival_date.as_deref(), Some("09/07/2024"));
        assert_eq!(PriceObservation::from_raw(&raw, "Maharashtra", "Pune", "Tomato"), Some(obs));
    }

    #[test]
    fn test_query_params() {
        let query = PriceQuery::for_state("Maharashtra")
            .district("Pune")
            .commodity("Onion")
            .on_date(NaiveDate::from_ymd_opt(2024, 1, 5).unwrap())
            .newest_first()
            .limit(10);
        let params = query.to_params();
        assert!(params.contains(&("filters[Arrival_Date]".into(), "05/01/2024".into())));
        assert!(params.contains(&("sort[Arrival_Date]".into(), "desc".into())));
        assert!(params.contains(&("limit".into(), "10".into())));
        assert!(!params.iter().any(|(k, _)| k == "api-key"));
    }

    #[test]
    fn test_model_variant_serializes_as_label() {
        assert_eq!(serde_json::to_value(ModelVariant::Sarima).unwrap(), "SARIMA");
        assert_eq!(ModelVariant::Arima.to_string(), "ARIMA");
    }
}
