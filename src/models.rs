use chrono::{DateTime, FixedOffset, NaiveDate, Utc};
use serde::{Deserialize, Serialize, Serializer};

/// One trading day of the underlying, dated at exchange-local midnight
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PriceBar {
    #[serde(rename = "Date", serialize_with = "serialize_bar_date")]
    pub date: DateTime<FixedOffset>,

    #[serde(rename = "Open")]
    pub open: f64,

    #[serde(rename = "High")]
    pub high: f64,

    #[serde(rename = "Low")]
    pub low: f64,

    #[serde(rename = "Close")]
    pub close: f64,

    #[serde(rename = "Volume")]
    pub volume: u64,

    #[serde(rename = "Dividends")]
    pub dividends: f64,

    #[serde(rename = "Stock Splits")]
    pub stock_splits: f64,
}

/// Quote snapshot fields used to resolve the current price
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct QuoteSnapshot {
    #[serde(rename = "currentPrice")]
    pub current_price: Option<f64>,

    #[serde(rename = "regularMarketPrice")]
    pub regular_market_price: Option<f64>,
}

/// A contract exactly as the provider lists it
#[derive(Debug, Clone, PartialEq)]
pub struct OptionContract {
    pub contract_symbol: String,
    pub last_trade_date: Option<DateTime<Utc>>,
    pub strike: f64,
    pub last_price: Option<f64>,
    pub bid: Option<f64>,
    pub ask: Option<f64>,
    pub change: Option<f64>,
    pub percent_change: Option<f64>,
    pub volume: Option<u64>,
    pub open_interest: Option<u64>,
    pub implied_volatility: Option<f64>,
    pub in_the_money: bool,
    pub contract_size: Option<String>,
    pub currency: Option<String>,
}

/// Calls and puts listed for a single expiration
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExpirationChain {
    pub calls: Vec<OptionContract>,
    pub puts: Vec<OptionContract>,
}

/// Contract row with expiry and pricing fields attached, one CSV row per instance
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OptionQuote {
    #[serde(rename = "contractSymbol")]
    pub contract_symbol: String,

    #[serde(rename = "lastTradeDate", serialize_with = "serialize_trade_date")]
    pub last_trade_date: Option<DateTime<Utc>>,

    pub strike: f64,

    #[serde(rename = "lastPrice")]
    pub last_price: Option<f64>,

    pub bid: Option<f64>,
    pub ask: Option<f64>,
    pub change: Option<f64>,

    #[serde(rename = "percentChange")]
    pub percent_change: Option<f64>,

    pub volume: Option<u64>,

    #[serde(rename = "openInterest")]
    pub open_interest: Option<u64>,

    #[serde(rename = "impliedVolatility")]
    pub implied_volatility: Option<f64>,

    #[serde(rename = "inTheMoney")]
    pub in_the_money: bool,

    #[serde(rename = "contractSize")]
    pub contract_size: Option<String>,

    pub currency: Option<String>,

    #[serde(serialize_with = "serialize_expiration")]
    pub expiration: NaiveDate,

    pub days_to_expiry: i64,
    pub time_to_expiry: f64,
    pub mid_price: Option<f64>,
}

/// Calls and puts accumulated across expirations
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OptionLegs {
    pub calls: Vec<OptionQuote>,
    pub puts: Vec<OptionQuote>,
}

impl OptionLegs {
    pub fn is_empty(&self) -> bool {
        self.calls.is_empty() && self.puts.is_empty()
    }
}

/// Snapshot record written once at the end of a run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Summary {
    pub symbol: String,
    pub current_price: Option<f64>,

    #[serde(serialize_with = "serialize_finite_or_null")]
    pub historical_volatility: f64,

    pub risk_free_rate: f64,
    pub stock_data_points: usize,
    pub calls_count: usize,
    pub puts_count: usize,
    pub download_timestamp: String,
}

fn serialize_bar_date<S: Serializer>(
    date: &DateTime<FixedOffset>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.collect_str(&date.format("%Y-%m-%d %H:%M:%S%:z"))
}

fn serialize_trade_date<S: Serializer>(
    date: &Option<DateTime<Utc>>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    match date {
        Some(d) => serializer.collect_str(&d.format("%Y-%m-%d %H:%M:%S+00:00")),
        None => serializer.serialize_none(),
    }
}

fn serialize_expiration<S: Serializer>(date: &NaiveDate, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_str(&date.format("%Y-%m-%d"))
}

// JSON has no NaN; an undefined estimate is written as null
fn serialize_finite_or_null<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
    if value.is_finite() {
        serializer.serialize_f64(*value)
    } else {
        serializer.serialize_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn summary(volatility: f64, current_price: Option<f64>) -> Summary {
        Summary {
            symbol: "AAPL".to_string(),
            current_price,
            historical_volatility: volatility,
            risk_free_rate: 0.0525,
            stock_data_points: 250,
            calls_count: 2,
            puts_count: 0,
            download_timestamp: "2026-10-19 09:30:00".to_string(),
        }
    }

    #[test]
    fn test_summary_json_shape() {
        let value = serde_json::to_value(summary(0.25, Some(187.5))).unwrap();

        assert_eq!(value["symbol"], "AAPL");
        assert_eq!(value["current_price"], 187.5);
        assert_eq!(value["historical_volatility"], 0.25);
        assert_eq!(value["risk_free_rate"], 0.0525);
        assert_eq!(value["stock_data_points"], 250);
        assert_eq!(value["calls_count"], 2);
        assert_eq!(value["puts_count"], 0);
        assert_eq!(value["download_timestamp"], "2026-10-19 09:30:00");
    }

    #[test]
    fn test_summary_absent_price_and_nan_volatility_are_null() {
        let value = serde_json::to_value(summary(f64::NAN, None)).unwrap();

        assert!(value["current_price"].is_null());
        assert!(value["historical_volatility"].is_null());
    }

    #[test]
    fn test_quote_snapshot_tolerates_missing_fields() {
        let snapshot: QuoteSnapshot =
            serde_json::from_str(r#"{"symbol":"AAPL","regularMarketPrice":190.1}"#).unwrap();

        assert_eq!(snapshot.current_price, None);
        assert_eq!(snapshot.regular_market_price, Some(190.1));
    }

    #[test]
    fn test_default_option_legs_are_empty() {
        assert!(OptionLegs::default().is_empty());
    }
}
