use crate::models::{OptionQuote, PriceBar, Summary};
use anyhow::{Context, Result};
use serde::Serialize;
use std::path::Path;

/// Header plus one row per record; an existing file is replaced
pub fn write_csv<T: Serialize>(path: &Path, rows: &[T]) -> Result<()> {
    let mut wtr = csv::Writer::from_path(path)
        .with_context(|| format!("Failed to create {}", path.display()))?;

    for row in rows {
        wtr.serialize(row)
            .with_context(|| format!("Failed to write row to {}", path.display()))?;
    }
    wtr.flush()
        .with_context(|| format!("Failed to flush {}", path.display()))?;

    Ok(())
}

pub fn write_stock_csv(path: &Path, bars: &[PriceBar]) -> Result<()> {
    write_csv(path, bars)
}

pub fn write_options_csv(path: &Path, quotes: &[OptionQuote]) -> Result<()> {
    write_csv(path, quotes)
}

pub fn write_summary(path: &Path, summary: &Summary) -> Result<()> {
    std::fs::write(path, serde_json::to_string_pretty(summary)?)
        .with_context(|| format!("Failed to write {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{FixedOffset, NaiveDate, TimeZone};

    fn bar(day: u32, close: f64) -> PriceBar {
        let offset = FixedOffset::west_opt(4 * 3600).unwrap();
        PriceBar {
            date: offset.with_ymd_and_hms(2026, 6, day, 0, 0, 0).unwrap(),
            open: close - 1.0,
            high: close + 1.0,
            low: close - 2.0,
            close,
            volume: 1_000,
            dividends: 0.0,
            stock_splits: 0.0,
        }
    }

    fn quote() -> OptionQuote {
        OptionQuote {
            contract_symbol: "AAPL260918C00200000".to_string(),
            last_trade_date: None,
            strike: 200.0,
            last_price: Some(7.5),
            bid: Some(7.4),
            ask: Some(7.6),
            change: None,
            percent_change: None,
            volume: Some(12),
            open_interest: Some(340),
            implied_volatility: Some(0.28),
            in_the_money: false,
            contract_size: Some("REGULAR".to_string()),
            currency: Some("USD".to_string()),
            expiration: NaiveDate::from_ymd_opt(2026, 9, 18).unwrap(),
            days_to_expiry: 90,
            time_to_expiry: 90.0 / 365.25,
            mid_price: Some(7.5),
        }
    }

    #[test]
    fn test_stock_csv_has_date_first() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("AAPL_stock.csv");

        write_stock_csv(&path, &[bar(1, 100.0), bar(2, 101.5)]).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "Date,Open,High,Low,Close,Volume,Dividends,Stock Splits");
        assert_eq!(lines[1], "2026-06-01 00:00:00-04:00,99.0,101.0,98.0,100.0,1000,0.0,0.0");
        assert_eq!(lines.len(), 3);
    }

    #[test]
    fn test_options_csv_columns() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("AAPL_calls.csv");

        write_options_csv(&path, &[quote()]).unwrap();

        let mut rdr = csv::Reader::from_path(&path).unwrap();
        let headers = rdr.headers().unwrap().clone();
        assert_eq!(&headers[0], "contractSymbol");
        assert_eq!(&headers[headers.len() - 4], "expiration");
        assert_eq!(&headers[headers.len() - 1], "mid_price");

        let rows: Vec<csv::StringRecord> = rdr.records().map(|r| r.unwrap()).collect();
        assert_eq!(rows.len(), 1);
        assert_eq!(&rows[0][0], "AAPL260918C00200000");
        // Missing values are blank cells
        assert_eq!(&rows[0][1], "");
        assert_eq!(&rows[0][headers.len() - 4], "2026-09-18");
        assert_eq!(&rows[0][headers.len() - 3], "90");
    }

    #[test]
    fn test_summary_is_pretty_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("AAPL_summary.json");
        let summary = Summary {
            symbol: "AAPL".to_string(),
            current_price: None,
            historical_volatility: 0.21,
            risk_free_rate: 0.0525,
            stock_data_points: 2,
            calls_count: 0,
            puts_count: 0,
            download_timestamp: "2026-10-19 10:00:00".to_string(),
        };

        write_summary(&path, &summary).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.contains("\n  \"symbol\": \"AAPL\""));
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert!(value["current_price"].is_null());
        assert_eq!(value["stock_data_points"], 2);
    }

    #[test]
    fn test_missing_directory_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("AAPL_stock.csv");
        assert!(write_stock_csv(&path, &[bar(1, 100.0)]).is_err());
    }
}
