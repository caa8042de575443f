use crate::config::{self, AppConfig, ChainFailurePolicy};
use crate::models::{OptionLegs, PriceBar, Summary};
use crate::processor;
use crate::provider::MarketDataProvider;
use crate::storage;

use anyhow::{bail, Context, Result};
use chrono::{Local, NaiveDateTime};
use colored::Colorize;
use tracing::{info, warn};

// -----------------------------------------------
// STEP 1: PRICE HISTORY (FATAL ON FAILURE)
// -----------------------------------------------
pub async fn get_stock_data<P: MarketDataProvider>(
    provider: &P,
    symbol: &str,
    period: &str,
) -> Result<Vec<PriceBar>> {
    let bars = provider
        .history(symbol, period)
        .await
        .with_context(|| format!("Failed to fetch {} price history for {}", period, symbol))?;

    if bars.is_empty() {
        bail!("No price history returned for {} ({})", symbol, period);
    }

    Ok(bars)
}

// -----------------------------------------------
// STEP 2: CURRENT PRICE (BEST EFFORT)
// -----------------------------------------------

/// currentPrice, then regularMarketPrice, then the last close of a short history
pub async fn get_current_price<P: MarketDataProvider>(provider: &P, symbol: &str) -> Option<f64> {
    match provider.quote(symbol).await {
        Ok(snapshot) => {
            if let Some(price) = snapshot.current_price.or(snapshot.regular_market_price) {
                return Some(price);
            }
        }
        Err(e) => warn!(symbol, error = %e, "Quote lookup failed, falling back to history"),
    }

    match provider.history(symbol, config::SHORT_PERIOD).await {
        Ok(bars) => bars.last().map(|b| b.close),
        Err(e) => {
            warn!(symbol, error = %e, "Current price unavailable");
            None
        }
    }
}

// -----------------------------------------------
// STEP 3: RISK-FREE RATE (BEST EFFORT)
// -----------------------------------------------

/// Latest T-bill proxy close as a decimal, or `fallback` on any failure
pub async fn get_risk_free_rate<P: MarketDataProvider>(provider: &P, fallback: f64) -> f64 {
    match provider
        .history(config::RISK_FREE_PROXY_SYMBOL, config::SHORT_PERIOD)
        .await
    {
        Ok(bars) => match bars.last() {
            Some(bar) => bar.close / 100.0,
            None => {
                warn!("Empty risk-free proxy history, using fallback {}", fallback);
                fallback
            }
        },
        Err(e) => {
            warn!(error = %e, "Risk-free rate lookup failed, using fallback {}", fallback);
            fallback
        }
    }
}

// -----------------------------------------------
// STEP 4: OPTIONS CHAIN (BEST EFFORT)
// -----------------------------------------------

/// Liquid calls and puts for the first `max_expirations` listed expirations.
///
/// Rows keep provider order within an expiration and expirations keep
/// listing order. A failed expiration is skipped or empties the whole
/// result depending on `policy`.
pub async fn get_options_chain<P: MarketDataProvider>(
    provider: &P,
    symbol: &str,
    max_expirations: usize,
    policy: ChainFailurePolicy,
    now: NaiveDateTime,
) -> OptionLegs {
    let expirations = match provider.expirations(symbol).await {
        Ok(dates) => dates,
        Err(e) => {
            println!("{} Options data error: {}", "⚠".yellow(), e);
            warn!(symbol, error = %e, "Failed to list option expirations");
            return OptionLegs::default();
        }
    };

    if expirations.is_empty() {
        info!(symbol, "No option expirations listed");
        return OptionLegs::default();
    }

    let mut legs = OptionLegs::default();

    for expiration in expirations.into_iter().take(max_expirations) {
        let chain = match provider.option_chain(symbol, expiration).await {
            Ok(chain) => chain,
            Err(e) => {
                println!("{} Options data error ({}): {}", "⚠".yellow(), expiration, e);
                warn!(symbol, %expiration, error = %e, "Option chain fetch failed");
                match policy {
                    ChainFailurePolicy::SkipExpiration => continue,
                    ChainFailurePolicy::DiscardAll => return OptionLegs::default(),
                }
            }
        };

        let calls = processor::filter_liquid(processor::process_contracts(chain.calls, expiration, now));
        let puts = processor::filter_liquid(processor::process_contracts(chain.puts, expiration, now));

        info!(
            symbol,
            %expiration,
            calls = calls.len(),
            puts = puts.len(),
            "Liquid contracts"
        );

        legs.calls.extend(calls);
        legs.puts.extend(puts);
    }

    legs
}

// -----------------------------------------------
// FULL RUN
// -----------------------------------------------

/// Fetch, derive, filter and persist everything for `config.symbol`
pub async fn run<P: MarketDataProvider>(provider: &P, config: &AppConfig) -> Result<Summary> {
    println!("{}", "=".repeat(60).blue());
    println!("{}", "Options Data Downloader".green().bold());
    println!("{}", "=".repeat(60).blue());
    println!();

    println!("{} Downloading data for {}...", "→".cyan(), config.symbol.yellow());
    info!(symbol = %config.symbol, period = %config.period, "Starting download");

    let stock_data = get_stock_data(provider, &config.symbol, &config.period).await?;
    let current_price = get_current_price(provider, &config.symbol).await;
    let volatility =
        processor::calculate_volatility(&processor::closes(&stock_data), config.volatility_window);
    let risk_free_rate = get_risk_free_rate(provider, config.fallback_risk_free_rate).await;

    let now = Local::now().naive_local();
    let options = get_options_chain(
        provider,
        &config.symbol,
        config.max_expirations,
        config.chain_failure_policy,
        now,
    )
    .await;

    let calls = processor::filter_target_expiry(
        options.calls,
        config.target_expiry_days,
        config.expiry_tolerance_days,
    );
    let puts = processor::filter_target_expiry(
        options.puts,
        config.target_expiry_days,
        config.expiry_tolerance_days,
    );

    std::fs::create_dir_all(&config.data_dir)
        .with_context(|| format!("Failed to create {}", config.data_dir.display()))?;

    let stock_file = config.stock_file();
    storage::write_stock_csv(&stock_file, &stock_data)?;
    println!("{} Stock data saved: {}", "✓".green(), stock_file.display());

    if !calls.is_empty() {
        let calls_file = config.calls_file();
        storage::write_options_csv(&calls_file, &calls)?;
        println!("{} Calls saved: {} ({} options)", "✓".green(), calls_file.display(), calls.len());
    }

    if !puts.is_empty() {
        let puts_file = config.puts_file();
        storage::write_options_csv(&puts_file, &puts)?;
        println!("{} Puts saved: {} ({} options)", "✓".green(), puts_file.display(), puts.len());
    }

    let summary = Summary {
        symbol: config.symbol.clone(),
        current_price,
        historical_volatility: volatility,
        risk_free_rate,
        stock_data_points: stock_data.len(),
        calls_count: calls.len(),
        puts_count: puts.len(),
        download_timestamp: Local::now().format(config::TIMESTAMP_FORMAT).to_string(),
    };

    let summary_file = config.summary_file();
    storage::write_summary(&summary_file, &summary)?;
    info!(path = %summary_file.display(), "Summary written");

    display_summary(&summary);

    Ok(summary)
}

/// Console rendering of the run summary
fn display_summary(summary: &Summary) {
    println!();
    println!("{}", "=".repeat(60).blue());
    println!("{}", "Summary".cyan().bold());
    println!("{}", "=".repeat(60).blue());
    println!("{} Current Price: {}", "ℹ".blue(), format_price(summary.current_price));
    println!("{} Volatility: {}", "ℹ".blue(), format_percent(summary.historical_volatility, 1));
    println!("{} Risk-Free Rate: {}", "ℹ".blue(), format_percent(summary.risk_free_rate, 3));
    println!(
        "{} Target Options: {} calls, {} puts",
        "ℹ".blue(),
        summary.calls_count,
        summary.puts_count
    );
    println!("{}", "=".repeat(60).blue());
}

pub fn format_price(price: Option<f64>) -> String {
    match price {
        Some(p) => format!("${:.2}", p),
        None => "N/A".to_string(),
    }
}

pub fn format_percent(value: f64, decimals: usize) -> String {
    if value.is_finite() {
        format!("{:.*}%", decimals, value * 100.0)
    } else {
        "N/A".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_price() {
        assert_eq!(format_price(Some(187.456)), "$187.46");
        assert_eq!(format_price(None), "N/A");
    }

    #[test]
    fn test_format_percent() {
        assert_eq!(format_percent(0.2534, 1), "25.3%");
        assert_eq!(format_percent(0.0525, 3), "5.250%");
        assert_eq!(format_percent(f64::NAN, 1), "N/A");
    }
}
