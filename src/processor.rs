use crate::config;
use crate::models::{OptionContract, OptionQuote, PriceBar};
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};

const MICROS_PER_DAY: i64 = 86_400_000_000;

/// Whole calendar days from `now` until midnight of the expiration, rounded down.
///
/// Expiring later today gives -1, tomorrow gives 0 once the day has started.
pub fn calculate_days_to_expiry(expiration: NaiveDate, now: NaiveDateTime) -> i64 {
    let delta = expiration.and_time(NaiveTime::MIN) - now;
    delta
        .num_microseconds()
        .map(|us| us.div_euclid(MICROS_PER_DAY))
        .unwrap_or_else(|| delta.num_days())
}

pub fn calculate_time_to_expiry(days_to_expiry: i64) -> f64 {
    days_to_expiry as f64 / config::DAYS_PER_YEAR
}

pub fn calculate_mid_price(bid: Option<f64>, ask: Option<f64>) -> Option<f64> {
    Some((bid? + ask?) / 2.0)
}

/// Attach expiry and pricing fields to every contract of one expiration
pub fn process_contracts(
    contracts: Vec<OptionContract>,
    expiration: NaiveDate,
    now: NaiveDateTime,
) -> Vec<OptionQuote> {
    let days_to_expiry = calculate_days_to_expiry(expiration, now);
    let time_to_expiry = calculate_time_to_expiry(days_to_expiry);

    contracts
        .into_iter()
        .map(|c| OptionQuote {
            mid_price: calculate_mid_price(c.bid, c.ask),
            contract_symbol: c.contract_symbol,
            last_trade_date: c.last_trade_date,
            strike: c.strike,
            last_price: c.last_price,
            bid: c.bid,
            ask: c.ask,
            change: c.change,
            percent_change: c.percent_change,
            volume: c.volume,
            open_interest: c.open_interest,
            implied_volatility: c.implied_volatility,
            in_the_money: c.in_the_money,
            contract_size: c.contract_size,
            currency: c.currency,
            expiration,
            days_to_expiry,
            time_to_expiry,
        })
        .collect()
}

/// Strictly positive volume, open interest, bid and ask; a missing value fails
pub fn is_liquid(quote: &OptionQuote) -> bool {
    quote.volume.is_some_and(|v| v > 0)
        && quote.open_interest.is_some_and(|oi| oi > 0)
        && quote.bid.is_some_and(|b| b > 0.0)
        && quote.ask.is_some_and(|a| a > 0.0)
}

pub fn filter_liquid(quotes: Vec<OptionQuote>) -> Vec<OptionQuote> {
    quotes.into_iter().filter(is_liquid).collect()
}

/// Keep rows with days to expiry in `[target - tolerance, target + tolerance]`
pub fn filter_target_expiry(
    quotes: Vec<OptionQuote>,
    target_days: i64,
    tolerance: i64,
) -> Vec<OptionQuote> {
    let window = (target_days - tolerance)..=(target_days + tolerance);
    quotes
        .into_iter()
        .filter(|q| window.contains(&q.days_to_expiry))
        .collect()
}

// -----------------------------------------------
// VOLATILITY
// -----------------------------------------------

/// Simple returns between consecutive values; one shorter than the input
pub fn pct_returns(values: &[f64]) -> Vec<f64> {
    values.windows(2).map(|w| w[1] / w[0] - 1.0).collect()
}

/// Sample standard deviation (n - 1); NaN below two observations
pub fn sample_std_dev(values: &[f64]) -> f64 {
    let n = values.len();
    if n < 2 {
        return f64::NAN;
    }

    let mean = values.iter().sum::<f64>() / n as f64;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1) as f64;
    variance.sqrt()
}

/// Standard deviation of daily close returns scaled by sqrt(window)
pub fn calculate_volatility(closes: &[f64], window: usize) -> f64 {
    sample_std_dev(&pct_returns(closes)) * (window as f64).sqrt()
}

pub fn closes(bars: &[PriceBar]) -> Vec<f64> {
    bars.iter().map(|b| b.close).collect()
}
