use crate::config;
use crate::error::{ProviderError, ProviderResult};
use crate::models::{ExpirationChain, OptionContract, PriceBar, QuoteSnapshot};
use crate::provider::MarketDataProvider;
use anyhow::{Context, Result};
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveTime, Offset, TimeZone, Utc};
use chrono_tz::Tz;
use rand::{seq::SliceRandom, thread_rng};
use reqwest::{header, Client};
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

// -----------------------------------------------
// CLIENT WRAPPER
// -----------------------------------------------
pub struct YahooClient {
    client: Client,
    crumb: Arc<RwLock<Option<String>>>,
}

impl YahooClient {
    pub fn new() -> Result<Self> {
        Ok(Self {
            client: build_client()?,
            crumb: Arc::new(RwLock::new(None)),
        })
    }

    /// Session cookie and crumb for the v7 endpoints, fetched once per client
    async fn crumb_if_needed(&self) -> ProviderResult<String> {
        if let Some(crumb) = self.crumb.read().await.as_ref() {
            return Ok(crumb.clone());
        }

        let mut cached = self.crumb.write().await;
        if let Some(crumb) = cached.as_ref() {
            return Ok(crumb.clone());
        }

        // Only the Set-Cookie matters here, this host answers 404
        let _ = self.client.get(config::YAHOO_COOKIE_URL).send().await?;

        let res = self.client.get(config::YAHOO_CRUMB_URL).send().await?;
        let status = res.status();
        let body = res.text().await?;
        if !status.is_success() {
            return Err(ProviderError::Status {
                status: status.as_u16(),
                preview: body.chars().take(200).collect(),
            });
        }

        let crumb = parse_crumb(&body)?;
        tracing::debug!("Yahoo session crumb acquired");
        *cached = Some(crumb.clone());

        Ok(crumb)
    }

    async fn fetch_json_with_crumb(&self, url: &str) -> ProviderResult<String> {
        let crumb = self.crumb_if_needed().await?;
        self.fetch_json(&config::with_crumb(url, &crumb)).await
    }

    /// Single GET, no retries; non-2xx and non-JSON bodies are errors
    async fn fetch_json(&self, url: &str) -> ProviderResult<String> {
        tracing::debug!(url, "GET");

        let res = self.client.get(url).send().await?;
        let status = res.status();

        if !status.is_success() {
            let body = res.text().await.unwrap_or_default();
            return Err(ProviderError::Status {
                status: status.as_u16(),
                preview: body.chars().take(200).collect(),
            });
        }

        let text = res.text().await?;

        let trimmed = text.trim();
        if !trimmed.starts_with('{') && !trimmed.starts_with('[') {
            return Err(ProviderError::NonJsonResponse(text.chars().take(200).collect()));
        }

        Ok(text)
    }

    // -----------------------------------------------
    // OPTIONS ENDPOINT (EXPIRATIONS + CHAINS)
    // -----------------------------------------------
    async fn fetch_options(&self, url: &str, symbol: &str) -> ProviderResult<YahooOptionChainData> {
        let text = self.fetch_json_with_crumb(url).await?;
        let response: YahooOptionsResponse = serde_json::from_str(&text)?;

        response
            .option_chain
            .result
            .into_iter()
            .next()
            .ok_or_else(|| ProviderError::NoData(symbol.to_string()))
    }
}

impl MarketDataProvider for YahooClient {
    async fn history(&self, symbol: &str, period: &str) -> ProviderResult<Vec<PriceBar>> {
        let url = config::yahoo_chart_url(symbol, period);
        let text = self.fetch_json(&url).await?;
        let response: YahooChartResponse = serde_json::from_str(&text)?;

        let result = response
            .chart
            .result
            .and_then(|r| r.into_iter().next())
            .ok_or_else(|| match response.chart.error {
                Some(err) => ProviderError::Parse(format!("{}: {}", err.code, err.description)),
                None => ProviderError::NoData(symbol.to_string()),
            })?;

        Ok(convert_chart(result))
    }

    async fn quote(&self, symbol: &str) -> ProviderResult<QuoteSnapshot> {
        let url = config::yahoo_quote_url(symbol);
        let text = self.fetch_json_with_crumb(&url).await?;
        let response: YahooQuoteResponse = serde_json::from_str(&text)?;

        response
            .quote_response
            .result
            .into_iter()
            .next()
            .ok_or_else(|| ProviderError::NoData(symbol.to_string()))
    }

    async fn expirations(&self, symbol: &str) -> ProviderResult<Vec<NaiveDate>> {
        let url = config::yahoo_options_url(symbol);
        let data = self.fetch_options(&url, symbol).await?;

        Ok(data
            .expiration_dates
            .iter()
            .filter_map(|&ts| DateTime::from_timestamp(ts, 0).map(|dt| dt.date_naive()))
            .collect())
    }

    async fn option_chain(
        &self,
        symbol: &str,
        expiration: NaiveDate,
    ) -> ProviderResult<ExpirationChain> {
        // Expirations are keyed by midnight UTC of the expiry date
        let expiration_ts = expiration.and_time(NaiveTime::MIN).and_utc().timestamp();
        let url = config::yahoo_option_chain_url(symbol, expiration_ts);
        let data = self.fetch_options(&url, symbol).await?;

        let options = data
            .options
            .into_iter()
            .next()
            .ok_or_else(|| ProviderError::NoData(format!("{} {}", symbol, expiration)))?;

        Ok(ExpirationChain {
            calls: options.calls.into_iter().filter_map(convert_contract).collect(),
            puts: options.puts.into_iter().filter_map(convert_contract).collect(),
        })
    }
}

// -----------------------------------------------
// RESPONSE CONVERSION
// -----------------------------------------------

/// A crumb is a short opaque token; HTML or JSON bodies mean the session was refused
fn parse_crumb(body: &str) -> ProviderResult<String> {
    let crumb = body.trim();
    if crumb.is_empty() || crumb.contains(char::is_whitespace) || crumb.starts_with(['<', '{']) {
        return Err(ProviderError::Parse(format!(
            "invalid session crumb: {}",
            crumb.chars().take(50).collect::<String>()
        )));
    }
    Ok(crumb.to_string())
}

/// Exchange clock used to date bars. `gmtoffset` is the offset at request
/// time only, so it is the fallback when the zone name is missing or unknown.
#[derive(Debug, Clone, Copy)]
enum ExchangeZone {
    Named(Tz),
    Fixed(FixedOffset),
}

impl ExchangeZone {
    fn from_meta(meta: &YahooChartMeta) -> Self {
        match meta
            .exchange_timezone_name
            .as_deref()
            .and_then(|name| name.parse::<Tz>().ok())
        {
            Some(tz) => ExchangeZone::Named(tz),
            None => ExchangeZone::Fixed(
                meta.gmtoffset
                    .and_then(FixedOffset::east_opt)
                    .unwrap_or_else(|| Utc.fix()),
            ),
        }
    }

    fn local_date(&self, ts: i64) -> Option<NaiveDate> {
        let utc = DateTime::from_timestamp(ts, 0)?;
        Some(match self {
            ExchangeZone::Named(tz) => utc.with_timezone(tz).date_naive(),
            ExchangeZone::Fixed(offset) => utc.with_timezone(offset).date_naive(),
        })
    }

    /// Midnight of `day` with the offset in force on that day
    fn midnight(&self, day: NaiveDate) -> Option<DateTime<FixedOffset>> {
        let midnight = day.and_time(NaiveTime::MIN);
        match self {
            ExchangeZone::Named(tz) => tz
                .from_local_datetime(&midnight)
                .earliest()
                .map(|dt| dt.fixed_offset()),
            ExchangeZone::Fixed(offset) => offset.from_local_datetime(&midnight).single(),
        }
    }
}

/// Daily bars dated at exchange-local midnight, OHLC adjusted by adjclose/close.
/// Rows with any missing OHLC value are dropped.
fn convert_chart(result: YahooChartResult) -> Vec<PriceBar> {
    let zone = ExchangeZone::from_meta(&result.meta);

    let Some(quote) = result.indicators.quote.into_iter().next() else {
        return Vec::new();
    };
    let adjclose = result
        .indicators
        .adjclose
        .and_then(|a| a.into_iter().next())
        .map(|a| a.adjclose)
        .unwrap_or_default();

    let local_date = |ts: i64| zone.local_date(ts);

    let events = result.events.unwrap_or_default();
    let dividends: HashMap<NaiveDate, f64> = events
        .dividends
        .values()
        .filter_map(|d| local_date(d.date).map(|date| (date, d.amount)))
        .collect();
    let splits: HashMap<NaiveDate, f64> = events
        .splits
        .values()
        .filter(|s| s.denominator != 0.0)
        .filter_map(|s| local_date(s.date).map(|date| (date, s.numerator / s.denominator)))
        .collect();

    let at = |values: &[Option<f64>], i: usize| values.get(i).copied().flatten();

    result
        .timestamp
        .iter()
        .enumerate()
        .filter_map(|(i, &ts)| {
            let (open, high, low, close) = (
                at(&quote.open, i)?,
                at(&quote.high, i)?,
                at(&quote.low, i)?,
                at(&quote.close, i)?,
            );
            let day = local_date(ts)?;
            let date = zone.midnight(day)?;

            let ratio = match at(&adjclose, i) {
                Some(adj) if close != 0.0 => adj / close,
                _ => 1.0,
            };

            Some(PriceBar {
                date,
                open: open * ratio,
                high: high * ratio,
                low: low * ratio,
                close: close * ratio,
                volume: quote.volume.get(i).copied().flatten().unwrap_or(0),
                dividends: dividends.get(&day).copied().unwrap_or(0.0),
                stock_splits: splits.get(&day).copied().unwrap_or(0.0),
            })
        })
        .collect()
}

fn convert_contract(data: YahooOptionData) -> Option<OptionContract> {
    Some(OptionContract {
        contract_symbol: data.contract_symbol.unwrap_or_default(),
        last_trade_date: data.last_trade_date.and_then(|ts| DateTime::<Utc>::from_timestamp(ts, 0)),
        strike: data.strike?,
        last_price: data.last_price,
        bid: data.bid,
        ask: data.ask,
        change: data.change,
        percent_change: data.percent_change,
        volume: data.volume,
        open_interest: data.open_interest,
        implied_volatility: data.implied_volatility,
        in_the_money: data.in_the_money.unwrap_or(false),
        contract_size: data.contract_size,
        currency: data.currency,
    })
}

// -----------------------------------------------
// HTTP CLIENT BUILDER
// -----------------------------------------------
fn build_client() -> Result<Client> {
    let mut headers = header::HeaderMap::new();

    let lang = config::ACCEPT_LANGUAGES
        .choose(&mut thread_rng())
        .copied()
        .unwrap_or("en-US,en;q=0.9");
    headers.insert(header::ACCEPT_LANGUAGE, header::HeaderValue::from_str(lang)?);
    headers.insert(header::ACCEPT, header::HeaderValue::from_static("*/*"));

    Client::builder()
        .default_headers(headers)
        .cookie_store(true)
        .user_agent(config::USER_AGENT)
        .timeout(config::HTTP_TIMEOUT)
        .build()
        .context("Failed to build HTTP client")
}

// -----------------------------------------------
// YAHOO RESPONSE STRUCTURES
// -----------------------------------------------

#[derive(Debug, Deserialize)]
struct YahooChartResponse {
    chart: YahooChart,
}

#[derive(Debug, Deserialize)]
struct YahooChart {
    result: Option<Vec<YahooChartResult>>,
    error: Option<YahooError>,
}

#[derive(Debug, Deserialize)]
struct YahooError {
    code: String,
    description: String,
}

#[derive(Debug, Deserialize)]
struct YahooChartResult {
    meta: YahooChartMeta,
    #[serde(default)]
    timestamp: Vec<i64>,
    events: Option<YahooEvents>,
    indicators: YahooIndicators,
}

#[derive(Debug, Deserialize)]
struct YahooChartMeta {
    gmtoffset: Option<i32>,
    #[serde(rename = "exchangeTimezoneName")]
    exchange_timezone_name: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct YahooEvents {
    #[serde(default)]
    dividends: HashMap<String, YahooDividend>,
    #[serde(default)]
    splits: HashMap<String, YahooSplit>,
}

#[derive(Debug, Deserialize)]
struct YahooDividend {
    amount: f64,
    date: i64,
}

#[derive(Debug, Deserialize)]
struct YahooSplit {
    date: i64,
    numerator: f64,
    denominator: f64,
}

#[derive(Debug, Deserialize)]
struct YahooIndicators {
    #[serde(default)]
    quote: Vec<YahooBarSeries>,
    adjclose: Option<Vec<YahooAdjClose>>,
}

#[derive(Debug, Default, Deserialize)]
struct YahooBarSeries {
    #[serde(default)]
    open: Vec<Option<f64>>,
    #[serde(default)]
    high: Vec<Option<f64>>,
    #[serde(default)]
    low: Vec<Option<f64>>,
    #[serde(default)]
    close: Vec<Option<f64>>,
    #[serde(default)]
    volume: Vec<Option<u64>>,
}

#[derive(Debug, Deserialize)]
struct YahooAdjClose {
    #[serde(default)]
    adjclose: Vec<Option<f64>>,
}

#[derive(Debug, Deserialize)]
struct YahooQuoteResponse {
    #[serde(rename = "quoteResponse")]
    quote_response: YahooQuoteResult,
}

#[derive(Debug, Deserialize)]
struct YahooQuoteResult {
    #[serde(default)]
    result: Vec<QuoteSnapshot>,
}

#[derive(Debug, Deserialize)]
struct YahooOptionsResponse {
    #[serde(rename = "optionChain")]
    option_chain: YahooOptionChain,
}

#[derive(Debug, Deserialize)]
struct YahooOptionChain {
    #[serde(default)]
    result: Vec<YahooOptionChainData>,
}

#[derive(Debug, Deserialize)]
struct YahooOptionChainData {
    #[serde(rename = "expirationDates", default)]
    expiration_dates: Vec<i64>,
    #[serde(default)]
    options: Vec<YahooOptions>,
}

#[derive(Debug, Deserialize)]
struct YahooOptions {
    #[serde(default)]
    calls: Vec<YahooOptionData>,
    #[serde(default)]
    puts: Vec<YahooOptionData>,
}

#[derive(Debug, Deserialize)]
struct YahooOptionData {
    #[serde(rename = "contractSymbol")]
    contract_symbol: Option<String>,
    strike: Option<f64>,
    currency: Option<String>,
    #[serde(rename = "lastPrice")]
    last_price: Option<f64>,
    change: Option<f64>,
    #[serde(rename = "percentChange")]
    percent_change: Option<f64>,
    volume: Option<u64>,
    #[serde(rename = "openInterest")]
    open_interest: Option<u64>,
    bid: Option<f64>,
    ask: Option<f64>,
    #[serde(rename = "contractSize")]
    contract_size: Option<String>,
    #[serde(rename = "lastTradeDate")]
    last_trade_date: Option<i64>,
    #[serde(rename = "impliedVolatility")]
    implied_volatility: Option<f64>,
    #[serde(rename = "inTheMoney")]
    in_the_money: Option<bool>,
}
