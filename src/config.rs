use std::path::PathBuf;
use std::time::Duration;

// -----------------------------------------------
// YAHOO FINANCE ENDPOINTS
// -----------------------------------------------
pub const YAHOO_CHART_BASE_URL: &str = "https://query1.finance.yahoo.com/v8/finance";
pub const YAHOO_QUOTE_BASE_URL: &str = "https://query1.finance.yahoo.com/v7/finance";

/// Sets the session cookie; the response status itself is irrelevant
pub const YAHOO_COOKIE_URL: &str = "https://fc.yahoo.com";
pub const YAHOO_CRUMB_URL: &str = "https://query1.finance.yahoo.com/v1/test/getcrumb";

pub fn yahoo_chart_url(symbol: &str, period: &str) -> String {
    format!(
        "{}/chart/{}?range={}&interval=1d&events=div%2Csplits",
        YAHOO_CHART_BASE_URL,
        urlencoding::encode(symbol),
        urlencoding::encode(period)
    )
}

pub fn yahoo_quote_url(symbol: &str) -> String {
    format!(
        "{}/quote?symbols={}",
        YAHOO_QUOTE_BASE_URL,
        urlencoding::encode(symbol)
    )
}

pub fn yahoo_options_url(symbol: &str) -> String {
    format!(
        "{}/options/{}",
        YAHOO_QUOTE_BASE_URL,
        urlencoding::encode(symbol)
    )
}

pub fn yahoo_option_chain_url(symbol: &str, expiration_ts: i64) -> String {
    format!("{}?date={}", yahoo_options_url(symbol), expiration_ts)
}

/// Append the session crumb the quote and options endpoints require
pub fn with_crumb(url: &str, crumb: &str) -> String {
    let sep = if url.contains('?') { '&' } else { '?' };
    format!("{}{}crumb={}", url, sep, urlencoding::encode(crumb))
}

// -----------------------------------------------
// HTTP CLIENT CONFIG
// -----------------------------------------------
pub const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
                               AppleWebKit/537.36 (KHTML, like Gecko) \
                               Chrome/131.0.0.0 Safari/537.36";

pub const ACCEPT_LANGUAGES: &[&str] = &[
    "en-US,en;q=0.9",
    "en-GB,en;q=0.8",
    "en-CA,en;q=0.9",
];

pub const HTTP_TIMEOUT: Duration = Duration::from_secs(20);

// -----------------------------------------------
// DATA COLLECTION
// -----------------------------------------------
pub const SYMBOL: &str = "AAPL";
pub const DATA_PERIOD: &str = "1y";
pub const VOLATILITY_WINDOW: usize = 252;

/// Short lookback used by the current-price and risk-free fallbacks
pub const SHORT_PERIOD: &str = "5d";

// -----------------------------------------------
// OPTION FOCUS
// -----------------------------------------------
pub const TARGET_EXPIRY_DAYS: i64 = 90;
pub const EXPIRY_TOLERANCE_DAYS: i64 = 15;
pub const MAX_EXPIRATIONS: usize = 5;
pub const DAYS_PER_YEAR: f64 = 365.25;

// -----------------------------------------------
// RISK-FREE RATE
// -----------------------------------------------
/// 13-week Treasury bill yield index, quoted in percent
pub const RISK_FREE_PROXY_SYMBOL: &str = "^IRX";
pub const FALLBACK_RISK_FREE_RATE: f64 = 0.0525;

// -----------------------------------------------
// OUTPUT
// -----------------------------------------------
pub const DATA_DIR: &str = "data";
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

// -----------------------------------------------
// RUNTIME CONFIGURATION
// -----------------------------------------------

/// How a failed expiration affects the rest of the chain fetch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChainFailurePolicy {
    /// Log the failed expiration and keep the others
    #[default]
    SkipExpiration,
    /// Any failed expiration empties both legs
    DiscardAll,
}

/// Everything one run needs, resolved once at startup
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub symbol: String,
    pub period: String,
    pub volatility_window: usize,
    pub target_expiry_days: i64,
    pub expiry_tolerance_days: i64,
    pub max_expirations: usize,
    pub fallback_risk_free_rate: f64,
    pub chain_failure_policy: ChainFailurePolicy,
    pub data_dir: PathBuf,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            symbol: SYMBOL.to_string(),
            period: DATA_PERIOD.to_string(),
            volatility_window: VOLATILITY_WINDOW,
            target_expiry_days: TARGET_EXPIRY_DAYS,
            expiry_tolerance_days: EXPIRY_TOLERANCE_DAYS,
            max_expirations: MAX_EXPIRATIONS,
            fallback_risk_free_rate: FALLBACK_RISK_FREE_RATE,
            chain_failure_policy: ChainFailurePolicy::default(),
            data_dir: PathBuf::from(DATA_DIR),
        }
    }
}

impl AppConfig {
    /// Defaults, with the symbol and output directory overridable from the environment
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Some(symbol) = get_env_symbol() {
            config.symbol = symbol;
        }
        if let Ok(dir) = std::env::var("OPTIONS_DL_DATA_DIR") {
            if !dir.trim().is_empty() {
                config.data_dir = PathBuf::from(dir);
            }
        }

        config
    }

    pub fn stock_file(&self) -> PathBuf {
        self.data_dir.join(format!("{}_stock.csv", self.symbol))
    }

    pub fn calls_file(&self) -> PathBuf {
        self.data_dir.join(format!("{}_calls.csv", self.symbol))
    }

    pub fn puts_file(&self) -> PathBuf {
        self.data_dir.join(format!("{}_puts.csv", self.symbol))
    }

    pub fn summary_file(&self) -> PathBuf {
        self.data_dir.join(format!("{}_summary.json", self.symbol))
    }
}

/// Symbol override, upper-cased; blank values are ignored
fn get_env_symbol() -> Option<String> {
    std::env::var("OPTIONS_DL_SYMBOL")
        .ok()
        .map(|s| s.trim().to_uppercase())
        .filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_constants() {
        let config = AppConfig::default();
        assert_eq!(config.symbol, "AAPL");
        assert_eq!(config.period, "1y");
        assert_eq!(config.volatility_window, 252);
        assert_eq!(config.target_expiry_days, 90);
        assert_eq!(config.expiry_tolerance_days, 15);
        assert_eq!(config.max_expirations, 5);
        assert_eq!(config.fallback_risk_free_rate, 0.0525);
        assert_eq!(config.chain_failure_policy, ChainFailurePolicy::SkipExpiration);
    }

    #[test]
    fn test_output_file_names() {
        let config = AppConfig::default();
        assert_eq!(config.stock_file(), PathBuf::from("data/AAPL_stock.csv"));
        assert_eq!(config.calls_file(), PathBuf::from("data/AAPL_calls.csv"));
        assert_eq!(config.puts_file(), PathBuf::from("data/AAPL_puts.csv"));
        assert_eq!(config.summary_file(), PathBuf::from("data/AAPL_summary.json"));
    }

    #[test]
    fn test_urls_encode_index_symbols() {
        assert_eq!(
            yahoo_chart_url("^IRX", "5d"),
            "https://query1.finance.yahoo.com/v8/finance/chart/%5EIRX?range=5d&interval=1d&events=div%2Csplits"
        );
        assert_eq!(
            yahoo_option_chain_url("AAPL", 1_700_000_000),
            "https://query1.finance.yahoo.com/v7/finance/options/AAPL?date=1700000000"
        );
    }

    #[test]
    fn test_with_crumb_picks_separator_and_encodes() {
        assert_eq!(
            with_crumb(&yahoo_options_url("AAPL"), "a/b.c"),
            "https://query1.finance.yahoo.com/v7/finance/options/AAPL?crumb=a%2Fb.c"
        );
        assert_eq!(
            with_crumb(&yahoo_option_chain_url("AAPL", 1_700_000_000), "xyz"),
            "https://query1.finance.yahoo.com/v7/finance/options/AAPL?date=1700000000&crumb=xyz"
        );
    }
}
