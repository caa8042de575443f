use crate::error::ProviderResult;
use crate::models::{ExpirationChain, PriceBar, QuoteSnapshot};
use chrono::NaiveDate;

/// Source of prices, quotes and option chains for a ticker.
///
/// Every call is awaited on its own; implementations need not be shareable
/// across tasks.
#[allow(async_fn_in_trait)]
pub trait MarketDataProvider {
    /// Daily bars for a lookback token such as `1y` or `5d`, oldest first
    async fn history(&self, symbol: &str, period: &str) -> ProviderResult<Vec<PriceBar>>;

    async fn quote(&self, symbol: &str) -> ProviderResult<QuoteSnapshot>;

    /// Listed expirations in provider order
    async fn expirations(&self, symbol: &str) -> ProviderResult<Vec<NaiveDate>>;

    async fn option_chain(
        &self,
        symbol: &str,
        expiration: NaiveDate,
    ) -> ProviderResult<ExpirationChain>;
}
