pub mod config;
pub mod downloader;
pub mod error;
pub mod logging;
pub mod models;
pub mod processor;
pub mod provider;
pub mod storage;
pub mod yahoo_client;

// Re-exports for convenience
pub use config::{AppConfig, ChainFailurePolicy};
pub use error::{ProviderError, ProviderResult};
pub use models::{ExpirationChain, OptionContract, OptionLegs, OptionQuote, PriceBar, QuoteSnapshot, Summary};
pub use provider::MarketDataProvider;
pub use yahoo_client::YahooClient;
