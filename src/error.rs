use thiserror::Error;

/// Failures talking to the market-data provider
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("Request error: {0}")]
    Request(String),

    #[error("HTTP {status}: {preview}")]
    Status { status: u16, preview: String },

    #[error("Non-JSON response: {0}")]
    NonJsonResponse(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("No data returned for {0}")]
    NoData(String),
}

impl From<reqwest::Error> for ProviderError {
    fn from(err: reqwest::Error) -> Self {
        ProviderError::Request(err.to_string())
    }
}

impl From<serde_json::Error> for ProviderError {
    fn from(err: serde_json::Error) -> Self {
        ProviderError::Parse(err.to_string())
    }
}

pub type ProviderResult<T> = std::result::Result<T, ProviderError>;
