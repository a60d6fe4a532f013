//! Market data provider interface
//!
//! The caches only depend on this trait, so the upstream service can be
//! swapped (or faked in tests) without touching the caching layer.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::policy::ChartRequest;

/// Errors that can occur when talking to the market data provider
#[derive(Debug, Error)]
pub enum ProviderError {
    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),

    /// Failed to parse JSON response
    #[error("Failed to parse JSON response: {0}")]
    ParseError(#[from] serde_json::Error),

    /// The provider answered with a non-success status
    #[error("Provider returned HTTP {status} for {symbol}")]
    Status { symbol: String, status: u16 },

    /// The provider could not authenticate the request
    #[error("Provider authentication failed: {0}")]
    Unauthorized(String),

    /// The provider returned no data for the symbol
    #[error("No data returned for {0}")]
    NotFound(String),
}

/// Latest quote fields used by the quote list
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UpstreamQuote {
    pub regular_market_price: Option<f64>,
    pub regular_market_change_percent: Option<f64>,
    pub short_name: Option<String>,
    pub long_name: Option<String>,
}

/// Company profile module of a quote summary
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AssetProfile {
    pub sector: Option<String>,
    pub industry: Option<String>,
    pub long_business_summary: Option<String>,
    pub website: Option<String>,
    pub full_time_employees: Option<u64>,
    pub city: Option<String>,
    pub country: Option<String>,
}

/// Price module of a quote summary
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PriceModule {
    pub regular_market_price: Option<f64>,
    pub regular_market_change: Option<f64>,
    pub regular_market_change_percent: Option<f64>,
    pub market_cap: Option<f64>,
    pub currency: Option<String>,
}

/// Summary detail module of a quote summary
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SummaryDetailModule {
    pub fifty_two_week_high: Option<f64>,
    pub fifty_two_week_low: Option<f64>,
    pub average_daily_volume_10_day: Option<f64>,
    pub average_volume: Option<f64>,
    pub dividend_yield: Option<f64>,
    pub trailing_pe: Option<f64>,
}

/// Quote summary with the profile, price and summary detail modules
///
/// Any module the provider omits is `None`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QuoteSummary {
    pub asset_profile: Option<AssetProfile>,
    pub price: Option<PriceModule>,
    pub summary_detail: Option<SummaryDetailModule>,
}

/// A single bar of a price history
#[derive(Debug, Clone, PartialEq)]
pub struct ChartQuote {
    pub date: DateTime<Utc>,
    /// Close price, `None` for bars without trades
    pub close: Option<f64>,
}

/// Price history returned by the provider
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChartData {
    pub quotes: Vec<ChartQuote>,
    pub currency: Option<String>,
}

/// The three lookups the caches need from the upstream service
#[async_trait]
pub trait MarketDataProvider: Send + Sync {
    /// Fetches the latest quote for `symbol`
    ///
    /// # Returns
    /// * `Ok(Some(UpstreamQuote))` - The quote
    /// * `Ok(None)` - The provider knows nothing about the symbol
    /// * `Err(ProviderError)` - If the request or parsing fails
    async fn quote(&self, symbol: &str) -> Result<Option<UpstreamQuote>, ProviderError>;

    /// Fetches the profile, price and summary detail modules for `symbol`
    async fn quote_summary(&self, symbol: &str) -> Result<QuoteSummary, ProviderError>;

    /// Fetches the price history for `symbol` described by `request`
    async fn chart(&self, symbol: &str, request: ChartRequest) -> Result<ChartData, ProviderError>;
}
