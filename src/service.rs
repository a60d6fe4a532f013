//! Market data service
//!
//! Owns one cache per resource and the loaders that fill them. Built once at
//! startup and shared with the HTTP handlers.

use std::convert::Infallible;
use std::sync::Arc;

use chrono::Utc;
use thiserror::Error;
use tracing::{debug, warn};

use crate::batch;
use crate::cache::{CacheError, CachedData, CoalescingCache};
use crate::data::{
    find_ticker, sparkline_closes, ChartSeries, MarketDataProvider, ProviderError, QuoteRecord,
    Sparklines, StockDetail,
};
use crate::policy::{ChartRange, ChartRequest, Resource, SPARKLINE_INTERVAL, SPARKLINE_MONTHS};

/// Errors returned by the service
#[derive(Debug, Error)]
pub enum ServiceError {
    /// The ticker is not in the tracked list
    #[error("Ticker not found: {0}")]
    UnknownTicker(String),

    /// The fetch for the requested value failed as a whole
    #[error("Fetch failed: {0}")]
    Fetch(#[from] CacheError),
}

/// Cached access to quotes, stock details, charts and sparklines
pub struct MarketService {
    tickers: &'static [&'static str],
    quotes: CoalescingCache<(), Arc<Vec<QuoteRecord>>>,
    details: CoalescingCache<&'static str, Arc<StockDetail>>,
    charts: CoalescingCache<(&'static str, ChartRange), Arc<ChartSeries>>,
    sparklines: CoalescingCache<(), Arc<Sparklines>>,
}

impl MarketService {
    /// Creates the service for `tickers`, fetching from `provider`
    pub fn new(provider: Arc<dyn MarketDataProvider>, tickers: &'static [&'static str]) -> Self {
        let quotes = {
            let provider = Arc::clone(&provider);
            CoalescingCache::new("quotes", Resource::Quotes.ttl(), move |()| {
                let provider = Arc::clone(&provider);
                async move { Ok::<_, Infallible>(Arc::new(load_quotes(provider, tickers).await)) }
            })
        };

        let details = {
            let provider = Arc::clone(&provider);
            CoalescingCache::new(
                "stock_detail",
                Resource::StockDetail.ttl(),
                move |ticker: &'static str| {
                    let provider = Arc::clone(&provider);
                    async move {
                        let summary = provider.quote_summary(ticker).await?;
                        Ok::<_, ProviderError>(Arc::new(StockDetail::from_summary(summary)))
                    }
                },
            )
        };

        let charts = {
            let provider = Arc::clone(&provider);
            CoalescingCache::new(
                "chart",
                Resource::Chart.ttl(),
                move |(ticker, range): (&'static str, ChartRange)| {
                    let provider = Arc::clone(&provider);
                    async move {
                        debug!(ticker, range = %range, "loading chart");
                        let chart = provider.chart(ticker, range.request(Utc::now())).await?;
                        Ok::<_, ProviderError>(Arc::new(ChartSeries::from_chart(chart)))
                    }
                },
            )
        };

        let sparklines = CoalescingCache::new("sparklines", Resource::Sparklines.ttl(), move |()| {
            let provider = Arc::clone(&provider);
            async move { Ok::<_, Infallible>(Arc::new(load_sparklines(provider, tickers).await)) }
        });

        Self {
            tickers,
            quotes,
            details,
            charts,
            sparklines,
        }
    }

    /// The tracked tickers, in display order
    pub fn tickers(&self) -> &'static [&'static str] {
        self.tickers
    }

    /// Latest quote for every tracked ticker
    ///
    /// Always one record per ticker; tickers whose lookup failed have `null` fields.
    pub async fn quotes(&self) -> Result<CachedData<Arc<Vec<QuoteRecord>>>, ServiceError> {
        Ok(self.quotes.get(()).await?)
    }

    /// Profile, price and key statistics for `ticker` (case-insensitive)
    pub async fn stock_detail(
        &self,
        ticker: &str,
    ) -> Result<CachedData<Arc<StockDetail>>, ServiceError> {
        let ticker = self.resolve(ticker)?;
        Ok(self.details.get(ticker).await?)
    }

    /// Price history for `ticker` over `range`
    pub async fn chart(
        &self,
        ticker: &str,
        range: ChartRange,
    ) -> Result<CachedData<Arc<ChartSeries>>, ServiceError> {
        let ticker = self.resolve(ticker)?;
        Ok(self.charts.get((ticker, range)).await?)
    }

    /// Last month of daily closes for every ticker that has any
    pub async fn sparklines(&self) -> Result<CachedData<Arc<Sparklines>>, ServiceError> {
        Ok(self.sparklines.get(()).await?)
    }

    /// Maps a requested ticker to its tracked spelling, before any cache access
    fn resolve(&self, ticker: &str) -> Result<&'static str, ServiceError> {
        find_ticker(self.tickers, ticker)
            .ok_or_else(|| ServiceError::UnknownTicker(ticker.to_string()))
    }
}

/// Fetches every quote, substituting a placeholder for any failed lookup
async fn load_quotes(
    provider: Arc<dyn MarketDataProvider>,
    tickers: &'static [&'static str],
) -> Vec<QuoteRecord> {
    let outcome = batch::fan_out(
        "quotes",
        tickers,
        |symbol| {
            let provider = Arc::clone(&provider);
            async move {
                let quote = provider.quote(symbol).await?;
                Ok::<_, ProviderError>(quote.map(|q| QuoteRecord::from_upstream(symbol, q)))
            }
        },
        |record: &QuoteRecord| record.price.is_some(),
    )
    .await;

    batch::with_placeholders(outcome.items, QuoteRecord::placeholder)
}

/// Fetches one month of closes per ticker, leaving out tickers with no data
async fn load_sparklines(
    provider: Arc<dyn MarketDataProvider>,
    tickers: &'static [&'static str],
) -> Sparklines {
    let request = ChartRequest::lookback(Utc::now(), SPARKLINE_MONTHS, SPARKLINE_INTERVAL);

    let outcome = batch::fan_out(
        "sparklines",
        tickers,
        |symbol| {
            let provider = Arc::clone(&provider);
            async move {
                let chart = provider.chart(symbol, request).await?;
                let closes = sparkline_closes(&chart);
                Ok::<_, ProviderError>((!closes.is_empty()).then_some(closes))
            }
        },
        |_closes: &Vec<f64>| true,
    )
    .await;

    let sparklines = Sparklines(
        batch::drop_missing(outcome.items)
            .into_iter()
            .map(|(symbol, closes)| (symbol.to_string(), closes))
            .collect(),
    );
    if sparklines.is_empty() {
        warn!("no sparkline data for any ticker");
    }
    sparklines
}
