//! Yahoo Finance API client
//!
//! This module fetches quotes, quote summaries and price history from the
//! Yahoo Finance HTTP API and parses them into the provider data structures.

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::future::{BoxFuture, FutureExt, Shared};
use reqwest::{header, Client, Response, StatusCode};
use serde::Deserialize;
use tracing::debug;

use super::provider::{
    AssetProfile, ChartData, ChartQuote, MarketDataProvider, PriceModule, ProviderError,
    QuoteSummary, SummaryDetailModule, UpstreamQuote,
};
use crate::policy::ChartRequest;

/// Base URL for the Yahoo Finance query API
const YAHOO_BASE_URL: &str = "https://query1.finance.yahoo.com";

/// URL that hands out the session cookie needed for the crumb
const YAHOO_COOKIE_URL: &str = "https://fc.yahoo.com";

/// Yahoo rejects requests without a browser-like user agent
const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36";

/// Modules requested from the quoteSummary endpoint
const SUMMARY_MODULES: &str = "assetProfile,price,summaryDetail";

/// Session cookie and crumb required by the quote and quoteSummary endpoints
#[derive(Debug, Clone, PartialEq)]
struct Crumb {
    cookie: String,
    crumb: String,
}

/// A handshake every concurrent caller awaits; errors are flattened to text so
/// the outcome can be cloned to each of them
type CrumbFetch = Shared<BoxFuture<'static, Result<Crumb, String>>>;

/// Crumb state shared by clones of the client
enum CrumbSlot {
    Empty,
    Negotiating(CrumbFetch),
    Ready(Crumb),
}

impl fmt::Debug for CrumbSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CrumbSlot::Empty => f.write_str("Empty"),
            CrumbSlot::Negotiating(_) => f.write_str("Negotiating"),
            CrumbSlot::Ready(crumb) => f.debug_tuple("Ready").field(crumb).finish(),
        }
    }
}

fn lock_slot(slot: &Mutex<CrumbSlot>) -> MutexGuard<'_, CrumbSlot> {
    slot.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Client for fetching market data from Yahoo Finance
#[derive(Debug, Clone)]
pub struct YahooClient {
    client: Client,
    base_url: String,
    cookie_url: String,
    crumb: Arc<Mutex<CrumbSlot>>,
}

impl YahooClient {
    /// Create a new YahooClient whose requests time out after `timeout`
    pub fn new(timeout: Duration) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()?;
        Ok(Self::with_client(client))
    }

    /// Create a new YahooClient with a custom HTTP client
    pub fn with_client(client: Client) -> Self {
        Self {
            client,
            base_url: YAHOO_BASE_URL.to_string(),
            cookie_url: YAHOO_COOKIE_URL.to_string(),
            crumb: Arc::new(Mutex::new(CrumbSlot::Empty)),
        }
    }

    /// Use a different API base URL
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Use a different URL to obtain the session cookie from
    pub fn with_cookie_url(mut self, cookie_url: impl Into<String>) -> Self {
        self.cookie_url = cookie_url.into();
        self
    }

    /// Returns the cached crumb, negotiating a new one if there is none
    ///
    /// Callers arriving while a handshake runs wait for that handshake. A failed
    /// handshake is reported to each of them once and not remembered.
    async fn ensure_crumb(&self) -> Result<Crumb, ProviderError> {
        let fetch = {
            let mut slot = lock_slot(&self.crumb);
            let running = match &*slot {
                CrumbSlot::Ready(crumb) => return Ok(crumb.clone()),
                CrumbSlot::Negotiating(fetch) => Some(fetch.clone()),
                CrumbSlot::Empty => None,
            };

            match running {
                Some(fetch) => fetch,
                None => {
                    debug!("negotiating Yahoo crumb");
                    let fetch = negotiate_crumb(
                        self.client.clone(),
                        self.cookie_url.clone(),
                        format!("{}/v1/test/getcrumb", self.base_url),
                    )
                    .map(|result| result.map_err(|e| e.to_string()))
                    .boxed()
                    .shared();
                    *slot = CrumbSlot::Negotiating(fetch.clone());
                    fetch
                }
            }
        };

        let result = fetch.clone().await;

        {
            let mut slot = lock_slot(&self.crumb);
            let settles = matches!(
                &*slot,
                CrumbSlot::Negotiating(current) if current.ptr_eq(&fetch)
            );
            if settles {
                *slot = match &result {
                    Ok(crumb) => CrumbSlot::Ready(crumb.clone()),
                    Err(_) => CrumbSlot::Empty,
                };
            }
        }

        result.map_err(|e| {
            ProviderError::Unauthorized(format!("crumb handshake failed: {}", e))
        })
    }

    /// Forgets `rejected` so the next call negotiates a new crumb
    ///
    /// A crumb negotiated since `rejected` was handed out is kept.
    fn invalidate_crumb(&self, rejected: &Crumb) {
        let mut slot = lock_slot(&self.crumb);
        if matches!(&*slot, CrumbSlot::Ready(current) if current == rejected) {
            *slot = CrumbSlot::Empty;
        }
    }

    /// Sends an authenticated GET request and returns the body of a successful response
    async fn get_with_crumb(
        &self,
        symbol: &str,
        url: &str,
        query: &[(&str, &str)],
    ) -> Result<String, ProviderError> {
        let crumb = self.ensure_crumb().await?;
        let response = self
            .client
            .get(url)
            .query(query)
            .query(&[("crumb", crumb.crumb.as_str())])
            .header(header::COOKIE, &crumb.cookie)
            .send()
            .await?;

        if matches!(
            response.status(),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN
        ) {
            self.invalidate_crumb(&crumb);
            return Err(ProviderError::Unauthorized(format!(
                "crumb rejected for {}",
                symbol
            )));
        }

        read_body(symbol, response).await
    }
}

/// Obtains a session cookie, then the crumb bound to it
async fn negotiate_crumb(
    client: Client,
    cookie_url: String,
    crumb_url: String,
) -> Result<Crumb, ProviderError> {
    let response = client.get(&cookie_url).send().await?;
    let cookie = response
        .headers()
        .get(header::SET_COOKIE)
        .and_then(|h| h.to_str().ok())
        .and_then(|s| s.split_once(';').map(|(v, _)| v.to_string()))
        .ok_or_else(|| ProviderError::Unauthorized("no session cookie".to_string()))?;

    let crumb = client
        .get(&crumb_url)
        .header(header::COOKIE, &cookie)
        .send()
        .await?
        .error_for_status()?
        .text()
        .await?;

    if crumb.trim().is_empty() {
        return Err(ProviderError::Unauthorized("empty crumb".to_string()));
    }

    Ok(Crumb { cookie, crumb })
}

/// Reads the response body, mapping error statuses to `ProviderError`
async fn read_body(symbol: &str, response: Response) -> Result<String, ProviderError> {
    let status = response.status();
    if status == StatusCode::NOT_FOUND {
        return Err(ProviderError::NotFound(symbol.to_string()));
    }
    if !status.is_success() {
        return Err(ProviderError::Status {
            symbol: symbol.to_string(),
            status: status.as_u16(),
        });
    }
    Ok(response.text().await?)
}

#[async_trait]
impl MarketDataProvider for YahooClient {
    async fn quote(&self, symbol: &str) -> Result<Option<UpstreamQuote>, ProviderError> {
        let url = format!("{}/v7/finance/quote", self.base_url);
        let text = self
            .get_with_crumb(symbol, &url, &[("symbols", symbol)])
            .await?;
        parse_quote_response(&text)
    }

    async fn quote_summary(&self, symbol: &str) -> Result<QuoteSummary, ProviderError> {
        let url = format!("{}/v10/finance/quoteSummary/{}", self.base_url, symbol);
        let text = self
            .get_with_crumb(symbol, &url, &[("modules", SUMMARY_MODULES)])
            .await?;
        parse_quote_summary_response(symbol, &text)
    }

    async fn chart(&self, symbol: &str, request: ChartRequest) -> Result<ChartData, ProviderError> {
        debug!(symbol, interval = %request.interval, "fetching chart");
        let url = format!("{}/v8/finance/chart/{}", self.base_url, symbol);
        let period1 = request.period1.timestamp().to_string();
        let period2 = Utc::now().timestamp().to_string();

        let response = self
            .client
            .get(&url)
            .query(&[
                ("period1", period1.as_str()),
                ("period2", period2.as_str()),
                ("interval", request.interval.as_str()),
            ])
            .send()
            .await?;
        let text = read_body(symbol, response).await?;
        parse_chart_response(symbol, &text)
    }
}

/// Parse a v7 quote response; an empty result list means the symbol is unknown
fn parse_quote_response(text: &str) -> Result<Option<UpstreamQuote>, ProviderError> {
    let response: QuoteEnvelope = serde_json::from_str(text)?;
    Ok(response
        .quote_response
        .result
        .into_iter()
        .next()
        .map(|q| UpstreamQuote {
            regular_market_price: q.regular_market_price,
            regular_market_change_percent: q.regular_market_change_percent,
            short_name: q.short_name,
            long_name: q.long_name,
        }))
}

/// Parse a v10 quoteSummary response
fn parse_quote_summary_response(symbol: &str, text: &str) -> Result<QuoteSummary, ProviderError> {
    let response: QuoteSummaryEnvelope = serde_json::from_str(text)?;
    let result = response
        .quote_summary
        .result
        .and_then(|r| r.into_iter().next())
        .ok_or_else(|| ProviderError::NotFound(symbol.to_string()))?;

    Ok(QuoteSummary {
        asset_profile: result.asset_profile.map(|ap| AssetProfile {
            sector: ap.sector,
            industry: ap.industry,
            long_business_summary: ap.long_business_summary,
            website: ap.website,
            full_time_employees: ap.full_time_employees,
            city: ap.city,
            country: ap.country,
        }),
        price: result.price.map(|pr| PriceModule {
            regular_market_price: raw(pr.regular_market_price),
            regular_market_change: raw(pr.regular_market_change),
            regular_market_change_percent: raw(pr.regular_market_change_percent),
            market_cap: raw(pr.market_cap),
            currency: pr.currency,
        }),
        summary_detail: result.summary_detail.map(|sd| SummaryDetailModule {
            fifty_two_week_high: raw(sd.fifty_two_week_high),
            fifty_two_week_low: raw(sd.fifty_two_week_low),
            average_daily_volume_10_day: raw(sd.average_daily_volume_10_day),
            average_volume: raw(sd.average_volume),
            dividend_yield: raw(sd.dividend_yield),
            trailing_pe: raw(sd.trailing_pe),
        }),
    })
}

/// Parse a v8 chart response, pairing each timestamp with its close
fn parse_chart_response(symbol: &str, text: &str) -> Result<ChartData, ProviderError> {
    let response: ChartEnvelope = serde_json::from_str(text)?;
    let result = response
        .chart
        .result
        .and_then(|r| r.into_iter().next())
        .ok_or_else(|| ProviderError::NotFound(symbol.to_string()))?;

    let closes = result
        .indicators
        .quote
        .into_iter()
        .next()
        .map(|q| q.close)
        .unwrap_or_default();

    let quotes = result
        .timestamp
        .iter()
        .enumerate()
        .filter_map(|(i, ts)| {
            let date = DateTime::from_timestamp(*ts, 0)?;
            Some(ChartQuote {
                date,
                close: closes.get(i).copied().flatten(),
            })
        })
        .collect();

    Ok(ChartData {
        quotes,
        currency: result.meta.currency,
    })
}

fn raw(value: Option<RawValue>) -> Option<f64> {
    value.and_then(|v| v.raw)
}

/// Numeric field wrapped as `{"raw": 1.0, "fmt": "1.00"}`, or `{}` when empty
#[derive(Debug, Deserialize)]
struct RawValue {
    raw: Option<f64>,
}

/// v7 quote response structure
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct QuoteEnvelope {
    quote_response: QuoteResult,
}

#[derive(Debug, Deserialize)]
struct QuoteResult {
    #[serde(default)]
    result: Vec<RawQuote>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawQuote {
    regular_market_price: Option<f64>,
    regular_market_change_percent: Option<f64>,
    short_name: Option<String>,
    long_name: Option<String>,
}

/// v10 quoteSummary response structure
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct QuoteSummaryEnvelope {
    quote_summary: QuoteSummaryResult,
}

#[derive(Debug, Deserialize)]
struct QuoteSummaryResult {
    result: Option<Vec<RawSummary>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawSummary {
    asset_profile: Option<RawAssetProfile>,
    price: Option<RawPrice>,
    summary_detail: Option<RawSummaryDetail>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawAssetProfile {
    sector: Option<String>,
    industry: Option<String>,
    long_business_summary: Option<String>,
    website: Option<String>,
    full_time_employees: Option<u64>,
    city: Option<String>,
    country: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawPrice {
    regular_market_price: Option<RawValue>,
    regular_market_change: Option<RawValue>,
    regular_market_change_percent: Option<RawValue>,
    market_cap: Option<RawValue>,
    currency: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawSummaryDetail {
    fifty_two_week_high: Option<RawValue>,
    fifty_two_week_low: Option<RawValue>,
    #[serde(rename = "averageDailyVolume10Day")]
    average_daily_volume_10_day: Option<RawValue>,
    average_volume: Option<RawValue>,
    dividend_yield: Option<RawValue>,
    #[serde(rename = "trailingPE")]
    trailing_pe: Option<RawValue>,
}

/// v8 chart response structure
#[derive(Debug, Deserialize)]
struct ChartEnvelope {
    chart: ChartResult,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    result: Option<Vec<RawChart>>,
}

#[derive(Debug, Deserialize)]
struct RawChart {
    meta: ChartMeta,
    /// Absent when the window contains no trading days
    #[serde(default)]
    timestamp: Vec<i64>,
    indicators: ChartIndicators,
}

#[derive(Debug, Deserialize)]
struct ChartMeta {
    currency: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChartIndicators {
    #[serde(default)]
    quote: Vec<ChartCloses>,
}

#[derive(Debug, Deserialize)]
struct ChartCloses {
    #[serde(default)]
    close: Vec<Option<f64>>,
}
