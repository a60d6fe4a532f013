//! Shared fixtures for integration tests

#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::body::{to_bytes, Body};
use axum::http::{HeaderMap, Request, StatusCode};
use axum::Router;
use chrono::{TimeZone, Utc};
use tower::ServiceExt;

use screener::api::app_router;
use screener::data::{
    AssetProfile, ChartData, ChartQuote, MarketDataProvider, PriceModule, ProviderError,
    QuoteSummary, SummaryDetailModule, UpstreamQuote,
};
use screener::policy::ChartRequest;
use screener::service::MarketService;

/// Tickers used by the fake provider
///
/// BBB.PA fails every quote lookup. CCC.PA has an empty price history.
pub static TICKERS: [&str; 3] = ["AAA.PA", "BBB.PA", "CCC.PA"];

/// In-memory provider that counts calls
#[derive(Default)]
pub struct FakeProvider {
    pub quote_calls: AtomicUsize,
    pub summary_calls: AtomicUsize,
    pub chart_calls: AtomicUsize,
    pub chart_requests: Mutex<Vec<(String, ChartRequest)>>,
    /// When set, every quote summary lookup fails
    pub fail_summary: AtomicBool,
}

impl FakeProvider {
    pub fn total_calls(&self) -> usize {
        self.quote_calls.load(Ordering::SeqCst)
            + self.summary_calls.load(Ordering::SeqCst)
            + self.chart_calls.load(Ordering::SeqCst)
    }

    pub fn last_chart_request(&self) -> Option<(String, ChartRequest)> {
        self.chart_requests.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl MarketDataProvider for FakeProvider {
    async fn quote(&self, symbol: &str) -> Result<Option<UpstreamQuote>, ProviderError> {
        self.quote_calls.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(20)).await;

        if symbol == "BBB.PA" {
            return Err(ProviderError::Status {
                symbol: symbol.to_string(),
                status: 500,
            });
        }

        Ok(Some(UpstreamQuote {
            regular_market_price: Some(42.5),
            regular_market_change_percent: Some(-1.25),
            short_name: None,
            long_name: Some(format!("{} SA", symbol)),
        }))
    }

    async fn quote_summary(&self, symbol: &str) -> Result<QuoteSummary, ProviderError> {
        self.summary_calls.fetch_add(1, Ordering::SeqCst);

        if self.fail_summary.load(Ordering::SeqCst) {
            return Err(ProviderError::NotFound(symbol.to_string()));
        }

        Ok(QuoteSummary {
            asset_profile: Some(AssetProfile {
                sector: Some("Consumer Defensive".to_string()),
                industry: Some("Household & Personal Products".to_string()),
                long_business_summary: Some("Makes cosmetics.".to_string()),
                website: Some("https://example.com".to_string()),
                full_time_employees: Some(90000),
                city: Some("Clichy".to_string()),
                country: Some("France".to_string()),
            }),
            price: Some(PriceModule {
                regular_market_price: Some(420.1),
                regular_market_change: Some(2.3),
                regular_market_change_percent: Some(0.55),
                market_cap: Some(2.2e11),
                currency: None,
            }),
            summary_detail: Some(SummaryDetailModule {
                fifty_two_week_high: Some(460.0),
                fifty_two_week_low: Some(380.0),
                average_daily_volume_10_day: None,
                average_volume: Some(350000.0),
                dividend_yield: Some(0.015),
                trailing_pe: Some(31.2),
            }),
        })
    }

    async fn chart(&self, symbol: &str, request: ChartRequest) -> Result<ChartData, ProviderError> {
        self.chart_calls.fetch_add(1, Ordering::SeqCst);
        self.chart_requests
            .lock()
            .unwrap()
            .push((symbol.to_string(), request));

        if symbol == "CCC.PA" {
            return Ok(ChartData::default());
        }

        Ok(ChartData {
            quotes: vec![
                ChartQuote {
                    date: Utc.with_ymd_and_hms(2024, 7, 8, 7, 0, 0).unwrap(),
                    close: Some(10.126),
                },
                ChartQuote {
                    date: Utc.with_ymd_and_hms(2024, 7, 9, 7, 0, 0).unwrap(),
                    close: None,
                },
                ChartQuote {
                    date: Utc.with_ymd_and_hms(2024, 7, 10, 7, 0, 0).unwrap(),
                    close: Some(10.5),
                },
            ],
            currency: Some("EUR".to_string()),
        })
    }
}

/// Router over a fresh service backed by `provider`
pub fn app(provider: Arc<FakeProvider>) -> Router {
    let service = Arc::new(MarketService::new(provider, &TICKERS));
    app_router(service, None)
}

/// Sends a GET request and returns status, headers and the raw body
pub async fn get_raw(app: &Router, uri: &str) -> (StatusCode, HeaderMap, String) {
    let response = app
        .clone()
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .expect("Router should respond");

    let status = response.status();
    let headers = response.headers().clone();
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("Body should be readable");

    (status, headers, String::from_utf8(bytes.to_vec()).unwrap())
}

/// Sends a GET request and parses the body as JSON
pub async fn get_json(app: &Router, uri: &str) -> (StatusCode, HeaderMap, serde_json::Value) {
    let (status, headers, body) = get_raw(app, uri).await;
    let json = serde_json::from_str(&body).expect("Body should be JSON");
    (status, headers, json)
}
