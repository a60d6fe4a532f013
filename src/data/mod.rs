//! Core data models for the screener API
//!
//! This module contains the records served over HTTP, the provider interface
//! they are built from, and the static list of tracked tickers.

pub mod provider;
pub mod tickers;
pub mod yahoo;

pub use provider::{
    AssetProfile, ChartData, ChartQuote, MarketDataProvider, PriceModule, ProviderError,
    QuoteSummary, SummaryDetailModule, UpstreamQuote,
};
pub use tickers::{all_tickers, find_ticker, TICKERS};
pub use yahoo::YahooClient;

use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};

use crate::policy::round_price;

/// Currency reported when the provider does not give one
pub const DEFAULT_CURRENCY: &str = "EUR";

/// Latest quote for one ticker in the quote list
///
/// A ticker whose lookup failed is still listed, with every other field `null`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteRecord {
    pub symbol: String,
    pub price: Option<f64>,
    pub change_percent: Option<f64>,
    pub name: Option<String>,
}

impl QuoteRecord {
    /// Record for a ticker with no usable quote
    pub fn placeholder(symbol: &str) -> Self {
        Self {
            symbol: symbol.to_string(),
            price: None,
            change_percent: None,
            name: None,
        }
    }

    /// Builds the record from a provider quote, preferring the short name
    pub fn from_upstream(symbol: &str, quote: UpstreamQuote) -> Self {
        Self {
            symbol: symbol.to_string(),
            price: quote.regular_market_price,
            change_percent: quote.regular_market_change_percent,
            name: non_empty(quote.short_name).or_else(|| non_empty(quote.long_name)),
        }
    }
}

/// Company profile section of the stock detail
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CompanyProfile {
    pub sector: Option<String>,
    pub industry: Option<String>,
    pub description: Option<String>,
    pub website: Option<String>,
    pub employees: Option<u64>,
    pub city: Option<String>,
    pub country: Option<String>,
}

/// Price section of the stock detail
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceSummary {
    pub regular_market_price: Option<f64>,
    pub regular_market_change: Option<f64>,
    pub regular_market_change_percent: Option<f64>,
    pub market_cap: Option<f64>,
    pub currency: String,
}

/// Key statistics section of the stock detail
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyStatistics {
    pub fifty_two_week_high: Option<f64>,
    pub fifty_two_week_low: Option<f64>,
    pub average_volume: Option<f64>,
    pub dividend_yield: Option<f64>,
    #[serde(rename = "trailingPE")]
    pub trailing_pe: Option<f64>,
}

/// Profile, price and key statistics for one ticker
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StockDetail {
    pub profile: CompanyProfile,
    pub price: PriceSummary,
    pub summary_detail: KeyStatistics,
}

impl StockDetail {
    /// Builds the detail from a quote summary; missing modules yield `null` fields
    pub fn from_summary(summary: QuoteSummary) -> Self {
        let ap = summary.asset_profile.unwrap_or_default();
        let pr = summary.price.unwrap_or_default();
        let sd = summary.summary_detail.unwrap_or_default();

        Self {
            profile: CompanyProfile {
                sector: non_empty(ap.sector),
                industry: non_empty(ap.industry),
                description: non_empty(ap.long_business_summary),
                website: non_empty(ap.website),
                employees: ap.full_time_employees.filter(|n| *n > 0),
                city: non_empty(ap.city),
                country: non_empty(ap.country),
            },
            price: PriceSummary {
                regular_market_price: pr.regular_market_price,
                regular_market_change: pr.regular_market_change,
                regular_market_change_percent: pr.regular_market_change_percent,
                market_cap: pr.market_cap,
                currency: currency_or_default(pr.currency),
            },
            summary_detail: KeyStatistics {
                fifty_two_week_high: sd.fifty_two_week_high,
                fifty_two_week_low: sd.fifty_two_week_low,
                average_volume: sd.average_daily_volume_10_day.or(sd.average_volume),
                dividend_yield: sd.dividend_yield,
                trailing_pe: sd.trailing_pe,
            },
        }
    }
}

/// One point of a price chart
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartPoint {
    /// Trading day as YYYY-MM-DD (UTC)
    pub time: String,
    /// Close rounded to two decimals
    pub value: f64,
}

/// Price history for one ticker and range
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartSeries {
    pub quotes: Vec<ChartPoint>,
    pub currency: String,
}

impl ChartSeries {
    /// Builds the series from provider history, skipping bars without a close
    pub fn from_chart(chart: ChartData) -> Self {
        let quotes = chart
            .quotes
            .into_iter()
            .filter_map(|q| {
                q.close.map(|close| ChartPoint {
                    time: q.date.format("%Y-%m-%d").to_string(),
                    value: round_price(close),
                })
            })
            .collect();

        Self {
            quotes,
            currency: currency_or_default(chart.currency),
        }
    }
}

/// Rounded closes of a price history, skipping bars without a close
pub fn sparkline_closes(chart: &ChartData) -> Vec<f64> {
    chart
        .quotes
        .iter()
        .filter_map(|q| q.close.map(round_price))
        .collect()
}

/// Recent closes per ticker, in ticker list order
///
/// Serialized as a JSON object keyed by ticker. Tickers without data are not
/// present at all.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Sparklines(pub Vec<(String, Vec<f64>)>);

impl Sparklines {
    /// Closes for `ticker`, if present
    #[cfg(test)]
    pub fn get(&self, ticker: &str) -> Option<&[f64]> {
        self.0
            .iter()
            .find(|(t, _)| t == ticker)
            .map(|(_, closes)| closes.as_slice())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Serialize for Sparklines {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.len()))?;
        for (ticker, closes) in &self.0 {
            map.serialize_entry(ticker, closes)?;
        }
        map.end()
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.is_empty())
}

fn currency_or_default(currency: Option<String>) -> String {
    non_empty(currency).unwrap_or_else(|| DEFAULT_CURRENCY.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    #[test]
    fn test_quote_record_placeholder_serializes_nulls() {
        let record = QuoteRecord::placeholder("OR.PA");
        let json = serde_json::to_value(&record).unwrap();

        assert_eq!(
            json,
            serde_json::json!({"symbol": "OR.PA", "price": null, "changePercent": null, "name": null})
        );
    }

    #[test]
    fn test_quote_record_name_fallback() {
        let quote = UpstreamQuote {
            regular_market_price: Some(10.5),
            regular_market_change_percent: Some(1.25),
            short_name: Some(String::new()),
            long_name: Some("Sopra Steria Group".to_string()),
        };

        let record = QuoteRecord::from_upstream("SOP.PA", quote);
        assert_eq!(record.name.as_deref(), Some("Sopra Steria Group"));
        assert_eq!(record.price, Some(10.5));

        let record = QuoteRecord::from_upstream("SOP.PA", UpstreamQuote::default());
        assert!(record.name.is_none());
    }

    #[test]
    fn test_stock_detail_from_empty_summary() {
        let detail = StockDetail::from_summary(QuoteSummary::default());

        assert_eq!(detail.profile, CompanyProfile::default());
        assert_eq!(detail.price.currency, "EUR");
        assert!(detail.price.regular_market_price.is_none());
        assert_eq!(detail.summary_detail, KeyStatistics::default());
    }

    #[test]
    fn test_stock_detail_field_mapping() {
        let summary = QuoteSummary {
            asset_profile: Some(AssetProfile {
                sector: Some("Technology".to_string()),
                industry: Some(String::new()),
                long_business_summary: Some("Makes software.".to_string()),
                full_time_employees: Some(0),
                ..Default::default()
            }),
            price: Some(PriceModule {
                regular_market_price: Some(0.0),
                currency: Some("USD".to_string()),
                ..Default::default()
            }),
            summary_detail: Some(SummaryDetailModule {
                average_volume: Some(1200.0),
                trailing_pe: Some(18.4),
                ..Default::default()
            }),
        };

        let detail = StockDetail::from_summary(summary);
        assert_eq!(detail.profile.sector.as_deref(), Some("Technology"));
        assert!(detail.profile.industry.is_none(), "Empty strings become null");
        assert!(detail.profile.employees.is_none(), "Zero employees becomes null");
        assert_eq!(detail.profile.description.as_deref(), Some("Makes software."));
        assert_eq!(detail.price.regular_market_price, Some(0.0), "Zero prices are kept");
        assert_eq!(detail.price.currency, "USD");
        assert_eq!(detail.summary_detail.average_volume, Some(1200.0));

        let json = serde_json::to_value(&detail).unwrap();
        assert_eq!(json["summaryDetail"]["trailingPE"], 18.4);
        assert!(json["price"]["regularMarketChange"].is_null());
    }

    #[test]
    fn test_average_volume_prefers_ten_day() {
        let summary = QuoteSummary {
            summary_detail: Some(SummaryDetailModule {
                average_daily_volume_10_day: Some(500.0),
                average_volume: Some(900.0),
                ..Default::default()
            }),
            ..Default::default()
        };

        let detail = StockDetail::from_summary(summary);
        assert_eq!(detail.summary_detail.average_volume, Some(500.0));
    }

    fn sample_chart() -> ChartData {
        ChartData {
            quotes: vec![
                ChartQuote {
                    date: Utc.with_ymd_and_hms(2024, 7, 8, 7, 0, 0).unwrap(),
                    close: Some(411.456),
                },
                ChartQuote {
                    date: Utc.with_ymd_and_hms(2024, 7, 9, 7, 0, 0).unwrap(),
                    close: None,
                },
                ChartQuote {
                    date: Utc.with_ymd_and_hms(2024, 7, 10, 7, 0, 0).unwrap(),
                    close: Some(413.001),
                },
            ],
            currency: None,
        }
    }

    #[test]
    fn test_chart_series_skips_missing_closes_and_rounds() {
        let series = ChartSeries::from_chart(sample_chart());

        assert_eq!(series.currency, "EUR");
        assert_eq!(
            series.quotes,
            vec![
                ChartPoint { time: "2024-07-08".to_string(), value: 411.46 },
                ChartPoint { time: "2024-07-10".to_string(), value: 413.0 },
            ]
        );
    }

    #[test]
    fn test_sparkline_closes() {
        assert_eq!(sparkline_closes(&sample_chart()), vec![411.46, 413.0]);
        assert!(sparkline_closes(&ChartData::default()).is_empty());
    }

    #[test]
    fn test_sparklines_serialize_in_list_order() {
        let sparklines = Sparklines(vec![
            ("SU.PA".to_string(), vec![1.5, 2.0]),
            ("AI.PA".to_string(), vec![3.25]),
        ]);

        let json = serde_json::to_string(&sparklines).unwrap();
        assert_eq!(json, r#"{"SU.PA":[1.5,2.0],"AI.PA":[3.25]}"#);
        assert_eq!(sparklines.get("AI.PA"), Some(&[3.25][..]));
        assert!(sparklines.get("OR.PA").is_none());
        assert_eq!(sparklines.len(), 2);
    }
}
