//! Cache policy for each served resource
//!
//! Maps every resource to its TTL and, for charts, maps the range id to the
//! lookback window and sampling interval requested from the provider.

use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Months, Utc};

/// The resources served by the API, each backed by its own cache
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resource {
    /// Latest quote for every tracked ticker, cached as one value
    Quotes,
    /// Profile, price and summary detail for one ticker
    StockDetail,
    /// Price history for one ticker and range
    Chart,
    /// One month of daily closes for every tracked ticker, cached as one value
    Sparklines,
}

impl Resource {
    /// How long a fetched value may be served
    pub fn ttl(self) -> Duration {
        match self {
            Resource::Quotes => Duration::from_secs(60),
            Resource::StockDetail | Resource::Chart => Duration::from_secs(5 * 60),
            Resource::Sparklines => Duration::from_secs(15 * 60),
        }
    }

    /// `Cache-Control` header value for successful responses
    pub fn cache_control(self) -> String {
        format!("public, max-age={}", self.ttl().as_secs())
    }
}

/// Sampling interval of a price series
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Interval {
    Daily,
    Weekly,
}

impl Interval {
    /// Interval identifier used by the provider
    pub fn as_str(self) -> &'static str {
        match self {
            Interval::Daily => "1d",
            Interval::Weekly => "1wk",
        }
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parameters of a history request sent to the provider
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChartRequest {
    /// Start of the requested window
    pub period1: DateTime<Utc>,
    /// Sampling interval
    pub interval: Interval,
}

impl ChartRequest {
    /// Builds a request covering the last `months` months up to `now`
    pub fn lookback(now: DateTime<Utc>, months: u32, interval: Interval) -> Self {
        let period1 = now
            .checked_sub_months(Months::new(months))
            .unwrap_or(DateTime::<Utc>::MIN_UTC);
        Self { period1, interval }
    }
}

/// Chart range selectable through the `range` query parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ChartRange {
    OneMonth,
    SixMonths,
    #[default]
    OneYear,
    FiveYears,
}

impl ChartRange {
    /// All ranges, shortest first
    pub const ALL: [ChartRange; 4] = [
        ChartRange::OneMonth,
        ChartRange::SixMonths,
        ChartRange::OneYear,
        ChartRange::FiveYears,
    ];

    /// Parses a range id such as "6M"
    ///
    /// # Returns
    /// * `Some(ChartRange)` if the id is one of 1M, 6M, 1Y, 5Y (exact match)
    /// * `None` otherwise
    pub fn from_id(id: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|range| range.id() == id)
    }

    /// Resolves the `range` query parameter, falling back to 1Y when it is
    /// missing or not recognized
    pub fn from_param(param: Option<&str>) -> Self {
        param.and_then(Self::from_id).unwrap_or_default()
    }

    /// The range id as used in the query string
    pub fn id(self) -> &'static str {
        match self {
            ChartRange::OneMonth => "1M",
            ChartRange::SixMonths => "6M",
            ChartRange::OneYear => "1Y",
            ChartRange::FiveYears => "5Y",
        }
    }

    /// Lookback window in months
    pub fn months(self) -> u32 {
        match self {
            ChartRange::OneMonth => 1,
            ChartRange::SixMonths => 6,
            ChartRange::OneYear => 12,
            ChartRange::FiveYears => 60,
        }
    }

    /// Sampling interval for this range
    pub fn interval(self) -> Interval {
        match self {
            ChartRange::FiveYears => Interval::Weekly,
            _ => Interval::Daily,
        }
    }

    /// Builds the provider request for this range ending at `now`
    pub fn request(self, now: DateTime<Utc>) -> ChartRequest {
        ChartRequest::lookback(now, self.months(), self.interval())
    }
}

impl fmt::Display for ChartRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

/// Lookback and interval used for the sparkline batch
pub const SPARKLINE_MONTHS: u32 = 1;
pub const SPARKLINE_INTERVAL: Interval = Interval::Daily;

/// Rounds a price to two decimals
pub fn round_price(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_resource_ttls() {
        assert_eq!(Resource::Quotes.ttl(), Duration::from_secs(60));
        assert_eq!(Resource::StockDetail.ttl(), Duration::from_secs(300));
        assert_eq!(Resource::Chart.ttl(), Duration::from_secs(300));
        assert_eq!(Resource::Sparklines.ttl(), Duration::from_secs(900));
    }

    #[test]
    fn test_cache_control_matches_ttl() {
        assert_eq!(Resource::Quotes.cache_control(), "public, max-age=60");
        assert_eq!(Resource::Sparklines.cache_control(), "public, max-age=900");
    }

    #[test]
    fn test_range_table() {
        let expected = [
            ("1M", 1, Interval::Daily),
            ("6M", 6, Interval::Daily),
            ("1Y", 12, Interval::Daily),
            ("5Y", 60, Interval::Weekly),
        ];

        for (id, months, interval) in expected {
            let range = ChartRange::from_id(id).expect(&format!("Range {} not found", id));
            assert_eq!(range.id(), id);
            assert_eq!(range.months(), months);
            assert_eq!(range.interval(), interval);
        }
    }

    #[test]
    fn test_range_param_falls_back_to_one_year() {
        assert_eq!(ChartRange::from_param(None), ChartRange::OneYear);
        assert_eq!(ChartRange::from_param(Some("bogus")), ChartRange::OneYear);
        assert_eq!(ChartRange::from_param(Some("")), ChartRange::OneYear);
        // Ids are case sensitive
        assert_eq!(ChartRange::from_param(Some("5y")), ChartRange::OneYear);
        assert_eq!(ChartRange::from_param(Some("5Y")), ChartRange::FiveYears);
    }

    #[test]
    fn test_request_lookback() {
        let now = Utc.with_ymd_and_hms(2024, 7, 15, 12, 0, 0).unwrap();

        let request = ChartRange::OneYear.request(now);
        assert_eq!(request.period1, Utc.with_ymd_and_hms(2023, 7, 15, 12, 0, 0).unwrap());
        assert_eq!(request.interval, Interval::Daily);

        let request = ChartRange::FiveYears.request(now);
        assert_eq!(request.period1, Utc.with_ymd_and_hms(2019, 7, 15, 12, 0, 0).unwrap());
        assert_eq!(request.interval, Interval::Weekly);
    }

    #[test]
    fn test_lookback_clamps_to_month_end() {
        let now = Utc.with_ymd_and_hms(2024, 3, 31, 0, 0, 0).unwrap();
        let request = ChartRequest::lookback(now, 1, Interval::Daily);
        assert_eq!(request.period1, Utc.with_ymd_and_hms(2024, 2, 29, 0, 0, 0).unwrap());
    }

    #[test]
    fn test_interval_ids() {
        assert_eq!(Interval::Daily.as_str(), "1d");
        assert_eq!(Interval::Weekly.to_string(), "1wk");
    }

    #[test]
    fn test_round_price() {
        assert_eq!(round_price(12.3456), 12.35);
        assert_eq!(round_price(12.344), 12.34);
        assert_eq!(round_price(7.0), 7.0);
    }
}
