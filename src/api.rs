//! HTTP routes
//!
//! Thin handlers over [`MarketService`]: resolve the request, read through
//! the cache and shape the JSON body.

use std::path::Path;
use std::sync::Arc;

use axum::{
    extract::{Path as UrlPath, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tower_http::{services::ServeDir, trace::TraceLayer};
use tracing::warn;

use crate::data::{ChartPoint, QuoteRecord, Sparklines, StockDetail};
use crate::policy::{ChartRange, Resource};
use crate::service::{MarketService, ServiceError};

/// Errors returned to HTTP clients
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Ticker not found")]
    TickerNotFound,

    /// Total failure of a fetch, carrying the message for the route
    #[error("{0}")]
    Internal(&'static str),
}

impl ApiError {
    /// Maps a service error, using `failure` as the message for fetch failures
    fn from_service(err: ServiceError, failure: &'static str) -> Self {
        match err {
            ServiceError::UnknownTicker(_) => ApiError::TickerNotFound,
            ServiceError::Fetch(e) => {
                warn!(error = %e, "{}", failure);
                ApiError::Internal(failure)
            }
        }
    }
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match self {
            ApiError::TickerNotFound => StatusCode::NOT_FOUND,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let body = Json(ErrorBody {
            error: self.to_string(),
        });
        (status, body).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Serialize)]
struct QuotesBody<'a> {
    quotes: &'a [QuoteRecord],
    timestamp: i64,
}

#[derive(Serialize)]
struct StockDetailBody<'a> {
    #[serde(flatten)]
    detail: &'a StockDetail,
    timestamp: i64,
}

#[derive(Serialize)]
struct ChartBody<'a> {
    quotes: &'a [ChartPoint],
    currency: &'a str,
    timestamp: i64,
}

#[derive(Debug, Deserialize)]
struct ChartParams {
    range: Option<String>,
}

/// JSON response with the cache lifetime of `resource`
fn cached_json<T: Serialize>(resource: Resource, body: T) -> Response {
    (
        [(header::CACHE_CONTROL, resource.cache_control())],
        Json(body),
    )
        .into_response()
}

async fn get_quotes(State(service): State<Arc<MarketService>>) -> ApiResult<Response> {
    let cached = service
        .quotes()
        .await
        .map_err(|e| ApiError::from_service(e, "Failed to fetch quotes"))?;

    Ok(cached_json(
        Resource::Quotes,
        QuotesBody {
            quotes: &cached.data,
            timestamp: cached.cached_at.timestamp_millis(),
        },
    ))
}

async fn get_stock_detail(
    State(service): State<Arc<MarketService>>,
    UrlPath(ticker): UrlPath<String>,
) -> ApiResult<Response> {
    let cached = service
        .stock_detail(&ticker)
        .await
        .map_err(|e| ApiError::from_service(e, "Failed to fetch stock details"))?;

    Ok(cached_json(
        Resource::StockDetail,
        StockDetailBody {
            detail: &cached.data,
            timestamp: cached.cached_at.timestamp_millis(),
        },
    ))
}

async fn get_chart(
    State(service): State<Arc<MarketService>>,
    UrlPath(ticker): UrlPath<String>,
    Query(params): Query<ChartParams>,
) -> ApiResult<Response> {
    let range = ChartRange::from_param(params.range.as_deref());
    let cached = service
        .chart(&ticker, range)
        .await
        .map_err(|e| ApiError::from_service(e, "Failed to fetch chart data"))?;

    Ok(cached_json(
        Resource::Chart,
        ChartBody {
            quotes: &cached.data.quotes,
            currency: &cached.data.currency,
            timestamp: cached.cached_at.timestamp_millis(),
        },
    ))
}

async fn get_sparklines(State(service): State<Arc<MarketService>>) -> ApiResult<Response> {
    let cached = service
        .sparklines()
        .await
        .map_err(|e| ApiError::from_service(e, "Failed to fetch sparklines"))?;

    let sparklines: &Sparklines = &cached.data;
    Ok(cached_json(Resource::Sparklines, sparklines))
}

/// Builds the application router
///
/// # Arguments
/// * `service` - Shared market data service
/// * `static_dir` - Directory served for any path that is not an API route
pub fn app_router(service: Arc<MarketService>, static_dir: Option<&Path>) -> Router {
    let router = Router::new()
        .route("/api/quotes", get(get_quotes))
        .route("/api/stock/{ticker}", get(get_stock_detail))
        .route("/api/stock/{ticker}/chart", get(get_chart))
        .route("/api/sparklines", get(get_sparklines))
        .with_state(service);

    let router = match static_dir {
        Some(dir) => router.fallback_service(ServeDir::new(dir)),
        None => router,
    };

    router.layer(TraceLayer::new_for_http())
}
