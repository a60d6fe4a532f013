//! Best-effort fan-out of per-ticker lookups
//!
//! Every lookup runs concurrently and is awaited to completion. A failed
//! lookup only affects its own item, never the batch.

use std::fmt::Display;
use std::future::Future;

use futures::future::join_all;
use tracing::{info, warn};

/// Outcome of one lookup in a batch
#[derive(Debug, Clone, PartialEq)]
pub struct BatchItem<R> {
    pub symbol: &'static str,
    /// `None` if the lookup failed or returned nothing usable
    pub record: Option<R>,
}

/// Items of a finished batch, with the number counted as usable in the summary
#[derive(Debug, Clone, PartialEq)]
pub struct BatchOutcome<R> {
    /// One item per symbol, in input order
    pub items: Vec<BatchItem<R>>,
    pub ok: usize,
}

/// Runs `lookup` for every symbol concurrently and collects one item per
/// symbol, in input order
///
/// Errors are logged and recorded as a missing record, exactly like a lookup
/// that succeeded with `None`. This function never fails.
///
/// # Arguments
/// * `batch` - Label for log output
/// * `symbols` - The tickers to look up
/// * `lookup` - Per-ticker lookup
/// * `usable` - Whether a record counts as OK in the logged summary
pub async fn fan_out<R, E, F, Fut, U>(
    batch: &str,
    symbols: &[&'static str],
    lookup: F,
    usable: U,
) -> BatchOutcome<R>
where
    F: Fn(&'static str) -> Fut,
    Fut: Future<Output = Result<Option<R>, E>>,
    E: Display,
    U: Fn(&R) -> bool,
{
    info!(batch, count = symbols.len(), "fetching batch");

    let items = join_all(symbols.iter().map(|&symbol| {
        let lookup = lookup(symbol);
        async move {
            let record = match lookup.await {
                Ok(record) => record,
                Err(e) => {
                    warn!(batch, symbol, error = %e, "lookup failed");
                    None
                }
            };
            BatchItem { symbol, record }
        }
    }))
    .await;

    let ok = items
        .iter()
        .filter(|item| item.record.as_ref().is_some_and(&usable))
        .count();
    info!(batch, ok, total = items.len(), "batch done");
    BatchOutcome { items, ok }
}

/// One record per item, substituting `placeholder(symbol)` for missing ones
pub fn with_placeholders<R>(
    items: Vec<BatchItem<R>>,
    placeholder: impl Fn(&str) -> R,
) -> Vec<R> {
    items
        .into_iter()
        .map(|item| item.record.unwrap_or_else(|| placeholder(item.symbol)))
        .collect()
}

/// Only the items that produced a record, keeping input order
pub fn drop_missing<R>(items: Vec<BatchItem<R>>) -> Vec<(&'static str, R)> {
    items
        .into_iter()
        .filter_map(|item| item.record.map(|record| (item.symbol, record)))
        .collect()
}
