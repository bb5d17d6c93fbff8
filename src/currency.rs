//! Currency conversion on top of the rate cache.

use crate::api::ApiClient;
use crate::cache::{CacheStore, FetchOptions, Fetcher, Snapshot};
use crate::error::ApiError;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Rates older than this are refetched in the background.
const RATE_STALE_AFTER: Duration = Duration::from_secs(5 * 60);

#[async_trait]
pub trait RateSource: Send + Sync {
    async fn fetch_rate(&self, from: &str, to: &str) -> Result<f64, ApiError>;
}

#[async_trait]
impl RateSource for ApiClient {
    async fn fetch_rate(&self, from: &str, to: &str) -> Result<f64, ApiError> {
        self.convert_currency(1.0, from, to)
            .await
            .map(|conversion| conversion.exchange_rate)
    }
}

#[derive(Clone)]
pub struct CurrencyConverter {
    rates: CacheStore<f64>,
    source: Arc<dyn RateSource>,
}

impl CurrencyConverter {
    pub fn new(source: Arc<dyn RateSource>) -> Self {
        CurrencyConverter {
            rates: CacheStore::new(),
            source,
        }
    }

    /// Converts `amount` from one currency to another without waiting.
    ///
    /// Identity pairs and non-positive amounts pass through untouched, with no
    /// cache entry materialized. While the rate is unresolved the original
    /// amount is returned as an interim value rather than blocking; the rate
    /// fetch proceeds in the background and later calls pick it up.
    pub fn convert(&self, amount: f64, from: &str, to: &str) -> f64 {
        if amount <= 0.0 || from == to {
            return amount;
        }
        let snapshot = self
            .rates
            .get(&rate_key(from, to), rate_options(), self.rate_fetcher(from, to));
        apply_rate(amount, from, to, snapshot)
    }

    /// Converts `amount`, waiting for the rate to resolve. Falls back to the
    /// original amount if the rate cannot be fetched.
    pub async fn convert_resolved(&self, amount: f64, from: &str, to: &str) -> f64 {
        if amount <= 0.0 || from == to {
            return amount;
        }
        let snapshot = self
            .rates
            .resolve(&rate_key(from, to), rate_options(), self.rate_fetcher(from, to))
            .await;
        apply_rate(amount, from, to, snapshot)
    }

    /// Drops all cached rates (logout path).
    pub fn clear(&self) {
        self.rates.clear();
    }

    fn rate_fetcher(&self, from: &str, to: &str) -> Fetcher<f64> {
        let source = Arc::clone(&self.source);
        let from = from.to_string();
        let to = to.to_string();
        Arc::new(move || {
            let source = Arc::clone(&source);
            let from = from.clone();
            let to = to.clone();
            Box::pin(async move { source.fetch_rate(&from, &to).await })
        })
    }
}

fn rate_key(from: &str, to: &str) -> String {
    format!("rate:{from}->{to}")
}

fn rate_options() -> FetchOptions {
    FetchOptions {
        stale_after: RATE_STALE_AFTER,
        ..FetchOptions::default()
    }
}

fn apply_rate(amount: f64, from: &str, to: &str, snapshot: Snapshot<f64>) -> f64 {
    match snapshot.value {
        Some(rate) => amount * rate,
        None => {
            debug!(from, to, "Rate unresolved, serving unconverted amount");
            amount
        }
    }
}
