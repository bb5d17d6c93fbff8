//! Watchlist reads and mutations, commit-then-invalidate like the portfolio.

use crate::api::ApiClient;
use crate::cache::{CacheStore, FetchOptions, Fetcher, Snapshot};
use crate::error::{ApiError, Result};
use crate::models::WatchlistEntry;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

const WATCHLIST_KEY: &str = "watchlist";

#[derive(Clone)]
pub struct WatchlistService {
    api: Arc<ApiClient>,
    cache: CacheStore<Vec<WatchlistEntry>>,
}

impl WatchlistService {
    pub fn new(api: Arc<ApiClient>) -> Self {
        WatchlistService {
            api,
            cache: CacheStore::new(),
        }
    }

    pub async fn entries(&self) -> Snapshot<Vec<WatchlistEntry>> {
        self.cache
            .resolve(WATCHLIST_KEY, self.options(), self.fetcher())
            .await
    }

    pub async fn add(&self, symbol: &str, notes: Option<&str>) -> Result<WatchlistEntry> {
        let symbol = symbol.trim();
        if symbol.is_empty() {
            return Err(ApiError::Validation("symbol must not be empty".to_string()));
        }
        let created = self.api.add_watchlist_entry(symbol, notes).await?;
        debug!(symbol = %created.stock_symbol, id = created.id, "Watchlist entry added");
        self.cache.invalidate(WATCHLIST_KEY);
        Ok(created)
    }

    pub async fn remove(&self, id: i64) -> Result<()> {
        self.api.remove_watchlist_entry(id).await?;
        debug!(id, "Watchlist entry removed");
        self.cache.invalidate(WATCHLIST_KEY);
        Ok(())
    }

    pub fn clear(&self) {
        self.cache.clear();
    }

    fn options(&self) -> FetchOptions {
        FetchOptions {
            stale_after: Duration::from_secs(2 * 60),
            ..FetchOptions::default()
        }
    }

    fn fetcher(&self) -> Fetcher<Vec<WatchlistEntry>> {
        let api = Arc::clone(&self.api);
        Arc::new(move || {
            let api = Arc::clone(&api);
            Box::pin(async move { api.watchlist().await })
        })
    }
}
