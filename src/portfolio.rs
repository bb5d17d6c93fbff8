//! Portfolio reads and mutations.
//!
//! Writes follow a commit-then-invalidate discipline: the cache is only
//! touched after the backend accepts the change, never optimistically, and the
//! next read refetches the canonical list.

use crate::api::ApiClient;
use crate::cache::{CacheStore, FetchOptions, Fetcher, Snapshot};
use crate::error::{ApiError, Result};
use crate::models::{NewPosition, PortfolioPosition};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

const PORTFOLIO_KEY: &str = "portfolio";

#[derive(Clone)]
pub struct PortfolioService {
    api: Arc<ApiClient>,
    cache: CacheStore<Vec<PortfolioPosition>>,
}

impl PortfolioService {
    pub fn new(api: Arc<ApiClient>) -> Self {
        PortfolioService {
            api,
            cache: CacheStore::new(),
        }
    }

    /// Resolved list of positions; serves the cached list when fresh.
    pub async fn positions(&self) -> Snapshot<Vec<PortfolioPosition>> {
        self.cache
            .resolve(PORTFOLIO_KEY, self.options(), self.fetcher())
            .await
    }

    pub async fn add(&self, position: NewPosition) -> Result<PortfolioPosition> {
        validate(&position)?;
        let created = self.api.add_position(&position).await?;
        debug!(symbol = %created.stock_symbol, id = created.id, "Position added");
        self.cache.invalidate(PORTFOLIO_KEY);
        Ok(created)
    }

    pub async fn update(&self, id: i64, position: NewPosition) -> Result<PortfolioPosition> {
        validate(&position)?;
        let updated = self.api.update_position(id, &position).await?;
        self.cache.invalidate(PORTFOLIO_KEY);
        Ok(updated)
    }

    pub async fn remove(&self, id: i64) -> Result<()> {
        self.api.remove_position(id).await?;
        debug!(id, "Position removed");
        self.cache.invalidate(PORTFOLIO_KEY);
        Ok(())
    }

    /// Forgets cached positions; used on logout when the key stops being
    /// meaningful.
    pub fn clear(&self) {
        self.cache.clear();
    }

    fn options(&self) -> FetchOptions {
        FetchOptions {
            stale_after: Duration::from_secs(60),
            ..FetchOptions::default()
        }
    }

    fn fetcher(&self) -> Fetcher<Vec<PortfolioPosition>> {
        let api = Arc::clone(&self.api);
        Arc::new(move || {
            let api = Arc::clone(&api);
            Box::pin(async move { api.portfolio().await })
        })
    }
}

fn validate(position: &NewPosition) -> Result<()> {
    if position.stock_symbol.trim().is_empty() {
        return Err(ApiError::Validation("symbol must not be empty".to_string()));
    }
    if position.quantity <= 0.0 {
        return Err(ApiError::Validation(
            "quantity must be positive".to_string(),
        ));
    }
    if position.purchase_price <= 0.0 {
        return Err(ApiError::Validation(
            "purchase price must be positive".to_string(),
        ));
    }
    Ok(())
}
