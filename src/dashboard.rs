//! Quote fetching and dashboard assembly.
//!
//! Batch fetches are partial-success: a symbol that fails to resolve is
//! dropped from the aggregate rather than failing the whole dashboard.

use crate::analytics::{
    self, CountryGroup, Direction, PortfolioTotals,
};
use crate::api::ApiClient;
use crate::cache::{CacheStore, FetchOptions, Fetcher, Snapshot};
use crate::config::IndexConfig;
use crate::models::{IndexQuote, PortfolioPosition, Quote};
use futures::future::join_all;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

const MOVERS_LIMIT: usize = 5;

#[derive(Clone)]
pub struct QuoteService {
    api: Arc<ApiClient>,
    quotes: CacheStore<Quote>,
}

impl QuoteService {
    pub fn new(api: Arc<ApiClient>) -> Self {
        QuoteService {
            api,
            quotes: CacheStore::new(),
        }
    }

    pub async fn quote(&self, symbol: &str) -> Snapshot<Quote> {
        self.quotes
            .resolve(&quote_key(symbol), self.options(), self.fetcher(symbol))
            .await
    }

    /// Resolves quotes for all symbols concurrently, keeping input order and
    /// silently dropping symbols whose fetch failed with no cached value.
    pub async fn quotes(&self, symbols: &[String]) -> Vec<Quote> {
        let futures = symbols.iter().map(|symbol| self.quote(symbol));
        join_all(futures)
            .await
            .into_iter()
            .zip(symbols)
            .filter_map(|(snapshot, symbol)| {
                if snapshot.value.is_none() {
                    debug!(symbol, "Dropping unresolved symbol from batch");
                }
                snapshot.value
            })
            .collect()
    }

    /// Resolves the configured market indices, joining quotes with their
    /// static metadata. Failed indices are dropped.
    pub async fn indices(&self, configs: &[IndexConfig]) -> Vec<IndexQuote> {
        let futures = configs.iter().map(|config| self.quote(&config.symbol));
        join_all(futures)
            .await
            .into_iter()
            .zip(configs)
            .filter_map(|(snapshot, config)| {
                snapshot.value.map(|quote| IndexQuote {
                    name: config.name.clone(),
                    country: config.country.clone(),
                    quote,
                })
            })
            .collect()
    }

    pub fn invalidate(&self, symbol: &str) {
        self.quotes.invalidate(&quote_key(symbol));
    }

    pub fn clear(&self) {
        self.quotes.clear();
    }

    fn options(&self) -> FetchOptions {
        FetchOptions {
            stale_after: Duration::from_secs(5 * 60),
            ..FetchOptions::default()
        }
    }

    fn fetcher(&self, symbol: &str) -> Fetcher<Quote> {
        let api = Arc::clone(&self.api);
        let symbol = symbol.to_string();
        Arc::new(move || {
            let api = Arc::clone(&api);
            let symbol = symbol.clone();
            Box::pin(async move { api.stock_info(&symbol).await })
        })
    }
}

fn quote_key(symbol: &str) -> String {
    format!("quote:{symbol}")
}

#[derive(Debug, Clone, Default)]
pub struct MarketMovers {
    pub gainers: Vec<Quote>,
    pub losers: Vec<Quote>,
    pub by_volume: Vec<Quote>,
}

impl MarketMovers {
    fn from_quotes(quotes: &[Quote]) -> Self {
        MarketMovers {
            gainers: analytics::top_movers(quotes, Direction::Gainers, MOVERS_LIMIT),
            losers: analytics::top_movers(quotes, Direction::Losers, MOVERS_LIMIT),
            by_volume: analytics::rank_by_volume(quotes, MOVERS_LIMIT),
        }
    }
}

#[derive(Debug, Clone)]
pub struct DashboardData {
    pub index_groups: Vec<CountryGroup>,
    pub us: MarketMovers,
    pub india: MarketMovers,
    pub portfolio_totals: Option<PortfolioTotals>,
}

fn is_indian_listing(symbol: &str) -> bool {
    symbol.ends_with(".NS") || symbol.ends_with(".BO")
}

/// Assembles the dashboard from whatever resolved: indices grouped by country,
/// per-region movers, and portfolio totals when the caller is signed in.
pub async fn build_dashboard(
    service: &QuoteService,
    index_configs: &[IndexConfig],
    popular_symbols: &[String],
    positions: Option<&[PortfolioPosition]>,
) -> DashboardData {
    let indices = service.indices(index_configs).await;
    let popular = service.quotes(popular_symbols).await;

    let (indian, us): (Vec<Quote>, Vec<Quote>) = popular
        .into_iter()
        .partition(|q| is_indian_listing(&q.symbol));

    DashboardData {
        index_groups: analytics::group_by_country(&indices),
        us: MarketMovers::from_quotes(&us),
        india: MarketMovers::from_quotes(&indian),
        portfolio_totals: positions.map(analytics::portfolio_totals),
    }
}
