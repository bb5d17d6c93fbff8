//! Pure aggregation over cached quote and portfolio snapshots.
//!
//! Nothing here caches or fetches; every function is recomputed from the
//! snapshot it is handed, so results stay consistent with whatever the cache
//! served at that instant.

use crate::models::{IndexQuote, PortfolioPosition, Quote};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PortfolioTotals {
    pub total_cost: f64,
    pub total_value: f64,
    pub total_pl: f64,
    pub total_pl_percent: f64,
}

/// Sums cost basis and market value across positions.
///
/// Positions with an unresolved current price contribute their full cost but
/// zero market value, so totals degrade gracefully while quotes load.
pub fn portfolio_totals(positions: &[PortfolioPosition]) -> PortfolioTotals {
    let total_cost: f64 = positions.iter().map(|p| p.total_cost()).sum();
    let total_value: f64 = positions.iter().map(|p| p.current_value()).sum();
    let total_pl = total_value - total_cost;
    let total_pl_percent = if total_cost > 0.0 {
        total_pl / total_cost * 100.0
    } else {
        0.0
    };
    PortfolioTotals {
        total_cost,
        total_value,
        total_pl,
        total_pl_percent,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Gainers,
    Losers,
}

/// Ranks quotes by percentage change. Gainers keep only positive movers in
/// descending order, losers only negative ones ascending; equal changes are
/// broken by symbol so the ranking is deterministic.
pub fn top_movers(quotes: &[Quote], direction: Direction, limit: usize) -> Vec<Quote> {
    let mut movers: Vec<Quote> = quotes
        .iter()
        .filter(|q| match direction {
            Direction::Gainers => q.change_percent > 0.0,
            Direction::Losers => q.change_percent < 0.0,
        })
        .cloned()
        .collect();
    movers.sort_by(|a, b| {
        let ordering = match direction {
            Direction::Gainers => b.change_percent.total_cmp(&a.change_percent),
            Direction::Losers => a.change_percent.total_cmp(&b.change_percent),
        };
        ordering.then_with(|| a.symbol.cmp(&b.symbol))
    });
    movers.truncate(limit);
    movers
}

/// Ranks quotes by reported volume, descending. Quotes without a volume are
/// excluded; ties are broken by symbol.
pub fn rank_by_volume(quotes: &[Quote], limit: usize) -> Vec<Quote> {
    let mut ranked: Vec<Quote> = quotes.iter().filter(|q| q.volume.is_some()).cloned().collect();
    ranked.sort_by(|a, b| {
        b.volume
            .cmp(&a.volume)
            .then_with(|| a.symbol.cmp(&b.symbol))
    });
    ranked.truncate(limit);
    ranked
}

#[derive(Debug, Clone)]
pub struct CountryGroup {
    pub country: String,
    pub indices: Vec<IndexQuote>,
}

/// Partitions index quotes by country, keeping the input order both across
/// groups (first appearance) and within each group.
pub fn group_by_country(indices: &[IndexQuote]) -> Vec<CountryGroup> {
    let mut groups: Vec<CountryGroup> = Vec::new();
    for index in indices {
        match groups.iter_mut().find(|g| g.country == index.country) {
            Some(group) => group.indices.push(index.clone()),
            None => groups.push(CountryGroup {
                country: index.country.clone(),
                indices: vec![index.clone()],
            }),
        }
    }
    groups
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn quote(symbol: &str, change_percent: f64, volume: Option<i64>) -> Quote {
        Quote {
            symbol: symbol.to_string(),
            name: symbol.to_string(),
            current_price: 100.0,
            change: change_percent,
            change_percent,
            volume,
            market_cap: None,
            sector: None,
            industry: None,
            currency: "USD".to_string(),
        }
    }

    fn position(symbol: &str, quantity: f64, price: f64, current: Option<f64>) -> PortfolioPosition {
        PortfolioPosition {
            id: 0,
            stock_symbol: symbol.to_string(),
            quantity,
            purchase_price: price,
            purchase_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            current_price: current,
        }
    }

    #[test]
    fn test_empty_portfolio_totals_are_zero() {
        let totals = portfolio_totals(&[]);
        assert_eq!(totals.total_cost, 0.0);
        assert_eq!(totals.total_value, 0.0);
        assert_eq!(totals.total_pl, 0.0);
        assert_eq!(totals.total_pl_percent, 0.0);
    }

    #[test]
    fn test_portfolio_totals() {
        let positions = vec![
            position("AAPL", 10.0, 100.0, Some(150.0)),
            position("MSFT", 2.0, 200.0, Some(250.0)),
        ];
        let totals = portfolio_totals(&positions);
        assert_eq!(totals.total_cost, 1400.0);
        assert_eq!(totals.total_value, 2000.0);
        assert_eq!(totals.total_pl, 600.0);
        assert!((totals.total_pl_percent - 42.857142857).abs() < 1e-6);
    }

    #[test]
    fn test_unresolved_price_counts_cost_but_no_value() {
        let positions = vec![
            position("AAPL", 10.0, 100.0, Some(150.0)),
            position("TSLA", 5.0, 200.0, None),
        ];
        let totals = portfolio_totals(&positions);
        assert_eq!(totals.total_cost, 2000.0);
        assert_eq!(totals.total_value, 1500.0);
        assert_eq!(totals.total_pl, -500.0);
    }

    #[test]
    fn test_gainers_exclude_losers_and_tie_break_by_symbol() {
        let quotes = vec![
            quote("MSFT", 5.0, None),
            quote("AAPL", 5.0, None),
            quote("TSLA", 2.0, None),
            quote("INTC", -1.0, None),
        ];
        let gainers = top_movers(&quotes, Direction::Gainers, 2);
        let symbols: Vec<&str> = gainers.iter().map(|q| q.symbol.as_str()).collect();
        assert_eq!(symbols, vec!["AAPL", "MSFT"]);
    }

    #[test]
    fn test_losers_ascend_by_change() {
        let quotes = vec![
            quote("AAPL", -1.0, None),
            quote("NVDA", -7.5, None),
            quote("MSFT", 3.0, None),
        ];
        let losers = top_movers(&quotes, Direction::Losers, 5);
        let symbols: Vec<&str> = losers.iter().map(|q| q.symbol.as_str()).collect();
        assert_eq!(symbols, vec!["NVDA", "AAPL"]);
    }

    #[test]
    fn test_movers_never_exceed_limit() {
        let quotes: Vec<Quote> = (0..10)
            .map(|i| quote(&format!("SYM{i}"), 1.0 + i as f64, None))
            .collect();
        assert_eq!(top_movers(&quotes, Direction::Gainers, 5).len(), 5);
    }

    #[test]
    fn test_volume_ranking_skips_missing_volume() {
        let quotes = vec![
            quote("AAPL", 1.0, Some(500)),
            quote("MSFT", 1.0, None),
            quote("NVDA", 1.0, Some(900)),
            quote("AMD", 1.0, Some(900)),
        ];
        let ranked = rank_by_volume(&quotes, 5);
        let symbols: Vec<&str> = ranked.iter().map(|q| q.symbol.as_str()).collect();
        assert_eq!(symbols, vec!["AMD", "NVDA", "AAPL"]);
    }

    #[test]
    fn test_group_by_country_preserves_order() {
        let indices: Vec<IndexQuote> = [
            ("S&P 500", "US"),
            ("Nifty 50", "IN"),
            ("NASDAQ", "US"),
            ("Sensex", "IN"),
        ]
        .iter()
        .map(|(name, country)| IndexQuote {
            name: name.to_string(),
            country: country.to_string(),
            quote: quote(name, 0.5, None),
        })
        .collect();

        let groups = group_by_country(&indices);
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].country, "US");
        assert_eq!(groups[0].indices.len(), 2);
        assert_eq!(groups[0].indices[1].name, "NASDAQ");
        assert_eq!(groups[1].country, "IN");
        assert_eq!(groups[1].indices[0].name, "Nifty 50");
    }
}
