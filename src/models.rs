//! Data transfer types for the stockdeck backend API.
//!
//! All quote and position snapshots are immutable once fetched; derived
//! portfolio figures are computed client-side when the server omits them.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

fn default_currency() -> String {
    "USD".to_string()
}

/// A point-in-time quote for a stock or index symbol.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Quote {
    pub symbol: String,
    pub name: String,
    pub current_price: f64,
    pub change: f64,
    pub change_percent: f64,
    #[serde(default)]
    pub volume: Option<i64>,
    #[serde(default)]
    pub market_cap: Option<f64>,
    #[serde(default)]
    pub sector: Option<String>,
    #[serde(default)]
    pub industry: Option<String>,
    #[serde(default = "default_currency")]
    pub currency: String,
}

/// An index quote joined with the static metadata it was configured with.
#[derive(Debug, Clone)]
pub struct IndexQuote {
    pub name: String,
    pub country: String,
    pub quote: Quote,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct SearchResult {
    pub symbol: String,
    pub name: String,
    #[serde(default)]
    pub exchange: Option<String>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct HistoryPoint {
    pub date: String,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    #[serde(default)]
    pub volume: Option<i64>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct StockHistory {
    pub symbol: String,
    pub period: String,
    pub data: Vec<HistoryPoint>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct NewsItem {
    pub headline: String,
    #[serde(default)]
    pub summary: Option<String>,
    pub source: String,
    pub url: String,
    pub datetime: DateTime<Utc>,
}

/// Server response for `POST /stocks/convert`.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct CurrencyConversion {
    pub amount: f64,
    pub from_currency: String,
    pub to_currency: String,
    pub converted_amount: f64,
    pub exchange_rate: f64,
}

/// A single holding in the user's portfolio.
///
/// `current_price` is nullable until the backing quote resolves; the derived
/// accessors treat an unresolved price as a zero market value while the cost
/// basis stays intact.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct PortfolioPosition {
    pub id: i64,
    pub stock_symbol: String,
    pub quantity: f64,
    pub purchase_price: f64,
    pub purchase_date: NaiveDate,
    #[serde(default)]
    pub current_price: Option<f64>,
}

impl PortfolioPosition {
    pub fn total_cost(&self) -> f64 {
        self.quantity * self.purchase_price
    }

    pub fn current_value(&self) -> f64 {
        self.current_price
            .map_or(0.0, |price| self.quantity * price)
    }

    pub fn profit_loss(&self) -> f64 {
        self.current_value() - self.total_cost()
    }

    pub fn profit_loss_percent(&self) -> f64 {
        let cost = self.total_cost();
        if cost > 0.0 {
            self.profit_loss() / cost * 100.0
        } else {
            0.0
        }
    }
}

#[derive(Debug, Serialize, Clone)]
pub struct NewPosition {
    pub stock_symbol: String,
    pub quantity: f64,
    pub purchase_price: f64,
    pub purchase_date: NaiveDate,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct WatchlistEntry {
    pub id: i64,
    pub stock_symbol: String,
    pub added_at: DateTime<Utc>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub current_price: Option<f64>,
    #[serde(default)]
    pub change: Option<f64>,
    #[serde(default)]
    pub change_percent: Option<f64>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct User {
    pub id: i64,
    pub email: String,
    pub full_name: String,
    pub is_active: bool,
    pub is_admin: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct Token {
    pub access_token: String,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Prediction {
    pub date: String,
    pub predicted_price: f64,
    pub lower_bound: f64,
    pub upper_bound: f64,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AdminStats {
    pub total_users: i64,
    pub active_users: i64,
    pub total_watchlists: i64,
    pub total_portfolios: i64,
}
