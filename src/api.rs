//! Typed client for the stockdeck backend REST API.

use crate::error::{ApiError, Result};
use crate::models::{
    AdminStats, CurrencyConversion, NewPosition, NewsItem, PortfolioPosition, Prediction, Quote,
    SearchResult, StockHistory, Token, User, WatchlistEntry,
};
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::sync::RwLock;
use tracing::{debug, instrument};

/// FastAPI error body shape.
#[derive(Deserialize)]
struct ErrorDetail {
    detail: Option<String>,
}

pub struct ApiClient {
    base_url: String,
    client: reqwest::Client,
    token: RwLock<Option<String>>,
}

impl ApiClient {
    pub fn new(base_url: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent("stockdeck/0.1")
            .build()
            .map_err(|e| ApiError::Network(e.to_string()))?;
        Ok(ApiClient {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
            token: RwLock::new(None),
        })
    }

    /// Installs or clears the bearer token used for authenticated endpoints.
    pub fn set_token(&self, token: Option<String>) {
        *self.token.write().unwrap() = token;
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        let mut builder = self.client.request(method, &url);
        if let Some(token) = self.token.read().unwrap().as_deref() {
            builder = builder.bearer_auth(token);
        }
        builder
    }

    async fn send<T: DeserializeOwned>(&self, builder: RequestBuilder) -> Result<T> {
        let response = builder.send().await.map_err(ApiError::from)?;
        Self::decode(response).await
    }

    async fn decode<T: DeserializeOwned>(response: Response) -> Result<T> {
        let status = response.status();
        if status.is_success() {
            return response
                .json::<T>()
                .await
                .map_err(|e| ApiError::Decode(e.to_string()));
        }

        let message = response
            .json::<ErrorDetail>()
            .await
            .ok()
            .and_then(|body| body.detail)
            .unwrap_or_else(|| status.to_string());
        debug!(status = status.as_u16(), %message, "Backend returned an error");

        if status.is_client_error() {
            Err(ApiError::Client {
                status: status.as_u16(),
                message,
            })
        } else {
            Err(ApiError::Server {
                status: status.as_u16(),
            })
        }
    }

    // ---- Auth ----

    pub async fn signup(&self, email: &str, password: &str, full_name: &str) -> Result<User> {
        self.send(self.request(Method::POST, "/auth/signup").json(&serde_json::json!({
            "email": email,
            "password": password,
            "full_name": full_name,
        })))
        .await
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<Token> {
        self.send(self.request(Method::POST, "/auth/login").json(&serde_json::json!({
            "email": email,
            "password": password,
        })))
        .await
    }

    pub async fn current_user(&self) -> Result<User> {
        self.send(self.request(Method::GET, "/auth/me")).await
    }

    // ---- Stocks ----

    pub async fn search_stocks(&self, query: &str) -> Result<Vec<SearchResult>> {
        self.send(
            self.request(Method::GET, "/stocks/search")
                .query(&[("q", query)]),
        )
        .await
    }

    #[instrument(name = "StockInfoFetch", skip(self), fields(symbol = %symbol))]
    pub async fn stock_info(&self, symbol: &str) -> Result<Quote> {
        self.send(self.request(Method::GET, &format!("/stocks/{symbol}")))
            .await
    }

    pub async fn stock_history(&self, symbol: &str, period: &str) -> Result<StockHistory> {
        self.send(
            self.request(Method::GET, &format!("/stocks/{symbol}/history"))
                .query(&[("period", period)]),
        )
        .await
    }

    pub async fn stock_news(&self, symbol: &str, limit: usize) -> Result<Vec<NewsItem>> {
        self.send(
            self.request(Method::GET, &format!("/stocks/{symbol}/news"))
                .query(&[("limit", limit.to_string())]),
        )
        .await
    }

    #[instrument(name = "CurrencyConvert", skip(self, amount))]
    pub async fn convert_currency(
        &self,
        amount: f64,
        from_currency: &str,
        to_currency: &str,
    ) -> Result<CurrencyConversion> {
        self.send(self.request(Method::POST, "/stocks/convert").query(&[
            ("amount", amount.to_string()),
            ("from_currency", from_currency.to_string()),
            ("to_currency", to_currency.to_string()),
        ]))
        .await
    }

    // ---- Portfolio ----

    pub async fn portfolio(&self) -> Result<Vec<PortfolioPosition>> {
        self.send(self.request(Method::GET, "/portfolio")).await
    }

    pub async fn add_position(&self, position: &NewPosition) -> Result<PortfolioPosition> {
        self.send(self.request(Method::POST, "/portfolio").json(position))
            .await
    }

    pub async fn update_position(
        &self,
        id: i64,
        position: &NewPosition,
    ) -> Result<PortfolioPosition> {
        self.send(
            self.request(Method::PUT, &format!("/portfolio/{id}"))
                .json(position),
        )
        .await
    }

    pub async fn remove_position(&self, id: i64) -> Result<()> {
        let response = self
            .request(Method::DELETE, &format!("/portfolio/{id}"))
            .send()
            .await
            .map_err(ApiError::from)?;
        Self::expect_no_content(response).await
    }

    // ---- Watchlist ----

    pub async fn watchlist(&self) -> Result<Vec<WatchlistEntry>> {
        self.send(self.request(Method::GET, "/watchlist")).await
    }

    pub async fn add_watchlist_entry(
        &self,
        symbol: &str,
        notes: Option<&str>,
    ) -> Result<WatchlistEntry> {
        self.send(self.request(Method::POST, "/watchlist").json(&serde_json::json!({
            "stock_symbol": symbol,
            "notes": notes,
        })))
        .await
    }

    pub async fn remove_watchlist_entry(&self, id: i64) -> Result<()> {
        let response = self
            .request(Method::DELETE, &format!("/watchlist/{id}"))
            .send()
            .await
            .map_err(ApiError::from)?;
        Self::expect_no_content(response).await
    }

    // ---- Predictions ----

    pub async fn predictions(&self, symbol: &str, days: u32) -> Result<Vec<Prediction>> {
        self.send(
            self.request(Method::GET, &format!("/predictions/{symbol}"))
                .query(&[("days", days.to_string())]),
        )
        .await
    }

    // ---- Admin ----

    pub async fn admin_users(&self) -> Result<Vec<User>> {
        self.send(self.request(Method::GET, "/admin/users")).await
    }

    pub async fn admin_stats(&self) -> Result<AdminStats> {
        self.send(self.request(Method::GET, "/admin/stats")).await
    }

    pub async fn set_user_status(
        &self,
        id: i64,
        is_active: Option<bool>,
        is_admin: Option<bool>,
    ) -> Result<User> {
        self.send(
            self.request(Method::PUT, &format!("/admin/users/{id}/status"))
                .json(&serde_json::json!({
                    "is_active": is_active,
                    "is_admin": is_admin,
                })),
        )
        .await
    }

    async fn expect_no_content(response: Response) -> Result<()> {
        let status = response.status();
        if status.is_success() || status == StatusCode::NO_CONTENT {
            return Ok(());
        }
        // Reuse the error mapping; the Ok arm is unreachable for error statuses.
        Self::decode::<serde_json::Value>(response).await.map(|_| ())
    }
}
