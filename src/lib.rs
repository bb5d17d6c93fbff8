pub mod analytics;
pub mod api;
pub mod cache;
pub mod cli;
pub mod config;
pub mod currency;
pub mod dashboard;
pub mod error;
pub mod log;
pub mod models;
pub mod portfolio;
pub mod session;
pub mod watchlist;

use crate::api::ApiClient;
use crate::config::AppConfig;
use crate::currency::CurrencyConverter;
use crate::dashboard::QuoteService;
use crate::portfolio::PortfolioService;
use crate::session::SessionStore;
use crate::watchlist::WatchlistService;
use anyhow::{Context, Result, bail};
use chrono::NaiveDate;
use std::sync::Arc;
use tracing::{debug, info};

pub enum PortfolioCommand {
    Show,
    Add {
        symbol: String,
        quantity: f64,
        price: f64,
        date: NaiveDate,
    },
    Remove {
        id: i64,
    },
}

pub enum WatchlistCommand {
    Show,
    Add {
        symbol: String,
        notes: Option<String>,
    },
    Remove {
        id: i64,
    },
}

pub enum AppCommand {
    Dashboard,
    Search { query: String },
    Quote { symbol: String },
    Predict { symbol: String, days: u32 },
    Login { email: String, password: String },
    Signup {
        email: String,
        password: String,
        full_name: String,
    },
    Logout,
    Portfolio(PortfolioCommand),
    Watchlist(WatchlistCommand),
    SetCurrency { currency: String },
    SetTheme { theme: String },
}

/// Shared application state: one API client, the persisted session and the
/// entity caches every command reads through.
pub struct App {
    pub config: AppConfig,
    pub api: Arc<ApiClient>,
    pub session: SessionStore,
    pub quotes: QuoteService,
    pub converter: CurrencyConverter,
    pub portfolio: PortfolioService,
    pub watchlist: WatchlistService,
}

impl App {
    pub async fn bootstrap(config_path: Option<&str>) -> Result<Self> {
        let config = match config_path {
            Some(path) => AppConfig::load_from_path(path)?,
            None => AppConfig::load()?,
        };
        debug!("Loaded config: {config:#?}");

        let api = Arc::new(ApiClient::new(&config.backend.base_url)?);
        let session = SessionStore::open(&config.default_data_path()?)
            .context("Failed to open session store")?;
        session.hydrate(&api).await?;

        let quotes = QuoteService::new(Arc::clone(&api));
        let converter = CurrencyConverter::new(Arc::clone(&api) as _);
        let portfolio = PortfolioService::new(Arc::clone(&api));
        let watchlist = WatchlistService::new(Arc::clone(&api));

        Ok(App {
            config,
            api,
            session,
            quotes,
            converter,
            portfolio,
            watchlist,
        })
    }

    /// Preferred display currency: the persisted preference, falling back to
    /// the config default.
    pub fn display_currency(&self) -> String {
        self.session.display_currency(&self.config.currency)
    }

    /// Clears the session and every per-user cache. Preferences survive.
    pub fn logout(&self) -> Result<()> {
        self.session.clear_session(&self.api)?;
        self.portfolio.clear();
        self.watchlist.clear();
        self.quotes.clear();
        self.converter.clear();
        info!("Signed out");
        Ok(())
    }

    fn require_auth(&self) -> Result<()> {
        if !self.session.is_authenticated() {
            bail!("Not signed in. Run `stockdeck login` first.");
        }
        Ok(())
    }
}

pub async fn run_command(command: AppCommand, config_path: Option<&str>) -> Result<()> {
    let app = App::bootstrap(config_path).await?;

    match command {
        AppCommand::Dashboard => cli::dashboard::run(&app).await,
        AppCommand::Search { query } => cli::quote::search(&app, &query).await,
        AppCommand::Quote { symbol } => cli::quote::show_quote(&app, &symbol).await,
        AppCommand::Predict { symbol, days } => {
            cli::quote::show_predictions(&app, &symbol, days).await
        }
        AppCommand::Login { email, password } => {
            let user = app.session.login(&app.api, &email, &password).await?;
            println!("Signed in as {}", user.full_name);
            Ok(())
        }
        AppCommand::Signup {
            email,
            password,
            full_name,
        } => {
            let user = app
                .session
                .signup(&app.api, &email, &password, &full_name)
                .await?;
            println!("Account created; signed in as {}", user.full_name);
            Ok(())
        }
        AppCommand::Logout => {
            app.logout()?;
            println!("Signed out");
            Ok(())
        }
        AppCommand::Portfolio(cmd) => {
            app.require_auth()?;
            cli::portfolio::run(&app, cmd).await
        }
        AppCommand::Watchlist(cmd) => {
            app.require_auth()?;
            cli::watchlist::run(&app, cmd).await
        }
        AppCommand::SetCurrency { currency } => {
            let currency = currency.to_uppercase();
            app.session
                .set_preference(session::PREF_DISPLAY_CURRENCY, &currency)?;
            println!("Display currency set to {currency}");
            Ok(())
        }
        AppCommand::SetTheme { theme } => {
            let theme = theme.to_lowercase();
            if theme != "light" && theme != "dark" {
                bail!("Unknown theme '{theme}', expected 'light' or 'dark'");
            }
            app.session.set_preference(session::PREF_THEME, &theme)?;
            println!("Theme set to {theme}");
            Ok(())
        }
    }
}
