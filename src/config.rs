use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{fs, path::PathBuf};
use tracing::debug;

/// A market index tracked on the dashboard.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct IndexConfig {
    pub symbol: String,
    pub name: String,
    pub country: String,
    #[serde(default = "default_currency")]
    pub currency: String,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct BackendConfig {
    pub base_url: String,
}

impl Default for BackendConfig {
    fn default() -> Self {
        BackendConfig {
            base_url: "http://localhost:8000/api".to_string(),
        }
    }
}

fn default_currency() -> String {
    "USD".to_string()
}

fn default_indices() -> Vec<IndexConfig> {
    [
        ("^GSPC", "S&P 500", "US", "USD"),
        ("^IXIC", "NASDAQ Composite", "US", "USD"),
        ("^DJI", "Dow Jones", "US", "USD"),
        ("^NSEI", "Nifty 50", "IN", "INR"),
        ("^NSEBANK", "Bank Nifty", "IN", "INR"),
        ("^BSESN", "Sensex", "IN", "INR"),
    ]
    .iter()
    .map(|(symbol, name, country, currency)| IndexConfig {
        symbol: symbol.to_string(),
        name: name.to_string(),
        country: country.to_string(),
        currency: currency.to_string(),
    })
    .collect()
}

fn default_popular_symbols() -> Vec<String> {
    [
        "AAPL",
        "MSFT",
        "GOOGL",
        "AMZN",
        "TSLA",
        "META",
        "NVDA",
        "NFLX",
        "AMD",
        "INTC",
        "RELIANCE.NS",
        "TCS.NS",
        "HDFCBANK.NS",
        "INFY.NS",
        "HINDUNILVR.NS",
        "ICICIBANK.NS",
        "SBIN.NS",
        "BHARTIARTL.NS",
        "KOTAKBANK.NS",
        "LT.NS",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AppConfig {
    #[serde(default)]
    pub backend: BackendConfig,
    /// Fallback display currency; a persisted preference takes precedence.
    #[serde(default = "default_currency")]
    pub currency: String,
    #[serde(default = "default_indices")]
    pub indices: Vec<IndexConfig>,
    /// Symbols scanned for the top gainers/losers/volume sections.
    #[serde(default = "default_popular_symbols")]
    pub popular_symbols: Vec<String>,
    /// Override for the local data directory (session and preferences).
    #[serde(default)]
    pub data_path: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            backend: BackendConfig::default(),
            currency: default_currency(),
            indices: default_indices(),
            popular_symbols: default_popular_symbols(),
            data_path: None,
        }
    }
}

impl AppConfig {
    pub fn load() -> Result<Self> {
        debug!("Loading default config");
        let config_path = Self::default_config_path()?;
        Self::load_from_path(&config_path)
    }

    pub fn default_config_path() -> Result<PathBuf> {
        let proj_dirs = ProjectDirs::from("io", "stockdeck", "stockdeck")
            .context("Could not determine project directories")?;
        Ok(proj_dirs.config_dir().join("config.yaml"))
    }

    pub fn default_data_path(&self) -> Result<PathBuf> {
        if let Some(custom_path) = &self.data_path {
            return Ok(PathBuf::from(custom_path));
        }
        let proj_dirs = ProjectDirs::from("io", "stockdeck", "stockdeck")
            .context("Could not determine project directories")?;
        Ok(proj_dirs.data_dir().to_path_buf())
    }

    pub fn load_from_path<P: AsRef<std::path::Path>>(path: P) -> Result<Self> {
        let config_str = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        let config: Self = serde_yaml::from_str(&config_str)
            .with_context(|| format!("Failed to parse config file: {}", path.as_ref().display()))?;
        debug!("Successfully loaded config");
        Ok(config)
    }
}
