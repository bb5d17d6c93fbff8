use anyhow::Result;
use chrono::NaiveDate;
use clap::{CommandFactory, Parser, Subcommand};
use stockdeck::log::init_logging;
use stockdeck::{AppCommand, PortfolioCommand, WatchlistCommand};

#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to optional configuration file
    #[arg(short, long, global = true)]
    config_path: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Create default configuration
    Setup,
    /// Display market indices, top movers and portfolio value
    Dashboard,
    /// Search stocks by symbol or company name
    Search { query: String },
    /// Display a detailed quote with recent news
    Quote { symbol: String },
    /// Display AI price forecasts for a symbol
    Predict {
        symbol: String,
        /// Forecast horizon in days
        #[arg(short, long, default_value_t = 7)]
        days: u32,
    },
    /// Sign in to the backend
    Login {
        email: String,
        #[arg(short, long, env = "STOCKDECK_PASSWORD")]
        password: String,
    },
    /// Create an account and sign in
    Signup {
        email: String,
        full_name: String,
        #[arg(short, long, env = "STOCKDECK_PASSWORD")]
        password: String,
    },
    /// Sign out and clear cached account data
    Logout,
    /// Manage portfolio positions
    Portfolio {
        #[command(subcommand)]
        command: Option<PortfolioCommands>,
    },
    /// Manage the watchlist
    Watchlist {
        #[command(subcommand)]
        command: Option<WatchlistCommands>,
    },
    /// Set the preferred display currency
    Currency { currency: String },
    /// Set the preferred theme (light or dark)
    Theme { theme: String },
}

#[derive(Subcommand)]
enum PortfolioCommands {
    /// List positions with P/L
    Show,
    /// Add a position
    Add {
        symbol: String,
        quantity: f64,
        price: f64,
        /// Purchase date (YYYY-MM-DD)
        date: NaiveDate,
    },
    /// Remove a position by id
    Remove { id: i64 },
}

#[derive(Subcommand)]
enum WatchlistCommands {
    /// List watched symbols
    Show,
    /// Watch a symbol
    Add {
        symbol: String,
        #[arg(short, long)]
        notes: Option<String>,
    },
    /// Stop watching by entry id
    Remove { id: i64 },
}

impl From<Commands> for AppCommand {
    fn from(cmd: Commands) -> AppCommand {
        match cmd {
            Commands::Dashboard => AppCommand::Dashboard,
            Commands::Search { query } => AppCommand::Search { query },
            Commands::Quote { symbol } => AppCommand::Quote { symbol },
            Commands::Predict { symbol, days } => AppCommand::Predict { symbol, days },
            Commands::Login { email, password } => AppCommand::Login { email, password },
            Commands::Signup {
                email,
                full_name,
                password,
            } => AppCommand::Signup {
                email,
                password,
                full_name,
            },
            Commands::Logout => AppCommand::Logout,
            Commands::Portfolio { command } => {
                AppCommand::Portfolio(match command.unwrap_or(PortfolioCommands::Show) {
                    PortfolioCommands::Show => PortfolioCommand::Show,
                    PortfolioCommands::Add {
                        symbol,
                        quantity,
                        price,
                        date,
                    } => PortfolioCommand::Add {
                        symbol,
                        quantity,
                        price,
                        date,
                    },
                    PortfolioCommands::Remove { id } => PortfolioCommand::Remove { id },
                })
            }
            Commands::Watchlist { command } => {
                AppCommand::Watchlist(match command.unwrap_or(WatchlistCommands::Show) {
                    WatchlistCommands::Show => WatchlistCommand::Show,
                    WatchlistCommands::Add { symbol, notes } => {
                        WatchlistCommand::Add { symbol, notes }
                    }
                    WatchlistCommands::Remove { id } => WatchlistCommand::Remove { id },
                })
            }
            Commands::Currency { currency } => AppCommand::SetCurrency { currency },
            Commands::Theme { theme } => AppCommand::SetTheme { theme },
            Commands::Setup => unreachable!("Setup command should be handled separately"),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    let result = match cli.command {
        Some(Commands::Setup) => setup(),
        Some(cmd) => stockdeck::run_command(cmd.into(), cli.config_path.as_deref()).await,
        None => {
            Cli::command().print_help()?;
            Ok(())
        }
    };

    if let Err(e) = &result {
        tracing::error!(error = %e, "Application failed");
    }
    result
}

fn setup() -> anyhow::Result<()> {
    use anyhow::Context;

    let path = stockdeck::config::AppConfig::default_config_path()?;

    if path.exists() {
        anyhow::bail!("Configuration file already exists at {}", path.display());
    }

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }

    let default_config =
        serde_yaml::to_string(&stockdeck::config::AppConfig::default()).context("Serialize")?;
    std::fs::write(&path, default_config)
        .with_context(|| format!("Failed to write config file to {}", path.display()))?;

    tracing::info!("Created default configuration at {}", path.display());
    println!("Created default configuration at {}", path.display());
    Ok(())
}
