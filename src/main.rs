//! Grid trading ledger - main entry point
//!
//! Subcommands cover the control surface: create a strategy, feed it price
//! ticks, inspect or edit the plan, and import confirmed fills.

use anyhow::Result;
use clap::{Parser, Subcommand};
use rust_decimal::Decimal;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use grid_trading::service::GridService;
use grid_trading::state_manager::SqliteStateManager;
use grid_trading::{Config, PricingMode};

mod commands;

#[derive(Parser, Debug)]
#[command(name = "grid-trading")]
#[command(about = "Fixed-template grid trading ledger with tick-driven execution", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Create a strategy with the fixed 19-band plan
    Create {
        /// Display name (defaults to one derived from the symbol)
        #[arg(long)]
        name: Option<String>,

        /// Instrument symbol
        #[arg(long)]
        symbol: String,

        /// Base price anchoring the ladder
        #[arg(long)]
        base_price: Decimal,

        /// Capital allocated to each band
        #[arg(long)]
        amount_per_band: Option<Decimal>,

        /// Alternative: quantity per band at the base price
        #[arg(long)]
        quantity_per_band: Option<Decimal>,

        /// Pricing mode (PRICE_LOCK or INDEPENDENT)
        #[arg(long, default_value = "PRICE_LOCK")]
        mode: PricingMode,
    },

    /// Feed one price sample to a strategy
    Tick {
        #[arg(long)]
        strategy: i64,

        #[arg(long)]
        price: Decimal,
    },

    /// Show a strategy's band ladder
    Plan {
        #[arg(long)]
        strategy: i64,
    },

    /// Edit a waiting band's planned buy price (re-anchors downstream)
    SetBuyPrice {
        #[arg(long)]
        strategy: i64,

        #[arg(long)]
        level: u8,

        #[arg(long)]
        price: Decimal,
    },

    /// Record the real fill price of a bought band (re-anchors downstream)
    SetActualBuy {
        #[arg(long)]
        strategy: i64,

        #[arg(long)]
        level: u8,

        #[arg(long)]
        price: Decimal,
    },

    /// Import confirmed fills from a JSON file
    Import {
        #[arg(long)]
        strategy: i64,

        /// JSON array of matched fill records
        #[arg(long)]
        file: PathBuf,
    },

    /// List a strategy's fill history
    Trades {
        #[arg(long)]
        strategy: i64,
    },

    /// Amend a fill's fee
    SetFee {
        #[arg(long)]
        fill: i64,

        #[arg(long)]
        fee: Decimal,
    },
}

fn main() -> Result<()> {
    dotenv::dotenv().ok();
    let cli = Cli::parse();

    let config = Config::load(cli.config.as_deref())?;
    let _guard = init_tracing(&config, cli.verbose);

    let store = SqliteStateManager::new(config.db_path())?;
    let service = GridService::new(store);

    match cli.command {
        Commands::Create {
            name,
            symbol,
            base_price,
            amount_per_band,
            quantity_per_band,
            mode,
        } => commands::create::run(
            &service,
            name,
            symbol,
            base_price,
            amount_per_band,
            quantity_per_band,
            mode,
        ),
        Commands::Tick { strategy, price } => commands::tick::run(&service, strategy, price),
        Commands::Plan { strategy } => commands::plan::run(&service, strategy),
        Commands::SetBuyPrice {
            strategy,
            level,
            price,
        } => commands::edit::set_plan_buy_price(&service, strategy, level, price),
        Commands::SetActualBuy {
            strategy,
            level,
            price,
        } => commands::edit::set_actual_buy_price(&service, strategy, level, price),
        Commands::Import { strategy, file } => commands::import::run(&service, strategy, &file),
        Commands::Trades { strategy } => commands::trades::run(&service, strategy),
        Commands::SetFee { fill, fee } => commands::trades::set_fee(&service, fill, fee),
    }
}

/// Install the tracing subscriber; the returned guard keeps the file writer
/// alive for the life of the process.
fn init_tracing(
    config: &Config,
    verbose: bool,
) -> Option<tracing_appender::non_blocking::WorkerGuard> {
    let default_level = if verbose {
        "debug".to_string()
    } else {
        config.log.level.clone()
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    match &config.log.file {
        Some(file) => {
            let appender = tracing_appender::rolling::daily(&config.data_dir, file);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer())
                .with(
                    tracing_subscriber::fmt::layer()
                        .with_writer(writer)
                        .with_ansi(false),
                )
                .init();
            Some(guard)
        }
        None => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer())
                .init();
            None
        }
    }
}
