use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use rust_decimal::Decimal;
use serde_json::json;
use std::path::{Path, PathBuf};
use tracing_subscriber::{EnvFilter, fmt};

use tradebot::extract::extract_pair_and_price;
use tradebot::{Config, Dispatcher};

#[derive(Parser)]
#[command(name = "tradebot", about = "Quote and trade on Kraken, Uphold or a paper ledger")]
struct Args {
    /// TOML config file; the environment (and `.env`) is used when absent
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Last trade price for a pair
    Ticker { pair: String },
    /// Place an order on the configured exchange (respects dry_run)
    Trade {
        pair: String,
        side: String,
        volume: Decimal,
        /// Limit price; market order when omitted
        #[arg(long)]
        price: Option<Decimal>,
    },
    /// Extract pair and price from a text file (e.g. OCR output)
    Parse { text_file: PathBuf },
    /// Extract the pair from a text file, show the live price, and place a market order
    Quick {
        text_file: PathBuf,
        side: String,
        volume: Decimal,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,tradebot=debug"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    match args.command {
        Command::Ticker { pair } => {
            let dispatcher = dispatcher(args.config.as_deref())?;
            let price = dispatcher.get_ticker_price(&pair).await?;
            print_json(&json!({ "pair": pair.to_uppercase(), "price": price }))?;
        }
        Command::Trade { pair, side, volume, price } => {
            let dispatcher = dispatcher(args.config.as_deref())?;
            let result = dispatcher.place_order(&pair, &side, volume, price).await?;
            print_json(&result)?;
        }
        Command::Parse { text_file } => {
            let text = read_text(&text_file)?;
            let (pair, price) = extract_pair_and_price(&text);
            print_json(&json!({ "pair": pair.map(|p| p.to_string()), "price": price }))?;
            println!("\n{text}");
        }
        Command::Quick { text_file, side, volume } => {
            let text = read_text(&text_file)?;
            let (pair, parsed_price) = extract_pair_and_price(&text);
            let Some(pair) = pair else {
                eprintln!("Could not extract a trading pair from {}", text_file.display());
                std::process::exit(2);
            };

            let dispatcher = dispatcher(args.config.as_deref())?;
            let pair = pair.to_string();
            let live_price = dispatcher.get_ticker_price(&pair).await?;
            print_json(&json!({
                "pair": pair,
                "parsed_price": parsed_price,
                "live_price": live_price,
            }))?;

            let result = dispatcher.place_order(&pair, &side, volume, None).await?;
            print_json(&result)?;
        }
    }

    Ok(())
}

fn dispatcher(config_path: Option<&Path>) -> Result<Dispatcher> {
    let config = match config_path {
        Some(path) => Config::load(path)?,
        None => Config::from_env()?,
    };
    tracing::debug!("Loaded config: {:?}", config);
    Ok(Dispatcher::from_config(&config)?)
}

fn read_text(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
