use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::commands;

#[derive(Parser)]
#[command(name = "canslim-screener")]
#[command(about = "CANSLIM stock screening and charting for Vietnamese equities", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Filter and rank the prediction table
    Screen {
        /// Path to the prediction CSV (default: $SCREENER_DATA)
        #[arg(short, long)]
        data: Option<PathBuf>,

        /// Range constraint NAME:MIN:MAX, repeatable
        #[arg(short, long)]
        filter: Vec<String>,

        /// Column for the descending sort (default: Rate)
        #[arg(short, long)]
        sort: Option<String>,

        /// Comma-separated display columns
        #[arg(short, long)]
        columns: Option<String>,
    },
    /// Fetch price history and compute indicators for one symbol
    Chart {
        /// Ticker symbol, e.g. VCB
        #[arg(short, long)]
        symbol: String,

        /// Start date YYYY-MM-DD
        #[arg(long)]
        start: String,

        /// End date YYYY-MM-DD (default: today)
        #[arg(long)]
        end: Option<String>,

        /// Comma-separated indicators (sma,rsi,macd,bollinger,stochastic);
        /// default: all
        #[arg(short, long)]
        indicators: Option<String>,

        /// Write the augmented series to a CSV file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Start the HTTP server
    Serve {
        /// Port to listen on
        #[arg(short, long, default_value_t = 9876)]
        port: u16,

        /// Path to the prediction CSV (default: $SCREENER_DATA)
        #[arg(short, long)]
        data: Option<PathBuf>,

        /// Path to the company reference CSV (default: $COMPANY_DATA)
        #[arg(long)]
        companies: Option<PathBuf>,
    },
}

pub async fn run() {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Screen {
            data,
            filter,
            sort,
            columns,
        } => commands::screen::run(data, filter, sort, columns),
        Commands::Chart {
            symbol,
            start,
            end,
            indicators,
            output,
        } => commands::chart::run(symbol, start, end, indicators, output).await,
        Commands::Serve {
            port,
            data,
            companies,
        } => commands::serve::run(port, data, companies).await,
    };

    if let Err(e) = result {
        eprintln!("❌ {}", e);
        std::process::exit(1);
    }
}
