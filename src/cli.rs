use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "ticker-prompt")]
#[command(about = "Stock analysis prompts and market data behind rotating API keys")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Skip loading a `.env` file from the working directory
    #[arg(long, global = true)]
    pub no_dotenv: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the JSON HTTP API
    Serve {
        /// Overrides TICKER_PROMPT_LISTEN_ADDR
        #[arg(short, long)]
        listen: Option<String>,
    },

    /// Print the analysis prompt template rendered for a ticker
    Prompt { ticker: String },

    /// Company overview merged with the latest quote
    Overview { ticker: String },

    /// Income statement with balance sheet, shares and estimates
    Income { ticker: String },

    /// Price history at one or all granularities
    Chart {
        ticker: String,

        /// intraday, daily, weekly, monthly or all
        #[arg(short, long, default_value = "all")]
        range: String,
    },

    /// Yahoo Finance key statistics tables
    Stats { ticker: String },
}
