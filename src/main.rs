mod cli;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use serde::Serialize;

use cli::{Cli, Commands};
use ticker_prompt::api::{self, AppState};
use ticker_prompt::config::{load_settings, ProcessEnv};
use ticker_prompt::fetch::ReqwestTransport;
use ticker_prompt::services::{self, ChartRange, ServiceError};
use ticker_prompt::utils::normalize_ticker;

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let env = if cli.no_dotenv {
        ProcessEnv
    } else {
        ProcessEnv::load_dotenv()
    };

    let mut settings = load_settings(&env).context("Failed to load settings")?;
    if let Commands::Serve {
        listen: Some(ref listen),
    } = cli.command
    {
        settings.listen_addr = listen
            .parse::<SocketAddr>()
            .with_context(|| format!("Invalid listen address `{listen}`"))?;
    }

    let transport = Arc::new(ReqwestTransport::new().context("Failed to build HTTP transport")?);
    let state = AppState::new(settings, transport, Arc::new(env));

    match cli.command {
        Commands::Serve { .. } => api::serve(state).await?,
        Commands::Prompt { ref ticker } => {
            let ticker = ticker_arg(ticker)?;
            let templates = &state.settings.templates;
            let template = services::fetch_template(
                state.transport.as_ref(),
                templates,
                state.settings.attempt_timeout,
            )
            .await
            .map_err(report)?;
            println!("{}", services::render_template(&template, templates, &ticker).content);
        }
        Commands::Overview { ref ticker } => {
            let ticker = ticker_arg(ticker)?;
            let pool = state.credential_pool();
            let body = services::company_overview(&state.alpha_vantage(), &pool, &ticker)
                .await
                .map_err(report)?;
            print_json(&body)?;
        }
        Commands::Income { ref ticker } => {
            let ticker = ticker_arg(ticker)?;
            let pool = state.credential_pool();
            let body = services::income_statement(&state.alpha_vantage(), &pool, &ticker)
                .await
                .map_err(report)?;
            print_json(&body)?;
        }
        Commands::Chart {
            ref ticker,
            ref range,
        } => {
            let ticker = ticker_arg(ticker)?;
            let range = range.parse::<ChartRange>().map_err(report)?;
            let pool = state.credential_pool();
            let body = services::stock_chart(&state.alpha_vantage(), &pool, &ticker, range)
                .await
                .map_err(report)?;
            print_json(&body)?;
        }
        Commands::Stats { ref ticker } => {
            let ticker = ticker_arg(ticker)?;
            let tables = services::key_statistics(&state.yahoo(), &ticker)
                .await
                .map_err(report)?;
            for table in tables {
                if !table.title.is_empty() {
                    println!("## {}", table.title);
                }
                for (label, value) in table.rows {
                    println!("{label:<40} {value}");
                }
                println!();
            }
        }
    }

    Ok(())
}

fn ticker_arg(raw: &str) -> Result<String> {
    normalize_ticker(raw).ok_or_else(|| anyhow!("Ticker must not be empty"))
}

fn report(err: ServiceError) -> anyhow::Error {
    match err.details() {
        Some(details) => anyhow!("{err} ({details})"),
        None => anyhow!("{err}"),
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let rendered = serde_json::to_string_pretty(value).context("Failed to render JSON")?;
    println!("{rendered}");
    Ok(())
}
