use std::net::SocketAddr;
use std::time::Duration;

use crate::config::validator;
use crate::error::{AppError, Context, Result};

use super::{AggregationMode, ConfigSource, Settings};

pub const LISTEN_ADDR_VAR: &str = "TICKER_PROMPT_LISTEN_ADDR";
pub const ATTEMPT_TIMEOUT_VAR: &str = "TICKER_PROMPT_ATTEMPT_TIMEOUT_MS";
pub const AGGREGATION_VAR: &str = "TICKER_PROMPT_AGGREGATION";
pub const TEMPLATE_URLS_VAR: &str = "TICKER_PROMPT_TEMPLATE_URLS";
pub const ALPHA_VANTAGE_BASE_URL_VAR: &str = "ALPHA_VANTAGE_BASE_URL";
pub const YAHOO_BASE_URL_VAR: &str = "YAHOO_BASE_URL";
pub const GEMINI_BASE_URL_VAR: &str = "GEMINI_BASE_URL";

/// Start from the builtin settings and apply every override present in `source`.
pub fn load_settings(source: &dyn ConfigSource) -> Result<Settings> {
    let mut settings = Settings::builtin();

    if let Some(raw) = non_empty(source, LISTEN_ADDR_VAR) {
        settings.listen_addr = raw
            .parse::<SocketAddr>()
            .with_context(|| format!("{LISTEN_ADDR_VAR} is not a socket address: `{raw}`"))?;
    }

    if let Some(raw) = non_empty(source, ATTEMPT_TIMEOUT_VAR) {
        let millis = raw
            .parse::<u64>()
            .with_context(|| format!("{ATTEMPT_TIMEOUT_VAR} must be milliseconds: `{raw}`"))?;
        settings.attempt_timeout = Duration::from_millis(millis);
    }

    if let Some(raw) = non_empty(source, AGGREGATION_VAR) {
        settings.aggregation = parse_aggregation(&raw)?;
    }

    if let Some(raw) = non_empty(source, TEMPLATE_URLS_VAR) {
        settings.templates.urls = raw
            .split(',')
            .map(str::trim)
            .filter(|url| !url.is_empty())
            .map(str::to_string)
            .collect();
    }

    if let Some(raw) = non_empty(source, ALPHA_VANTAGE_BASE_URL_VAR) {
        settings.alpha_vantage.base_url = raw;
    }

    if let Some(raw) = non_empty(source, YAHOO_BASE_URL_VAR) {
        settings.yahoo.base_url = raw.trim_end_matches('/').to_string();
    }

    if let Some(raw) = non_empty(source, GEMINI_BASE_URL_VAR) {
        settings.llm.base_url = raw.trim_end_matches('/').to_string();
    }

    validator::validate_settings(&settings)?;

    Ok(settings)
}

fn non_empty(source: &dyn ConfigSource, name: &str) -> Option<String> {
    source
        .get(name)
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn parse_aggregation(value: &str) -> Result<AggregationMode> {
    match value.to_lowercase().as_str() {
        "sequential" => Ok(AggregationMode::Sequential),
        "concurrent" | "parallel" => Ok(AggregationMode::Concurrent),
        other => Err(AppError::message(format!(
            "unsupported {AGGREGATION_VAR} `{other}` (expected `sequential` or `concurrent`)"
        ))),
    }
}
