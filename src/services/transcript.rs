use std::fmt;

use serde_json::Value;

use crate::config::LlmConfig;
use crate::fetch::decode::value_to_string;
use crate::fetch::{AttemptOutcome, CredentialPool, ALPHA_VANTAGE_RULES};

use super::{AlphaVantage, GenerationRequest, LanguageModel, ServiceError, ServiceResult};

/// Calendar year plus quarter, rendered the way Alpha Vantage expects (`2024Q3`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FiscalQuarter {
    pub year: u16,
    pub quarter: u8,
}

impl FiscalQuarter {
    /// Accepts numbers or strings; the quarter may be written `3` or `Q3`.
    pub fn from_values(year: &Value, quarter: &Value) -> ServiceResult<Self> {
        let year_text = value_to_string(year);
        let year_text = year_text.trim();
        let year = year_text
            .parse::<u16>()
            .ok()
            .filter(|_| year_text.len() == 4)
            .ok_or_else(|| {
                ServiceError::InvalidInput(format!("Year must be a four-digit number, got `{year_text}`."))
            })?;

        let quarter_text = value_to_string(quarter);
        let quarter_text = quarter_text.trim();
        let digits = quarter_text
            .strip_prefix('Q')
            .or_else(|| quarter_text.strip_prefix('q'))
            .unwrap_or(quarter_text);
        let quarter = digits
            .parse::<u8>()
            .ok()
            .filter(|quarter| (1..=4).contains(quarter))
            .ok_or_else(|| {
                ServiceError::InvalidInput(format!("Quarter must be between 1 and 4, got `{quarter_text}`."))
            })?;

        Ok(Self { year, quarter })
    }
}

impl fmt::Display for FiscalQuarter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}Q{}", self.year, self.quarter)
    }
}

/// Transcript text from either a flat `content` string or the `transcript`
/// array of speaker turns.
pub fn transcript_text(payload: &Value) -> Option<String> {
    if let Some(content) = payload.get("content").and_then(Value::as_str) {
        if !content.trim().is_empty() {
            return Some(content.to_string());
        }
    }

    let turns = payload.get("transcript")?.as_array()?;
    let text = turns
        .iter()
        .filter_map(|turn| {
            let content = turn.get("content").and_then(Value::as_str)?.trim();
            if content.is_empty() {
                return None;
            }
            let speaker = turn.get("speaker").and_then(Value::as_str).unwrap_or("Unknown");
            Some(match turn.get("title").and_then(Value::as_str).filter(|t| !t.is_empty()) {
                Some(title) => format!("{speaker} ({title}): {content}"),
                None => format!("{speaker}: {content}"),
            })
        })
        .collect::<Vec<_>>()
        .join("\n\n");

    (!text.is_empty()).then_some(text)
}

fn summary_prompt(ticker: &str, quarter: FiscalQuarter, transcript: &str) -> String {
    format!(
        "You are a financial analyst.\n\
         Read the following earnings call transcript for {ticker} ({quarter}).\n\n\
         Task: Create a single paragraph executive summary.\n\
         Requirements:\n\
         - Highlight the most important metrics reported.\n\
         - Mention sales/revenue performance.\n\
         - Summarize the future outlook provided by management.\n\
         - Keep it concise and professional.\n\n\
         Transcript:\n{transcript}"
    )
}

pub async fn summarize_earnings(
    alpha: &AlphaVantage,
    pool: &CredentialPool,
    model: &dyn LanguageModel,
    config: &LlmConfig,
    ticker: &str,
    quarter: FiscalQuarter,
) -> ServiceResult<String> {
    pool.ensure_configured()?;

    let request = alpha
        .descriptor("EARNINGS_CALL_TRANSCRIPT", ticker)
        .param("quarter", quarter.to_string());

    let transcript = alpha
        .fetcher()
        .fetch_with_rotation(&request, pool, |payload| {
            match ALPHA_VANTAGE_RULES.classify(payload) {
                AttemptOutcome::Success(payload) => AttemptOutcome::Success(transcript_text(&payload)),
                AttemptOutcome::SoftError { note } => AttemptOutcome::SoftError { note },
                AttemptOutcome::HardError { message } => AttemptOutcome::HardError { message },
                AttemptOutcome::TransportFailure { reason } => AttemptOutcome::TransportFailure { reason },
            }
        })
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("No transcript found for {ticker} {quarter}")))?;

    let prompt = summary_prompt(ticker, quarter, &transcript);
    model
        .generate(GenerationRequest::new(config.analysis_model.as_str(), prompt))
        .await
        .map_err(|err| ServiceError::Model {
            error: "Internal server error summarizing earnings.".to_string(),
            details: err.to_string(),
        })
}
