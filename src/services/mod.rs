use std::time::Duration;

use thiserror::Error;

use crate::fetch::{FetchError, HttpRequest, HttpTransport};

pub mod alpha;
pub mod analysis;
pub mod chart;
pub mod income;
pub mod llm;
pub mod overview;
pub mod statistics;
pub mod template;
pub mod transcript;

pub use alpha::AlphaVantage;
pub use analysis::{generate_analysis, transcript_summary};
pub use chart::{stock_chart, ChartRange};
pub use income::income_statement;
pub use llm::{GeminiClient, GenerationRequest, LanguageModel, LlmError};
pub use overview::company_overview;
pub use statistics::{key_statistics, quote_summary, StatisticsTable, YahooFinance};
pub use template::{fetch_template, render_template, RenderedPrompt, Template};
pub use transcript::{summarize_earnings, FiscalQuarter};

pub type ServiceResult<T> = std::result::Result<T, ServiceError>;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("{0}")]
    InvalidInput(String),
    #[error("{0}")]
    Configuration(String),
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error("{0}")]
    NotFound(String),
    /// Upstream answered with a status the caller should see as-is.
    #[error("{message}")]
    Upstream { status: u16, message: String },
    #[error("{error}")]
    Model { error: String, details: String },
    #[error("{0}")]
    Internal(String),
}

impl ServiceError {
    pub fn details(&self) -> Option<String> {
        match self {
            ServiceError::Fetch(err) => err.details(),
            ServiceError::Model { details, .. } => Some(details.clone()),
            _ => None,
        }
    }
}

/// Plain-text GET over the shared transport. Errors carry no URL.
pub(crate) async fn get_text(
    transport: &dyn HttpTransport,
    url: &str,
    timeout: Duration,
) -> Result<String, String> {
    let request = HttpRequest::get(url).with_timeout(timeout);
    let reply = tokio::time::timeout(timeout, transport.execute(request))
        .await
        .map_err(|_| format!("timed out after {} ms", timeout.as_millis()))?
        .map_err(|err| err.to_string())?;

    if reply.is_success() {
        Ok(reply.body)
    } else {
        Err(format!("upstream status {}", reply.status))
    }
}
