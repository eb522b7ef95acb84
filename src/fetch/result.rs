use serde::Serialize;
use thiserror::Error;

pub type FetchResult<T = serde_json::Value> = std::result::Result<T, FetchError>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    /// No usable credential was configured; nothing was sent upstream.
    #[error("The '{source_name}' environment variables are not set on the server.")]
    NoCredentials { source_name: String },
    #[error("Failed to fetch data after trying all available API keys.")]
    Exhausted {
        detail: Option<String>,
        redacted_url: String,
    },
    #[error("API rate limit exceeded on all keys.")]
    QuotaExceeded { note: String },
    /// The provider rejected the request itself; no credential can fix it.
    #[error("{message}")]
    InvalidRequest { message: String },
}

impl FetchError {
    pub fn details(&self) -> Option<String> {
        match self {
            FetchError::NoCredentials { .. } | FetchError::InvalidRequest { .. } => None,
            FetchError::QuotaExceeded { note } => Some(note.clone()),
            FetchError::Exhausted {
                detail,
                redacted_url,
            } => Some(match detail {
                Some(detail) => format!("last attempt: {detail}; url: {redacted_url}"),
                None => format!("url: {redacted_url}"),
            }),
        }
    }

    pub fn to_body(&self) -> ErrorBody {
        ErrorBody::new(self.to_string(), self.details())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorBody {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ErrorBody {
    pub fn new(error: impl Into<String>, details: Option<String>) -> Self {
        Self {
            error: error.into(),
            details,
        }
    }
}
