use serde_json::Value;

use super::decode::{first_text_field, value_to_string};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptOutcome<T> {
    /// Network error, timeout, non-2xx status or unparseable body. Try the next credential.
    TransportFailure { reason: String },
    /// 2xx with a quota or rate-limit note. Try the next credential.
    SoftError { note: String },
    HardError { message: String },
    Success(T),
}

impl<T> AttemptOutcome<T> {
    pub fn label(&self) -> &'static str {
        match self {
            AttemptOutcome::TransportFailure { .. } => "transport failure",
            AttemptOutcome::SoftError { .. } => "soft error",
            AttemptOutcome::HardError { .. } => "hard error",
            AttemptOutcome::Success(_) => "success",
        }
    }
}

/// Field names and phrases that identify soft and hard errors for one provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProviderRules {
    pub version: &'static str,
    pub note_fields: &'static [&'static str],
    /// Case-sensitive substrings that mark a note as a quota/rate-limit note.
    pub soft_phrases: &'static [&'static str],
    pub error_fields: &'static [&'static str],
}

pub const ALPHA_VANTAGE_RULES: ProviderRules = ProviderRules {
    version: "alpha-vantage/2",
    note_fields: &["Note", "Information"],
    soft_phrases: &[
        "rate limit",
        "call frequency",
        "requests per day",
        "higher API call frequency",
    ],
    error_fields: &["Error Message"],
};

impl ProviderRules {
    pub fn classify(&self, payload: Value) -> AttemptOutcome<Value> {
        if let Some(note) = self.rate_limit_note(&payload) {
            return AttemptOutcome::SoftError {
                note: note.to_string(),
            };
        }

        if let Some(message) = self.error_message(&payload) {
            return AttemptOutcome::HardError { message };
        }

        AttemptOutcome::Success(payload)
    }

    pub fn rate_limit_note<'a>(&self, payload: &'a Value) -> Option<&'a str> {
        let note = first_text_field(payload, self.note_fields)?;
        self.soft_phrases
            .iter()
            .any(|phrase| note.contains(phrase))
            .then_some(note)
    }

    pub fn error_message(&self, payload: &Value) -> Option<String> {
        self.error_fields
            .iter()
            .filter_map(|field| payload.get(*field))
            .filter(|value| !value.is_null())
            .map(value_to_string)
            .find(|message| !message.trim().is_empty())
    }
}
