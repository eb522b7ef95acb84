use std::fmt::{self, Debug};

use crate::config::ConfigSource;

use super::result::FetchError;

/// Opaque API token. Its value only leaves this type when a concrete URL is built.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    pub fn new(value: impl AsRef<str>) -> Option<Self> {
        let trimmed = value.as_ref().trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(Self(trimmed.to_string()))
        }
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(<redacted>)")
    }
}

#[derive(Debug, Clone, Default)]
pub struct CredentialPool {
    credentials: Vec<Credential>,
    label: String,
}

impl CredentialPool {
    pub fn from_values<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = Option<S>>,
        S: AsRef<str>,
    {
        let credentials = values
            .into_iter()
            .flatten()
            .filter_map(Credential::new)
            .collect();

        Self {
            credentials,
            label: "API key".to_string(),
        }
    }

    pub fn from_source(source: &dyn ConfigSource, names: &[String]) -> Self {
        let mut pool = Self::from_values(names.iter().map(|name| source.get(name)));
        if let Some(first) = names.first() {
            pool.label = first.clone();
        }
        pool
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn len(&self) -> usize {
        self.credentials.len()
    }

    pub fn is_empty(&self) -> bool {
        self.credentials.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Credential> {
        self.credentials.iter()
    }

    /// Fail fast, before any network call, when nothing is configured.
    pub fn ensure_configured(&self) -> Result<(), FetchError> {
        if self.is_empty() {
            Err(FetchError::NoCredentials {
                source_name: self.label.clone(),
            })
        } else {
            Ok(())
        }
    }
}
