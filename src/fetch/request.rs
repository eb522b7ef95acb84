use reqwest::Url;

use super::credentials::Credential;
use super::transport::TransportError;

/// Base URL plus query parameters, with the credential left out until attempt time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestDescriptor {
    base_url: String,
    params: Vec<(String, String)>,
    credential_param: String,
}

impl RequestDescriptor {
    pub fn new(base_url: impl Into<String>, credential_param: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            params: Vec::new(),
            credential_param: credential_param.into(),
        }
    }

    pub fn param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.push((name.into(), value.into()));
        self
    }

    /// Concrete URL for one attempt. Never log the return value.
    pub fn url_for(&self, credential: &Credential) -> Result<String, TransportError> {
        let credential_pair = (self.credential_param.as_str(), credential.expose());
        let pairs = self
            .params
            .iter()
            .map(|(name, value)| (name.as_str(), value.as_str()))
            .chain(std::iter::once(credential_pair));

        Url::parse_with_params(&self.base_url, pairs)
            .map(String::from)
            .map_err(|err| TransportError::new(format!("invalid request url: {err}")))
    }

    /// URL without the credential, safe for logs and debug fields.
    pub fn redacted_url(&self) -> String {
        let pairs = self
            .params
            .iter()
            .map(|(name, value)| (name.as_str(), value.as_str()));

        match Url::parse_with_params(&self.base_url, pairs) {
            Ok(url) => url.into(),
            Err(_) => self.base_url.clone(),
        }
    }
}
