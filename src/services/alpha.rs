use serde_json::Value;

use crate::config::{AggregationMode, AlphaVantageConfig};
use crate::fetch::{CredentialPool, FetchResult, RequestDescriptor, ResilientFetcher, ALPHA_VANTAGE_RULES};

#[derive(Clone)]
pub struct AlphaVantage {
    fetcher: ResilientFetcher,
    base_url: String,
    credential_param: String,
    mode: AggregationMode,
}

impl AlphaVantage {
    pub fn new(fetcher: ResilientFetcher, config: &AlphaVantageConfig, mode: AggregationMode) -> Self {
        Self {
            fetcher,
            base_url: config.base_url.clone(),
            credential_param: config.credential_param.clone(),
            mode,
        }
    }

    pub fn fetcher(&self) -> &ResilientFetcher {
        &self.fetcher
    }

    pub fn mode(&self) -> AggregationMode {
        self.mode
    }

    /// `function` + `symbol` descriptor; extra parameters can be chained on.
    pub fn descriptor(&self, function: &str, symbol: &str) -> RequestDescriptor {
        RequestDescriptor::new(self.base_url.as_str(), self.credential_param.as_str())
            .param("function", function)
            .param("symbol", symbol)
    }

    pub async fn fetch(&self, descriptor: &RequestDescriptor, pool: &CredentialPool) -> FetchResult<Value> {
        self.fetcher.fetch(descriptor, pool, &ALPHA_VANTAGE_RULES).await
    }
}
