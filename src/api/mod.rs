use std::sync::Arc;

use axum::Router;
use log::info;

use crate::config::{ConfigSource, Settings};
use crate::error::{Context, Result};
use crate::fetch::{Credential, CredentialPool, HttpTransport, ResilientFetcher};
use crate::services::{AlphaVantage, GeminiClient, ServiceError, ServiceResult, YahooFinance};

pub mod error;
pub mod routes;

pub use error::{ApiError, ApiResult};

/// Shared, read-only request context. Credentials are looked up through
/// `config` on every request and never cached here.
#[derive(Clone)]
pub struct AppState {
    pub settings: Arc<Settings>,
    pub transport: Arc<dyn HttpTransport>,
    pub config: Arc<dyn ConfigSource>,
}

impl AppState {
    pub fn new(
        settings: Settings,
        transport: Arc<dyn HttpTransport>,
        config: Arc<dyn ConfigSource>,
    ) -> Self {
        Self {
            settings: Arc::new(settings),
            transport,
            config,
        }
    }

    pub fn credential_pool(&self) -> CredentialPool {
        CredentialPool::from_source(
            self.config.as_ref(),
            &self.settings.alpha_vantage.credential_vars,
        )
    }

    pub fn alpha_vantage(&self) -> AlphaVantage {
        let fetcher = ResilientFetcher::new(self.transport.clone(), self.settings.attempt_timeout);
        AlphaVantage::new(fetcher, &self.settings.alpha_vantage, self.settings.aggregation)
    }

    pub fn yahoo(&self) -> YahooFinance {
        YahooFinance::new(
            self.transport.clone(),
            &self.settings.yahoo,
            self.settings.attempt_timeout,
        )
    }

    /// Model client for this request; fails when the API key is not configured.
    pub fn language_model(&self) -> ServiceResult<GeminiClient> {
        let name = &self.settings.llm.api_key_var;
        let api_key = self
            .config
            .get(name)
            .and_then(Credential::new)
            .ok_or_else(|| {
                ServiceError::Configuration(format!(
                    "The {name} environment variable is not set on the server."
                ))
            })?;
        Ok(GeminiClient::new(
            self.transport.clone(),
            &self.settings.llm,
            api_key,
        ))
    }
}

pub fn app_router(state: AppState) -> Router {
    routes::api_routes().with_state(state)
}

pub async fn serve(state: AppState) -> Result<()> {
    let addr = state.settings.listen_addr;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;

    info!("Listening on http://{addr}");
    axum::serve(listener, app_router(state))
        .await
        .context("HTTP server stopped unexpectedly")?;
    Ok(())
}
