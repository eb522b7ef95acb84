use std::net::{Ipv4Addr, SocketAddr};
use std::time::Duration;

pub mod loader;
pub mod source;
pub mod validator;

pub use loader::load_settings;
pub use source::{ConfigSource, MapSource, ProcessEnv};

/// Environment variables holding Alpha Vantage keys, in rotation order.
pub const DEFAULT_CREDENTIAL_VARS: [&str; 5] = [
    "ALPHA_KEY",
    "ALPHA_KEY_2",
    "ALPHA_KEY_3",
    "ALPHA_KEY_4",
    "ALPHA_KEY_5",
];

const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AggregationMode {
    /// One sub-fetch at a time, so rotations never race for the same first key.
    #[default]
    Sequential,
    Concurrent,
}

#[derive(Debug, Clone)]
pub struct AlphaVantageConfig {
    pub base_url: String,
    pub credential_vars: Vec<String>,
    /// Query parameter the credential is appended under at attempt time.
    pub credential_param: String,
}

#[derive(Debug, Clone)]
pub struct YahooConfig {
    pub base_url: String,
    pub user_agent: String,
}

#[derive(Debug, Clone)]
pub struct TemplateConfig {
    pub urls: Vec<String>,
    pub placeholder: String,
    pub min_length: usize,
}

#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub base_url: String,
    pub api_key_var: String,
    pub analysis_model: String,
    pub transcript_model: String,
    pub transcript_prompt_url: String,
    pub request_timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub listen_addr: SocketAddr,
    pub attempt_timeout: Duration,
    pub aggregation: AggregationMode,
    pub alpha_vantage: AlphaVantageConfig,
    pub yahoo: YahooConfig,
    pub templates: TemplateConfig,
    pub llm: LlmConfig,
}

impl Settings {
    pub fn builtin() -> Self {
        Settings {
            listen_addr: SocketAddr::from((Ipv4Addr::UNSPECIFIED, 3000)),
            attempt_timeout: Duration::from_secs(5),
            aggregation: AggregationMode::Sequential,
            alpha_vantage: AlphaVantageConfig {
                base_url: "https://www.alphavantage.co/query".to_string(),
                credential_vars: DEFAULT_CREDENTIAL_VARS
                    .iter()
                    .map(|name| name.to_string())
                    .collect(),
                credential_param: "apikey".to_string(),
            },
            yahoo: YahooConfig {
                base_url: "https://query1.finance.yahoo.com".to_string(),
                user_agent: BROWSER_USER_AGENT.to_string(),
            },
            templates: TemplateConfig {
                urls: vec![
                    "https://cdn.jsdelivr.net/gh/mrarogiewicz/prompts@main/stock_analysis_detail.md"
                        .to_string(),
                    "https://raw.githubusercontent.com/mrarogiewicz/prompts/main/stock_analysis_detail.md"
                        .to_string(),
                    "https://raw.githack.com/mrarogiewicz/prompts/main/stock_analysis_detail.md"
                        .to_string(),
                ],
                placeholder: "XXX".to_string(),
                min_length: 500,
            },
            llm: LlmConfig {
                base_url: "https://generativelanguage.googleapis.com/v1beta".to_string(),
                api_key_var: "API_KEY".to_string(),
                analysis_model: "gemini-3-pro-preview".to_string(),
                transcript_model: "gemini-2.5-flash".to_string(),
                transcript_prompt_url: "https://raw.githubusercontent.com/mrarogiewicz/prompts/58a7ec6c1a7a09ff0271acf466b6997a2d8ad609/earnings_transcript_summarization.md"
                    .to_string(),
                request_timeout: Duration::from_secs(120),
            },
        }
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self::builtin()
    }
}
