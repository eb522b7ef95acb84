use std::time::Duration;

use log::{debug, warn};
use serde::Serialize;

use crate::config::TemplateConfig;
use crate::fetch::HttpTransport;
use crate::utils::replace_placeholder;

use super::{get_text, ServiceError, ServiceResult};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    pub source: String,
    pub body: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RenderedPrompt {
    pub ticker: String,
    pub source: String,
    pub content: String,
}

/// Try each mirror in order and keep the first body that looks like a real
/// template: it must contain the placeholder and exceed the minimum length.
pub async fn fetch_template(
    transport: &dyn HttpTransport,
    config: &TemplateConfig,
    timeout: Duration,
) -> ServiceResult<Template> {
    for url in &config.urls {
        match get_text(transport, url, timeout).await {
            Ok(body) if accepts(config, &body) => {
                debug!("Loaded prompt template from {url}");
                return Ok(Template {
                    source: url.clone(),
                    body,
                });
            }
            Ok(body) => warn!(
                "Ignoring template from {url}: {} chars, placeholder present: {}",
                body.chars().count(),
                body.contains(&config.placeholder)
            ),
            Err(reason) => warn!("Failed to fetch template from {url}: {reason}"),
        }
    }

    Err(ServiceError::Upstream {
        status: 502,
        message: "Could not fetch template from any available source.".to_string(),
    })
}

fn accepts(config: &TemplateConfig, body: &str) -> bool {
    body.contains(&config.placeholder) && body.chars().count() > config.min_length
}

/// Substitute the upper-cased ticker for every placeholder.
pub fn render_template(template: &Template, config: &TemplateConfig, ticker: &str) -> RenderedPrompt {
    let ticker = ticker.trim().to_uppercase();
    RenderedPrompt {
        content: replace_placeholder(&template.body, &config.placeholder, &ticker),
        source: template.source.clone(),
        ticker,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Settings;
    use crate::fetch::testutils::ScriptedTransport;

    fn config() -> TemplateConfig {
        TemplateConfig {
            urls: vec![
                "https://mirror-one.test/prompt.md".to_string(),
                "https://mirror-two.test/prompt.md".to_string(),
                "https://mirror-three.test/prompt.md".to_string(),
            ],
            ..Settings::builtin().templates
        }
    }

    fn long_template() -> String {
        format!("# Analysis of XXX\n\n{}\n\nCompare XXX with peers.", "detail ".repeat(100))
    }

    #[tokio::test]
    async fn falls_through_to_first_acceptable_mirror() {
        let transport = ScriptedTransport::new()
            .status("mirror-one", 404, "not found")
            .status("mirror-two", 200, "XXX too short")
            .status("mirror-three", 200, &long_template());

        let template = fetch_template(&transport, &config(), Duration::from_secs(5))
            .await
            .unwrap();

        assert_eq!(template.source, "https://mirror-three.test/prompt.md");
        assert_eq!(transport.call_count(), 3);
    }

    #[tokio::test]
    async fn long_body_without_placeholder_is_rejected() {
        let transport = ScriptedTransport::new()
            .status("mirror-one", 200, &"no placeholder here ".repeat(50))
            .fail("mirror-two", "dns failure")
            .fail("mirror-three", "dns failure");

        let err = fetch_template(&transport, &config(), Duration::from_secs(5))
            .await
            .unwrap_err();

        assert_eq!(err.to_string(), "Could not fetch template from any available source.");
    }

    #[tokio::test]
    async fn stops_at_first_good_mirror() {
        let transport = ScriptedTransport::new().status("mirror-one", 200, &long_template());

        fetch_template(&transport, &config(), Duration::from_secs(5))
            .await
            .unwrap();

        assert_eq!(transport.call_count(), 1);
    }

    #[test]
    fn renders_uppercased_ticker_everywhere() {
        let template = Template {
            source: "https://mirror-one.test/prompt.md".to_string(),
            body: long_template(),
        };

        let rendered = render_template(&template, &config(), " nvda ");

        assert_eq!(rendered.ticker, "NVDA");
        assert!(rendered.content.starts_with("# Analysis of NVDA"));
        assert!(rendered.content.contains("Compare NVDA with peers."));
        assert!(!rendered.content.contains("XXX"));
    }
}
