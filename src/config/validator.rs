use crate::error::{AppError, Result};

use super::Settings;

/// Validate settings and surface every problem at once.
pub fn validate_settings(settings: &Settings) -> Result<()> {
    let mut issues = Vec::new();

    validate_timeout(settings, &mut issues);
    validate_providers(settings, &mut issues);
    validate_templates(settings, &mut issues);

    if issues.is_empty() {
        Ok(())
    } else {
        Err(AppError::message(format!(
            "settings invalid:\n  - {}",
            issues.join("\n  - ")
        )))
    }
}

fn validate_timeout(settings: &Settings, issues: &mut Vec<String>) {
    if settings.attempt_timeout.is_zero() {
        issues.push("attempt timeout must be greater than zero".to_string());
    }
}

fn validate_providers(settings: &Settings, issues: &mut Vec<String>) {
    let alpha = &settings.alpha_vantage;
    if !is_http_url(&alpha.base_url) {
        issues.push(format!(
            "alpha vantage base url `{}` must start with http:// or https://",
            alpha.base_url
        ));
    }
    if alpha.credential_vars.is_empty() {
        issues.push("at least one credential variable name must be configured".to_string());
    }
    if alpha.credential_param.trim().is_empty() {
        issues.push("credential query parameter must not be empty".to_string());
    }

    if !is_http_url(&settings.yahoo.base_url) {
        issues.push(format!(
            "yahoo base url `{}` must start with http:// or https://",
            settings.yahoo.base_url
        ));
    }

    if !is_http_url(&settings.llm.base_url) {
        issues.push(format!(
            "llm base url `{}` must start with http:// or https://",
            settings.llm.base_url
        ));
    }
}

fn validate_templates(settings: &Settings, issues: &mut Vec<String>) {
    let templates = &settings.templates;
    if templates.urls.is_empty() {
        issues.push("at least one template url must be configured".to_string());
    }
    for url in &templates.urls {
        if !is_http_url(url) {
            issues.push(format!("template url `{url}` must start with http:// or https://"));
        }
    }
    if templates.placeholder.is_empty() {
        issues.push("template placeholder must not be empty".to_string());
    }
}

fn is_http_url(value: &str) -> bool {
    value.starts_with("http://") || value.starts_with("https://")
}
