use std::time::Duration;

use log::warn;

use crate::config::LlmConfig;
use crate::fetch::HttpTransport;

use super::{get_text, GenerationRequest, LanguageModel, ServiceError, ServiceResult};

const ANALYST_INSTRUCTION: &str = "You are a financial analyst providing a stock analysis. \
Respond in well-structured Markdown format. Use headings, bold text, bullet points, and tables \
to present the data clearly and professionally, similar to a GitHub README file.";

/// Forward `prompt` verbatim with the fixed analyst instruction.
pub async fn generate_analysis(
    model: &dyn LanguageModel,
    config: &LlmConfig,
    prompt: &str,
) -> ServiceResult<String> {
    let request = GenerationRequest::new(config.analysis_model.as_str(), prompt)
        .with_system_instruction(ANALYST_INSTRUCTION);

    model.generate(request).await.map_err(|err| ServiceError::Model {
        error: "Failed to generate analysis from Gemini.".to_string(),
        details: err.to_string(),
    })
}

/// Summarize a client-supplied transcript using the pinned summarization prompt
/// as system instruction.
pub async fn transcript_summary(
    transport: &dyn HttpTransport,
    model: &dyn LanguageModel,
    config: &LlmConfig,
    transcript: &str,
    ticker: Option<&str>,
    quarter: Option<&str>,
) -> ServiceResult<String> {
    let failed = |details: String| ServiceError::Model {
        error: "Failed to generate summary.".to_string(),
        details,
    };

    let instruction = get_text(transport, &config.transcript_prompt_url, prompt_timeout(config))
        .await
        .map_err(|reason| {
            warn!("Could not load transcript summarization prompt: {reason}");
            failed(format!("Failed to fetch prompt template: {reason}"))
        })?;

    let prompt = format!(
        "Now produce the investor-style executive summary for the following transcript for {} ({}):\n\n{}",
        ticker.unwrap_or("unknown ticker"),
        quarter.unwrap_or("unknown quarter"),
        transcript
    );
    let request = GenerationRequest::new(config.transcript_model.as_str(), prompt)
        .with_system_instruction(instruction);

    model
        .generate(request)
        .await
        .map_err(|err| failed(err.to_string()))
}

fn prompt_timeout(config: &LlmConfig) -> Duration {
    config.request_timeout.min(Duration::from_secs(15))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Settings;
    use crate::fetch::testutils::ScriptedTransport;
    use crate::services::llm::fakes::RecordingModel;
    use crate::services::LlmError;

    #[tokio::test]
    async fn analysis_uses_fixed_instruction() {
        let model = RecordingModel::answering("# AAPL\n\n**Buy**");

        let text = generate_analysis(&model, &Settings::builtin().llm, "Analyze AAPL")
            .await
            .unwrap();

        assert_eq!(text, "# AAPL\n\n**Buy**");
        let request = &model.requests()[0];
        assert_eq!(request.prompt, "Analyze AAPL");
        assert_eq!(request.model, "gemini-3-pro-preview");
        assert!(request.system_instruction.as_deref().unwrap().contains("Markdown"));
    }

    #[tokio::test]
    async fn analysis_failure_reports_details() {
        let model = RecordingModel::failing(LlmError::Transport("connection refused".to_string()));

        let err = generate_analysis(&model, &Settings::builtin().llm, "Analyze AAPL")
            .await
            .unwrap_err();

        assert_eq!(err.to_string(), "Failed to generate analysis from Gemini.");
        assert_eq!(err.details().as_deref(), Some("model request failed: connection refused"));
    }

    #[tokio::test]
    async fn transcript_summary_loads_remote_instruction() {
        let settings = Settings::builtin();
        let transport = ScriptedTransport::new().status(
            "earnings_transcript_summarization.md",
            200,
            "You summarize earnings calls for investors.",
        );
        let model = RecordingModel::answering("Executive summary.");

        let text = transcript_summary(
            &transport,
            &model,
            &settings.llm,
            "CEO: We grew.",
            Some("MSFT"),
            Some("2024Q4"),
        )
        .await
        .unwrap();

        assert_eq!(text, "Executive summary.");
        let request = &model.requests()[0];
        assert_eq!(request.model, "gemini-2.5-flash");
        assert_eq!(
            request.system_instruction.as_deref(),
            Some("You summarize earnings calls for investors.")
        );
        assert!(request.prompt.contains("for MSFT (2024Q4):\n\nCEO: We grew."));
    }

    #[tokio::test]
    async fn missing_instruction_skips_model() {
        let settings = Settings::builtin();
        let transport = ScriptedTransport::new().status("earnings_transcript_summarization.md", 404, "");
        let model = RecordingModel::answering("unused");

        let err = transcript_summary(&transport, &model, &settings.llm, "text", None, None)
            .await
            .unwrap_err();

        assert_eq!(err.to_string(), "Failed to generate summary.");
        assert!(err.details().unwrap().contains("upstream status 404"));
        assert!(model.requests().is_empty());
    }
}
