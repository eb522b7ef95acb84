use std::ops::ControlFlow;
use std::sync::Arc;
use std::time::Duration;

use log::{debug, info, warn};
use serde_json::Value;

use super::classify::{AttemptOutcome, ProviderRules};
use super::credentials::CredentialPool;
use super::decode::short_text;
use super::request::RequestDescriptor;
use super::result::{FetchError, FetchResult};
use super::transport::{HttpRequest, HttpTransport};

/// Longest raw body kept as diagnostic detail when a reply is not JSON.
const DIAGNOSTIC_BODY_LIMIT: usize = 200;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RotationState {
    pub attempts: usize,
    pub last_note: Option<String>,
    pub last_failure: Option<String>,
}

/// One step of the rotation fold. `Break` is terminal (success or hard error);
/// `Continue` moves on to the next credential.
pub fn advance<T>(
    mut state: RotationState,
    outcome: AttemptOutcome<T>,
) -> ControlFlow<FetchResult<T>, RotationState> {
    state.attempts += 1;
    match outcome {
        AttemptOutcome::Success(payload) => ControlFlow::Break(Ok(payload)),
        AttemptOutcome::HardError { message } => {
            ControlFlow::Break(Err(FetchError::InvalidRequest { message }))
        }
        AttemptOutcome::SoftError { note } => {
            state.last_note = Some(note);
            ControlFlow::Continue(state)
        }
        AttemptOutcome::TransportFailure { reason } => {
            state.last_failure = Some(reason);
            ControlFlow::Continue(state)
        }
    }
}

pub fn exhausted<T>(state: RotationState, descriptor: &RequestDescriptor) -> FetchResult<T> {
    match state.last_note {
        Some(note) => Err(FetchError::QuotaExceeded { note }),
        None => Err(FetchError::Exhausted {
            detail: state.last_failure,
            redacted_url: descriptor.redacted_url(),
        }),
    }
}

#[derive(Clone)]
pub struct ResilientFetcher {
    transport: Arc<dyn HttpTransport>,
    attempt_timeout: Duration,
}

impl ResilientFetcher {
    pub fn new(transport: Arc<dyn HttpTransport>, attempt_timeout: Duration) -> Self {
        Self {
            transport,
            attempt_timeout,
        }
    }

    pub async fn fetch(
        &self,
        descriptor: &RequestDescriptor,
        pool: &CredentialPool,
        rules: &ProviderRules,
    ) -> FetchResult<Value> {
        debug!("Classifying {} with rules {}", descriptor.redacted_url(), rules.version);
        self.fetch_with_rotation(descriptor, pool, |payload| rules.classify(payload))
            .await
    }

    /// Try each credential in pool order until `classify` reports success or a
    /// hard error, or the pool runs out.
    pub async fn fetch_with_rotation<T, F>(
        &self,
        descriptor: &RequestDescriptor,
        pool: &CredentialPool,
        classify: F,
    ) -> FetchResult<T>
    where
        F: Fn(Value) -> AttemptOutcome<T> + Send + Sync,
        T: Send,
    {
        pool.ensure_configured()?;

        let redacted = descriptor.redacted_url();
        let mut state = RotationState::default();

        for (position, credential) in pool.iter().enumerate() {
            let outcome = match descriptor.url_for(credential) {
                Ok(url) => match self.attempt(url).await {
                    Ok(payload) => classify(payload),
                    Err(reason) => AttemptOutcome::TransportFailure { reason },
                },
                Err(err) => AttemptOutcome::TransportFailure {
                    reason: err.to_string(),
                },
            };

            log_outcome(&outcome, position + 1, pool.len(), &redacted);

            match advance(state, outcome) {
                ControlFlow::Break(result) => return result,
                ControlFlow::Continue(next) => state = next,
            }
        }

        info!(
            "All {} credentials exhausted for {} (rate limited: {})",
            state.attempts,
            redacted,
            state.last_note.is_some()
        );
        exhausted(state, descriptor)
    }

    async fn attempt(&self, url: String) -> Result<Value, String> {
        let request = HttpRequest::get(url).with_timeout(self.attempt_timeout);

        let reply = match tokio::time::timeout(self.attempt_timeout, self.transport.execute(request))
            .await
        {
            Ok(Ok(reply)) => reply,
            Ok(Err(err)) => return Err(err.to_string()),
            Err(_) => {
                return Err(format!(
                    "timed out after {} ms",
                    self.attempt_timeout.as_millis()
                ))
            }
        };

        if !reply.is_success() {
            return Err(format!("upstream status {}", reply.status));
        }

        serde_json::from_str::<Value>(&reply.body).map_err(|err| {
            match short_text(&reply.body, DIAGNOSTIC_BODY_LIMIT) {
                Some(body) => format!("non-JSON body: {body}"),
                None => format!("non-JSON body ({err})"),
            }
        })
    }
}

fn log_outcome<T>(outcome: &AttemptOutcome<T>, position: usize, total: usize, url: &str) {
    match outcome {
        AttemptOutcome::Success(_) => {
            debug!("Credential {position}/{total} for {url}: {}", outcome.label());
        }
        AttemptOutcome::SoftError { .. } => {
            info!("Rate limit hit with credential {position}/{total} for {url}, trying next");
        }
        AttemptOutcome::HardError { message } => {
            warn!("Provider rejected {url} with credential {position}/{total}: {message}");
        }
        AttemptOutcome::TransportFailure { reason } => {
            warn!("Credential {position}/{total} failed for {url}: {reason}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::classify::ALPHA_VANTAGE_RULES;
    use crate::fetch::testutils::{Scripted, ScriptedTransport};
    use serde_json::json;

    const TIMEOUT: Duration = Duration::from_secs(5);

    fn descriptor() -> RequestDescriptor {
        RequestDescriptor::new("https://www.alphavantage.co/query", "apikey")
            .param("function", "OVERVIEW")
            .param("symbol", "AAPL")
    }

    fn pool(keys: &[&str]) -> CredentialPool {
        CredentialPool::from_values(keys.iter().map(|key| Some(*key)))
    }

    async fn run(transport: &Arc<ScriptedTransport>, keys: &[&str]) -> FetchResult<Value> {
        let fetcher = ResilientFetcher::new(transport.clone(), TIMEOUT);
        fetcher
            .fetch(&descriptor(), &pool(keys), &ALPHA_VANTAGE_RULES)
            .await
    }

    #[tokio::test]
    async fn empty_pool_never_calls_upstream() {
        let transport = Arc::new(ScriptedTransport::new().json("function=OVERVIEW", json!({})));

        let result = run(&transport, &[]).await;

        assert!(matches!(result, Err(FetchError::NoCredentials { .. })));
        assert_eq!(transport.call_count(), 0);
    }

    #[tokio::test]
    async fn first_success_stops_after_one_call() {
        let transport = Arc::new(
            ScriptedTransport::new().json("apikey=keyA", json!({ "Symbol": "AAPL" })),
        );

        let result = run(&transport, &["keyA", "keyB", "keyC"]).await;

        assert_eq!(result, Ok(json!({ "Symbol": "AAPL" })));
        assert_eq!(transport.call_count(), 1);
    }

    #[tokio::test]
    async fn blank_error_message_is_returned_as_data() {
        let transport = Arc::new(
            ScriptedTransport::new()
                .json("apikey=keyA", json!({ "Error Message": "", "Symbol": "AAPL" })),
        );

        let result = run(&transport, &["keyA", "keyB"]).await;

        assert_eq!(result, Ok(json!({ "Error Message": "", "Symbol": "AAPL" })));
        assert_eq!(transport.call_count(), 1);
    }

    #[tokio::test]
    async fn soft_error_rotates_to_next_credential() {
        let transport = Arc::new(
            ScriptedTransport::new()
                .json("apikey=keyA", json!({ "Note": "rate limit exceeded" }))
                .json("apikey=keyB", json!({ "symbol": "AAPL", "Name": "Apple Inc" })),
        );

        let result = run(&transport, &["keyA", "keyB"]).await;

        assert_eq!(result, Ok(json!({ "symbol": "AAPL", "Name": "Apple Inc" })));
        assert_eq!(transport.call_count(), 2);
    }

    #[tokio::test]
    async fn hard_error_stops_immediately() {
        let transport = Arc::new(
            ScriptedTransport::new()
                .status("apikey=keyA", 503, "unavailable")
                .json("apikey=keyB", json!({ "Error Message": "Invalid API call" }))
                .json("apikey=keyC", json!({ "Symbol": "AAPL" })),
        );

        let result = run(&transport, &["keyA", "keyB", "keyC"]).await;

        assert_eq!(
            result,
            Err(FetchError::InvalidRequest {
                message: "Invalid API call".to_string()
            })
        );
        assert_eq!(transport.call_count(), 2);
    }

    #[tokio::test]
    async fn single_key_hard_error() {
        let transport = Arc::new(
            ScriptedTransport::new().json("apikey=keyA", json!({ "Error Message": "Invalid API call" })),
        );

        let result = run(&transport, &["keyA"]).await;

        assert!(matches!(result, Err(FetchError::InvalidRequest { ref message }) if message == "Invalid API call"));
        assert_eq!(transport.call_count(), 1);
    }

    #[tokio::test]
    async fn all_soft_errors_report_last_note() {
        let transport = Arc::new(
            ScriptedTransport::new()
                .json("apikey=keyA", json!({ "Note": "call frequency is 5 per minute" }))
                .json("apikey=keyB", json!({ "Information": "limit is 25 requests per day" })),
        );

        let result = run(&transport, &["keyA", "keyB"]).await;

        assert_eq!(
            result,
            Err(FetchError::QuotaExceeded {
                note: "limit is 25 requests per day".to_string()
            })
        );
        assert_eq!(transport.call_count(), 2);
    }

    #[tokio::test]
    async fn soft_error_then_transport_failure_is_still_quota() {
        let transport = Arc::new(
            ScriptedTransport::new()
                .json("apikey=keyA", json!({ "Note": "rate limit exceeded" }))
                .fail("apikey=keyB", "connection reset"),
        );

        let result = run(&transport, &["keyA", "keyB"]).await;

        assert!(matches!(result, Err(FetchError::QuotaExceeded { .. })));
    }

    #[tokio::test]
    async fn transport_failures_exhaust_every_credential() {
        let transport = Arc::new(ScriptedTransport::new().fail("function=OVERVIEW", "connection refused"));

        let result = run(&transport, &["keyA", "keyB", "keyC"]).await;

        match result {
            Err(err @ FetchError::Exhausted { .. }) => {
                let details = err.details().unwrap();
                assert!(details.contains("connection refused"), "details: {details}");
                assert!(!details.contains("keyC"), "credential leaked: {details}");
            }
            other => panic!("expected exhausted, got {other:?}"),
        }
        assert_eq!(transport.call_count(), 3);
    }

    #[tokio::test]
    async fn non_json_body_continues_rotation() {
        let transport = Arc::new(
            ScriptedTransport::new()
                .status("apikey=keyA", 200, "<html>Service Unavailable</html>")
                .json("apikey=keyB", json!({ "Symbol": "AAPL" })),
        );

        let result = run(&transport, &["keyA", "keyB"]).await;

        assert_eq!(result, Ok(json!({ "Symbol": "AAPL" })));
        assert_eq!(transport.call_count(), 2);
    }

    #[tokio::test]
    async fn short_non_json_body_is_kept_as_detail() {
        let transport = Arc::new(
            ScriptedTransport::new().status("function=OVERVIEW", 200, "<html>maintenance</html>"),
        );

        let err = run(&transport, &["keyA"]).await.expect_err("should exhaust");

        assert!(err.details().unwrap().contains("<html>maintenance</html>"));
    }

    #[tokio::test(start_paused = true)]
    async fn hung_attempt_times_out_and_rotates() {
        let transport = Arc::new(
            ScriptedTransport::new()
                .on("apikey=keyA", Scripted::Hang)
                .json("apikey=keyB", json!({ "Symbol": "AAPL" })),
        );

        let result = run(&transport, &["keyA", "keyB"]).await;

        assert_eq!(result, Ok(json!({ "Symbol": "AAPL" })));
        assert_eq!(transport.call_count(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn every_attempt_hanging_exhausts_pool() {
        let transport = Arc::new(ScriptedTransport::new().on("function=OVERVIEW", Scripted::Hang));

        let result = run(&transport, &["keyA", "keyB", "keyC"]).await;

        assert!(matches!(result, Err(FetchError::Exhausted { .. })));
        assert_eq!(transport.call_count(), 3);
    }

    #[tokio::test]
    async fn attempts_follow_pool_order() {
        let transport = Arc::new(ScriptedTransport::new().status("function=OVERVIEW", 500, ""));

        let _ = run(&transport, &["first", "second", "third"]).await;

        let keys: Vec<String> = transport
            .urls()
            .iter()
            .map(|url| url.rsplit("apikey=").next().unwrap().to_string())
            .collect();
        assert_eq!(keys, vec!["first", "second", "third"]);
    }

    #[tokio::test]
    async fn repeated_fetches_classify_identically() {
        let transport = Arc::new(
            ScriptedTransport::new()
                .json("apikey=keyA", json!({ "Note": "rate limit exceeded" }))
                .status("apikey=keyB", 502, "")
                .json("apikey=keyC", json!({ "Symbol": "AAPL" })),
        );

        let first = run(&transport, &["keyA", "keyB", "keyC"]).await;
        let first_calls = transport.urls();
        let second = run(&transport, &["keyA", "keyB", "keyC"]).await;
        let all_calls = transport.urls();

        assert_eq!(first, second);
        assert_eq!(first_calls.as_slice(), &all_calls[first_calls.len()..]);
    }

    #[tokio::test]
    async fn custom_classifier_can_reject_payloads() {
        let transport = Arc::new(
            ScriptedTransport::new()
                .json("apikey=keyA", json!({}))
                .json("apikey=keyB", json!({ "content": "transcript" })),
        );
        let fetcher = ResilientFetcher::new(transport.clone(), TIMEOUT);

        let result = fetcher
            .fetch_with_rotation(&descriptor(), &pool(&["keyA", "keyB"]), |payload| {
                match payload.get("content").and_then(Value::as_str) {
                    Some(text) => AttemptOutcome::Success(text.to_string()),
                    None => AttemptOutcome::TransportFailure {
                        reason: "empty payload".to_string(),
                    },
                }
            })
            .await;

        assert_eq!(result, Ok("transcript".to_string()));
    }

    #[test]
    fn advance_breaks_only_on_terminal_outcomes() {
        let state = RotationState::default();

        let soft = advance::<Value>(state.clone(), AttemptOutcome::SoftError { note: "n".into() });
        assert!(matches!(soft, ControlFlow::Continue(ref s) if s.last_note.as_deref() == Some("n")));

        let transport = advance::<Value>(
            state.clone(),
            AttemptOutcome::TransportFailure { reason: "r".into() },
        );
        assert!(matches!(transport, ControlFlow::Continue(ref s) if s.attempts == 1));

        let hard = advance::<Value>(state.clone(), AttemptOutcome::HardError { message: "m".into() });
        assert!(matches!(hard, ControlFlow::Break(Err(FetchError::InvalidRequest { .. }))));

        let success = advance(state, AttemptOutcome::Success(1));
        assert!(matches!(success, ControlFlow::Break(Ok(1))));
    }
}
