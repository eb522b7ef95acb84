use futures::future::{self, BoxFuture};
use log::warn;
use serde_json::{Map, Value};

use crate::config::AggregationMode;

use super::result::FetchResult;

/// Drive independent sub-fetches. Results keep the order of `tasks`
/// whichever mode is used.
pub async fn run_all<'a, T>(mode: AggregationMode, tasks: Vec<BoxFuture<'a, T>>) -> Vec<T>
where
    T: Send + 'a,
{
    match mode {
        AggregationMode::Sequential => {
            let mut results = Vec::with_capacity(tasks.len());
            for task in tasks {
                results.push(task.await);
            }
            results
        }
        AggregationMode::Concurrent => future::join_all(tasks).await,
    }
}

/// One required fetch plus best-effort supplements. In sequential mode a
/// failed required fetch returns before any supplement is issued.
pub async fn gather<'a, E>(
    mode: AggregationMode,
    required: BoxFuture<'a, Result<Value, E>>,
    supplements: Vec<BoxFuture<'a, FetchResult<Value>>>,
) -> Result<(Value, Vec<FetchResult<Value>>), E>
where
    E: Send + 'a,
{
    match mode {
        AggregationMode::Sequential => {
            let primary = required.await?;
            let rest = run_all(mode, supplements).await;
            Ok((primary, rest))
        }
        AggregationMode::Concurrent => {
            let (primary, rest) = future::join(required, future::join_all(supplements)).await;
            Ok((primary?, rest))
        }
    }
}

/// Supplementary slot: a failure becomes `null` instead of failing the aggregate.
pub fn best_effort(slot: &str, result: FetchResult<Value>) -> Value {
    match result {
        Ok(payload) => payload,
        Err(err) => {
            warn!("Supplementary fetch `{slot}` failed: {err}");
            Value::Null
        }
    }
}

pub fn merge_shallow(base: &mut Map<String, Value>, overlay: Value) {
    if let Value::Object(map) = overlay {
        base.extend(map);
    }
}

/// Named slots that are not key-compatible. Failed slots are `null`; when
/// every slot failed the first error is returned instead.
pub fn collect_slots(
    names: &[&str],
    results: Vec<FetchResult<Value>>,
) -> FetchResult<Map<String, Value>> {
    if results.iter().all(Result::is_err) {
        if let Some(Err(first)) = results.into_iter().next() {
            return Err(first);
        }
        return Ok(Map::new());
    }

    Ok(names
        .iter()
        .zip(results)
        .map(|(name, result)| (name.to_string(), best_effort(name, result)))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::result::FetchError;
    use futures::FutureExt;
    use serde_json::json;

    fn quota() -> FetchError {
        FetchError::QuotaExceeded {
            note: "rate limit".to_string(),
        }
    }

    #[tokio::test]
    async fn both_modes_keep_task_order() {
        for mode in [AggregationMode::Sequential, AggregationMode::Concurrent] {
            let tasks: Vec<BoxFuture<'_, u32>> = vec![
                async { 1 }.boxed(),
                async {
                    tokio::task::yield_now().await;
                    2
                }
                .boxed(),
                async { 3 }.boxed(),
            ];
            assert_eq!(run_all(mode, tasks).await, vec![1, 2, 3]);
        }
    }

    #[tokio::test]
    async fn sequential_gather_skips_supplements_after_required_failure() {
        let issued = std::sync::atomic::AtomicUsize::new(0);
        let supplement = async {
            issued.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            Ok::<Value, FetchError>(json!({}))
        }
        .boxed();

        let result = gather(
            AggregationMode::Sequential,
            async { Err::<Value, _>(quota()) }.boxed(),
            vec![supplement],
        )
        .await;

        assert_eq!(result.unwrap_err(), quota());
        assert_eq!(issued.load(std::sync::atomic::Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn concurrent_gather_returns_every_supplement() {
        let (primary, rest) = gather::<FetchError>(
            AggregationMode::Concurrent,
            async { Ok::<Value, FetchError>(json!({ "Symbol": "IBM" })) }.boxed(),
            vec![
                async { Err::<Value, FetchError>(quota()) }.boxed(),
                async { Ok::<Value, FetchError>(json!(1)) }.boxed(),
            ],
        )
        .await
        .unwrap();

        assert_eq!(primary, json!({ "Symbol": "IBM" }));
        assert_eq!(rest, vec![Err(quota()), Ok(json!(1))]);
    }

    #[test]
    fn failed_supplement_becomes_null() {
        assert_eq!(best_effort("balance", Err(quota())), Value::Null);
        assert_eq!(best_effort("balance", Ok(json!({"a": 1}))), json!({"a": 1}));
    }

    #[test]
    fn overlay_keys_win() {
        let mut base = json!({ "Symbol": "IBM", "Price": "1" })
            .as_object()
            .cloned()
            .unwrap();
        merge_shallow(&mut base, json!({ "Price": "2", "Global Quote": {} }));
        assert_eq!(
            Value::Object(base),
            json!({ "Symbol": "IBM", "Price": "2", "Global Quote": {} })
        );
    }

    #[test]
    fn slots_keep_partial_results() {
        let slots = collect_slots(
            &["intraday", "daily"],
            vec![Err(quota()), Ok(json!({ "Meta Data": {} }))],
        )
        .unwrap();
        assert_eq!(slots["intraday"], Value::Null);
        assert_eq!(slots["daily"], json!({ "Meta Data": {} }));
    }

    #[test]
    fn all_failed_slots_surface_first_error() {
        let err = collect_slots(
            &["weekly", "monthly"],
            vec![
                Err(quota()),
                Err(FetchError::InvalidRequest {
                    message: "bad".to_string(),
                }),
            ],
        )
        .unwrap_err();
        assert_eq!(err, quota());
    }
}
