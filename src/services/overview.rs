use futures::FutureExt;
use serde_json::{Map, Value};

use crate::fetch::decode::is_empty_payload;
use crate::fetch::{best_effort, gather, merge_shallow, CredentialPool};

use super::{AlphaVantage, ServiceError, ServiceResult};

const QUOTE_SLOT: &str = "Global Quote";

/// Company profile merged with the latest quote. The profile is required;
/// the quote is best-effort and shows up as `"Global Quote": null` when it fails.
pub async fn company_overview(
    alpha: &AlphaVantage,
    pool: &CredentialPool,
    ticker: &str,
) -> ServiceResult<Value> {
    pool.ensure_configured()?;

    let profile_request = alpha.descriptor("OVERVIEW", ticker);
    let quote_request = alpha.descriptor("GLOBAL_QUOTE", ticker);

    let profile = async {
        let payload = alpha.fetch(&profile_request, pool).await?;
        if is_empty_payload(&payload) {
            return Err(ServiceError::NotFound(
                "No overview data found for this ticker.".to_string(),
            ));
        }
        Ok::<Value, ServiceError>(payload)
    }
    .boxed();
    let quote = alpha.fetch(&quote_request, pool).boxed();

    let (profile, mut supplements) = gather(alpha.mode(), profile, vec![quote]).await?;

    let mut merged = match profile {
        Value::Object(map) => map,
        other => {
            let mut map = Map::new();
            map.insert("profile".to_string(), other);
            map
        }
    };

    let quote = best_effort("quote", supplements.remove(0));
    if quote.is_null() {
        merged.insert(QUOTE_SLOT.to_string(), Value::Null);
    } else {
        merge_shallow(&mut merged, quote);
    }

    merged.insert(
        "_debugUrl".to_string(),
        Value::String(profile_request.redacted_url()),
    );

    Ok(Value::Object(merged))
}
