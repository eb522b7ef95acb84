use futures::FutureExt;
use serde_json::{Map, Value};

use crate::fetch::{best_effort, gather, CredentialPool, FetchResult};

use super::{AlphaVantage, ServiceError, ServiceResult};

const SUPPLEMENTS: [(&str, &str); 3] = [
    ("balance", "BALANCE_SHEET"),
    ("shares", "SHARES_OUTSTANDING"),
    ("estimates", "EARNINGS_ESTIMATES"),
];

/// `{income, balance, shares, estimates}`; only `income` is required.
pub async fn income_statement(
    alpha: &AlphaVantage,
    pool: &CredentialPool,
    ticker: &str,
) -> ServiceResult<Value> {
    pool.ensure_configured()?;

    let income_request = alpha.descriptor("INCOME_STATEMENT", ticker);
    let supplement_requests: Vec<_> = SUPPLEMENTS
        .iter()
        .map(|(_, function)| alpha.descriptor(function, ticker))
        .collect();

    let income = alpha
        .fetch(&income_request, pool)
        .map(|result: FetchResult<Value>| result.map_err(ServiceError::from))
        .boxed();
    let supplements = supplement_requests
        .iter()
        .map(|request| alpha.fetch(request, pool).boxed())
        .collect();

    let (income, supplements) = gather(alpha.mode(), income, supplements).await?;

    let mut body = Map::new();
    body.insert("income".to_string(), income);
    for ((slot, _), result) in SUPPLEMENTS.iter().zip(supplements) {
        body.insert(slot.to_string(), best_effort(slot, result));
    }

    Ok(Value::Object(body))
}
