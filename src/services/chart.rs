use std::str::FromStr;

use futures::FutureExt;
use serde_json::Value;

use crate::fetch::{collect_slots, run_all, CredentialPool, RequestDescriptor};

use super::{AlphaVantage, ServiceError, ServiceResult};

/// Granularity selector for `/api/stock-chart`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChartRange {
    Intraday,
    Daily,
    Weekly,
    Monthly,
    #[default]
    All,
}

impl ChartRange {
    fn granularities(self) -> &'static [Granularity] {
        match self {
            ChartRange::Intraday => &[Granularity::Intraday],
            ChartRange::Daily => &[Granularity::Daily],
            ChartRange::Weekly => &[Granularity::Weekly],
            ChartRange::Monthly => &[Granularity::Monthly],
            ChartRange::All => &SLOTS,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Granularity {
    Intraday,
    Daily,
    Weekly,
    Monthly,
}

/// Every slot in response order.
const SLOTS: [Granularity; 4] = [
    Granularity::Intraday,
    Granularity::Daily,
    Granularity::Weekly,
    Granularity::Monthly,
];

impl Granularity {
    fn slot(self) -> &'static str {
        match self {
            Granularity::Intraday => "intraday",
            Granularity::Daily => "daily",
            Granularity::Weekly => "weekly",
            Granularity::Monthly => "monthly",
        }
    }

    fn descriptor(self, alpha: &AlphaVantage, ticker: &str) -> RequestDescriptor {
        match self {
            Granularity::Intraday => alpha
                .descriptor("TIME_SERIES_INTRADAY", ticker)
                .param("interval", "15min"),
            Granularity::Daily => alpha
                .descriptor("TIME_SERIES_DAILY", ticker)
                .param("outputsize", "full"),
            Granularity::Weekly => alpha.descriptor("TIME_SERIES_WEEKLY", ticker),
            Granularity::Monthly => alpha.descriptor("TIME_SERIES_MONTHLY", ticker),
        }
    }
}

impl FromStr for ChartRange {
    type Err = ServiceError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_lowercase().as_str() {
            "" | "all" => Ok(ChartRange::All),
            "intraday" => Ok(ChartRange::Intraday),
            "daily" => Ok(ChartRange::Daily),
            "weekly" => Ok(ChartRange::Weekly),
            "monthly" => Ok(ChartRange::Monthly),
            other => Err(ServiceError::InvalidInput(format!(
                "Unsupported range `{other}`. Use intraday, daily, weekly, monthly or all."
            ))),
        }
    }
}

/// `{intraday, daily, weekly, monthly, _debugUrl}`. Slots outside `range`
/// and slots whose fetch failed are `null`.
pub async fn stock_chart(
    alpha: &AlphaVantage,
    pool: &CredentialPool,
    ticker: &str,
    range: ChartRange,
) -> ServiceResult<Value> {
    pool.ensure_configured()?;

    let selected = range.granularities();
    let requests: Vec<RequestDescriptor> = selected
        .iter()
        .map(|granularity| granularity.descriptor(alpha, ticker))
        .collect();

    let tasks = requests
        .iter()
        .map(|request| alpha.fetch(request, pool).boxed())
        .collect();
    let results = run_all(alpha.mode(), tasks).await;

    let names: Vec<&str> = selected.iter().map(|granularity| granularity.slot()).collect();
    let mut fetched = collect_slots(&names, results)?;

    let mut body = serde_json::Map::new();
    for granularity in SLOTS {
        let slot = granularity.slot();
        body.insert(slot.to_string(), fetched.remove(slot).unwrap_or(Value::Null));
    }
    body.insert(
        "_debugUrl".to_string(),
        Value::String(format!("Fetched for {ticker} using pooled keys.")),
    );

    Ok(Value::Object(body))
}
