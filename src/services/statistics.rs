use std::sync::Arc;
use std::time::Duration;

use log::warn;
use reqwest::Url;
use serde::Serialize;
use serde_json::{json, Value};

use crate::config::YahooConfig;
use crate::fetch::decode::{formatted_field, walk_json_path};
use crate::fetch::{HttpRequest, HttpTransport};
use crate::utils::rfc3339_now;

use super::{ServiceError, ServiceResult};

const STATISTICS_MODULES: [&str; 3] = ["summaryDetail", "defaultKeyStatistics", "financialData"];
const SUMMARY_MODULES: [&str; 4] = ["financialData", "defaultKeyStatistics", "price", "summaryDetail"];

/// One block of the statistics page. An empty title continues the previous block.
struct TableDefinition {
    title: &'static str,
    source: &'static str,
    rows: &'static [(&'static str, &'static str)],
}

const TABLES: &[TableDefinition] = &[
    TableDefinition {
        title: "Valuation Measures",
        source: "summaryDetail",
        rows: &[
            ("Market Cap (intraday)", "marketCap"),
            ("Trailing P/E", "trailingPE"),
            ("Forward P/E", "forwardPE"),
            ("Price/Sales (ttm)", "priceToSalesTrailing12Months"),
        ],
    },
    TableDefinition {
        title: "",
        source: "defaultKeyStatistics",
        rows: &[
            ("Enterprise Value", "enterpriseValue"),
            ("PEG Ratio (5 yr expected)", "pegRatio"),
            ("Price/Book (mrq)", "priceToBook"),
            ("Enterprise Value/Revenue", "enterpriseToRevenue"),
            ("Enterprise Value/EBITDA", "enterpriseToEbitda"),
        ],
    },
    TableDefinition {
        title: "Financial Highlights",
        source: "defaultKeyStatistics",
        rows: &[
            ("Fiscal Year Ends", "lastFiscalYearEnd"),
            ("Most Recent Quarter (mrq)", "mostRecentQuarter"),
            ("Profit Margin", "profitMargins"),
            ("Net Income Avi to Common (ttm)", "netIncomeToCommon"),
            ("Diluted EPS (ttm)", "trailingEps"),
            ("Book Value Per Share (mrq)", "bookValue"),
        ],
    },
    TableDefinition {
        title: "",
        source: "financialData",
        rows: &[
            ("Operating Margin (ttm)", "operatingMargins"),
            ("Return on Assets (ttm)", "returnOnAssets"),
            ("Return on Equity (ttm)", "returnOnEquity"),
            ("Revenue (ttm)", "totalRevenue"),
            ("Revenue Per Share (ttm)", "revenuePerShare"),
            ("Gross Profit (ttm)", "grossProfits"),
            ("EBITDA", "ebitda"),
            ("Total Cash (mrq)", "totalCash"),
            ("Total Cash Per Share (mrq)", "totalCashPerShare"),
            ("Total Debt (mrq)", "totalDebt"),
            ("Total Debt/Equity (mrq)", "debtToEquity"),
            ("Current Ratio (mrq)", "currentRatio"),
            ("Operating Cash Flow (ttm)", "operatingCashflow"),
            ("Levered Free Cash Flow (ttm)", "freeCashflow"),
        ],
    },
    TableDefinition {
        title: "Trading Information",
        source: "summaryDetail",
        rows: &[
            ("Beta (5Y Monthly)", "beta"),
            ("52 Week High", "fiftyTwoWeekHigh"),
            ("52 Week Low", "fiftyTwoWeekLow"),
            ("50-Day Moving Average", "fiftyDayAverage"),
            ("200-Day Moving Average", "twoHundredDayAverage"),
            ("Avg Vol (3 month)", "averageVolume"),
            ("Avg Vol (10 day)", "averageDailyVolume10Day"),
            ("Forward Annual Dividend Rate", "dividendRate"),
            ("Forward Annual Dividend Yield", "dividendYield"),
            ("Trailing Annual Dividend Rate", "trailingAnnualDividendRate"),
            ("Trailing Annual Dividend Yield", "trailingAnnualDividendYield"),
            ("5 Year Average Dividend Yield", "fiveYearAvgDividendYield"),
            ("Payout Ratio", "payoutRatio"),
            ("Dividend Date", "exDividendDate"),
        ],
    },
    TableDefinition {
        title: "",
        source: "defaultKeyStatistics",
        rows: &[
            ("52-Week Change", "52WeekChange"),
            ("S&P500 52-Week Change", "SandP52WeekChange"),
            ("Shares Outstanding", "sharesOutstanding"),
            ("Implied Shares Outstanding", "impliedSharesOutstanding"),
            ("Float", "floatShares"),
            ("% Held by Insiders", "heldPercentInsiders"),
            ("% Held by Institutions", "heldPercentInstitutions"),
            ("Shares Short", "sharesShort"),
            ("Short Ratio", "shortRatio"),
            ("Short % of Float", "shortPercentOfFloat"),
            ("Short % of Shares Outstanding", "sharesPercentSharesOut"),
            ("Last Split Factor", "lastSplitFactor"),
            ("Last Split Date", "lastSplitDate"),
        ],
    },
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatisticsTable {
    pub title: String,
    pub rows: Vec<(String, String)>,
}

#[derive(Clone)]
pub struct YahooFinance {
    transport: Arc<dyn HttpTransport>,
    base_url: String,
    user_agent: String,
    timeout: Duration,
}

impl YahooFinance {
    pub fn new(transport: Arc<dyn HttpTransport>, config: &YahooConfig, timeout: Duration) -> Self {
        Self {
            transport,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            user_agent: config.user_agent.clone(),
            timeout,
        }
    }

    fn summary_url(&self, ticker: &str, modules: &[&str]) -> ServiceResult<String> {
        let invalid = || ServiceError::Internal(format!("Invalid Yahoo Finance base url {}", self.base_url));

        let mut url = Url::parse(&format!("{}/v10/finance/quoteSummary", self.base_url))
            .map_err(|_| invalid())?;
        url.path_segments_mut().map_err(|_| invalid())?.push(ticker);
        url.set_query(Some(&format!("modules={}", modules.join(","))));
        Ok(url.into())
    }

    /// First entry of `quoteSummary.result`, or `None` when Yahoo returned no result.
    async fn first_result(&self, ticker: &str, modules: &[&str]) -> ServiceResult<Option<Value>> {
        let url = self.summary_url(ticker, modules)?;
        let request = HttpRequest::get(url)
            .with_header("User-Agent", self.user_agent.as_str())
            .with_timeout(self.timeout);

        let reply = tokio::time::timeout(self.timeout, self.transport.execute(request))
            .await
            .map_err(|_| ServiceError::Internal("Yahoo Finance request timed out.".to_string()))?
            .map_err(|err| ServiceError::Internal(err.to_string()))?;

        if !reply.is_success() {
            warn!("Yahoo Finance answered {} for {ticker}", reply.status);
            return Err(ServiceError::Upstream {
                status: reply.status,
                message: format!(
                    "Failed to fetch data from Yahoo Finance API. Status: {}",
                    reply.status
                ),
            });
        }

        let payload: Value = serde_json::from_str(&reply.body)
            .map_err(|err| ServiceError::Internal(format!("Invalid Yahoo Finance response: {err}")))?;

        Ok(walk_json_path(&payload, &["quoteSummary", "result", "0"])
            .filter(|result| !result.is_null())
            .cloned())
    }
}

pub async fn key_statistics(yahoo: &YahooFinance, ticker: &str) -> ServiceResult<Vec<StatisticsTable>> {
    let result = yahoo
        .first_result(ticker, &STATISTICS_MODULES)
        .await?
        .ok_or_else(|| {
            ServiceError::NotFound(format!(
                "Could not find key statistics for ticker \"{ticker}\". The ticker may be invalid, delisted, or not supported by the API."
            ))
        })?;

    let tables = build_tables(&result);
    if tables.is_empty() {
        return Err(ServiceError::NotFound(format!(
            "Successfully connected to API, but no key statistics were found for ticker \"{ticker}\"."
        )));
    }
    Ok(tables)
}

/// `{ticker, summary, fetchedAt}` with the raw quote summary modules.
pub async fn quote_summary(yahoo: &YahooFinance, ticker: &str) -> ServiceResult<Value> {
    let summary = yahoo
        .first_result(ticker, &SUMMARY_MODULES)
        .await
        .map_err(|err| match err {
            ServiceError::Upstream { status: 404, .. } => not_found(ticker),
            other => other,
        })?
        .ok_or_else(|| not_found(ticker))?;

    Ok(json!({
        "ticker": ticker,
        "summary": summary,
        "fetchedAt": rfc3339_now(),
    }))
}

fn not_found(ticker: &str) -> ServiceError {
    ServiceError::NotFound(format!(
        "Data not found for ticker: {ticker}. It may be an invalid ticker."
    ))
}

fn build_tables(result: &Value) -> Vec<StatisticsTable> {
    let mut tables: Vec<StatisticsTable> = Vec::new();

    for definition in TABLES {
        let Some(source) = result.get(definition.source).filter(|source| source.is_object()) else {
            continue;
        };

        let rows: Vec<(String, String)> = definition
            .rows
            .iter()
            .filter_map(|(label, key)| {
                formatted_field(source, key).map(|value| (label.to_string(), value))
            })
            .collect();
        if rows.is_empty() {
            continue;
        }

        if definition.title.is_empty() {
            if let Some(previous) = tables.last_mut() {
                previous.rows.extend(rows);
                continue;
            }
        }
        tables.push(StatisticsTable {
            title: definition.title.to_string(),
            rows,
        });
    }

    tables
}
