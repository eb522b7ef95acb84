use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::services::{self, ChartRange, FiscalQuarter, RenderedPrompt, StatisticsTable};
use crate::utils::normalize_ticker;

use super::{ApiError, ApiResult, AppState};

const DEFAULT_SUMMARY_TICKER: &str = "AAPL";

pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/api/company-overview", get(company_overview))
        .route("/api/income-statement", get(income_statement))
        .route("/api/stock-chart", get(stock_chart))
        .route("/api/key-statistics", get(key_statistics))
        .route("/api/yahoo", get(quote_summary))
        .route("/api/template", get(template))
        .route(
            "/api/summarize-earnings",
            post(summarize_earnings).fallback(method_not_allowed),
        )
        .route(
            "/api/generate-transcript-summary",
            post(generate_transcript_summary).fallback(method_not_allowed),
        )
        .route(
            "/api/generate-analysis",
            post(generate_analysis).fallback(method_not_allowed),
        )
}

#[derive(Debug, Deserialize)]
pub struct TickerQuery {
    ticker: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ChartQuery {
    ticker: Option<String>,
    range: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SummarizeEarningsBody {
    ticker: Option<String>,
    year: Option<Value>,
    quarter: Option<Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TranscriptSummaryBody {
    transcript_text: Option<String>,
    ticker: Option<String>,
    quarter: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AnalysisBody {
    prompt: Option<String>,
}

fn required_ticker(raw: Option<&str>) -> ApiResult<String> {
    raw.and_then(normalize_ticker).ok_or_else(|| {
        ApiError::BadRequest("Ticker is required and must be a string.".to_string())
    })
}

async fn company_overview(
    State(state): State<AppState>,
    query: Result<Query<TickerQuery>, QueryRejection>,
) -> ApiResult<Json<Value>> {
    let Query(query) = query?;
    let ticker = required_ticker(query.ticker.as_deref())?;
    let pool = state.credential_pool();
    let body = services::company_overview(&state.alpha_vantage(), &pool, &ticker).await?;
    Ok(Json(body))
}

async fn income_statement(
    State(state): State<AppState>,
    query: Result<Query<TickerQuery>, QueryRejection>,
) -> ApiResult<Json<Value>> {
    let Query(query) = query?;
    let ticker = required_ticker(query.ticker.as_deref())?;
    let pool = state.credential_pool();
    let body = services::income_statement(&state.alpha_vantage(), &pool, &ticker).await?;
    Ok(Json(body))
}

async fn stock_chart(
    State(state): State<AppState>,
    query: Result<Query<ChartQuery>, QueryRejection>,
) -> ApiResult<Json<Value>> {
    let Query(query) = query?;
    let ticker = required_ticker(query.ticker.as_deref())?;
    let range = match query.range.as_deref() {
        Some(raw) => raw.parse::<ChartRange>()?,
        None => ChartRange::All,
    };
    let pool = state.credential_pool();
    let body = services::stock_chart(&state.alpha_vantage(), &pool, &ticker, range).await?;
    Ok(Json(body))
}

async fn key_statistics(
    State(state): State<AppState>,
    query: Result<Query<TickerQuery>, QueryRejection>,
) -> ApiResult<Json<Vec<StatisticsTable>>> {
    let Query(query) = query?;
    let ticker = required_ticker(query.ticker.as_deref())?;
    let tables = services::key_statistics(&state.yahoo(), &ticker).await?;
    Ok(Json(tables))
}

async fn quote_summary(
    State(state): State<AppState>,
    query: Result<Query<TickerQuery>, QueryRejection>,
) -> ApiResult<Json<Value>> {
    let Query(query) = query?;
    let ticker = normalize_ticker(query.ticker.as_deref().unwrap_or(DEFAULT_SUMMARY_TICKER))
        .unwrap_or_else(|| DEFAULT_SUMMARY_TICKER.to_string());
    let body = services::quote_summary(&state.yahoo(), &ticker).await?;
    Ok(Json(body))
}

async fn template(
    State(state): State<AppState>,
    query: Result<Query<TickerQuery>, QueryRejection>,
) -> ApiResult<Json<RenderedPrompt>> {
    let Query(query) = query?;
    let ticker = required_ticker(query.ticker.as_deref())?;
    let templates = &state.settings.templates;
    let template =
        services::fetch_template(state.transport.as_ref(), templates, state.settings.attempt_timeout)
            .await?;
    Ok(Json(services::render_template(&template, templates, &ticker)))
}

async fn summarize_earnings(
    State(state): State<AppState>,
    payload: Result<Json<SummarizeEarningsBody>, JsonRejection>,
) -> ApiResult<Json<Value>> {
    let Json(body) = payload?;
    let (Some(ticker), Some(year), Some(quarter)) = (
        body.ticker.as_deref().and_then(normalize_ticker),
        body.year,
        body.quarter,
    ) else {
        return Err(ApiError::BadRequest(
            "Ticker, year, and quarter are required.".to_string(),
        ));
    };
    let quarter = FiscalQuarter::from_values(&year, &quarter)?;

    let pool = state.credential_pool();
    pool.ensure_configured()?;
    let model = state.language_model()?;

    let summary = services::summarize_earnings(
        &state.alpha_vantage(),
        &pool,
        &model,
        &state.settings.llm,
        &ticker,
        quarter,
    )
    .await?;
    Ok(Json(json!({ "summary": summary })))
}

async fn generate_transcript_summary(
    State(state): State<AppState>,
    payload: Result<Json<TranscriptSummaryBody>, JsonRejection>,
) -> ApiResult<Json<Value>> {
    let Json(body) = payload?;
    let transcript = body
        .transcript_text
        .filter(|text| !text.trim().is_empty())
        .ok_or_else(|| ApiError::BadRequest("Transcript text is required.".to_string()))?;
    let model = state.language_model()?;

    let text = services::transcript_summary(
        state.transport.as_ref(),
        &model,
        &state.settings.llm,
        &transcript,
        body.ticker.as_deref(),
        body.quarter.as_deref(),
    )
    .await?;
    Ok(Json(json!({ "text": text })))
}

async fn generate_analysis(
    State(state): State<AppState>,
    payload: Result<Json<AnalysisBody>, JsonRejection>,
) -> ApiResult<Json<Value>> {
    let Json(body) = payload?;
    let prompt = body
        .prompt
        .filter(|prompt| !prompt.trim().is_empty())
        .ok_or_else(|| ApiError::BadRequest("Prompt is required.".to_string()))?;
    let model = state.language_model()?;

    let text = services::generate_analysis(&model, &state.settings.llm, &prompt).await?;
    Ok(Json(json!({ "text": text })))
}

async fn method_not_allowed() -> impl IntoResponse {
    (
        StatusCode::METHOD_NOT_ALLOWED,
        Json(json!({ "error": "Method Not Allowed" })),
    )
}
