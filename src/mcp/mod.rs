// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! MCP server exposing the insight tools
//!
//! A TCP listener speaking line-delimited JSON-RPC 2.0. Each connection is
//! served by its own task; each `tools/call` resolves dates, fetches the
//! signals the tool needs, runs the matching engine, and serializes the
//! result. Date and parameter problems map to invalid-params errors,
//! provider failures to internal errors.

pub mod schema;

use anyhow::Result;
use chrono::{Duration, Local, NaiveDate};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

use crate::config::Config;
use crate::intelligence::{
    mean, resolve_anchor_period, resolve_date_strings, AnomalyDetector, AnomalyThresholds,
    CompletenessScorer, CueGenerator, CueSignals, DateRange, InsightError, PeriodKind,
    ReadinessScorer, SignalFetcher, SummaryComposer, SummaryOptions, TrendEngine,
};
use crate::logging::AppLogger;
use crate::mcp::schema::InitializeResponse;
use crate::models::{DailyRecord, SignalKind, TrendMetric};
use crate::providers::WellnessProvider;

// MCP Protocol Constants
const MCP_PROTOCOL_VERSION: &str = "2024-11-05";
const JSONRPC_VERSION: &str = "2.0";

// Server Information
const SERVER_NAME: &str = "garmin-insights-mcp";
const SERVER_VERSION: &str = env!("CARGO_PKG_VERSION");

// JSON-RPC Error Codes (as defined in the JSON-RPC 2.0 specification)
const ERROR_METHOD_NOT_FOUND: i32 = -32601;
const ERROR_INVALID_PARAMS: i32 = -32602;
const ERROR_INTERNAL_ERROR: i32 = -32603;

/// Days before the period start the coach-cue steps comparison looks at
const PRIOR_STEPS_WINDOW_DAYS: u32 = 7;

pub struct McpServer {
    config: Arc<Config>,
    fetcher: SignalFetcher,
}

impl McpServer {
    pub fn new(config: Config, provider: Arc<dyn WellnessProvider>) -> Self {
        Self {
            config: Arc::new(config),
            fetcher: SignalFetcher::new(provider),
        }
    }

    pub async fn run(self, port: u16) -> Result<()> {
        use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
        use tokio::net::TcpListener;

        let listener = TcpListener::bind(format!("127.0.0.1:{}", port)).await?;
        info!("MCP server listening on port {}", port);

        loop {
            let (socket, addr) = listener.accept().await?;
            info!("New connection from {}", addr);

            let config = self.config.clone();
            let fetcher = self.fetcher.clone();

            tokio::spawn(async move {
                let (reader, mut writer) = socket.into_split();
                let mut reader = BufReader::new(reader);
                let mut line = String::new();

                while reader.read_line(&mut line).await.unwrap_or(0) > 0 {
                    if let Ok(request) = serde_json::from_str::<McpRequest>(&line) {
                        let response = handle_request(request, &fetcher, &config).await;
                        let response_str = serde_json::to_string(&response).unwrap();
                        writer.write_all(response_str.as_bytes()).await.ok();
                        writer.write_all(b"\n").await.ok();
                    }
                    line.clear();
                }
            });
        }
    }
}

#[derive(Debug, Deserialize)]
struct McpRequest {
    #[allow(dead_code)]
    jsonrpc: String,
    method: String,
    params: Option<Value>,
    id: Value,
}

#[derive(Debug, Serialize)]
struct McpResponse {
    jsonrpc: String,
    result: Option<Value>,
    error: Option<McpError>,
    id: Value,
}

#[derive(Debug, Serialize)]
struct McpError {
    code: i32,
    message: String,
    data: Option<Value>,
}

impl From<InsightError> for McpError {
    fn from(error: InsightError) -> Self {
        let code = match &error {
            InsightError::InvalidDateExpression(_) => ERROR_INVALID_PARAMS,
            InsightError::ProviderUnavailable(_) => ERROR_INTERNAL_ERROR,
        };
        McpError {
            code,
            message: error.to_string(),
            data: None,
        }
    }
}

fn invalid_params(message: impl Into<String>) -> McpError {
    McpError {
        code: ERROR_INVALID_PARAMS,
        message: message.into(),
        data: None,
    }
}

fn internal_error(message: impl Into<String>) -> McpError {
    McpError {
        code: ERROR_INTERNAL_ERROR,
        message: message.into(),
        data: None,
    }
}

async fn handle_request(request: McpRequest, fetcher: &SignalFetcher, config: &Config) -> McpResponse {
    match request.method.as_str() {
        "initialize" => {
            let init_response = InitializeResponse::new(
                MCP_PROTOCOL_VERSION.to_string(),
                SERVER_NAME.to_string(),
                SERVER_VERSION.to_string(),
            );

            McpResponse {
                jsonrpc: JSONRPC_VERSION.to_string(),
                result: serde_json::to_value(&init_response).ok(),
                error: None,
                id: request.id,
            }
        }
        "tools/call" => {
            let params = request.params.unwrap_or_default();
            let tool_name = params["name"].as_str().unwrap_or("");
            let args = &params["arguments"];

            handle_tool_call(tool_name, args, fetcher, config, request.id).await
        }
        _ => McpResponse {
            jsonrpc: JSONRPC_VERSION.to_string(),
            result: None,
            error: Some(McpError {
                code: ERROR_METHOD_NOT_FOUND,
                message: "Method not found".to_string(),
                data: None,
            }),
            id: request.id,
        },
    }
}

async fn handle_tool_call(
    tool_name: &str,
    args: &Value,
    fetcher: &SignalFetcher,
    config: &Config,
    id: Value,
) -> McpResponse {
    let started = Instant::now();
    let reference = Local::now().date_naive();
    debug!("Tool call: {} with args {}", tool_name, args);

    let result = match tool_name {
        "get_period_summary" => handle_get_period_summary(args, fetcher, config, reference).await,
        "get_trends" => handle_get_trends(args, fetcher, config, reference).await,
        "detect_anomalies" => handle_detect_anomalies(args, fetcher, config, reference).await,
        "get_readiness_breakdown" => {
            handle_get_readiness_breakdown(args, fetcher, config, reference).await
        }
        "get_data_completeness" => {
            handle_get_data_completeness(args, fetcher, config, reference).await
        }
        "get_hydration_guidance" => handle_get_hydration_guidance(args, config),
        "get_coach_cues" => handle_get_coach_cues(args, fetcher, config, reference).await,
        _ => {
            return McpResponse {
                jsonrpc: JSONRPC_VERSION.to_string(),
                result: None,
                error: Some(McpError {
                    code: ERROR_METHOD_NOT_FOUND,
                    message: format!("Unknown tool: {}", tool_name),
                    data: None,
                }),
                id,
            };
        }
    };

    AppLogger::log_mcp_tool_call(
        tool_name,
        result.is_ok(),
        started.elapsed().as_millis() as u64,
    );

    match result {
        Ok(value) => McpResponse {
            jsonrpc: JSONRPC_VERSION.to_string(),
            result: Some(value),
            error: None,
            id,
        },
        Err(error) => McpResponse {
            jsonrpc: JSONRPC_VERSION.to_string(),
            result: None,
            error: Some(error),
            id,
        },
    }
}

fn opt_str<'a>(args: &'a Value, key: &str) -> Option<&'a str> {
    args.get(key).and_then(Value::as_str)
}

fn require_str<'a>(args: &'a Value, key: &str) -> Result<&'a str, McpError> {
    opt_str(args, key)
        .ok_or_else(|| invalid_params(format!("Missing required parameter: {}", key)))
}

/// A numeric argument that may be absent or null, but never another type
fn opt_f64(args: &Value, key: &str) -> Result<Option<f64>, McpError> {
    match args.get(key) {
        Some(Value::Null) | None => Ok(None),
        Some(value) => value
            .as_f64()
            .map(Some)
            .ok_or_else(|| invalid_params(format!("{} must be a number", key))),
    }
}

fn parse_period(args: &Value) -> Result<PeriodKind, McpError> {
    require_str(args, "period")?
        .parse()
        .map_err(|e: anyhow::Error| invalid_params(e.to_string()))
}

fn to_result_value<T: Serialize>(payload: &T) -> Result<Value, McpError> {
    serde_json::to_value(payload)
        .map_err(|e| internal_error(format!("Failed to serialize result: {}", e)))
}

async fn handle_get_period_summary(
    args: &Value,
    fetcher: &SignalFetcher,
    config: &Config,
    reference: NaiveDate,
) -> Result<Value, McpError> {
    let period = parse_period(args)?;
    let options: SummaryOptions = serde_json::from_value(args.clone())
        .map_err(|e| invalid_params(format!("Invalid summary options: {}", e)))?;

    let resolved = resolve_anchor_period(
        period,
        opt_str(args, "anchor_date"),
        reference,
        config.insights.week_start(),
    )?;

    let composer = SummaryComposer::new(ReadinessScorer::new(
        config.insights.readiness.clone(),
        config.insights.hrv_baseline_days,
    ));
    let kinds = SummaryComposer::required_kinds(&options);
    let fetch_range = resolved.range.extend_back(composer.history_days(&options));
    let records = fetcher.fetch_range(fetch_range, &kinds).await?;

    let activities = if options.include_activities {
        Some(
            fetcher
                .fetch_activities(resolved.range, &options.activity_type)
                .await?,
        )
    } else {
        None
    };

    let summary = composer.compose(resolved, period, &records, activities, &options);
    to_result_value(&summary)
}

async fn handle_get_trends(
    args: &Value,
    fetcher: &SignalFetcher,
    config: &Config,
    reference: NaiveDate,
) -> Result<Value, McpError> {
    let range = resolve_date_strings(
        opt_str(args, "start_date"),
        opt_str(args, "end_date"),
        reference,
        config.insights.week_start(),
    )?;

    let metrics: Vec<TrendMetric> = match args.get("include") {
        Some(Value::Array(keys)) => {
            let mut metrics = Vec::new();
            for key in keys {
                let key = key
                    .as_str()
                    .ok_or_else(|| invalid_params("Metric keys must be strings"))?;
                let metric: TrendMetric = key
                    .parse()
                    .map_err(|e: anyhow::Error| invalid_params(e.to_string()))?;
                if !metrics.contains(&metric) {
                    metrics.push(metric);
                }
            }
            metrics
        }
        Some(Value::Null) | None => TrendMetric::DEFAULT_SET.to_vec(),
        Some(_) => {
            return Err(invalid_params(
                "Parameter 'include' must be an array of metric keys",
            ))
        }
    };

    let engine = TrendEngine::new(config.insights.trends.clone());
    let kinds: Vec<SignalKind> = metrics.iter().map(|m| m.signal_kind()).collect();
    let records = fetcher
        .fetch_range(range.extend_back(engine.history_days()), &kinds)
        .await?;

    let report = engine.compute(range, &records, &metrics);
    to_result_value(&report)
}

async fn handle_detect_anomalies(
    args: &Value,
    fetcher: &SignalFetcher,
    config: &Config,
    reference: NaiveDate,
) -> Result<Value, McpError> {
    let range = resolve_date_strings(
        opt_str(args, "start_date"),
        opt_str(args, "end_date"),
        reference,
        config.insights.week_start(),
    )?;

    let thresholds = apply_threshold_overrides(config.insights.anomaly.clone(), args)?;

    let detector = AnomalyDetector::new(thresholds.clone());
    let kinds = [
        SignalKind::HeartRate,
        SignalKind::Hrv,
        SignalKind::Sleep,
        SignalKind::Steps,
    ];
    let records = fetcher
        .fetch_range(range.extend_back(detector.history_days()), &kinds)
        .await?;

    let anomalies = detector.detect(range, &records);
    Ok(json!({
        "range": range,
        "thresholds": thresholds,
        "anomalies": anomalies,
    }))
}

/// Overlay the per-call threshold knobs onto the configured defaults
///
/// A wrongly typed knob is an invalid-params error, never a silent fall
/// back to the default.
fn apply_threshold_overrides(
    mut thresholds: AnomalyThresholds,
    args: &Value,
) -> Result<AnomalyThresholds, McpError> {
    if let Some(value) = opt_f64(args, "rhr_bpm_increase")? {
        thresholds.rhr_increase_bpm = value;
    }
    if let Some(value) = opt_f64(args, "hrv_ms_drop")? {
        thresholds.hrv_drop_ms = value;
    }
    if let Some(value) = opt_f64(args, "sleep_hours_min")? {
        thresholds.sleep_floor_hours = value;
    }
    if let Some(value) = opt_f64(args, "steps_drop_pct")? {
        thresholds.steps_drop_pct = value;
    }
    Ok(thresholds)
}

async fn handle_get_readiness_breakdown(
    args: &Value,
    fetcher: &SignalFetcher,
    config: &Config,
    reference: NaiveDate,
) -> Result<Value, McpError> {
    let input = require_str(args, "date")?;
    let range = resolve_date_strings(Some(input), None, reference, config.insights.week_start())?;
    if range.start() != range.end() {
        return Err(invalid_params(format!(
            "'{}' does not resolve to a single day",
            input
        )));
    }
    let date = range.end();

    let scorer = ReadinessScorer::new(
        config.insights.readiness.clone(),
        config.insights.hrv_baseline_days,
    );
    let kinds = [
        SignalKind::Sleep,
        SignalKind::BodyBattery,
        SignalKind::Hrv,
        SignalKind::Stress,
    ];
    let records = fetcher
        .fetch_range(DateRange::single(date).extend_back(scorer.history_days()), &kinds)
        .await?;

    let score = scorer.score(date, &records);
    let mut value = to_result_value(&score)?;
    value["weights"] = to_result_value(&config.insights.readiness)?;
    Ok(value)
}

async fn handle_get_data_completeness(
    args: &Value,
    fetcher: &SignalFetcher,
    config: &Config,
    reference: NaiveDate,
) -> Result<Value, McpError> {
    let range = resolve_date_strings(
        opt_str(args, "start_date"),
        opt_str(args, "end_date"),
        reference,
        config.insights.week_start(),
    )?;

    let records = fetcher.fetch_range(range, &SignalKind::EXPECTED).await?;
    let report = CompletenessScorer::new().assess(range, &records);
    to_result_value(&report)
}

fn handle_get_hydration_guidance(args: &Value, config: &Config) -> Result<Value, McpError> {
    let weight_kg = args
        .get("weight_kg")
        .and_then(Value::as_f64)
        .ok_or_else(|| invalid_params("Missing required parameter: weight_kg"))?;
    if weight_kg <= 0.0 {
        return Err(invalid_params("weight_kg must be positive"));
    }

    let training_minutes = match args.get("training_minutes") {
        Some(Value::Null) | None => 0,
        Some(value) => value
            .as_u64()
            .and_then(|n| u32::try_from(n).ok())
            .ok_or_else(|| invalid_params("training_minutes must be a non-negative integer"))?,
    };

    let temperature_c = opt_f64(args, "temperature_c")?;

    let advice = config
        .insights
        .hydration
        .recommend(weight_kg, training_minutes, temperature_c);
    to_result_value(&advice)
}

async fn handle_get_coach_cues(
    args: &Value,
    fetcher: &SignalFetcher,
    config: &Config,
    reference: NaiveDate,
) -> Result<Value, McpError> {
    let period = parse_period(args)?;
    let resolved = resolve_anchor_period(
        period,
        opt_str(args, "anchor_date"),
        reference,
        config.insights.week_start(),
    )?;
    let range = resolved.range;

    let options = SummaryOptions::default();
    let composer = SummaryComposer::new(ReadinessScorer::new(
        config.insights.readiness.clone(),
        config.insights.hrv_baseline_days,
    ));
    let detector = AnomalyDetector::new(config.insights.anomaly.clone());

    let mut kinds = SummaryComposer::required_kinds(&options);
    if !kinds.contains(&SignalKind::HeartRate) {
        kinds.push(SignalKind::HeartRate);
    }
    let history = composer
        .history_days(&options)
        .max(detector.history_days())
        .max(PRIOR_STEPS_WINDOW_DAYS);
    let records = fetcher.fetch_range(range.extend_back(history), &kinds).await?;
    let activities = fetcher.fetch_activities(range, "").await?;

    let summary = composer.compose(resolved, period, &records, Some(activities), &options);
    let anomalies = detector.detect(range, &records);

    let stats = summary.stats.as_ref();
    let signals = CueSignals {
        avg_sleep_hours: stats.and_then(|s| s.avg_sleep_hours),
        avg_body_battery: stats.and_then(|s| s.avg_body_battery_peak),
        avg_training_readiness: stats.and_then(|s| s.avg_training_readiness),
        steps_change_pct: steps_change_vs_prior(range, &records),
        activity_count: stats.and_then(|s| s.total_activities).unwrap_or(0),
    };

    let cues = CueGenerator::new().generate(&anomalies, &signals);
    Ok(json!({
        "period": period,
        "range": range,
        "anchor": resolved.anchor,
        "signals": signals,
        "coach_cues": cues,
    }))
}

/// Percent change of mean daily steps in the range against the week before it
fn steps_change_vs_prior(range: DateRange, records: &[DailyRecord]) -> Option<f64> {
    let current = mean(
        records
            .iter()
            .filter(|r| range.contains(r.date))
            .filter_map(|r| r.steps.map(|s| s as f64)),
    )?;

    let prior_end = range.start() - Duration::days(1);
    let prior_start = range.start() - Duration::days(PRIOR_STEPS_WINDOW_DAYS as i64);
    let prior = mean(
        records
            .iter()
            .filter(|r| r.date >= prior_start && r.date <= prior_end)
            .filter_map(|r| r.steps.map(|s| s as f64)),
    )?;

    if prior <= 0.0 {
        return None;
    }
    Some(((current - prior) / prior * 1000.0).round() / 10.0)
}
