// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! End-to-end tests for the insights pipeline
//!
//! Each test drives the full path a tool call takes: resolve a date
//! expression, fetch records through the signal fetcher from a scripted
//! in-memory provider, then run the relevant analytics engine and check
//! the report it produces.

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{NaiveDate, TimeZone, Utc, Weekday};

use garmin_insights_mcp::intelligence::{
    resolve_anchor_period, resolve_date_strings, AnomalyDetector, AnomalySeverity,
    AnomalyThresholds, CompletenessScorer, CueCategory, CueGenerator, CueSignals, DateRange,
    InsightError, PeriodKind, ReadinessScorer, ReadinessWeights, SignalFetcher, SummaryComposer,
    SummaryOptions, TrendConfig, TrendEngine,
};
use garmin_insights_mcp::models::{
    Activity, BodyBatterySignal, DailyRecord, SignalKind, SleepSignal, StressSignal, TrendMetric,
};
use garmin_insights_mcp::providers::{AuthData, ProviderError, SignalValue, WellnessProvider};

#[derive(Default)]
struct FixtureProvider {
    records: HashMap<NaiveDate, DailyRecord>,
    activities: Vec<Activity>,
    unauthorized: bool,
}

#[async_trait]
impl WellnessProvider for FixtureProvider {
    async fn authenticate(&mut self, _auth_data: AuthData) -> Result<()> {
        Ok(())
    }

    async fn daily_signal(
        &self,
        date: NaiveDate,
        kind: SignalKind,
    ) -> Result<Option<SignalValue>, ProviderError> {
        if self.unauthorized {
            return Err(ProviderError::Unauthorized("expired token".to_string()));
        }
        Ok(self
            .records
            .get(&date)
            .and_then(|record| SignalValue::from_record(record, kind)))
    }

    async fn activities(&self, _range: DateRange) -> Result<Vec<Activity>, ProviderError> {
        if self.unauthorized {
            return Err(ProviderError::Unauthorized("expired token".to_string()));
        }
        Ok(self.activities.clone())
    }

    fn provider_name(&self) -> &'static str {
        "fixture"
    }
}

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn steady_record(day: NaiveDate) -> DailyRecord {
    let mut record = DailyRecord::empty(day);
    record.sleep = Some(SleepSignal {
        duration_hours: 7.5,
        quality: Some(80.0),
    });
    record.resting_heart_rate = Some(50.0);
    record.hrv = Some(55.0);
    record.body_battery = Some(BodyBatterySignal {
        low: 20.0,
        high: 85.0,
        charged: 70.0,
        drained: 65.0,
    });
    record.stress = Some(StressSignal { avg: 30.0, max: 70.0 });
    record.steps = Some(10_000);
    record
}

/// A provider with identical full records for every day of the span
fn steady_provider(start: NaiveDate, end: NaiveDate) -> FixtureProvider {
    let mut provider = FixtureProvider::default();
    for day in DateRange::new(start, end).unwrap().days() {
        provider.records.insert(day, steady_record(day));
    }
    provider
}

/// The steady provider with resting heart rate raised over the last 3 days
fn elevated_rhr_provider() -> FixtureProvider {
    let mut provider = steady_provider(date(2024, 5, 6), date(2024, 6, 9));
    for day in [date(2024, 6, 7), date(2024, 6, 8), date(2024, 6, 9)] {
        provider.records.get_mut(&day).unwrap().resting_heart_rate = Some(58.0);
    }
    provider
}

fn sample_activity(id: &str, activity_type: &str) -> Activity {
    Activity {
        id: id.to_string(),
        name: format!("{} session", activity_type),
        activity_type: activity_type.to_string(),
        start_date: Utc.with_ymd_and_hms(2024, 6, 4, 7, 0, 0).unwrap(),
        duration_seconds: 2_400,
        distance_meters: Some(8_000.0),
        calories: Some(450),
    }
}

#[tokio::test]
async fn test_weekly_summary_through_fetcher() -> Result<()> {
    let reference = date(2024, 6, 9);
    let mut provider = steady_provider(date(2024, 5, 6), reference);
    provider.records.remove(&date(2024, 6, 6));
    provider.activities = vec![
        sample_activity("1", "running"),
        sample_activity("2", "running"),
        sample_activity("3", "cycling"),
    ];
    let fetcher = SignalFetcher::new(Arc::new(provider));

    let resolved =
        resolve_anchor_period(PeriodKind::Weekly, Some("2024-06-05"), reference, Weekday::Mon)?;
    assert_eq!(resolved.range, DateRange::new(date(2024, 6, 3), date(2024, 6, 9))?);
    assert_eq!(resolved.anchor, date(2024, 6, 5));

    let options = SummaryOptions::default();
    let composer = SummaryComposer::new(ReadinessScorer::new(ReadinessWeights::default(), 28));
    let kinds = SummaryComposer::required_kinds(&options);
    let records = fetcher
        .fetch_range(resolved.range.extend_back(composer.history_days(&options)), &kinds)
        .await?;
    let activities = fetcher
        .fetch_activities(resolved.range, &options.activity_type)
        .await?;
    let summary = composer.compose(
        resolved,
        PeriodKind::Weekly,
        &records,
        Some(activities),
        &options,
    );

    assert_eq!(summary.days.len(), 7);

    // The removed day shows up as an all-absent row, not a missing row.
    let rest_day = &summary.days[3];
    assert_eq!(rest_day.date, date(2024, 6, 6));
    assert!(rest_day.sleep.is_none());
    assert!(rest_day.steps.is_none());
    assert!(rest_day.training_readiness.is_none());

    // Steady data: sleep 86.875, battery 85, HRV at neutral 75, stress 70,
    // blended with the default 30/25/25/20 weights.
    let readiness = summary.days[0].training_readiness.unwrap();
    assert!((readiness - 80.0625).abs() < 1e-9);

    let stats = summary.stats.as_ref().unwrap();
    assert_eq!(stats.total_activities, Some(3));
    assert_eq!(stats.total_steps, Some(60_000));
    assert_eq!(stats.avg_steps_per_day, Some(10_000.0));
    assert_eq!(stats.avg_sleep_hours, Some(7.5));
    assert_eq!(stats.avg_stress, Some(30.0));
    assert_eq!(stats.avg_body_battery_peak, Some(85.0));
    assert_eq!(stats.avg_training_readiness, Some(80.1));
    Ok(())
}

#[tokio::test]
async fn test_trend_pipeline_reports_heart_rate_rise() -> Result<()> {
    let reference = date(2024, 6, 9);
    let fetcher = SignalFetcher::new(Arc::new(elevated_rhr_provider()));

    let range = resolve_date_strings(
        Some("2024-06-03"),
        Some("2024-06-09"),
        reference,
        Weekday::Mon,
    )?;
    let engine = TrendEngine::new(TrendConfig::default());
    let records = fetcher
        .fetch_range(range.extend_back(engine.history_days()), &[SignalKind::HeartRate])
        .await?;
    let report = engine.compute(range, &records, &[TrendMetric::RestingHeartRate]);

    assert_eq!(report.metrics.len(), 1);
    let trend = &report.metrics[0];
    assert_eq!(trend.points.len(), 7);
    assert_eq!(trend.delta, Some(8.0));

    let last = trend.points.last().unwrap();
    assert_eq!(last.value, Some(58.0));
    // 7-day window ending 06-09: four days at 50, three at 58.
    let short = last.rolling_7d.unwrap();
    assert!((short - (4.0 * 50.0 + 3.0 * 58.0) / 7.0).abs() < 1e-9);
    // 28-day window: twenty-five days at 50, three at 58.
    let long = last.rolling_28d.unwrap();
    assert!((long - (25.0 * 50.0 + 3.0 * 58.0) / 28.0).abs() < 1e-9);
    Ok(())
}

#[tokio::test]
async fn test_anomaly_pipeline_flags_elevated_heart_rate() -> Result<()> {
    let fetcher = SignalFetcher::new(Arc::new(elevated_rhr_provider()));
    let detector = AnomalyDetector::new(AnomalyThresholds::default());

    let range = DateRange::new(date(2024, 6, 3), date(2024, 6, 9))?;
    let kinds = [
        SignalKind::HeartRate,
        SignalKind::Hrv,
        SignalKind::Sleep,
        SignalKind::Steps,
    ];
    let records = fetcher
        .fetch_range(range.extend_back(detector.history_days()), &kinds)
        .await?;
    let flags = detector.detect(range, &records);

    // Sleep, HRV and steps are steady; only the heart rate moves.
    assert_eq!(flags.len(), 1);
    let flag = &flags[0];
    assert_eq!(flag.metric, TrendMetric::RestingHeartRate);
    assert_eq!(flag.severity, AnomalySeverity::Warning);
    assert!((flag.change - 8.0).abs() < 1e-9);
    assert!((flag.recent_mean - 58.0).abs() < 1e-9);
    assert!((flag.baseline_mean - 50.0).abs() < 1e-9);
    assert_eq!(flag.threshold, 5.0);
    assert!(flag.message.contains("up 8.0 bpm"));
    Ok(())
}

#[tokio::test]
async fn test_unauthorized_provider_aborts_pipeline() -> Result<()> {
    let provider = FixtureProvider {
        unauthorized: true,
        ..FixtureProvider::default()
    };
    let fetcher = SignalFetcher::new(Arc::new(provider));
    let result = fetcher
        .fetch_range(DateRange::single(date(2024, 6, 9)), &SignalKind::ALL)
        .await;
    assert!(matches!(result, Err(InsightError::ProviderUnavailable(_))));
    Ok(())
}

#[tokio::test]
async fn test_completeness_pipeline_reports_gaps() -> Result<()> {
    let mut provider = steady_provider(date(2024, 6, 3), date(2024, 6, 9));
    provider.records.remove(&date(2024, 6, 6));
    provider.records.get_mut(&date(2024, 6, 8)).unwrap().hrv = None;
    let fetcher = SignalFetcher::new(Arc::new(provider));

    let range = resolve_date_strings(Some("last week"), None, date(2024, 6, 12), Weekday::Mon)?;
    assert_eq!(range, DateRange::new(date(2024, 6, 3), date(2024, 6, 9))?);

    let records = fetcher.fetch_range(range, &SignalKind::EXPECTED).await?;
    let report = CompletenessScorer::new().assess(range, &records);

    assert_eq!(report.days.len(), 7);
    assert_eq!(report.zero_data_days, vec![date(2024, 6, 6)]);

    let partial = &report.days[5];
    assert_eq!(partial.date, date(2024, 6, 8));
    assert!((partial.fraction - 0.8).abs() < 1e-9);
    assert_eq!(partial.missing, vec![SignalKind::Hrv]);

    let expected_aggregate = (5.0 + 0.8) / 7.0;
    assert!((report.aggregate - expected_aggregate).abs() < 1e-9);
    Ok(())
}

#[tokio::test]
async fn test_cue_pipeline_flows_from_anomalies() -> Result<()> {
    let reference = date(2024, 6, 9);
    let mut provider = elevated_rhr_provider();
    provider.activities = vec![
        sample_activity("1", "running"),
        sample_activity("2", "running"),
        sample_activity("3", "cycling"),
    ];
    let fetcher = SignalFetcher::new(Arc::new(provider));

    let resolved = resolve_anchor_period(PeriodKind::Weekly, None, reference, Weekday::Mon)?;
    let options = SummaryOptions::default();
    let composer = SummaryComposer::new(ReadinessScorer::new(ReadinessWeights::default(), 28));
    let detector = AnomalyDetector::new(AnomalyThresholds::default());

    let mut kinds = SummaryComposer::required_kinds(&options);
    if !kinds.contains(&SignalKind::HeartRate) {
        kinds.push(SignalKind::HeartRate);
    }
    let history = composer
        .history_days(&options)
        .max(detector.history_days());
    let records = fetcher
        .fetch_range(resolved.range.extend_back(history), &kinds)
        .await?;
    let activities = fetcher.fetch_activities(resolved.range, "").await?;
    let summary = composer.compose(
        resolved,
        PeriodKind::Weekly,
        &records,
        Some(activities),
        &options,
    );
    let anomalies = detector.detect(resolved.range, &records);

    let stats = summary.stats.as_ref().unwrap();
    let signals = CueSignals {
        avg_sleep_hours: stats.avg_sleep_hours,
        avg_body_battery: stats.avg_body_battery_peak,
        avg_training_readiness: stats.avg_training_readiness,
        steps_change_pct: Some(0.0),
        activity_count: stats.total_activities.unwrap_or(0),
    };
    let cues = CueGenerator::new().generate(&anomalies, &signals);

    // The heart rate flag leads, and the otherwise-strong recovery signals
    // stay quiet while it is active.
    assert_eq!(cues.len(), 1);
    assert_eq!(cues[0].category, CueCategory::Anomaly);
    assert!(cues[0].text.contains("Resting heart rate is up 8.0 bpm"));
    Ok(())
}
