// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! # Anomaly Detection
//!
//! Flags short-term deviations in daily wellness metrics by comparing the
//! mean of a recent window (default 3 days, ending at the requested range
//! end) against the mean of the baseline window preceding it (default 14
//! days). A metric with fewer than a minimum number of present baseline
//! days is skipped outright; comparing against that little history flags
//! noise, not anomalies.
//!
//! The detector reports every firing metric and never suppresses
//! co-occurring flags. Prioritizing between them is the cue generator's job.

use chrono::Duration;
use serde::{Deserialize, Serialize};

use super::{mean, DateRange};
use crate::models::{DailyRecord, TrendMetric};

/// Detection thresholds and window sizes, all overridable per call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnomalyThresholds {
    /// Resting-heart-rate increase over baseline that fires, in bpm
    pub rhr_increase_bpm: f64,
    /// HRV drop below baseline that fires, in ms
    pub hrv_drop_ms: f64,
    /// Absolute sleep floor; a recent mean below this fires, in hours
    pub sleep_floor_hours: f64,
    /// Steps drop relative to baseline that fires, in percent
    pub steps_drop_pct: f64,
    /// Days in the recent window
    pub recent_window_days: u32,
    /// Days in the baseline window preceding the recent window
    pub baseline_window_days: u32,
    /// Minimum present days the baseline needs before a metric is judged
    pub min_baseline_days: u32,
}

impl Default for AnomalyThresholds {
    fn default() -> Self {
        Self {
            rhr_increase_bpm: 5.0,
            hrv_drop_ms: 15.0,
            sleep_floor_hours: 6.0,
            steps_drop_pct: 30.0,
            recent_window_days: 3,
            baseline_window_days: 14,
            min_baseline_days: 3,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnomalySeverity {
    /// Past the configured threshold
    Warning,
    /// Past twice the configured deviation (for sleep, a full hour under)
    Critical,
}

/// One metric that deviated past its threshold
#[derive(Debug, Clone, Serialize)]
pub struct AnomalyFlag {
    pub metric: TrendMetric,
    pub severity: AnomalySeverity,
    /// Mean over present days in the recent window
    pub recent_mean: f64,
    /// Mean over present days in the baseline window
    pub baseline_mean: f64,
    /// Recent minus baseline, in the metric's unit (percent for steps)
    pub change: f64,
    /// The threshold this metric was judged against, in the same unit
    pub threshold: f64,
    pub message: String,
}

pub struct AnomalyDetector {
    thresholds: AnomalyThresholds,
}

impl AnomalyDetector {
    pub fn new(thresholds: AnomalyThresholds) -> Self {
        Self { thresholds }
    }

    /// Days of history before the range end both windows need
    pub fn history_days(&self) -> u32 {
        self.thresholds.recent_window_days + self.thresholds.baseline_window_days
    }

    /// Evaluate all monitored metrics over records covering the windows
    ///
    /// `records` must include the days of both windows ending at
    /// `range.end()`; fetching `range.extend_back(history_days())` covers
    /// them regardless of how short the requested range is.
    pub fn detect(&self, range: DateRange, records: &[DailyRecord]) -> Vec<AnomalyFlag> {
        let recent_start =
            range.end() - Duration::days(self.thresholds.recent_window_days as i64 - 1);
        let baseline_end = recent_start - Duration::days(1);
        let baseline_start =
            baseline_end - Duration::days(self.thresholds.baseline_window_days as i64 - 1);

        let mut flags = Vec::new();
        for metric in [
            TrendMetric::RestingHeartRate,
            TrendMetric::Hrv,
            TrendMetric::Sleep,
            TrendMetric::Steps,
        ] {
            let recent: Vec<f64> = records
                .iter()
                .filter(|r| r.date >= recent_start && r.date <= range.end())
                .filter_map(|r| r.metric_value(metric))
                .collect();
            let baseline: Vec<f64> = records
                .iter()
                .filter(|r| r.date >= baseline_start && r.date <= baseline_end)
                .filter_map(|r| r.metric_value(metric))
                .collect();

            if baseline.len() < self.thresholds.min_baseline_days as usize {
                continue;
            }
            let recent_mean = match mean(recent.iter().copied()) {
                Some(value) => value,
                None => continue,
            };
            let baseline_mean = match mean(baseline.iter().copied()) {
                Some(value) => value,
                None => continue,
            };

            if let Some(flag) = self.judge(metric, recent_mean, baseline_mean) {
                flags.push(flag);
            }
        }
        flags
    }

    fn judge(
        &self,
        metric: TrendMetric,
        recent_mean: f64,
        baseline_mean: f64,
    ) -> Option<AnomalyFlag> {
        let t = &self.thresholds;
        let (change, threshold, severity, message) = match metric {
            TrendMetric::RestingHeartRate => {
                let increase = recent_mean - baseline_mean;
                if increase < t.rhr_increase_bpm {
                    return None;
                }
                let severity = severity_for(increase, t.rhr_increase_bpm);
                let message = format!(
                    "Resting heart rate is up {:.1} bpm over the last {} days ({:.1} vs {:.1} baseline)",
                    increase, t.recent_window_days, recent_mean, baseline_mean
                );
                (increase, t.rhr_increase_bpm, severity, message)
            }
            TrendMetric::Hrv => {
                let drop = baseline_mean - recent_mean;
                if drop < t.hrv_drop_ms {
                    return None;
                }
                let severity = severity_for(drop, t.hrv_drop_ms);
                let message = format!(
                    "HRV is down {:.1} ms from baseline ({:.1} vs {:.1})",
                    drop, recent_mean, baseline_mean
                );
                (-drop, t.hrv_drop_ms, severity, message)
            }
            TrendMetric::Sleep => {
                if recent_mean >= t.sleep_floor_hours {
                    return None;
                }
                let severity = if recent_mean <= t.sleep_floor_hours - 1.0 {
                    AnomalySeverity::Critical
                } else {
                    AnomalySeverity::Warning
                };
                let message = format!(
                    "Average sleep over the last {} days is {:.1} h, under the {:.1} h floor",
                    t.recent_window_days, recent_mean, t.sleep_floor_hours
                );
                (recent_mean - baseline_mean, t.sleep_floor_hours, severity, message)
            }
            TrendMetric::Steps => {
                if baseline_mean <= 0.0 {
                    return None;
                }
                let drop_pct = (baseline_mean - recent_mean) / baseline_mean * 100.0;
                if drop_pct < t.steps_drop_pct {
                    return None;
                }
                let severity = severity_for(drop_pct, t.steps_drop_pct);
                let message = format!(
                    "Daily steps are down {:.0}% from baseline ({:.0} vs {:.0})",
                    drop_pct, recent_mean, baseline_mean
                );
                (-drop_pct, t.steps_drop_pct, severity, message)
            }
            TrendMetric::BodyBattery | TrendMetric::Stress => return None,
        };

        Some(AnomalyFlag {
            metric,
            severity,
            recent_mean,
            baseline_mean,
            change,
            threshold,
            message,
        })
    }
}

impl Default for AnomalyDetector {
    fn default() -> Self {
        Self::new(AnomalyThresholds::default())
    }
}

fn severity_for(deviation: f64, threshold: f64) -> AnomalySeverity {
    if deviation >= threshold * 2.0 {
        AnomalySeverity::Critical
    } else {
        AnomalySeverity::Warning
    }
}
