// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! # Metric Trends
//!
//! Rolling-average trend lines for the daily wellness metrics. Windows are
//! trailing and inclusive of the day they end on, and the divisor is the
//! number of days with the signal actually present inside the window, so a
//! metric recorded on 2 of 7 days averages those 2 values instead of being
//! dragged toward zero by the gaps.
//!
//! The engine is pure: callers fetch records (including enough history
//! before the range start to fill the long window) and pass them in.

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};

use super::{mean, DateRange};
use crate::models::{DailyRecord, TrendMetric};

/// Window sizes for the rolling averages
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrendConfig {
    /// Short rolling window in days
    pub short_window_days: u32,
    /// Long rolling window in days, also the baseline for readiness HRV
    pub long_window_days: u32,
}

impl Default for TrendConfig {
    fn default() -> Self {
        Self {
            short_window_days: 7,
            long_window_days: 28,
        }
    }
}

/// One day of a metric's trend line
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrendPoint {
    pub date: NaiveDate,
    /// Raw value for the day, absent when the signal was not recorded
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<f64>,
    /// Trailing short-window average over present days
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rolling_7d: Option<f64>,
    /// Trailing long-window average over present days
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rolling_28d: Option<f64>,
}

/// A full trend line for one metric
#[derive(Debug, Clone, Serialize)]
pub struct MetricTrend {
    pub metric: TrendMetric,
    /// One point per day of the requested range, ascending
    pub points: Vec<TrendPoint>,
    /// Raw end-value minus raw start-value, absent unless both ends have data
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delta: Option<f64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TrendReport {
    pub range: DateRange,
    pub metrics: Vec<MetricTrend>,
}

pub struct TrendEngine {
    config: TrendConfig,
}

impl TrendEngine {
    pub fn new(config: TrendConfig) -> Self {
        Self { config }
    }

    /// Days of history before the range start needed to fill the long window
    pub fn history_days(&self) -> u32 {
        self.config.long_window_days.saturating_sub(1)
    }

    /// Compute trend lines over `records` for each requested metric
    ///
    /// `records` must be ascending with one entry per day, covering the
    /// requested range and whatever history before it was fetchable. Points
    /// are emitted only for days inside `range`; the earlier records feed
    /// the rolling windows.
    pub fn compute(
        &self,
        range: DateRange,
        records: &[DailyRecord],
        metrics: &[TrendMetric],
    ) -> TrendReport {
        let lines = metrics
            .iter()
            .map(|metric| self.compute_metric(range, records, *metric))
            .collect();
        TrendReport {
            range,
            metrics: lines,
        }
    }

    fn compute_metric(
        &self,
        range: DateRange,
        records: &[DailyRecord],
        metric: TrendMetric,
    ) -> MetricTrend {
        let series: Vec<(NaiveDate, Option<f64>)> = records
            .iter()
            .map(|record| (record.date, record.metric_value(metric)))
            .collect();

        let points: Vec<TrendPoint> = series
            .iter()
            .enumerate()
            .filter(|(_, (date, _))| range.contains(*date))
            .map(|(index, (date, value))| TrendPoint {
                date: *date,
                value: *value,
                rolling_7d: rolling_mean(&series, index, self.config.short_window_days),
                rolling_28d: rolling_mean(&series, index, self.config.long_window_days),
            })
            .collect();

        let delta = match (
            points.first().and_then(|p| p.value),
            points.last().and_then(|p| p.value),
        ) {
            (Some(first), Some(last)) => Some(last - first),
            _ => None,
        };

        MetricTrend {
            metric,
            points,
            delta,
        }
    }
}

impl Default for TrendEngine {
    fn default() -> Self {
        Self::new(TrendConfig::default())
    }
}

/// Mean of present values in the trailing window ending at `end_index`
fn rolling_mean(
    series: &[(NaiveDate, Option<f64>)],
    end_index: usize,
    window_days: u32,
) -> Option<f64> {
    let (end_date, _) = series[end_index];
    let window_start = end_date - Duration::days(window_days as i64 - 1);
    let values = series[..=end_index]
        .iter()
        .rev()
        .take_while(|(date, _)| *date >= window_start)
        .filter_map(|(_, value)| *value);
    mean(values)
}
