// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! # Period Summaries
//!
//! Composes the daily/weekly/monthly overview a coach would skim: a per-day
//! table of the requested signal categories, the period's activities, and a
//! block of aggregates. Categories the caller did not ask for are absent
//! from the payload, not zero-filled, and each aggregate averages only the
//! days that actually carry the signal.
//!
//! Training readiness rows come from the readiness scorer, so the records
//! handed in should reach back far enough to feed its HRV baseline when
//! that column is requested.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::daterange::{DateRange, PeriodKind, ResolvedPeriod};
use super::mean;
use super::readiness::ReadinessScorer;
use crate::models::{Activity, BodyBatterySignal, DailyRecord, SignalKind, SleepSignal, StressSignal};

/// Which categories a summary should cover
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SummaryOptions {
    pub include_activities: bool,
    pub include_sleep: bool,
    pub include_stress: bool,
    pub include_body_battery: bool,
    pub include_training_readiness: bool,
    pub include_hrv: bool,
    pub include_stats: bool,
    /// Case-insensitive substring filter on activity type; empty keeps all
    pub activity_type: String,
}

impl Default for SummaryOptions {
    fn default() -> Self {
        Self {
            include_activities: true,
            include_sleep: true,
            include_stress: true,
            include_body_battery: true,
            include_training_readiness: true,
            include_hrv: false,
            include_stats: true,
            activity_type: String::new(),
        }
    }
}

/// One row of the per-day view; only requested categories are populated
#[derive(Debug, Clone, Serialize)]
pub struct DaySummary {
    pub date: NaiveDate,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sleep: Option<SleepSignal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stress: Option<StressSignal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body_battery: Option<BodyBatterySignal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hrv: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub steps: Option<u64>,
    /// Combined readiness for the day, when that column was requested
    #[serde(skip_serializing_if = "Option::is_none")]
    pub training_readiness: Option<f64>,
}

/// Aggregates over the period, populated per the requested categories
#[derive(Debug, Clone, Default, Serialize)]
pub struct PeriodStats {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_activities: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_distance_m: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_duration_s: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_calories: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_steps: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avg_steps_per_day: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avg_sleep_hours: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avg_stress: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avg_body_battery_peak: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avg_hrv: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avg_training_readiness: Option<f64>,
}

impl PeriodStats {
    fn is_empty(&self) -> bool {
        self.total_activities.is_none()
            && self.total_steps.is_none()
            && self.avg_sleep_hours.is_none()
            && self.avg_stress.is_none()
            && self.avg_body_battery_peak.is_none()
            && self.avg_hrv.is_none()
            && self.avg_training_readiness.is_none()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PeriodSummary {
    pub period: PeriodKind,
    pub range: DateRange,
    pub anchor: NaiveDate,
    /// Per-day view, ascending
    pub days: Vec<DaySummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub activities: Option<Vec<Activity>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stats: Option<PeriodStats>,
}

pub struct SummaryComposer {
    readiness: ReadinessScorer,
}

impl SummaryComposer {
    pub fn new(readiness: ReadinessScorer) -> Self {
        Self { readiness }
    }

    /// Signal kinds a fetch must cover for these options
    ///
    /// Readiness rows need their component signals regardless of whether
    /// those categories were requested for display.
    pub fn required_kinds(options: &SummaryOptions) -> Vec<SignalKind> {
        let mut kinds = Vec::new();
        let mut require = |kind: SignalKind, wanted: bool| {
            if wanted && !kinds.contains(&kind) {
                kinds.push(kind);
            }
        };
        require(SignalKind::Sleep, options.include_sleep);
        require(SignalKind::Stress, options.include_stress);
        require(SignalKind::BodyBattery, options.include_body_battery);
        require(SignalKind::Hrv, options.include_hrv);
        require(SignalKind::Steps, options.include_stats);
        if options.include_training_readiness {
            require(SignalKind::Sleep, true);
            require(SignalKind::BodyBattery, true);
            require(SignalKind::Hrv, true);
            require(SignalKind::Stress, true);
        }
        kinds
    }

    /// History to fetch before the range start, in days
    pub fn history_days(&self, options: &SummaryOptions) -> u32 {
        if options.include_training_readiness {
            self.readiness.history_days()
        } else {
            0
        }
    }

    /// Build the summary from records covering the range (plus history) and
    /// an already-filtered activity list
    pub fn compose(
        &self,
        resolved: ResolvedPeriod,
        period: PeriodKind,
        records: &[DailyRecord],
        activities: Option<Vec<Activity>>,
        options: &SummaryOptions,
    ) -> PeriodSummary {
        let range = resolved.range;
        let days: Vec<DaySummary> = range
            .days()
            .map(|date| {
                let record = records.iter().find(|r| r.date == date);
                DaySummary {
                    date,
                    sleep: record
                        .filter(|_| options.include_sleep)
                        .and_then(|r| r.sleep.clone()),
                    stress: record
                        .filter(|_| options.include_stress)
                        .and_then(|r| r.stress.clone()),
                    body_battery: record
                        .filter(|_| options.include_body_battery)
                        .and_then(|r| r.body_battery.clone()),
                    hrv: record.filter(|_| options.include_hrv).and_then(|r| r.hrv),
                    steps: record.filter(|_| options.include_stats).and_then(|r| r.steps),
                    training_readiness: if options.include_training_readiness {
                        self.readiness.score(date, records).combined
                    } else {
                        None
                    },
                }
            })
            .collect();

        let stats = self.build_stats(&days, activities.as_deref(), options);

        PeriodSummary {
            period,
            range,
            anchor: resolved.anchor,
            days,
            activities: if options.include_activities {
                activities
            } else {
                None
            },
            stats,
        }
    }

    fn build_stats(
        &self,
        days: &[DaySummary],
        activities: Option<&[Activity]>,
        options: &SummaryOptions,
    ) -> Option<PeriodStats> {
        let mut stats = PeriodStats::default();

        if options.include_activities {
            if let Some(activities) = activities {
                stats.total_activities = Some(activities.len());
                stats.total_distance_m =
                    Some(activities.iter().filter_map(|a| a.distance_meters).sum());
                stats.total_duration_s = Some(activities.iter().map(|a| a.duration_seconds).sum());
                stats.total_calories = Some(
                    activities
                        .iter()
                        .filter_map(|a| a.calories.map(u64::from))
                        .sum(),
                );
            }
        }
        if options.include_stats {
            let step_days: Vec<u64> = days.iter().filter_map(|d| d.steps).collect();
            // No step data at all means no totals, not a zero total.
            if !step_days.is_empty() {
                stats.total_steps = Some(step_days.iter().sum());
                stats.avg_steps_per_day = mean(step_days.iter().map(|s| *s as f64)).map(round1);
            }
        }
        if options.include_sleep {
            stats.avg_sleep_hours = mean(
                days.iter()
                    .filter_map(|d| d.sleep.as_ref().map(|s| s.duration_hours)),
            )
            .map(round1);
        }
        if options.include_stress {
            stats.avg_stress =
                mean(days.iter().filter_map(|d| d.stress.as_ref().map(|s| s.avg))).map(round1);
        }
        if options.include_body_battery {
            stats.avg_body_battery_peak = mean(
                days.iter()
                    .filter_map(|d| d.body_battery.as_ref().map(|b| b.peak_level())),
            )
            .map(round1);
        }
        if options.include_hrv {
            stats.avg_hrv = mean(days.iter().filter_map(|d| d.hrv)).map(round1);
        }
        if options.include_training_readiness {
            stats.avg_training_readiness =
                mean(days.iter().filter_map(|d| d.training_readiness)).map(round1);
        }

        if stats.is_empty() {
            None
        } else {
            Some(stats)
        }
    }
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}
