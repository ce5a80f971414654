// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! # Wellness Data Models
//!
//! This module contains the core data structures used throughout the Garmin
//! Insights MCP Server. They give every analytics component a single
//! normalized view of one calendar day of account data, independent of the
//! raw endpoint shapes the signals were fetched from.
//!
//! ## Design Principles
//!
//! - **Absence is first-class**: every signal on a [`DailyRecord`] is an
//!   `Option`, so "no data recorded" stays distinguishable from a recorded
//!   zero all the way down the pipeline
//! - **Immutable by convention**: records are produced once by the signal
//!   fetcher and only read downstream; nothing is persisted between requests
//! - **Serializable**: all models support JSON serialization for the MCP
//!   protocol, with absent signals omitted rather than null-filled
//!
//! ## Core Models
//!
//! - [`DailyRecord`]: one calendar day's normalized signals
//! - [`SignalKind`]: the signal families a record can carry
//! - [`TrendMetric`]: the scalar metrics the trend and anomaly engines consume
//! - [`Activity`]: a single recorded activity, as period summaries roll them up

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// One night of sleep as reported by the account
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SleepSignal {
    /// Total sleep duration in hours
    pub duration_hours: f64,
    /// Device sleep quality score on a 0-100 scale, when the device reports one
    pub quality: Option<f64>,
}

/// One day of body battery readings
///
/// Garmin reports body battery as an energy reserve estimate on a 0-100
/// scale. The day's peak level ([`BodyBatterySignal::peak_level`]) is the
/// scalar used wherever a single body battery number is needed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BodyBatterySignal {
    /// Lowest level reached during the day (0-100)
    pub low: f64,
    /// Highest level reached during the day (0-100)
    pub high: f64,
    /// Total amount charged over the day
    pub charged: f64,
    /// Total amount drained over the day
    pub drained: f64,
}

impl BodyBatterySignal {
    /// The day's representative charge level (the peak reached)
    pub fn peak_level(&self) -> f64 {
        self.high
    }
}

/// One day of stress readings on Garmin's 0-100 scale
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StressSignal {
    /// Average stress level over the day (0-100)
    pub avg: f64,
    /// Maximum stress level reached during the day (0-100)
    pub max: f64,
}

/// One calendar day's normalized wellness signals
///
/// Produced by the signal fetcher, one record per day in a resolved range,
/// and never mutated afterwards. A signal the account did not record for the
/// day is `None`; a recorded zero is `Some(0)`. Downstream averages count
/// only present signals, so the distinction is load-bearing.
///
/// # Examples
///
/// ```rust
/// use garmin_insights_mcp::models::{DailyRecord, SleepSignal};
/// use chrono::NaiveDate;
///
/// let date = NaiveDate::from_ymd_opt(2024, 6, 3).unwrap();
/// let mut record = DailyRecord::empty(date);
/// record.sleep = Some(SleepSignal { duration_hours: 7.5, quality: Some(82.0) });
/// record.steps = Some(0); // tracked all day, genuinely zero steps
///
/// assert!(record.sleep.is_some());
/// assert!(record.hrv.is_none()); // absent, not zero
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyRecord {
    /// The calendar day these signals belong to
    pub date: NaiveDate,
    /// Sleep duration and quality for the night ending this day
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sleep: Option<SleepSignal>,
    /// Resting heart rate in BPM
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resting_heart_rate: Option<f64>,
    /// Overnight heart rate variability in milliseconds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hrv: Option<f64>,
    /// Body battery range and charge/drain totals
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body_battery: Option<BodyBatterySignal>,
    /// Average and peak stress levels
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stress: Option<StressSignal>,
    /// Total step count
    #[serde(skip_serializing_if = "Option::is_none")]
    pub steps: Option<u64>,
}

impl DailyRecord {
    /// A record for `date` with every signal absent
    ///
    /// The signal fetcher synthesizes these for days the provider has no
    /// data for, so ranges always contain one record per calendar day.
    pub fn empty(date: NaiveDate) -> Self {
        Self {
            date,
            sleep: None,
            resting_heart_rate: None,
            hrv: None,
            body_battery: None,
            stress: None,
            steps: None,
        }
    }

    /// Whether the given signal family is present on this record
    pub fn has_signal(&self, kind: SignalKind) -> bool {
        match kind {
            SignalKind::Sleep => self.sleep.is_some(),
            SignalKind::Steps => self.steps.is_some(),
            SignalKind::HeartRate => self.resting_heart_rate.is_some(),
            SignalKind::Hrv => self.hrv.is_some(),
            SignalKind::BodyBattery => self.body_battery.is_some(),
            SignalKind::Stress => self.stress.is_some(),
        }
    }

    /// The signal families present on this record, in canonical order
    pub fn present_signals(&self) -> Vec<SignalKind> {
        SignalKind::ALL
            .iter()
            .copied()
            .filter(|kind| self.has_signal(*kind))
            .collect()
    }

    /// True when no signal at all was recorded for this day
    pub fn is_empty(&self) -> bool {
        SignalKind::ALL.iter().all(|kind| !self.has_signal(*kind))
    }

    /// The day-level scalar value for a trend metric, if present
    pub fn metric_value(&self, metric: TrendMetric) -> Option<f64> {
        match metric {
            TrendMetric::RestingHeartRate => self.resting_heart_rate,
            TrendMetric::Hrv => self.hrv,
            TrendMetric::Sleep => self.sleep.as_ref().map(|s| s.duration_hours),
            TrendMetric::Steps => self.steps.map(|s| s as f64),
            TrendMetric::BodyBattery => self.body_battery.as_ref().map(BodyBatterySignal::peak_level),
            TrendMetric::Stress => self.stress.as_ref().map(|s| s.avg),
        }
    }
}

/// The signal families a [`DailyRecord`] can carry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalKind {
    /// Sleep duration and quality
    Sleep,
    /// Daily step total
    Steps,
    /// Resting heart rate
    HeartRate,
    /// Heart rate variability
    Hrv,
    /// Body battery levels
    BodyBattery,
    /// Stress levels
    Stress,
}

impl SignalKind {
    /// Every signal family, in canonical order
    pub const ALL: [SignalKind; 6] = [
        SignalKind::Sleep,
        SignalKind::Steps,
        SignalKind::HeartRate,
        SignalKind::Hrv,
        SignalKind::BodyBattery,
        SignalKind::Stress,
    ];

    /// The canonical set completeness is measured against
    ///
    /// Stress is deliberately not part of the expected set: devices without
    /// all-day stress tracking would otherwise never reach full completeness.
    pub const EXPECTED: [SignalKind; 5] = [
        SignalKind::Sleep,
        SignalKind::Steps,
        SignalKind::HeartRate,
        SignalKind::Hrv,
        SignalKind::BodyBattery,
    ];

    /// Human-readable name for log lines and cue text
    pub fn display_name(&self) -> &'static str {
        match self {
            SignalKind::Sleep => "sleep",
            SignalKind::Steps => "steps",
            SignalKind::HeartRate => "resting heart rate",
            SignalKind::Hrv => "HRV",
            SignalKind::BodyBattery => "body battery",
            SignalKind::Stress => "stress",
        }
    }
}

/// The scalar metrics the trend and anomaly engines operate on
///
/// Wire keys are the stable short strings callers pass in tool parameters
/// (`"rhr"`, `"hrv"`, `"sleep"`, `"steps"`, `"body_battery"`, `"stress"`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TrendMetric {
    /// Resting heart rate in BPM
    #[serde(rename = "rhr")]
    RestingHeartRate,
    /// Heart rate variability in milliseconds
    #[serde(rename = "hrv")]
    Hrv,
    /// Sleep duration in hours
    #[serde(rename = "sleep")]
    Sleep,
    /// Daily step total
    #[serde(rename = "steps")]
    Steps,
    /// Body battery peak level
    #[serde(rename = "body_battery")]
    BodyBattery,
    /// Average stress level
    #[serde(rename = "stress")]
    Stress,
}

impl TrendMetric {
    /// The metrics a trends request covers when the caller names none
    pub const DEFAULT_SET: [TrendMetric; 5] = [
        TrendMetric::RestingHeartRate,
        TrendMetric::Hrv,
        TrendMetric::Sleep,
        TrendMetric::Steps,
        TrendMetric::BodyBattery,
    ];

    /// The stable wire key for this metric
    pub fn key(&self) -> &'static str {
        match self {
            TrendMetric::RestingHeartRate => "rhr",
            TrendMetric::Hrv => "hrv",
            TrendMetric::Sleep => "sleep",
            TrendMetric::Steps => "steps",
            TrendMetric::BodyBattery => "body_battery",
            TrendMetric::Stress => "stress",
        }
    }

    /// Human-readable name for cue text
    pub fn display_name(&self) -> &'static str {
        match self {
            TrendMetric::RestingHeartRate => "resting heart rate",
            TrendMetric::Hrv => "HRV",
            TrendMetric::Sleep => "sleep",
            TrendMetric::Steps => "steps",
            TrendMetric::BodyBattery => "body battery",
            TrendMetric::Stress => "stress",
        }
    }

    /// The signal family that must be fetched to compute this metric
    pub fn signal_kind(&self) -> SignalKind {
        match self {
            TrendMetric::RestingHeartRate => SignalKind::HeartRate,
            TrendMetric::Hrv => SignalKind::Hrv,
            TrendMetric::Sleep => SignalKind::Sleep,
            TrendMetric::Steps => SignalKind::Steps,
            TrendMetric::BodyBattery => SignalKind::BodyBattery,
            TrendMetric::Stress => SignalKind::Stress,
        }
    }
}

impl std::str::FromStr for TrendMetric {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "rhr" | "resting_heart_rate" => Ok(TrendMetric::RestingHeartRate),
            "hrv" => Ok(TrendMetric::Hrv),
            "sleep" => Ok(TrendMetric::Sleep),
            "steps" => Ok(TrendMetric::Steps),
            "body_battery" => Ok(TrendMetric::BodyBattery),
            "stress" => Ok(TrendMetric::Stress),
            other => Err(anyhow::anyhow!("Unknown metric key: {}", other)),
        }
    }
}

/// A single recorded activity, as period summaries roll them up
///
/// Activities are peripheral here: the analytics layer only aggregates their
/// count, distance and duration. The activity type stays a plain provider
/// string since summaries filter on it by substring, never branch on it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Activity {
    /// Provider-assigned activity identifier
    pub id: String,
    /// Human-readable activity name
    pub name: String,
    /// Provider activity type string (e.g. "running", "cycling")
    pub activity_type: String,
    /// When the activity started (UTC)
    pub start_date: DateTime<Utc>,
    /// Total duration in seconds
    pub duration_seconds: u64,
    /// Distance covered in meters, when the activity has one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distance_meters: Option<f64>,
    /// Estimated calories burned, when reported
    #[serde(skip_serializing_if = "Option::is_none")]
    pub calories: Option<u32>,
}

impl Activity {
    /// Case-insensitive substring match against the activity type
    ///
    /// An empty filter matches everything, mirroring the tool parameter
    /// default.
    pub fn matches_type(&self, filter: &str) -> bool {
        let filter = filter.trim();
        if filter.is_empty() {
            return true;
        }
        self.activity_type
            .to_lowercase()
            .contains(&filter.to_lowercase())
    }
}
