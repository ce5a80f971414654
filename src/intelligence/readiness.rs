// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! # Readiness Scoring
//!
//! Combines a day's recovery signals into one 0-100 score. Each signal is
//! first normalized onto 0-100 by a documented monotonic mapping, then the
//! present sub-scores are blended by weight, with the weights of absent
//! sub-scores renormalized away rather than counted as zero.
//!
//! HRV is judged against the account's own trailing baseline, not a
//! population norm; with no history to compare against it sits at a neutral
//! 75 instead of pretending to know better.
//!
//! A day with no signals at all scores absent, never a fabricated midpoint.

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};

use super::{clamp_score, mean, weighted_mean};
use crate::models::DailyRecord;

/// Neutral HRV sub-score used when no baseline history exists
const HRV_NEUTRAL_SCORE: f64 = 75.0;

/// Sleep hours that earn a full duration sub-score
const FULL_SLEEP_HOURS: f64 = 8.0;

/// Relative weights of the readiness components
///
/// Only the ratios matter; weights of absent components are dropped and the
/// rest renormalized, so any positive numbers work.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReadinessWeights {
    pub sleep: f64,
    pub body_battery: f64,
    pub hrv: f64,
    pub stress: f64,
}

impl Default for ReadinessWeights {
    fn default() -> Self {
        Self {
            sleep: 30.0,
            body_battery: 25.0,
            hrv: 25.0,
            stress: 20.0,
        }
    }
}

/// A scored day: normalized sub-scores plus the weighted blend
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReadinessScore {
    pub date: NaiveDate,
    /// Sleep duration scaled to 0-100, blended with device quality if present
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sleep: Option<f64>,
    /// The day's peak body battery level, already 0-100
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body_battery: Option<f64>,
    /// HRV relative to the account's own trailing baseline
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hrv: Option<f64>,
    /// Inverted average stress
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stress_inverse: Option<f64>,
    /// Weighted blend of the present sub-scores, absent when none are
    #[serde(skip_serializing_if = "Option::is_none")]
    pub combined: Option<f64>,
}

pub struct ReadinessScorer {
    weights: ReadinessWeights,
    baseline_window_days: u32,
}

impl ReadinessScorer {
    pub fn new(weights: ReadinessWeights, baseline_window_days: u32) -> Self {
        Self {
            weights,
            baseline_window_days,
        }
    }

    /// Days of history before the scored day the HRV baseline wants
    pub fn history_days(&self) -> u32 {
        self.baseline_window_days.saturating_sub(1)
    }

    /// Score one day from records covering it and its baseline history
    pub fn score(&self, date: NaiveDate, records: &[DailyRecord]) -> ReadinessScore {
        let record = records.iter().find(|r| r.date == date);

        let sleep = record.and_then(|r| r.sleep.as_ref()).map(|sleep| {
            let duration_score = (sleep.duration_hours / FULL_SLEEP_HOURS * 100.0).min(100.0);
            match sleep.quality {
                Some(quality) => (duration_score + quality) / 2.0,
                None => duration_score,
            }
        });

        let body_battery = record
            .and_then(|r| r.body_battery.as_ref())
            .map(|battery| clamp_score(battery.peak_level()));

        let hrv = record.and_then(|r| r.hrv).map(|value| {
            let baseline_start = date - Duration::days(self.baseline_window_days as i64 - 1);
            let baseline = mean(
                records
                    .iter()
                    .filter(|r| r.date >= baseline_start && r.date <= date)
                    .filter_map(|r| r.hrv),
            );
            match baseline {
                Some(baseline) if baseline > 0.0 => {
                    clamp_score(value / baseline * HRV_NEUTRAL_SCORE)
                }
                _ => HRV_NEUTRAL_SCORE,
            }
        });

        let stress_inverse = record
            .and_then(|r| r.stress.as_ref())
            .map(|stress| clamp_score(100.0 - stress.avg));

        let combined = weighted_mean(&[
            (sleep, self.weights.sleep),
            (body_battery, self.weights.body_battery),
            (hrv, self.weights.hrv),
            (stress_inverse, self.weights.stress),
        ])
        .map(clamp_score);

        ReadinessScore {
            date,
            sleep,
            body_battery,
            hrv,
            stress_inverse,
            combined,
        }
    }
}

impl Default for ReadinessScorer {
    fn default() -> Self {
        Self::new(ReadinessWeights::default(), 28)
    }
}
