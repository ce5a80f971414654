// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Tunable parameters for the insight engines
//!
//! Every knob has a default, so a config file only needs the sections it
//! wants to change. The structures here are handed straight to the engine
//! constructors in the intelligence layer.

use chrono::Weekday;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::intelligence::{AnomalyThresholds, HydrationConfig, ReadinessWeights, TrendConfig};

/// Analysis settings grouped per engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InsightsConfig {
    /// First day of the week for "this week" style phrases
    ///
    /// Accepts full names or three-letter abbreviations ("monday", "sun").
    pub week_starts_on: String,
    /// Trailing window, in days, for the personal HRV baseline used by
    /// readiness scoring
    pub hrv_baseline_days: u32,
    pub trends: TrendConfig,
    pub anomaly: AnomalyThresholds,
    pub readiness: ReadinessWeights,
    pub hydration: HydrationConfig,
}

impl Default for InsightsConfig {
    fn default() -> Self {
        Self {
            week_starts_on: "monday".to_string(),
            hrv_baseline_days: 28,
            trends: TrendConfig::default(),
            anomaly: AnomalyThresholds::default(),
            readiness: ReadinessWeights::default(),
            hydration: HydrationConfig::default(),
        }
    }
}

impl InsightsConfig {
    /// The configured week start as a `chrono` weekday
    ///
    /// Unrecognized values fall back to Monday rather than failing the
    /// whole config load.
    pub fn week_start(&self) -> Weekday {
        match self.week_starts_on.parse() {
            Ok(day) => day,
            Err(_) => {
                warn!(
                    "Unrecognized week_starts_on value '{}', using monday",
                    self.week_starts_on
                );
                Weekday::Mon
            }
        }
    }
}
