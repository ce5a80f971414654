// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! # Hydration Guidance
//!
//! A pure intake formula: a per-kilogram baseline, a pro-rated training
//! increment, and a heat multiplier that kicks in above documented
//! temperature thresholds. No provider data is involved; missing
//! temperature or zero training minutes simply fall back to baseline.

use serde::{Deserialize, Serialize};

/// Formula constants, overridable through configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HydrationConfig {
    /// Baseline intake per kilogram of body weight, in ml
    pub ml_per_kg: f64,
    /// Extra intake per hour of training, pro-rated by minute, in ml
    pub training_ml_per_hour: f64,
    /// Temperature at which the warm multiplier applies, in Celsius
    pub warm_threshold_c: f64,
    pub warm_multiplier: f64,
    /// Temperature at which the hot multiplier applies instead, in Celsius
    pub hot_threshold_c: f64,
    pub hot_multiplier: f64,
}

impl Default for HydrationConfig {
    fn default() -> Self {
        Self {
            ml_per_kg: 35.0,
            training_ml_per_hour: 500.0,
            warm_threshold_c: 25.0,
            warm_multiplier: 1.1,
            hot_threshold_c: 30.0,
            hot_multiplier: 1.2,
        }
    }
}

/// The recommendation with its inputs and intermediate terms laid out
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HydrationAdvice {
    pub weight_kg: f64,
    pub training_minutes: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature_c: Option<f64>,
    /// Weight-scaled baseline, in ml
    pub baseline_ml: f64,
    /// Training increment, in ml
    pub training_ml: f64,
    pub heat_multiplier: f64,
    /// `(baseline + training) * heat`, rounded to whole ml
    pub target_ml: f64,
}

impl HydrationConfig {
    /// Daily intake target for the given body, training load, and weather
    pub fn recommend(
        &self,
        weight_kg: f64,
        training_minutes: u32,
        temperature_c: Option<f64>,
    ) -> HydrationAdvice {
        let baseline_ml = weight_kg * self.ml_per_kg;
        let training_ml = f64::from(training_minutes) / 60.0 * self.training_ml_per_hour;
        let heat_multiplier = match temperature_c {
            Some(t) if t >= self.hot_threshold_c => self.hot_multiplier,
            Some(t) if t >= self.warm_threshold_c => self.warm_multiplier,
            _ => 1.0,
        };
        HydrationAdvice {
            weight_kg,
            training_minutes,
            temperature_c,
            baseline_ml: baseline_ml.round(),
            training_ml: training_ml.round(),
            heat_multiplier,
            target_ml: ((baseline_ml + training_ml) * heat_multiplier).round(),
        }
    }
}
