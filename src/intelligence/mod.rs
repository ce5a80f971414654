// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! # Intelligence Module
//!
//! The analytics layer computed over normalized wellness records. Every tool
//! the server exposes is built from these components:
//!
//! - Date resolution: anchor phrases and explicit dates to clamped ranges
//! - Signal fetching: provider payloads to one record per calendar day
//! - Trends: rolling averages and range-boundary deltas
//! - Anomalies: recent-window vs baseline-window recovery red flags
//! - Readiness: weighted 0-100 composite from per-signal sub-scores
//! - Completeness: fraction of expected signals actually recorded
//! - Summaries: single-pane daily/weekly/monthly reports
//! - Hydration: fluid target formula
//! - Coach cues: rule-based guidance text
//!
//! Everything except the signal fetcher is a pure function over its inputs.
//! Each request runs the same pipeline: resolve the range, fetch records,
//! then score. Thin history is never an error anywhere in this module; it
//! surfaces as absent fields in results.

use thiserror::Error;

use crate::providers::ProviderError;

pub mod anomaly;
pub mod completeness;
pub mod cues;
pub mod daterange;
pub mod fetcher;
pub mod hydration;
pub mod readiness;
pub mod summary;
pub mod trends;

pub use anomaly::{AnomalyDetector, AnomalyFlag, AnomalySeverity, AnomalyThresholds};
pub use completeness::{CompletenessReport, CompletenessScorer, DayCompleteness};
pub use cues::{CoachCue, CueCategory, CueGenerator, CueSignals};
pub use daterange::{
    resolve_anchor_period, resolve_date_strings, AnchorExpression, DateRange, PeriodKind,
    ResolvedPeriod,
};
pub use fetcher::SignalFetcher;
pub use hydration::{HydrationAdvice, HydrationConfig};
pub use readiness::{ReadinessScore, ReadinessScorer, ReadinessWeights};
pub use summary::{DaySummary, PeriodStats, PeriodSummary, SummaryComposer, SummaryOptions};
pub use trends::{MetricTrend, TrendConfig, TrendEngine, TrendPoint, TrendReport};

/// Errors the analytics layer surfaces to callers
///
/// Deliberately small: insufficient data is not represented here at all.
/// A metric with too little history shows up as an absent field in the
/// result, never as a failure.
#[derive(Debug, Error)]
pub enum InsightError {
    /// The anchor phrase or explicit dates could not be resolved
    #[error("Invalid date expression: {0}")]
    InvalidDateExpression(String),

    /// The data provider failed in a way partial results cannot paper over
    #[error("Provider unavailable: {0}")]
    ProviderUnavailable(#[from] ProviderError),
}

/// Mean over the yielded values, `None` when the iterator is empty
///
/// The shared primitive behind every present-day average in this module:
/// callers filter out absent days before the mean, so sparse data never
/// biases toward zero.
pub fn mean(values: impl IntoIterator<Item = f64>) -> Option<f64> {
    let mut sum = 0.0;
    let mut count = 0usize;
    for value in values {
        sum += value;
        count += 1;
    }
    if count == 0 {
        None
    } else {
        Some(sum / count as f64)
    }
}

/// Weighted mean over present components, renormalizing the weights
///
/// Components are `(value, weight)` pairs. Absent values drop out and the
/// remaining weights are rescaled to cover the full scale again, so a score
/// built from two of four components still lands on the same 0-100 range.
/// `None` when every component is absent or the present weights sum to zero.
pub fn weighted_mean(components: &[(Option<f64>, f64)]) -> Option<f64> {
    let mut weighted_sum = 0.0;
    let mut weight_total = 0.0;
    for (value, weight) in components {
        if let Some(v) = value {
            weighted_sum += v * weight;
            weight_total += weight;
        }
    }
    if weight_total > 0.0 {
        Some(weighted_sum / weight_total)
    } else {
        None
    }
}

/// Clamp a value to the 0-100 score scale
pub fn clamp_score(value: f64) -> f64 {
    value.clamp(0.0, 100.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mean_of_values() {
        assert_eq!(mean([2.0, 4.0, 6.0]), Some(4.0));
        assert_eq!(mean([5.0]), Some(5.0));
        assert_eq!(mean(std::iter::empty::<f64>()), None);
    }

    #[test]
    fn test_weighted_mean_all_present() {
        let combined = weighted_mean(&[
            (Some(80.0), 30.0),
            (Some(60.0), 25.0),
            (Some(60.0), 25.0),
            (Some(40.0), 20.0),
        ])
        .unwrap();
        assert!((combined - 62.0).abs() < 1e-9);
    }

    #[test]
    fn test_weighted_mean_renormalizes_over_present() {
        // Only two of four components present: their weights rescale, so the
        // result is the 30/25-weighted mean of 80 and 60, not dragged down.
        let combined = weighted_mean(&[
            (Some(80.0), 30.0),
            (Some(60.0), 25.0),
            (None, 25.0),
            (None, 20.0),
        ])
        .unwrap();
        let expected = (80.0 * 30.0 + 60.0 * 25.0) / 55.0;
        assert!((combined - expected).abs() < 1e-9);
    }

    #[test]
    fn test_weighted_mean_absent_when_nothing_present() {
        assert_eq!(weighted_mean(&[(None, 30.0), (None, 70.0)]), None);
        assert_eq!(weighted_mean(&[]), None);
    }

    #[test]
    fn test_clamp_score_bounds() {
        assert_eq!(clamp_score(-5.0), 0.0);
        assert_eq!(clamp_score(50.0), 50.0);
        assert_eq!(clamp_score(120.0), 100.0);
    }
}
