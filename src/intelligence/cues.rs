// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! # Coach Cues
//!
//! Turns the period's analytics into at most four short, actionable lines.
//! Priority is fixed: anomaly flags speak first, then recovery state
//! (readiness, sleep, body battery), then trend direction. While any
//! anomaly is active, purely positive cues are suppressed so the response
//! never cheers and warns about the same body in one breath.
//!
//! A quiet period still produces one steady-state line; an empty cue list
//! reads like an error to a caller.

use serde::Serialize;

use super::anomaly::{AnomalyFlag, AnomalySeverity};
use crate::models::TrendMetric;

const MAX_CUES: usize = 4;

/// Period-level signals the cue rules read
///
/// These mirror the signal block reported back to the caller: averages over
/// the period's present days, the step change against the prior week, and
/// the activity count.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CueSignals {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avg_sleep_hours: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avg_body_battery: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avg_training_readiness: Option<f64>,
    /// Mean daily steps vs the 7 days before the period, in percent
    #[serde(skip_serializing_if = "Option::is_none")]
    pub steps_change_pct: Option<f64>,
    pub activity_count: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CueCategory {
    Anomaly,
    Readiness,
    Trend,
    SteadyState,
}

#[derive(Debug, Clone, Serialize)]
pub struct CoachCue {
    pub category: CueCategory,
    pub text: String,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct CueGenerator;

impl CueGenerator {
    pub fn new() -> Self {
        Self
    }

    /// Produce 1 to 4 cues from the period's flags and signals
    pub fn generate(&self, anomalies: &[AnomalyFlag], signals: &CueSignals) -> Vec<CoachCue> {
        let mut cues = Vec::new();
        let anomaly_active = !anomalies.is_empty();

        let mut flags: Vec<&AnomalyFlag> = anomalies.iter().collect();
        flags.sort_by_key(|flag| match flag.severity {
            AnomalySeverity::Critical => 0,
            AnomalySeverity::Warning => 1,
        });
        for flag in flags {
            cues.push(CoachCue {
                category: CueCategory::Anomaly,
                text: anomaly_cue_text(flag),
            });
        }

        if let Some(readiness) = signals.avg_training_readiness {
            if readiness < 50.0 {
                cues.push(CoachCue {
                    category: CueCategory::Readiness,
                    text: "Training readiness is low; reduce intensity and focus on recovery."
                        .to_string(),
                });
            } else if readiness > 70.0 && !anomaly_active {
                cues.push(CoachCue {
                    category: CueCategory::Readiness,
                    text: "Training readiness is high; schedule harder workouts now.".to_string(),
                });
            }
        }
        if let Some(sleep) = signals.avg_sleep_hours {
            if sleep < 7.0 {
                cues.push(CoachCue {
                    category: CueCategory::Readiness,
                    text: "Sleep is below 7h on average; prioritize an easy day or mobility."
                        .to_string(),
                });
            } else if sleep >= 8.0 && !anomaly_active {
                cues.push(CoachCue {
                    category: CueCategory::Readiness,
                    text: "Sleep is strong; you can sustain or slightly increase intensity."
                        .to_string(),
                });
            }
        }
        if let Some(battery) = signals.avg_body_battery {
            if battery < 50.0 {
                cues.push(CoachCue {
                    category: CueCategory::Readiness,
                    text: "Body battery is low; bias toward recovery work or rest.".to_string(),
                });
            } else if battery > 70.0 && !anomaly_active {
                cues.push(CoachCue {
                    category: CueCategory::Readiness,
                    text: "Body battery is high; green light for quality sessions.".to_string(),
                });
            }
        }

        if let Some(change) = signals.steps_change_pct {
            if change <= -30.0 {
                cues.push(CoachCue {
                    category: CueCategory::Trend,
                    text:
                        "Activity volume down >30% vs prior week; rebuild gradually to avoid detraining."
                            .to_string(),
                });
            } else if change >= 20.0 {
                cues.push(CoachCue {
                    category: CueCategory::Trend,
                    text:
                        "Activity volume up notably; ensure adequate recovery to avoid overuse."
                            .to_string(),
                });
            }
        }
        if signals.activity_count == 0 {
            cues.push(CoachCue {
                category: CueCategory::Trend,
                text: "No activities recorded; start with light sessions and ramp conservatively."
                    .to_string(),
            });
        }

        cues.truncate(MAX_CUES);
        if cues.is_empty() {
            cues.push(CoachCue {
                category: CueCategory::SteadyState,
                text: "Signals look steady; keep your current training rhythm.".to_string(),
            });
        }
        cues
    }
}

fn anomaly_cue_text(flag: &AnomalyFlag) -> String {
    match flag.metric {
        TrendMetric::RestingHeartRate => format!(
            "Resting heart rate is up {:.1} bpm vs baseline; keep intensity low today.",
            flag.change
        ),
        TrendMetric::Hrv => format!(
            "HRV is down {:.1} ms vs baseline; prioritize sleep and easy movement.",
            -flag.change
        ),
        TrendMetric::Sleep => format!(
            "Sleep has averaged {:.1}h recently; bank an early night before the next hard session.",
            flag.recent_mean
        ),
        TrendMetric::Steps => format!(
            "Daily movement is down {:.0}% vs baseline; add easy walks to rebuild volume.",
            -flag.change
        ),
        TrendMetric::BodyBattery | TrendMetric::Stress => flag.message.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rhr_flag(severity: AnomalySeverity) -> AnomalyFlag {
        AnomalyFlag {
            metric: TrendMetric::RestingHeartRate,
            severity,
            recent_mean: 65.0,
            baseline_mean: 58.0,
            change: 7.0,
            threshold: 5.0,
            message: "Resting heart rate is up 7.0 bpm".to_string(),
        }
    }

    fn hrv_flag() -> AnomalyFlag {
        AnomalyFlag {
            metric: TrendMetric::Hrv,
            severity: AnomalySeverity::Critical,
            recent_mean: 32.0,
            baseline_mean: 58.0,
            change: -26.0,
            threshold: 15.0,
            message: "HRV is down 26.0 ms".to_string(),
        }
    }

    #[test]
    fn test_quiet_period_yields_one_steady_state_cue() {
        let signals = CueSignals {
            avg_sleep_hours: Some(7.5),
            avg_body_battery: Some(65.0),
            avg_training_readiness: Some(60.0),
            steps_change_pct: Some(2.0),
            activity_count: 3,
        };
        let cues = CueGenerator::new().generate(&[], &signals);
        assert_eq!(cues.len(), 1);
        assert_eq!(cues[0].category, CueCategory::SteadyState);
    }

    #[test]
    fn test_anomalies_lead_and_critical_outranks_warning() {
        let flags = vec![rhr_flag(AnomalySeverity::Warning), hrv_flag()];
        let cues = CueGenerator::new().generate(&flags, &CueSignals::default());
        assert_eq!(cues[0].category, CueCategory::Anomaly);
        assert!(cues[0].text.contains("HRV"));
        assert!(cues[1].text.contains("Resting heart rate"));
    }

    #[test]
    fn test_positive_cues_suppressed_while_anomaly_active() {
        let signals = CueSignals {
            avg_sleep_hours: Some(8.5),
            avg_body_battery: Some(80.0),
            avg_training_readiness: Some(85.0),
            steps_change_pct: None,
            activity_count: 2,
        };
        let cues = CueGenerator::new().generate(&[rhr_flag(AnomalySeverity::Warning)], &signals);
        assert!(cues
            .iter()
            .all(|cue| !cue.text.contains("high") && !cue.text.contains("strong")));

        // Without the flag the same signals turn encouraging.
        let cues = CueGenerator::new().generate(&[], &signals);
        assert!(cues.iter().any(|cue| cue.text.contains("readiness is high")));
    }

    #[test]
    fn test_low_recovery_cues_fire_without_anomalies() {
        let signals = CueSignals {
            avg_sleep_hours: Some(6.2),
            avg_body_battery: Some(42.0),
            avg_training_readiness: Some(38.0),
            steps_change_pct: None,
            activity_count: 1,
        };
        let cues = CueGenerator::new().generate(&[], &signals);
        let texts: Vec<&str> = cues.iter().map(|c| c.text.as_str()).collect();
        assert!(texts.iter().any(|t| t.contains("readiness is low")));
        assert!(texts.iter().any(|t| t.contains("Sleep is below 7h")));
        assert!(texts.iter().any(|t| t.contains("Body battery is low")));
    }

    #[test]
    fn test_step_trend_cues() {
        let dropped = CueSignals {
            steps_change_pct: Some(-35.0),
            activity_count: 2,
            ..CueSignals::default()
        };
        let cues = CueGenerator::new().generate(&[], &dropped);
        assert!(cues[0].text.contains("down >30%"));
        assert_eq!(cues[0].category, CueCategory::Trend);

        let surged = CueSignals {
            steps_change_pct: Some(25.0),
            activity_count: 2,
            ..CueSignals::default()
        };
        let cues = CueGenerator::new().generate(&[], &surged);
        assert!(cues[0].text.contains("up notably"));
    }

    #[test]
    fn test_no_activities_cue() {
        let signals = CueSignals {
            activity_count: 0,
            ..CueSignals::default()
        };
        let cues = CueGenerator::new().generate(&[], &signals);
        assert!(cues[0].text.contains("No activities recorded"));
    }

    #[test]
    fn test_cue_count_capped_at_four() {
        let signals = CueSignals {
            avg_sleep_hours: Some(5.0),
            avg_body_battery: Some(30.0),
            avg_training_readiness: Some(25.0),
            steps_change_pct: Some(-50.0),
            activity_count: 0,
        };
        let flags = vec![rhr_flag(AnomalySeverity::Critical), hrv_flag()];
        let cues = CueGenerator::new().generate(&flags, &signals);
        assert_eq!(cues.len(), 4);
        assert_eq!(cues[0].category, CueCategory::Anomaly);
        assert_eq!(cues[1].category, CueCategory::Anomaly);
    }
}
