// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! # Data Completeness
//!
//! Scores how much of the expected signal set the account actually synced,
//! day by day. The expected set is the canonical five signals a worn watch
//! records overnight and through the day; stress is excluded since many
//! devices only report it opportunistically.
//!
//! Days with nothing at all are listed separately so "thin data" and "no
//! data" stay distinguishable at a glance.

use chrono::NaiveDate;
use serde::Serialize;

use super::DateRange;
use crate::models::{DailyRecord, SignalKind};

/// One day's completeness against the expected signal set
#[derive(Debug, Clone, Serialize)]
pub struct DayCompleteness {
    pub date: NaiveDate,
    pub present: Vec<SignalKind>,
    pub missing: Vec<SignalKind>,
    /// `present / expected`, in [0, 1]
    pub fraction: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct CompletenessReport {
    pub range: DateRange,
    /// Per-day breakdown, ascending
    pub days: Vec<DayCompleteness>,
    /// Mean of the per-day fractions
    pub aggregate: f64,
    /// Days where nothing was recorded at all
    pub zero_data_days: Vec<NaiveDate>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct CompletenessScorer;

impl CompletenessScorer {
    pub fn new() -> Self {
        Self
    }

    /// Assess every day of the range against the expected signal set
    pub fn assess(&self, range: DateRange, records: &[DailyRecord]) -> CompletenessReport {
        let days: Vec<DayCompleteness> = range
            .days()
            .map(|date| {
                let record = records.iter().find(|r| r.date == date);
                let present: Vec<SignalKind> = SignalKind::EXPECTED
                    .iter()
                    .filter(|kind| record.is_some_and(|r| r.has_signal(**kind)))
                    .copied()
                    .collect();
                let missing: Vec<SignalKind> = SignalKind::EXPECTED
                    .iter()
                    .filter(|kind| !present.contains(kind))
                    .copied()
                    .collect();
                let fraction = present.len() as f64 / SignalKind::EXPECTED.len() as f64;
                DayCompleteness {
                    date,
                    present,
                    missing,
                    fraction,
                }
            })
            .collect();

        let aggregate = if days.is_empty() {
            0.0
        } else {
            days.iter().map(|day| day.fraction).sum::<f64>() / days.len() as f64
        };
        let zero_data_days = days
            .iter()
            .filter(|day| day.fraction == 0.0)
            .map(|day| day.date)
            .collect();

        CompletenessReport {
            range,
            days,
            aggregate,
            zero_data_days,
        }
    }
}
