// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! # Signal Fetching
//!
//! Assembles per-day wellness records from a provider. The fetcher is the
//! only place provider errors are interpreted: a rejected credential aborts
//! the whole fetch, while any other per-day failure degrades to "signal
//! absent" so one flaky endpoint cannot sink a whole report.
//!
//! Every day in the requested range appears in the output exactly once,
//! ascending, even when the provider has nothing for it. Downstream
//! analytics rely on that shape and never re-check ordering.

use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, warn};

use super::{DateRange, InsightError};
use crate::logging::AppLogger;
use crate::models::{Activity, DailyRecord, SignalKind};
use crate::providers::{SignalValue, WellnessProvider};

/// Assembles [`DailyRecord`]s for a date range from a wellness provider
#[derive(Clone)]
pub struct SignalFetcher {
    provider: Arc<dyn WellnessProvider>,
}

impl SignalFetcher {
    pub fn new(provider: Arc<dyn WellnessProvider>) -> Self {
        Self { provider }
    }

    /// Fetch the requested signal kinds for every day in the range
    ///
    /// Only `kinds` are queried; everything else stays absent in the
    /// returned records. Order is ascending by date, one record per day.
    pub async fn fetch_range(
        &self,
        range: DateRange,
        kinds: &[SignalKind],
    ) -> Result<Vec<DailyRecord>, InsightError> {
        debug!(
            range = %range,
            kinds = kinds.len(),
            provider = self.provider.provider_name(),
            "fetching signal range"
        );
        let started = Instant::now();
        let mut soft_failures = 0usize;
        let mut records = Vec::with_capacity(range.num_days() as usize);
        for date in range.days() {
            let mut record = DailyRecord::empty(date);
            for kind in kinds {
                match self.provider.daily_signal(date, *kind).await {
                    Ok(Some(value)) => apply_signal(&mut record, value),
                    Ok(None) => {}
                    Err(error) if error.is_fatal() => {
                        return Err(InsightError::ProviderUnavailable(error))
                    }
                    Err(error) => {
                        soft_failures += 1;
                        warn!(
                            date = %date,
                            kind = kind.display_name(),
                            %error,
                            "signal fetch failed, treating as absent"
                        );
                    }
                }
            }
            records.push(record);
        }
        let days_with_data = records.iter().filter(|r| !r.is_empty()).count();
        AppLogger::log_signal_fetch(
            self.provider.provider_name(),
            records.len(),
            days_with_data,
            soft_failures,
            started.elapsed().as_millis() as u64,
        );
        Ok(records)
    }

    /// List activities in the range, keeping those matching the type filter
    ///
    /// An empty filter keeps everything. A non-fatal listing failure logs
    /// and returns an empty list, mirroring the per-day signal policy.
    pub async fn fetch_activities(
        &self,
        range: DateRange,
        type_filter: &str,
    ) -> Result<Vec<Activity>, InsightError> {
        let activities = match self.provider.activities(range).await {
            Ok(activities) => activities,
            Err(error) if error.is_fatal() => {
                return Err(InsightError::ProviderUnavailable(error))
            }
            Err(error) => {
                warn!(range = %range, %error, "activity fetch failed, treating as empty");
                Vec::new()
            }
        };
        Ok(activities
            .into_iter()
            .filter(|activity| activity.matches_type(type_filter))
            .collect())
    }
}

fn apply_signal(record: &mut DailyRecord, value: SignalValue) {
    match value {
        SignalValue::Sleep(sleep) => record.sleep = Some(sleep),
        SignalValue::RestingHeartRate(rhr) => record.resting_heart_rate = Some(rhr),
        SignalValue::Hrv(hrv) => record.hrv = Some(hrv),
        SignalValue::BodyBattery(battery) => record.body_battery = Some(battery),
        SignalValue::Stress(stress) => record.stress = Some(stress),
        SignalValue::Steps(steps) => record.steps = Some(steps),
    }
}
