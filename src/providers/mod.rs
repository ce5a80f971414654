// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use anyhow::Result;
use async_trait::async_trait;
use chrono::NaiveDate;
use thiserror::Error;

use crate::intelligence::DateRange;
use crate::models::{Activity, BodyBatterySignal, DailyRecord, SignalKind, SleepSignal, StressSignal};

pub mod garmin;

pub use garmin::GarminProvider;

/// Failures from a wellness provider call
///
/// `Unauthorized` poisons the whole fetch; everything else is scoped to one
/// day and one signal, and the fetch layer degrades it to absence. A day the
/// provider simply has nothing for is not an error at all (`Ok(None)`).
#[derive(Debug, Error)]
pub enum ProviderError {
    /// Credentials were rejected; retrying other days cannot help
    #[error("provider rejected credentials: {0}")]
    Unauthorized(String),

    /// The request never produced a usable response
    #[error("provider request failed: {0}")]
    Network(#[from] reqwest::Error),

    /// The provider answered with an unexpected status or payload
    #[error("provider returned {status}: {message}")]
    Api { status: u16, message: String },
}

impl ProviderError {
    /// Whether this failure aborts the whole fetch rather than a single day
    pub fn is_fatal(&self) -> bool {
        matches!(self, ProviderError::Unauthorized(_))
    }
}

/// One day's worth of a single signal, as a provider reports it
#[derive(Debug, Clone, PartialEq)]
pub enum SignalValue {
    Sleep(SleepSignal),
    RestingHeartRate(f64),
    Hrv(f64),
    BodyBattery(BodyBatterySignal),
    Stress(StressSignal),
    Steps(u64),
}

impl SignalValue {
    pub fn kind(&self) -> SignalKind {
        match self {
            SignalValue::Sleep(_) => SignalKind::Sleep,
            SignalValue::RestingHeartRate(_) => SignalKind::HeartRate,
            SignalValue::Hrv(_) => SignalKind::Hrv,
            SignalValue::BodyBattery(_) => SignalKind::BodyBattery,
            SignalValue::Stress(_) => SignalKind::Stress,
            SignalValue::Steps(_) => SignalKind::Steps,
        }
    }

    /// The value of `kind` in an assembled record, if the day has it
    ///
    /// The inverse of the fetch-side merge; in-memory providers use it to
    /// serve scripted records signal by signal.
    pub fn from_record(record: &DailyRecord, kind: SignalKind) -> Option<SignalValue> {
        match kind {
            SignalKind::Sleep => record.sleep.clone().map(SignalValue::Sleep),
            SignalKind::HeartRate => record.resting_heart_rate.map(SignalValue::RestingHeartRate),
            SignalKind::Hrv => record.hrv.map(SignalValue::Hrv),
            SignalKind::BodyBattery => record.body_battery.clone().map(SignalValue::BodyBattery),
            SignalKind::Stress => record.stress.clone().map(SignalValue::Stress),
            SignalKind::Steps => record.steps.map(SignalValue::Steps),
        }
    }
}

/// Pre-arranged credentials for a provider session
///
/// Interactive login and token refresh happen outside this process; the
/// server only consumes what that tooling exported.
#[derive(Debug, Clone)]
pub enum AuthData {
    /// A ready OAuth access token for the wellness API
    Token(String),
    /// A saved token store as JSON, in the shape the account tooling exports
    TokenStore(String),
}

#[async_trait]
pub trait WellnessProvider: Send + Sync {
    /// Establish an authorized session from pre-arranged credentials
    async fn authenticate(&mut self, auth_data: AuthData) -> Result<()>;

    /// Fetch one signal for one day; `Ok(None)` means the day has no data
    async fn daily_signal(
        &self,
        date: NaiveDate,
        kind: SignalKind,
    ) -> Result<Option<SignalValue>, ProviderError>;

    /// List activities whose start falls inside the range, newest last
    async fn activities(&self, range: DateRange) -> Result<Vec<Activity>, ProviderError>;

    fn provider_name(&self) -> &'static str;
}

/// Build a provider by name, optionally pointing it at a non-default API base
pub fn create_provider(
    provider_type: &str,
    api_base_url: Option<&str>,
) -> Result<Box<dyn WellnessProvider>> {
    match provider_type.to_lowercase().as_str() {
        "garmin" => Ok(match api_base_url {
            Some(base_url) => Box::new(garmin::GarminProvider::with_base_url(base_url)),
            None => Box::new(garmin::GarminProvider::new()),
        }),
        _ => Err(anyhow::anyhow!(
            "Unknown provider: {}. Currently supported: garmin",
            provider_type
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signal_value_reports_its_kind() {
        assert_eq!(SignalValue::Steps(12_000).kind(), SignalKind::Steps);
        assert_eq!(SignalValue::Hrv(48.0).kind(), SignalKind::Hrv);
        assert_eq!(
            SignalValue::RestingHeartRate(52.0).kind(),
            SignalKind::HeartRate
        );
    }

    #[test]
    fn test_only_unauthorized_is_fatal() {
        assert!(ProviderError::Unauthorized("expired token".to_string()).is_fatal());
        assert!(!ProviderError::Api {
            status: 500,
            message: "internal error".to_string(),
        }
        .is_fatal());
    }

    #[test]
    fn test_create_provider_rejects_unknown() {
        assert!(create_provider("garmin", None).is_ok());
        assert!(create_provider("garmin", Some("http://localhost:9999")).is_ok());
        assert!(create_provider("polar", None).is_err());
    }
}
