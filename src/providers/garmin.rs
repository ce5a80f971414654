// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use anyhow::{Context, Result};
use async_trait::async_trait;
use base64::{engine::general_purpose, Engine as _};
use chrono::{NaiveDate, NaiveDateTime};
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, info, warn};

use super::{AuthData, ProviderError, SignalValue, WellnessProvider};
use crate::intelligence::DateRange;
use crate::models::{Activity, BodyBatterySignal, SignalKind, SleepSignal, StressSignal};

const GARMIN_API_BASE: &str = "https://connectapi.garmin.com";
const ACTIVITY_PAGE_LIMIT: usize = 200;
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Garmin Connect wellness API client
///
/// Talks to the per-day wellness endpoints the watch syncs into. The base
/// URL is injectable so integration tests can point it at a local mock.
pub struct GarminProvider {
    client: Client,
    base_url: String,
    access_token: Option<String>,
    display_name: Option<String>,
}

impl GarminProvider {
    pub fn new() -> Self {
        Self::with_base_url(GARMIN_API_BASE)
    }

    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            client: Self::http_client(REQUEST_TIMEOUT),
            base_url: base_url.into(),
            access_token: None,
            display_name: None,
        }
    }

    /// Replace the default request timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.client = Self::http_client(timeout);
        self
    }

    fn http_client(timeout: Duration) -> Client {
        Client::builder()
            .timeout(timeout)
            .build()
            .expect("Failed to create HTTP client")
    }

    fn display_name(&self) -> Result<&str, ProviderError> {
        self.display_name.as_deref().ok_or_else(|| {
            ProviderError::Unauthorized("no account profile loaded; call authenticate first".into())
        })
    }

    /// GET an endpoint with the session token, mapping status codes to the
    /// provider error taxonomy. `Ok(None)` covers 404 and empty bodies.
    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<Option<T>, ProviderError> {
        let token = self.access_token.as_ref().ok_or_else(|| {
            ProviderError::Unauthorized("not authenticated; call authenticate first".into())
        })?;

        let response = self
            .client
            .get(format!("{}{}", self.base_url, path))
            .query(query)
            .bearer_auth(token)
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(ProviderError::Unauthorized(format!(
                "wellness API returned {} for {}",
                status.as_u16(),
                path
            )));
        }
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(ProviderError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let body = response.text().await?;
        let trimmed = body.trim();
        if trimmed.is_empty() || trimmed == "null" {
            return Ok(None);
        }
        let parsed = serde_json::from_str(trimmed).map_err(|e| ProviderError::Api {
            status: status.as_u16(),
            message: format!("undecodable payload from {}: {}", path, e),
        })?;
        Ok(Some(parsed))
    }

    async fn fetch_sleep(&self, date: NaiveDate) -> Result<Option<SignalValue>, ProviderError> {
        let path = format!(
            "/wellness-service/wellness/dailySleepData/{}",
            self.display_name()?
        );
        let response: Option<GarminSleepResponse> = self
            .get_json(&path, &[("date", date.to_string())])
            .await?;
        Ok(response
            .and_then(|r| r.daily_sleep_dto)
            .and_then(GarminSleepDto::into_signal)
            .map(SignalValue::Sleep))
    }

    async fn fetch_resting_heart_rate(
        &self,
        date: NaiveDate,
    ) -> Result<Option<SignalValue>, ProviderError> {
        let path = format!(
            "/wellness-service/wellness/dailyHeartRate/{}",
            self.display_name()?
        );
        let response: Option<GarminHeartRateResponse> = self
            .get_json(&path, &[("date", date.to_string())])
            .await?;
        Ok(response
            .and_then(|r| r.resting_heart_rate)
            .filter(|rhr| *rhr > 0.0)
            .map(SignalValue::RestingHeartRate))
    }

    async fn fetch_hrv(&self, date: NaiveDate) -> Result<Option<SignalValue>, ProviderError> {
        let path = format!("/hrv-service/hrv/{}", date);
        let response: Option<GarminHrvResponse> = self.get_json(&path, &[]).await?;
        Ok(response
            .and_then(|r| r.hrv_summary)
            .and_then(|s| s.last_night_avg)
            .filter(|avg| *avg > 0.0)
            .map(SignalValue::Hrv))
    }

    async fn fetch_body_battery(
        &self,
        date: NaiveDate,
    ) -> Result<Option<SignalValue>, ProviderError> {
        // Body battery only has a range endpoint; a one-day range selects
        // the single report this call is after.
        let query = [
            ("startDate", date.to_string()),
            ("endDate", date.to_string()),
        ];
        let response: Option<Vec<GarminBodyBatteryDay>> = self
            .get_json("/wellness-service/wellness/bodyBattery/reports/daily", &query)
            .await?;
        Ok(response
            .into_iter()
            .flatten()
            .find(|day| day.date == Some(date))
            .and_then(GarminBodyBatteryDay::into_signal)
            .map(SignalValue::BodyBattery))
    }

    async fn fetch_stress(&self, date: NaiveDate) -> Result<Option<SignalValue>, ProviderError> {
        let path = format!("/wellness-service/wellness/dailyStress/{}", date);
        let response: Option<GarminStressResponse> = self.get_json(&path, &[]).await?;
        Ok(response
            .and_then(GarminStressResponse::into_signal)
            .map(SignalValue::Stress))
    }

    async fn fetch_steps(&self, date: NaiveDate) -> Result<Option<SignalValue>, ProviderError> {
        let path = format!(
            "/usersummary-service/usersummary/daily/{}",
            self.display_name()?
        );
        let response: Option<GarminDailySummary> = self
            .get_json(&path, &[("calendarDate", date.to_string())])
            .await?;
        Ok(response
            .and_then(|r| r.total_steps)
            .map(SignalValue::Steps))
    }
}

impl Default for GarminProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl WellnessProvider for GarminProvider {
    async fn authenticate(&mut self, auth_data: AuthData) -> Result<()> {
        let token = match auth_data {
            AuthData::Token(token) => token,
            AuthData::TokenStore(raw) => parse_token_store(&raw)?,
        };
        self.access_token = Some(token);

        let profile: Option<GarminSocialProfile> = self
            .get_json("/userprofile-service/socialProfile", &[])
            .await
            .context("loading Garmin account profile")?;
        let profile = profile.context("Garmin returned no account profile")?;
        info!("Authenticated as Garmin account: {}", profile.display_name);
        self.display_name = Some(profile.display_name);
        Ok(())
    }

    async fn daily_signal(
        &self,
        date: NaiveDate,
        kind: SignalKind,
    ) -> Result<Option<SignalValue>, ProviderError> {
        debug!(date = %date, kind = kind.display_name(), "fetching daily signal");
        match kind {
            SignalKind::Sleep => self.fetch_sleep(date).await,
            SignalKind::HeartRate => self.fetch_resting_heart_rate(date).await,
            SignalKind::Hrv => self.fetch_hrv(date).await,
            SignalKind::BodyBattery => self.fetch_body_battery(date).await,
            SignalKind::Stress => self.fetch_stress(date).await,
            SignalKind::Steps => self.fetch_steps(date).await,
        }
    }

    async fn activities(&self, range: DateRange) -> Result<Vec<Activity>, ProviderError> {
        let query = [
            ("startDate", range.start().to_string()),
            ("endDate", range.end().to_string()),
            ("start", "0".to_string()),
            ("limit", ACTIVITY_PAGE_LIMIT.to_string()),
        ];
        let response: Option<Vec<GarminActivity>> = self
            .get_json("/activitylist-service/activities/search/activities", &query)
            .await?;
        let activities = response
            .unwrap_or_default()
            .into_iter()
            .filter_map(|raw| {
                let id = raw.activity_id;
                match raw.into_activity() {
                    Some(activity) => Some(activity),
                    None => {
                        warn!("skipping activity {} with unusable start time", id);
                        None
                    }
                }
            })
            .collect();
        Ok(activities)
    }

    fn provider_name(&self) -> &'static str {
        "Garmin"
    }
}

/// Extract the OAuth access token from a saved token store
///
/// Accepts the store as plain JSON or base64-wrapped JSON, the two shapes
/// the export tooling produces.
fn parse_token_store(raw: &str) -> Result<String> {
    let trimmed = raw.trim();
    let json = if trimmed.starts_with('{') {
        trimmed.to_string()
    } else {
        let decoded = general_purpose::STANDARD
            .decode(trimmed)
            .context("token store is neither JSON nor base64")?;
        String::from_utf8(decoded).context("decoded token store is not UTF-8")?
    };
    let store: GarminTokenStore =
        serde_json::from_str(&json).context("unrecognized token store layout")?;
    Ok(store.oauth2_token.access_token)
}

#[derive(Debug, Deserialize)]
struct GarminTokenStore {
    oauth2_token: GarminOauth2Token,
}

#[derive(Debug, Deserialize)]
struct GarminOauth2Token {
    access_token: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GarminSocialProfile {
    display_name: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GarminSleepResponse {
    daily_sleep_dto: Option<GarminSleepDto>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GarminSleepDto {
    sleep_time_seconds: Option<f64>,
    sleep_scores: Option<GarminSleepScores>,
}

impl GarminSleepDto {
    fn into_signal(self) -> Option<SleepSignal> {
        let seconds = self.sleep_time_seconds.filter(|s| *s > 0.0)?;
        let quality = self
            .sleep_scores
            .and_then(|scores| scores.overall)
            .and_then(|overall| overall.value);
        Some(SleepSignal {
            duration_hours: seconds / 3600.0,
            quality,
        })
    }
}

#[derive(Debug, Deserialize)]
struct GarminSleepScores {
    overall: Option<GarminScoreValue>,
}

#[derive(Debug, Deserialize)]
struct GarminScoreValue {
    value: Option<f64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GarminHeartRateResponse {
    resting_heart_rate: Option<f64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GarminHrvResponse {
    hrv_summary: Option<GarminHrvSummary>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GarminHrvSummary {
    last_night_avg: Option<f64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GarminBodyBatteryDay {
    date: Option<NaiveDate>,
    charged: Option<f64>,
    drained: Option<f64>,
    /// `[timestamp_ms, level]` pairs sampled through the day
    body_battery_values_array: Option<Vec<Vec<f64>>>,
}

impl GarminBodyBatteryDay {
    fn into_signal(self) -> Option<BodyBatterySignal> {
        let levels: Vec<f64> = self
            .body_battery_values_array?
            .iter()
            .filter_map(|pair| pair.get(1).copied())
            .collect();
        if levels.is_empty() {
            return None;
        }
        let high = levels.iter().cloned().fold(f64::MIN, f64::max);
        let low = levels.iter().cloned().fold(f64::MAX, f64::min);
        Some(BodyBatterySignal {
            low,
            high,
            charged: self.charged.unwrap_or(0.0),
            drained: self.drained.unwrap_or(0.0),
        })
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GarminStressResponse {
    avg_stress_level: Option<f64>,
    max_stress_level: Option<f64>,
}

impl GarminStressResponse {
    fn into_signal(self) -> Option<StressSignal> {
        // Garmin reports -1 when the day has no valid stress samples.
        let avg = self.avg_stress_level.filter(|avg| *avg >= 0.0)?;
        let max = self.max_stress_level.filter(|max| *max >= 0.0).unwrap_or(avg);
        Some(StressSignal { avg, max })
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GarminDailySummary {
    total_steps: Option<u64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GarminActivity {
    activity_id: u64,
    activity_name: Option<String>,
    activity_type: Option<GarminActivityType>,
    /// `YYYY-MM-DD HH:MM:SS`, not RFC 3339
    start_time_gmt: Option<String>,
    duration: Option<f64>,
    distance: Option<f64>,
    calories: Option<f64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GarminActivityType {
    type_key: String,
}

impl GarminActivity {
    fn into_activity(self) -> Option<Activity> {
        let start_date = self
            .start_time_gmt
            .as_deref()
            .and_then(|raw| NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S").ok())?
            .and_utc();
        Some(Activity {
            id: self.activity_id.to_string(),
            name: self.activity_name.unwrap_or_else(|| "Untitled".to_string()),
            activity_type: self
                .activity_type
                .map(|t| t.type_key)
                .unwrap_or_else(|| "unknown".to_string()),
            start_date,
            duration_seconds: self.duration.unwrap_or(0.0).round().max(0.0) as u64,
            distance_meters: self.distance,
            calories: self.calories.map(|c| c.round().max(0.0) as u32),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_store_parses_plain_and_base64_json() {
        let json = r#"{"oauth2_token": {"access_token": "abc123", "refresh_token": "r"}}"#;
        assert_eq!(parse_token_store(json).unwrap(), "abc123");

        let wrapped = general_purpose::STANDARD.encode(json);
        assert_eq!(parse_token_store(&wrapped).unwrap(), "abc123");

        assert!(parse_token_store("not a token store").is_err());
    }

    #[test]
    fn test_sleep_payload_maps_to_hours_and_quality() {
        let response: GarminSleepResponse = serde_json::from_str(
            r#"{"dailySleepDTO": {"sleepTimeSeconds": 27000,
                "sleepScores": {"overall": {"value": 82}}}}"#,
        )
        .unwrap();
        let signal = response.daily_sleep_dto.unwrap().into_signal().unwrap();
        assert!((signal.duration_hours - 7.5).abs() < 1e-9);
        assert_eq!(signal.quality, Some(82.0));
    }

    #[test]
    fn test_zero_sleep_seconds_is_absent() {
        let dto = GarminSleepDto {
            sleep_time_seconds: Some(0.0),
            sleep_scores: None,
        };
        assert!(dto.into_signal().is_none());
    }

    #[test]
    fn test_body_battery_levels_drive_low_and_high() {
        let day: GarminBodyBatteryDay = serde_json::from_str(
            r#"{"date": "2024-06-01", "charged": 55, "drained": 40,
                "bodyBatteryValuesArray": [[1717200000000, 30], [1717210000000, 85], [1717220000000, 45]]}"#,
        )
        .unwrap();
        let signal = day.into_signal().unwrap();
        assert_eq!(signal.low, 30.0);
        assert_eq!(signal.high, 85.0);
        assert_eq!(signal.charged, 55.0);
        assert_eq!(signal.drained, 40.0);
    }

    #[test]
    fn test_body_battery_without_samples_is_absent() {
        let day = GarminBodyBatteryDay {
            date: None,
            charged: Some(10.0),
            drained: Some(5.0),
            body_battery_values_array: Some(vec![]),
        };
        assert!(day.into_signal().is_none());
    }

    #[test]
    fn test_negative_stress_average_means_no_data() {
        let missing = GarminStressResponse {
            avg_stress_level: Some(-1.0),
            max_stress_level: Some(-1.0),
        };
        assert!(missing.into_signal().is_none());

        let present = GarminStressResponse {
            avg_stress_level: Some(31.0),
            max_stress_level: Some(78.0),
        };
        let signal = present.into_signal().unwrap();
        assert_eq!(signal.avg, 31.0);
        assert_eq!(signal.max, 78.0);
    }

    #[test]
    fn test_activity_payload_converts_with_gmt_timestamp() {
        let raw: GarminActivity = serde_json::from_str(
            r#"{"activityId": 987654, "activityName": "Morning Run",
                "activityType": {"typeKey": "running"},
                "startTimeGMT": "2024-06-01 06:30:00",
                "duration": 1800.4, "distance": 5012.0, "calories": 350.6}"#,
        )
        .unwrap();
        let activity = raw.into_activity().unwrap();
        assert_eq!(activity.id, "987654");
        assert_eq!(activity.activity_type, "running");
        assert_eq!(activity.duration_seconds, 1800);
        assert_eq!(activity.calories, Some(351));
        assert_eq!(activity.start_date.to_rfc3339(), "2024-06-01T06:30:00+00:00");
    }

    #[test]
    fn test_activity_without_start_time_is_skipped() {
        let raw = GarminActivity {
            activity_id: 1,
            activity_name: None,
            activity_type: None,
            start_time_gmt: Some("yesterday-ish".to_string()),
            duration: None,
            distance: None,
            calories: None,
        };
        assert!(raw.into_activity().is_none());
    }
}
