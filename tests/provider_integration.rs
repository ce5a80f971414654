// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Integration tests for the Garmin wellness provider
//!
//! Every test runs against a local mockito server so the exact endpoint
//! paths, query parameters and response payloads the provider depends on
//! stay pinned down.

use anyhow::Result;
use base64::{engine::general_purpose, Engine};
use chrono::NaiveDate;
use mockito::{Matcher, Server};
use serde_json::json;
use std::time::{Duration, Instant};
use tokio::net::TcpListener;

use garmin_insights_mcp::intelligence::DateRange;
use garmin_insights_mcp::models::SignalKind;
use garmin_insights_mcp::providers::{
    AuthData, GarminProvider, ProviderError, SignalValue, WellnessProvider,
};

fn sample_token_store() -> String {
    r#"{"oauth2_token": {"access_token": "abc123", "refresh_token": "r"}}"#.to_string()
}

fn sample_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 6, 1).unwrap()
}

fn date_query(param: &str) -> Matcher {
    Matcher::UrlEncoded(param.into(), sample_date().to_string())
}

/// Mounts the social profile endpoint and authenticates a provider
/// against it, returning the provider ready for signal calls.
async fn authenticated_provider(server: &mut Server) -> Result<GarminProvider> {
    let profile_mock = server
        .mock("GET", "/userprofile-service/socialProfile")
        .match_header("authorization", "Bearer abc123")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(json!({"displayName": "testuser"}).to_string())
        .create_async()
        .await;

    let mut provider = GarminProvider::with_base_url(server.url());
    provider
        .authenticate(AuthData::TokenStore(sample_token_store()))
        .await?;
    profile_mock.assert_async().await;
    Ok(provider)
}

fn mock_sleep_response() -> serde_json::Value {
    json!({
        "dailySleepDTO": {
            "sleepTimeSeconds": 27000,
            "sleepScores": {
                "overall": {"value": 82}
            }
        }
    })
}

fn mock_body_battery_response() -> serde_json::Value {
    json!([
        {
            "date": "2024-05-31",
            "charged": 44,
            "drained": 50,
            "bodyBatteryValuesArray": [[1717113600000i64, 55.0], [1717117200000i64, 40.0]]
        },
        {
            "date": "2024-06-01",
            "charged": 68,
            "drained": 61,
            "bodyBatteryValuesArray": [
                [1717200000000i64, 25.0],
                [1717203600000i64, 88.0],
                [1717207200000i64, 74.0]
            ]
        }
    ])
}

fn mock_activity_list() -> serde_json::Value {
    json!([
        {
            "activityId": 101,
            "activityName": "Morning Run",
            "activityType": {"typeKey": "running"},
            "startTimeGMT": "2024-06-01 06:30:00",
            "duration": 1800.4,
            "distance": 5012.0,
            "calories": 310.6
        },
        {
            "activityId": 102,
            "activityName": "Evening Ride",
            "activityType": {"typeKey": "cycling"},
            "startTimeGMT": "2024-06-01 18:00:00",
            "duration": 3600.0,
            "distance": 24000.0,
            "calories": 620.0
        },
        {
            "activityId": 103,
            "activityName": "Broken Import",
            "activityType": {"typeKey": "running"},
            "startTimeGMT": "yesterday-ish",
            "duration": 900.0
        }
    ])
}

#[tokio::test]
async fn test_authenticate_with_plain_token_store() -> Result<()> {
    let mut server = Server::new_async().await;
    let provider = authenticated_provider(&mut server).await?;
    assert_eq!(provider.provider_name(), "Garmin");
    Ok(())
}

#[tokio::test]
async fn test_authenticate_with_base64_token_store() -> Result<()> {
    let mut server = Server::new_async().await;
    let profile_mock = server
        .mock("GET", "/userprofile-service/socialProfile")
        .match_header("authorization", "Bearer abc123")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(json!({"displayName": "testuser"}).to_string())
        .create_async()
        .await;

    let wrapped = general_purpose::STANDARD.encode(sample_token_store());
    let mut provider = GarminProvider::with_base_url(server.url());
    provider.authenticate(AuthData::TokenStore(wrapped)).await?;
    profile_mock.assert_async().await;
    Ok(())
}

#[tokio::test]
async fn test_authenticate_rejects_unusable_token_store() -> Result<()> {
    let mut provider = GarminProvider::new();
    let result = provider
        .authenticate(AuthData::TokenStore("not a token store".to_string()))
        .await;
    assert!(result.is_err());
    Ok(())
}

#[tokio::test]
async fn test_sleep_signal_maps_duration_and_quality() -> Result<()> {
    let mut server = Server::new_async().await;
    let provider = authenticated_provider(&mut server).await?;

    let sleep_mock = server
        .mock("GET", "/wellness-service/wellness/dailySleepData/testuser")
        .match_query(date_query("date"))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(mock_sleep_response().to_string())
        .create_async()
        .await;

    let signal = provider.daily_signal(sample_date(), SignalKind::Sleep).await?;
    sleep_mock.assert_async().await;

    match signal {
        Some(SignalValue::Sleep(sleep)) => {
            assert!((sleep.duration_hours - 7.5).abs() < 1e-9);
            assert_eq!(sleep.quality, Some(82.0));
        }
        other => panic!("expected a sleep signal, got {:?}", other),
    }
    Ok(())
}

#[tokio::test]
async fn test_sleep_with_zero_seconds_is_absent() -> Result<()> {
    let mut server = Server::new_async().await;
    let provider = authenticated_provider(&mut server).await?;

    server
        .mock("GET", "/wellness-service/wellness/dailySleepData/testuser")
        .match_query(date_query("date"))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(json!({"dailySleepDTO": {"sleepTimeSeconds": 0}}).to_string())
        .create_async()
        .await;

    let signal = provider.daily_signal(sample_date(), SignalKind::Sleep).await?;
    assert!(signal.is_none());
    Ok(())
}

#[tokio::test]
async fn test_resting_heart_rate_filters_placeholder_zero() -> Result<()> {
    let mut server = Server::new_async().await;
    let provider = authenticated_provider(&mut server).await?;

    server
        .mock("GET", "/wellness-service/wellness/dailyHeartRate/testuser")
        .match_query(date_query("date"))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(json!({"restingHeartRate": 52}).to_string())
        .create_async()
        .await;
    server
        .mock("GET", "/wellness-service/wellness/dailyHeartRate/testuser")
        .match_query(Matcher::UrlEncoded("date".into(), "2024-06-02".into()))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(json!({"restingHeartRate": 0}).to_string())
        .create_async()
        .await;

    let present = provider
        .daily_signal(sample_date(), SignalKind::HeartRate)
        .await?;
    assert_eq!(present, Some(SignalValue::RestingHeartRate(52.0)));

    let missing = provider
        .daily_signal(
            NaiveDate::from_ymd_opt(2024, 6, 2).unwrap(),
            SignalKind::HeartRate,
        )
        .await?;
    assert!(missing.is_none());
    Ok(())
}

#[tokio::test]
async fn test_hrv_last_night_average() -> Result<()> {
    let mut server = Server::new_async().await;
    let provider = authenticated_provider(&mut server).await?;

    server
        .mock("GET", "/hrv-service/hrv/2024-06-01")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(json!({"hrvSummary": {"lastNightAvg": 48}}).to_string())
        .create_async()
        .await;

    let signal = provider.daily_signal(sample_date(), SignalKind::Hrv).await?;
    assert_eq!(signal, Some(SignalValue::Hrv(48.0)));
    Ok(())
}

#[tokio::test]
async fn test_body_battery_selects_requested_day() -> Result<()> {
    let mut server = Server::new_async().await;
    let provider = authenticated_provider(&mut server).await?;

    let battery_mock = server
        .mock("GET", "/wellness-service/wellness/bodyBattery/reports/daily")
        .match_query(Matcher::AllOf(vec![
            date_query("startDate"),
            date_query("endDate"),
        ]))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(mock_body_battery_response().to_string())
        .create_async()
        .await;

    let signal = provider
        .daily_signal(sample_date(), SignalKind::BodyBattery)
        .await?;
    battery_mock.assert_async().await;

    match signal {
        Some(SignalValue::BodyBattery(battery)) => {
            assert_eq!(battery.low, 25.0);
            assert_eq!(battery.high, 88.0);
            assert_eq!(battery.charged, 68.0);
            assert_eq!(battery.drained, 61.0);
        }
        other => panic!("expected a body battery signal, got {:?}", other),
    }
    Ok(())
}

#[tokio::test]
async fn test_stress_negative_sentinel_means_absent() -> Result<()> {
    let mut server = Server::new_async().await;
    let provider = authenticated_provider(&mut server).await?;

    server
        .mock("GET", "/wellness-service/wellness/dailyStress/2024-06-01")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(json!({"avgStressLevel": -1, "maxStressLevel": -1}).to_string())
        .create_async()
        .await;
    server
        .mock("GET", "/wellness-service/wellness/dailyStress/2024-06-02")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(json!({"avgStressLevel": 32, "maxStressLevel": 78}).to_string())
        .create_async()
        .await;

    let unworn = provider.daily_signal(sample_date(), SignalKind::Stress).await?;
    assert!(unworn.is_none());

    let worn = provider
        .daily_signal(
            NaiveDate::from_ymd_opt(2024, 6, 2).unwrap(),
            SignalKind::Stress,
        )
        .await?;
    match worn {
        Some(SignalValue::Stress(stress)) => {
            assert_eq!(stress.avg, 32.0);
            assert_eq!(stress.max, 78.0);
        }
        other => panic!("expected a stress signal, got {:?}", other),
    }
    Ok(())
}

#[tokio::test]
async fn test_steps_from_daily_summary() -> Result<()> {
    let mut server = Server::new_async().await;
    let provider = authenticated_provider(&mut server).await?;

    server
        .mock("GET", "/usersummary-service/usersummary/daily/testuser")
        .match_query(date_query("calendarDate"))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(json!({"totalSteps": 10432}).to_string())
        .create_async()
        .await;

    let signal = provider.daily_signal(sample_date(), SignalKind::Steps).await?;
    assert_eq!(signal, Some(SignalValue::Steps(10432)));
    Ok(())
}

#[tokio::test]
async fn test_missing_day_returns_none() -> Result<()> {
    let mut server = Server::new_async().await;
    let provider = authenticated_provider(&mut server).await?;

    server
        .mock("GET", "/hrv-service/hrv/2024-06-01")
        .with_status(404)
        .create_async()
        .await;

    let signal = provider.daily_signal(sample_date(), SignalKind::Hrv).await?;
    assert!(signal.is_none());
    Ok(())
}

#[tokio::test]
async fn test_empty_body_is_absent() -> Result<()> {
    let mut server = Server::new_async().await;
    let provider = authenticated_provider(&mut server).await?;

    server
        .mock("GET", "/hrv-service/hrv/2024-06-01")
        .with_status(200)
        .with_body("")
        .create_async()
        .await;
    server
        .mock("GET", "/wellness-service/wellness/dailyStress/2024-06-01")
        .with_status(200)
        .with_body("null")
        .create_async()
        .await;

    assert!(provider
        .daily_signal(sample_date(), SignalKind::Hrv)
        .await?
        .is_none());
    assert!(provider
        .daily_signal(sample_date(), SignalKind::Stress)
        .await?
        .is_none());
    Ok(())
}

#[tokio::test]
async fn test_expired_token_is_fatal() -> Result<()> {
    let mut server = Server::new_async().await;
    let provider = authenticated_provider(&mut server).await?;

    server
        .mock("GET", "/hrv-service/hrv/2024-06-01")
        .with_status(401)
        .create_async()
        .await;

    let error = provider
        .daily_signal(sample_date(), SignalKind::Hrv)
        .await
        .unwrap_err();
    assert!(matches!(error, ProviderError::Unauthorized(_)));
    assert!(error.is_fatal());
    Ok(())
}

#[tokio::test]
async fn test_server_error_is_not_fatal() -> Result<()> {
    let mut server = Server::new_async().await;
    let provider = authenticated_provider(&mut server).await?;

    server
        .mock("GET", "/hrv-service/hrv/2024-06-01")
        .with_status(500)
        .with_body("backend unavailable")
        .create_async()
        .await;

    let error = provider
        .daily_signal(sample_date(), SignalKind::Hrv)
        .await
        .unwrap_err();
    match &error {
        ProviderError::Api { status, message } => {
            assert_eq!(*status, 500);
            assert_eq!(message, "backend unavailable");
        }
        other => panic!("expected an API error, got {:?}", other),
    }
    assert!(!error.is_fatal());
    Ok(())
}

#[tokio::test]
async fn test_unresponsive_server_fails_within_the_timeout() -> Result<()> {
    // Accepts connections and then sits on them without ever answering.
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    tokio::spawn(async move {
        let mut held = Vec::new();
        loop {
            if let Ok((socket, _)) = listener.accept().await {
                held.push(socket);
            }
        }
    });

    let mut provider = GarminProvider::with_base_url(format!("http://{}", addr))
        .with_timeout(Duration::from_millis(250));
    let started = Instant::now();
    let result = provider
        .authenticate(AuthData::TokenStore(sample_token_store()))
        .await;

    assert!(result.is_err());
    assert!(
        started.elapsed() < Duration::from_secs(5),
        "request should fail at the timeout, not hang"
    );
    Ok(())
}

#[tokio::test]
async fn test_daily_signal_requires_authentication() -> Result<()> {
    let provider = GarminProvider::new();
    let error = provider
        .daily_signal(sample_date(), SignalKind::Sleep)
        .await
        .unwrap_err();
    match error {
        ProviderError::Unauthorized(message) => {
            assert!(message.contains("not authenticated"));
        }
        other => panic!("expected an unauthorized error, got {:?}", other),
    }
    Ok(())
}

#[tokio::test]
async fn test_activities_conversion_skips_unusable_rows() -> Result<()> {
    let mut server = Server::new_async().await;
    let provider = authenticated_provider(&mut server).await?;

    let list_mock = server
        .mock("GET", "/activitylist-service/activities/search/activities")
        .match_query(Matcher::AllOf(vec![
            date_query("startDate"),
            Matcher::UrlEncoded("endDate".into(), "2024-06-02".into()),
            Matcher::UrlEncoded("start".into(), "0".into()),
            Matcher::UrlEncoded("limit".into(), "200".into()),
        ]))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(mock_activity_list().to_string())
        .create_async()
        .await;

    let range = DateRange::new(sample_date(), NaiveDate::from_ymd_opt(2024, 6, 2).unwrap())?;
    let activities = provider.activities(range).await?;
    list_mock.assert_async().await;

    // The third row has an unparseable start time and gets dropped.
    assert_eq!(activities.len(), 2);

    let run = &activities[0];
    assert_eq!(run.id, "101");
    assert_eq!(run.name, "Morning Run");
    assert_eq!(run.activity_type, "running");
    assert_eq!(run.start_date.to_rfc3339(), "2024-06-01T06:30:00+00:00");
    assert_eq!(run.duration_seconds, 1800);
    assert_eq!(run.distance_meters, Some(5012.0));
    assert_eq!(run.calories, Some(311));

    let ride = &activities[1];
    assert_eq!(ride.activity_type, "cycling");
    assert_eq!(ride.duration_seconds, 3600);
    Ok(())
}
