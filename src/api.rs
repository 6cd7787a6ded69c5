use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::time::Duration;

use crate::weatherfx::WeatherKind;

const LAUNCH_API: &str = "https://fdo.rocketlaunch.live/json/launches/next";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

// Cape Canaveral, FL
const SITE_LAT: f64 = 28.3922;
const SITE_LON: f64 = -80.6077;

/// Launch outcome/status as the state machine sees it. Produced only by
/// [`classify_outcome`]; the raw API fields never leave this module.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum LaunchStatus {
    Go,
    Tbd,
    InFlight,
    Success,
    Failure,
    PartialFailure,
    Scrubbed,
}

/// Normalized launch snapshot. Replaced wholesale on every refresh.
#[derive(Clone, Debug)]
pub(crate) struct LaunchRecord {
    pub(crate) id: i64,
    pub(crate) name: String,
    pub(crate) vehicle: String,
    pub(crate) provider: String,
    pub(crate) pad: String,
    pub(crate) t0: Option<DateTime<Utc>>,
    pub(crate) status: LaunchStatus,
}

/// Ambient weather snapshot driving the scene palette and particle layers.
#[derive(Clone, Copy, Debug)]
pub(crate) struct WeatherState {
    pub(crate) kind: WeatherKind,
    pub(crate) temp_c: f64,
    pub(crate) wind_kph: f64,
    pub(crate) cloud_pct: f64,
    pub(crate) humidity_pct: f64,
}

impl Default for WeatherState {
    fn default() -> Self {
        Self {
            kind: WeatherKind::Clear,
            temp_c: 24.0,
            wind_kph: 8.0,
            cloud_pct: 10.0,
            humidity_pct: 70.0,
        }
    }
}

/* ----------------------------
   Launch schedule (rocketlaunch.live)
---------------------------- */

#[derive(Debug, Deserialize)]
struct LaunchResp {
    #[serde(default)]
    result: Vec<RawLaunch>,
}

#[derive(Debug, Deserialize)]
struct RawLaunch {
    id: i64,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    vehicle: Option<RawNamed>,
    #[serde(default)]
    provider: Option<RawNamed>,
    #[serde(default)]
    pad: Option<RawNamed>,
    #[serde(default)]
    t0: Option<String>,
    #[serde(default)]
    win_open: Option<String>,
    #[serde(default)]
    result: Option<i32>,
    #[serde(default)]
    launch_description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawNamed {
    #[serde(default)]
    name: Option<String>,
}

/// Map the API's outcome fields to a stable status.
///
/// The schema is not guaranteed, so this stays heuristic and isolated: the
/// numeric result code wins when present, free text is the fallback, and an
/// unset outcome with a scheduled time reads as Go.
pub(crate) fn classify_outcome(
    result_code: Option<i32>,
    description: Option<&str>,
    has_t0: bool,
) -> LaunchStatus {
    match result_code {
        Some(0) => return LaunchStatus::Failure,
        Some(1) => return LaunchStatus::Success,
        Some(2) => return LaunchStatus::PartialFailure,
        _ => {}
    }
    if let Some(desc) = description {
        let d = desc.to_ascii_lowercase();
        if d.contains("in flight") || d.contains("in-flight") || d.contains("has launched") {
            return LaunchStatus::InFlight;
        }
        if d.contains("success") {
            return LaunchStatus::Success;
        }
        if d.contains("partial") {
            return LaunchStatus::PartialFailure;
        }
        if d.contains("failure") || d.contains("failed") {
            return LaunchStatus::Failure;
        }
        if d.contains("scrub") {
            return LaunchStatus::Scrubbed;
        }
    }
    if has_t0 {
        LaunchStatus::Go
    } else {
        LaunchStatus::Tbd
    }
}

fn parse_t0(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

fn normalize(raw: RawLaunch) -> LaunchRecord {
    let t0 = raw
        .t0
        .as_deref()
        .and_then(parse_t0)
        .or_else(|| raw.win_open.as_deref().and_then(parse_t0));
    let named = |n: Option<RawNamed>, fallback: &str| {
        n.and_then(|v| v.name)
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| fallback.to_string())
    };
    let status = classify_outcome(raw.result, raw.launch_description.as_deref(), t0.is_some());
    LaunchRecord {
        id: raw.id,
        name: raw.name.unwrap_or_else(|| "Unnamed mission".to_string()),
        vehicle: named(raw.vehicle, "Unknown vehicle"),
        provider: named(raw.provider, "Unknown provider"),
        pad: named(raw.pad, "Unknown pad"),
        t0,
        status,
    }
}

pub(crate) async fn fetch_launches(n: usize) -> Result<Vec<LaunchRecord>> {
    let url = format!("{LAUNCH_API}/{n}");
    let client = reqwest::Client::builder()
        .timeout(REQUEST_TIMEOUT)
        .build()
        .context("http client build failed")?;
    let resp = client
        .get(url)
        .send()
        .await
        .context("launch schedule request failed")?;
    if !resp.status().is_success() {
        return Err(anyhow!("launch schedule HTTP {}", resp.status()));
    }
    let parsed: LaunchResp = resp
        .json()
        .await
        .context("launch schedule JSON parse failed")?;
    Ok(parsed.result.into_iter().map(normalize).collect())
}

/// Re-fetch a single record for a post-launch status check. `Ok(None)` means
/// the record is no longer in the upcoming list (scrubbed or long gone).
pub(crate) async fn fetch_launch_by_id(id: i64) -> Result<Option<LaunchRecord>> {
    // The upcoming feed is small; scanning it beats relying on a per-id
    // endpoint that the free tier does not expose.
    let all = fetch_launches(25).await?;
    Ok(all.into_iter().find(|r| r.id == id))
}

/* ----------------------------
   Weather (Open-Meteo)
---------------------------- */

#[derive(Debug, Deserialize)]
struct OpenMeteoResp {
    current: OpenMeteoCurrent,
}

#[derive(Debug, Deserialize)]
struct OpenMeteoCurrent {
    temperature_2m: f64,
    wind_speed_10m: f64,
    cloud_cover: f64,
    relative_humidity_2m: f64,
    weather_code: i32,
}

pub(crate) async fn fetch_weather() -> Result<WeatherState> {
    let url = format!(
        "https://api.open-meteo.com/v1/forecast?latitude={SITE_LAT}&longitude={SITE_LON}\
&current=temperature_2m,wind_speed_10m,cloud_cover,relative_humidity_2m,weather_code&timezone=auto"
    );
    let client = reqwest::Client::builder()
        .timeout(REQUEST_TIMEOUT)
        .build()
        .context("http client build failed")?;
    let resp = client
        .get(url)
        .send()
        .await
        .context("weather request failed")?;
    if !resp.status().is_success() {
        return Err(anyhow!("weather HTTP {}", resp.status()));
    }
    let om: OpenMeteoResp = resp.json().await.context("weather JSON parse failed")?;
    Ok(WeatherState {
        kind: WeatherKind::from_code(om.current.weather_code),
        temp_c: om.current.temperature_2m,
        wind_kph: om.current.wind_speed_10m,
        cloud_pct: om.current.cloud_cover,
        humidity_pct: om.current.relative_humidity_2m,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_result_code_wins() {
        assert_eq!(classify_outcome(Some(1), Some("anomaly"), true), LaunchStatus::Success);
        assert_eq!(classify_outcome(Some(0), None, true), LaunchStatus::Failure);
        assert_eq!(classify_outcome(Some(2), None, false), LaunchStatus::PartialFailure);
    }

    #[test]
    fn text_fallback_buckets() {
        assert_eq!(
            classify_outcome(None, Some("Vehicle is currently in flight."), true),
            LaunchStatus::InFlight
        );
        assert_eq!(
            classify_outcome(None, Some("Launch was a complete success!"), true),
            LaunchStatus::Success
        );
        assert_eq!(
            classify_outcome(None, Some("Scrubbed due to weather"), true),
            LaunchStatus::Scrubbed
        );
        assert_eq!(
            classify_outcome(None, Some("Mission failed after stage separation"), true),
            LaunchStatus::Failure
        );
    }

    #[test]
    fn unset_outcome_depends_on_schedule() {
        assert_eq!(classify_outcome(None, None, true), LaunchStatus::Go);
        assert_eq!(classify_outcome(None, None, false), LaunchStatus::Tbd);
        assert_eq!(classify_outcome(Some(-1), None, true), LaunchStatus::Go);
    }

    #[test]
    fn normalize_fills_placeholders_and_falls_back_to_window() {
        let raw = RawLaunch {
            id: 7,
            name: None,
            vehicle: None,
            provider: Some(RawNamed {
                name: Some("  ".to_string()),
            }),
            pad: None,
            t0: None,
            win_open: Some("2026-03-01T12:00:00Z".to_string()),
            result: None,
            launch_description: None,
        };
        let rec = normalize(raw);
        assert_eq!(rec.name, "Unnamed mission");
        assert_eq!(rec.vehicle, "Unknown vehicle");
        assert_eq!(rec.provider, "Unknown provider");
        assert!(rec.t0.is_some());
        assert_eq!(rec.status, LaunchStatus::Go);
    }

    #[test]
    fn launch_resp_parses_api_shape() {
        let body = r#"{"result":[{"id":42,"name":"Starlink Group 9-1",
            "vehicle":{"name":"Falcon 9"},"provider":{"name":"SpaceX"},
            "pad":{"name":"SLC-40"},"t0":"2026-03-02T04:15:00Z","result":-1}]}"#;
        let parsed: LaunchResp = serde_json::from_str(body).unwrap();
        let rec = normalize(parsed.result.into_iter().next().unwrap());
        assert_eq!(rec.id, 42);
        assert_eq!(rec.vehicle, "Falcon 9");
        assert_eq!(rec.status, LaunchStatus::Go);
    }
}
