//! Upstream payload normalization.
//!
//! This is the only module that knows the field names used by the backend
//! (`t_2m`, `wind_dir_10m`, ...) and their camelCase equivalents. Everything
//! downstream works on the typed model.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDateTime, Utc};
use foundation::geo::LatLng;
use serde_json::{Map, Value};
use tracing::warn;

use crate::aqi::aqi_from_pm25;
use crate::error::TimelineError;
use crate::model::{
    AirQualityReading, AqiCategory, NamedLocation, RawSeriesPoint, RawWeatherPoint, WeatherReading,
};

pub const DEFAULT_LOCATION_NAME: &str = "Current location";

const TEMPERATURE: &[&str] = &["t_2m", "temperature"];
const FEELS_LIKE: &[&str] = &["t_apparent", "feelsLike", "feels_like"];
const WIND_SPEED: &[&str] = &["wind_speed_10m", "windSpeed", "wind_speed"];
const WIND_DIRECTION: &[&str] = &["wind_dir_10m", "windDirection", "wind_direction"];
const HUMIDITY: &[&str] = &["relative_humidity_2m", "humidity"];
const PRESSURE: &[&str] = &["msl_pressure", "pressure"];
const CLOUD_COVER: &[&str] = &["total_cloud_cover", "cloudCover", "cloud_cover"];
const PM25: &[&str] = &["pm25", "pm2p5", "pm2_5"];

#[derive(Debug, Clone, PartialEq, Default)]
pub struct AirSeries {
    pub location: NamedLocation,
    pub points: Vec<RawSeriesPoint>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct WeatherSeries {
    pub location: NamedLocation,
    pub points: Vec<RawWeatherPoint>,
}

/// Parses a `/air` response: `{ location, timeline: [...] }` or a bare array.
pub fn air_series(payload: &Value) -> Result<AirSeries, TimelineError> {
    let (location, items) = split_payload(payload)?;
    Ok(AirSeries {
        location,
        points: take_parsed(items, "air", air_point),
    })
}

/// Parses a `/weather` response: `{ location, timeline: [...] }` or a bare array.
pub fn weather_series(payload: &Value) -> Result<WeatherSeries, TimelineError> {
    let (location, items) = split_payload(payload)?;
    Ok(WeatherSeries {
        location,
        points: take_parsed(items, "weather", weather_point),
    })
}

/// One air-quality point; `None` when it is not an object or its timestamp
/// cannot be read.
pub fn air_point(value: &Value) -> Option<RawSeriesPoint> {
    let obj = value.as_object()?;
    let timestamp = obj.get("timestamp").and_then(Value::as_str).and_then(parse_timestamp)?;

    let pollutants = pollutants(obj.get("pollutants"));
    let pm25 = PM25.iter().find_map(|k| pollutants.get(*k).copied());

    let aqi = number(obj, &["aqi"])
        .map(|v| v.round().clamp(0.0, f64::from(u32::MAX)) as u32)
        .or_else(|| pm25.map(aqi_from_pm25));

    let category = match obj.get("category").and_then(Value::as_str) {
        Some(label) if AqiCategory::from_label(label) != AqiCategory::Unknown => {
            AqiCategory::from_label(label)
        }
        _ => aqi.map_or(AqiCategory::Unknown, AqiCategory::from_aqi),
    };

    Some(RawSeriesPoint {
        timestamp,
        reading: AirQualityReading {
            aqi: aqi.unwrap_or(0),
            category,
            pollutants,
        },
    })
}

/// One weather point; `None` when it is not an object or its timestamp
/// cannot be read. Missing values become `0`.
pub fn weather_point(value: &Value) -> Option<RawWeatherPoint> {
    let obj = value.as_object()?;
    let timestamp = obj.get("timestamp").and_then(Value::as_str).and_then(parse_timestamp)?;

    let temperature = number(obj, TEMPERATURE).unwrap_or(0.0);
    Some(RawWeatherPoint {
        timestamp,
        reading: WeatherReading {
            temperature,
            feels_like: number(obj, FEELS_LIKE).unwrap_or(temperature),
            wind_speed: number(obj, WIND_SPEED).unwrap_or(0.0).max(0.0),
            wind_direction: wrap_degrees(number(obj, WIND_DIRECTION).unwrap_or(0.0)),
            humidity: number(obj, HUMIDITY).unwrap_or(0.0).clamp(0.0, 100.0),
            pressure: number(obj, PRESSURE).unwrap_or(0.0),
            cloud_cover: number(obj, CLOUD_COVER).unwrap_or(0.0).clamp(0.0, 100.0),
        },
    })
}

/// The `location` object of a single pushed point, if any.
pub fn point_location(value: &Value) -> NamedLocation {
    value.get("location").map(named_location).unwrap_or_default()
}

/// Display name for a fetched pair of series.
pub fn location_name(air: &NamedLocation, weather: &NamedLocation) -> String {
    [&air.name, &weather.name]
        .into_iter()
        .flatten()
        .map(|n| n.trim())
        .find(|n| !n.is_empty())
        .unwrap_or(DEFAULT_LOCATION_NAME)
        .to_string()
}

/// RFC 3339, or a naive `YYYY-MM-DDTHH:MM:SS[.f]` read as UTC.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .map(|naive| naive.and_utc())
}

fn split_payload(payload: &Value) -> Result<(NamedLocation, &[Value]), TimelineError> {
    match payload {
        Value::Array(items) => Ok((NamedLocation::default(), items.as_slice())),
        Value::Object(obj) => {
            let location = obj.get("location").map(named_location).unwrap_or_default();
            match obj.get("timeline") {
                Some(Value::Array(items)) => Ok((location, items.as_slice())),
                Some(Value::Null) | None => Ok((location, &[][..])),
                Some(_) => Err(TimelineError::Schema("`timeline` is not an array".into())),
            }
        }
        _ => Err(TimelineError::Schema(
            "expected an object with `timeline` or an array".into(),
        )),
    }
}

fn take_parsed<T>(items: &[Value], what: &str, parse: fn(&Value) -> Option<T>) -> Vec<T> {
    let mut out = Vec::with_capacity(items.len());
    for (i, item) in items.iter().enumerate() {
        match parse(item) {
            Some(point) => out.push(point),
            None => {
                warn!(index = i, total = items.len(), "unreadable {what} point, truncating series");
                break;
            }
        }
    }
    out
}

fn named_location(value: &Value) -> NamedLocation {
    let Some(obj) = value.as_object() else {
        return NamedLocation::default();
    };
    let coord = match (number(obj, &["lat", "latitude"]), number(obj, &["lng", "lon", "longitude"])) {
        (Some(lat), Some(lng)) => LatLng::checked(lat, lng),
        _ => None,
    };
    NamedLocation {
        coord,
        name: obj.get("name").and_then(Value::as_str).map(str::to_string),
    }
}

fn pollutants(value: Option<&Value>) -> BTreeMap<String, f64> {
    let Some(Value::Object(obj)) = value else {
        return BTreeMap::new();
    };
    obj.iter()
        .filter_map(|(name, v)| as_f64(v).map(|c| (name.clone(), c.max(0.0))))
        .collect()
}

/// First readable number among `keys`.
fn number(obj: &Map<String, Value>, keys: &[&str]) -> Option<f64> {
    keys.iter().find_map(|k| obj.get(*k).and_then(as_f64))
}

fn as_f64(v: &Value) -> Option<f64> {
    let n = match v {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse().ok()?,
        _ => return None,
    };
    n.is_finite().then_some(n)
}

fn wrap_degrees(deg: f64) -> f64 {
    let d = deg.rem_euclid(360.0);
    if d >= 360.0 { 0.0 } else { d }
}
