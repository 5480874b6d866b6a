use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use foundation::geo::LatLng;
use serde::{Deserialize, Serialize};

use crate::error::TimelineError;

/// US EPA AQI band.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum AqiCategory {
    Good,
    Moderate,
    #[serde(rename = "Unhealthy for Sensitive Groups", alias = "UnhealthySensitive")]
    UnhealthySensitive,
    Unhealthy,
    #[serde(rename = "Very Unhealthy", alias = "VeryUnhealthy")]
    VeryUnhealthy,
    Hazardous,
    /// Sentinel for samples whose upstream category was missing or unreadable.
    #[default]
    #[serde(rename = "unknown")]
    Unknown,
}

/// Air-quality values of one sample.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct AirQualityReading {
    pub aqi: u32,
    pub category: AqiCategory,
    /// Concentration per pollutant name; sorted so iteration order is stable.
    #[serde(default)]
    pub pollutants: BTreeMap<String, f64>,
}

impl AirQualityReading {
    pub fn pollutant(&self, name: &str) -> f64 {
        self.pollutants.get(name).copied().unwrap_or(0.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawSeriesPoint {
    pub timestamp: DateTime<Utc>,
    #[serde(flatten)]
    pub reading: AirQualityReading,
}

/// Weather values of one sample.
///
/// All-zero is the "unknown" sentinel used when no weather series is
/// available; the renderer always gets a number.
#[derive(Debug, Copy, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeatherReading {
    pub temperature: f64,
    pub feels_like: f64,
    /// km/h, never negative.
    pub wind_speed: f64,
    /// Degrees in `[0, 360)`, direction the wind blows toward on screen.
    pub wind_direction: f64,
    /// Percent in `[0, 100]`.
    pub humidity: f64,
    pub pressure: f64,
    /// Percent in `[0, 100]`.
    pub cloud_cover: f64,
}

impl WeatherReading {
    pub const UNKNOWN: WeatherReading = WeatherReading {
        temperature: 0.0,
        feels_like: 0.0,
        wind_speed: 0.0,
        wind_direction: 0.0,
        humidity: 0.0,
        pressure: 0.0,
        cloud_cover: 0.0,
    };
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawWeatherPoint {
    pub timestamp: DateTime<Utc>,
    #[serde(flatten)]
    pub reading: WeatherReading,
}

/// One merged, immutable timeline entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimelineSample {
    pub timestamp: DateTime<Utc>,
    pub air_quality: AirQualityReading,
    pub weather: WeatherReading,
}

/// Where a series was sampled, as reported by the upstream provider.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct NamedLocation {
    pub coord: Option<LatLng>,
    pub name: Option<String>,
}

/// Ordered, immutable snapshot of merged samples.
///
/// Timelines are shared behind `Arc` and replaced wholesale; the only way to
/// "change" one is to build a new snapshot with [`Timeline::with_sample`].
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Timeline {
    samples: Vec<TimelineSample>,
}

impl Timeline {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Builds a timeline, rejecting samples whose timestamps do not strictly increase.
    pub fn from_samples(samples: Vec<TimelineSample>) -> Result<Self, TimelineError> {
        if let Some(i) = first_non_increasing(&samples) {
            return Err(TimelineError::Schema(format!(
                "timestamp at index {i} does not increase"
            )));
        }
        Ok(Self { samples })
    }

    /// Callers guarantee ordering; used by the merger after it has truncated.
    pub(crate) fn from_ordered(samples: Vec<TimelineSample>) -> Self {
        debug_assert!(first_non_increasing(&samples).is_none());
        Self { samples }
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&TimelineSample> {
        self.samples.get(index)
    }

    pub fn samples(&self) -> &[TimelineSample] {
        &self.samples
    }

    pub fn iter(&self) -> std::slice::Iter<'_, TimelineSample> {
        self.samples.iter()
    }

    pub fn first_timestamp(&self) -> Option<DateTime<Utc>> {
        self.samples.first().map(|s| s.timestamp)
    }

    pub fn last_timestamp(&self) -> Option<DateTime<Utc>> {
        self.samples.last().map(|s| s.timestamp)
    }

    /// Index whose timestamp is closest to `now`; ties go to the lower index.
    pub fn nearest_index(&self, now: DateTime<Utc>) -> Option<usize> {
        let mut best: Option<(usize, i64)> = None;
        for (i, s) in self.samples.iter().enumerate() {
            let diff = abs_millis(s.timestamp, now);
            match best {
                Some((_, d)) if diff >= d => {}
                _ => best = Some((i, diff)),
            }
        }
        best.map(|(i, _)| i)
    }

    /// Returns a new snapshot with the sample at `index` replaced by
    /// `patch(old)`. The timestamp is always kept so ordering survives.
    pub fn with_sample<F>(&self, index: usize, patch: F) -> Result<Timeline, TimelineError>
    where
        F: FnOnce(&TimelineSample) -> TimelineSample,
    {
        let old = self.samples.get(index).ok_or(TimelineError::OutOfRange {
            index,
            len: self.samples.len(),
        })?;
        let mut replacement = patch(old);
        replacement.timestamp = old.timestamp;

        let mut samples = self.samples.clone();
        samples[index] = replacement;
        Ok(Timeline { samples })
    }
}

impl<'a> IntoIterator for &'a Timeline {
    type Item = &'a TimelineSample;
    type IntoIter = std::slice::Iter<'a, TimelineSample>;

    fn into_iter(self) -> Self::IntoIter {
        self.samples.iter()
    }
}

fn first_non_increasing(samples: &[TimelineSample]) -> Option<usize> {
    samples
        .windows(2)
        .position(|w| w[1].timestamp <= w[0].timestamp)
        .map(|i| i + 1)
}

pub(crate) fn abs_millis(a: DateTime<Utc>, b: DateTime<Utc>) -> i64 {
    a.signed_duration_since(b).num_milliseconds().saturating_abs()
}
