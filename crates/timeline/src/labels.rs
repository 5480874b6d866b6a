//! Display helpers for the scrubber and the readout panel.

use chrono::{DateTime, Utc};

use crate::model::{Timeline, abs_millis};

const HOUR_MS: f64 = 3_600_000.0;
const CURRENT_WINDOW_MS: i64 = 30 * 60 * 1000;

/// Samples between labelled ticks on the scrubber.
pub const HOUR_MARKER_EVERY: usize = 12;
/// How far back the AQI trend looks, in samples.
pub const TREND_LOOKBACK: usize = 6;
/// AQI change needed before a trend is reported.
pub const TREND_THRESHOLD: i64 = 5;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Phase {
    Historical,
    Current,
    Forecast,
}

impl Phase {
    /// Samples within half an hour of `now` count as current.
    pub fn of(timestamp: DateTime<Utc>, now: DateTime<Utc>) -> Self {
        if abs_millis(timestamp, now) < CURRENT_WINDOW_MS {
            Phase::Current
        } else if timestamp < now {
            Phase::Historical
        } else {
            Phase::Forecast
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Phase::Historical => "Historical",
            Phase::Current => "Current",
            Phase::Forecast => "Forecast",
        }
    }
}

/// "Now", "+3h" or "-12h" relative to `now`, rounded to whole hours.
pub fn relative_label(timestamp: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let ms = timestamp.signed_duration_since(now).num_milliseconds();
    let hours = (ms as f64 / HOUR_MS).round() as i64;
    match hours {
        0 => "Now".to_string(),
        h if h > 0 => format!("+{h}h"),
        h => format!("{h}h"),
    }
}

/// Indices that carry a labelled tick.
pub fn hour_markers(len: usize) -> impl Iterator<Item = usize> {
    (0..len).step_by(HOUR_MARKER_EVERY)
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Trend {
    Up,
    Down,
    Steady,
}

/// AQI trend at `index` against the sample [`TREND_LOOKBACK`] steps earlier
/// (or the first sample).
pub fn aqi_trend(timeline: &Timeline, index: usize) -> Option<Trend> {
    let current = timeline.get(index)?;
    let previous = timeline.get(index.saturating_sub(TREND_LOOKBACK))?;
    let delta = i64::from(current.air_quality.aqi) - i64::from(previous.air_quality.aqi);
    Some(if delta > TREND_THRESHOLD {
        Trend::Up
    } else if delta < -TREND_THRESHOLD {
        Trend::Down
    } else {
        Trend::Steady
    })
}

const COMPASS: [&str; 16] = [
    "N", "NNE", "NE", "ENE", "E", "ESE", "SE", "SSE", "S", "SSW", "SW", "WSW", "W", "WNW", "NW",
    "NNW",
];

/// 16-point compass name for a direction in degrees.
pub fn compass_point(degrees: f64) -> &'static str {
    if !degrees.is_finite() {
        return COMPASS[0];
    }
    let sector = (degrees.rem_euclid(360.0) / 22.5).round() as usize % COMPASS.len();
    COMPASS[sector]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{AirQualityReading, TimelineSample, WeatherReading};
    use chrono::{Duration, TimeZone};
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 10, 5, 12, 0, 0).unwrap()
    }

    #[test]
    fn phase_uses_half_hour_window() {
        assert_eq!(Phase::of(now() + Duration::minutes(29), now()), Phase::Current);
        assert_eq!(Phase::of(now() - Duration::minutes(30), now()), Phase::Historical);
        assert_eq!(Phase::of(now() + Duration::hours(2), now()), Phase::Forecast);
    }

    #[test]
    fn relative_labels() {
        assert_eq!(relative_label(now(), now()), "Now");
        assert_eq!(relative_label(now() + Duration::minutes(20), now()), "Now");
        assert_eq!(relative_label(now() + Duration::hours(6), now()), "+6h");
        assert_eq!(relative_label(now() - Duration::hours(24), now()), "-24h");
    }

    #[test]
    fn markers_every_twelve_samples() {
        let markers: Vec<_> = hour_markers(97).collect();
        assert_eq!(markers, vec![0, 12, 24, 36, 48, 60, 72, 84, 96]);
    }

    #[test]
    fn trend_against_six_samples_back() {
        let samples = [10, 10, 10, 10, 10, 10, 16, 4, 12]
            .iter()
            .enumerate()
            .map(|(i, aqi)| TimelineSample {
                timestamp: now() + Duration::hours(i as i64),
                air_quality: AirQualityReading {
                    aqi: *aqi,
                    ..Default::default()
                },
                weather: WeatherReading::UNKNOWN,
            })
            .collect();
        let tl = Timeline::from_samples(samples).unwrap();

        assert_eq!(aqi_trend(&tl, 6), Some(Trend::Up));
        assert_eq!(aqi_trend(&tl, 7), Some(Trend::Down));
        assert_eq!(aqi_trend(&tl, 8), Some(Trend::Steady));
        assert_eq!(aqi_trend(&tl, 2), Some(Trend::Steady));
        assert_eq!(aqi_trend(&tl, 9), None);
    }

    #[rstest]
    #[case(0.0, "N")]
    #[case(11.0, "N")]
    #[case(12.0, "NNE")]
    #[case(90.0, "E")]
    #[case(225.0, "SW")]
    #[case(350.0, "N")]
    #[case(-90.0, "W")]
    fn compass_points(#[case] degrees: f64, #[case] expected: &str) {
        assert_eq!(compass_point(degrees), expected);
    }
}
