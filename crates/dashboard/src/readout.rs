use std::fmt;

use chrono::{DateTime, Utc};
use timeline::labels::{self, Phase, Trend};
use timeline::{AqiCategory, TimelineCursor};

use crate::advice::{recommendations, Recommendation};
use crate::subscription::HealthProfile;

pub const NO_DATA: &str = "no data";

/// Everything the readout panel shows for the selected sample.
#[derive(Debug, Clone, PartialEq)]
pub struct Readout {
    pub location: String,
    pub timestamp: DateTime<Utc>,
    pub relative: String,
    pub phase: Phase,
    pub aqi: u32,
    pub category: AqiCategory,
    pub color: &'static str,
    pub trend: Option<Trend>,
    pub pm25: f64,
    pub temperature: f64,
    pub wind_speed: f64,
    pub wind_compass: &'static str,
    pub humidity: f64,
}

impl Readout {
    pub fn from_cursor(cursor: &TimelineCursor, location: &str, now: DateTime<Utc>) -> Self {
        let sample = cursor.current();
        let air = &sample.air_quality;
        let weather = &sample.weather;
        Self {
            location: location.to_string(),
            timestamp: sample.timestamp,
            relative: labels::relative_label(sample.timestamp, now),
            phase: Phase::of(sample.timestamp, now),
            aqi: air.aqi,
            category: air.category,
            color: air.category.color_hex(),
            trend: labels::aqi_trend(cursor.timeline(), cursor.index()),
            pm25: air.pollutant("pm25"),
            temperature: weather.temperature,
            wind_speed: weather.wind_speed,
            wind_compass: labels::compass_point(weather.wind_direction),
            humidity: weather.humidity,
        }
    }

    pub fn advice(&self, profile: HealthProfile) -> Vec<Recommendation> {
        recommendations(self.aqi, profile)
    }
}

impl fmt::Display for Readout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let trend = match self.trend {
            Some(Trend::Up) => " ↑",
            Some(Trend::Down) => " ↓",
            _ => "",
        };
        write!(
            f,
            "{} [{} {}] AQI {} {}{} | {:.1}°C | wind {:.1} km/h {} | humidity {:.0}%",
            self.location,
            self.phase.label(),
            self.relative,
            self.aqi,
            self.category.label(),
            trend,
            self.temperature,
            self.wind_speed,
            self.wind_compass,
            self.humidity,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use pretty_assertions::assert_eq;
    use std::sync::Arc;
    use timeline::{AirQualityReading, Timeline, TimelineSample, WeatherReading};

    #[test]
    fn readout_of_current_sample() {
        let now = Utc.with_ymd_and_hms(2025, 10, 5, 12, 0, 0).unwrap();
        let samples = (0..3)
            .map(|i| TimelineSample {
                timestamp: now + Duration::hours(i),
                air_quality: AirQualityReading {
                    aqi: 120,
                    category: AqiCategory::UnhealthySensitive,
                    pollutants: [("pm25".to_string(), 40.0)].into_iter().collect(),
                },
                weather: WeatherReading {
                    temperature: 18.3,
                    wind_speed: 12.0,
                    wind_direction: 90.0,
                    humidity: 55.0,
                    ..WeatherReading::UNKNOWN
                },
            })
            .collect();
        let mut cursor = TimelineCursor::new(Arc::new(Timeline::from_samples(samples).unwrap())).unwrap();
        cursor.jump_to(2);

        let r = Readout::from_cursor(&cursor, "Lyon", now);
        assert_eq!(r.relative, "+2h");
        assert_eq!(r.phase, Phase::Forecast);
        assert_eq!(r.color, "#f97316");
        assert_eq!(r.wind_compass, "E");
        assert_eq!(r.trend, Some(Trend::Steady));
        assert_eq!(
            r.to_string(),
            "Lyon [Forecast +2h] AQI 120 Unhealthy for Sensitive Groups | 18.3°C | wind 12.0 km/h E | humidity 55%"
        );

        let titles: Vec<_> = r.advice(HealthProfile::Child).iter().map(|a| a.title).collect();
        assert_eq!(titles, ["Unhealthy for sensitive groups", "Children: reduce outdoor play"]);
        assert_eq!(r.advice(HealthProfile::General).len(), 1);
    }
}
