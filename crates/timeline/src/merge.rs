use tracing::{debug, warn};

use crate::model::{RawSeriesPoint, RawWeatherPoint, Timeline, TimelineSample, WeatherReading};

/// Pairs an air-quality series with a weather series into one [`Timeline`].
///
/// Pairing is positional: element `i` of each series forms sample `i`, and the
/// sample takes the air element's timestamp. Both upstream series are produced
/// on the same hourly grid, so small timestamp offsets between them are
/// ignored rather than joined.
pub struct SeriesMerger;

impl SeriesMerger {
    pub fn merge(air: &[RawSeriesPoint], weather: &[RawWeatherPoint]) -> Timeline {
        let len = Self::merged_len(air.len(), weather.len());
        if !weather.is_empty() && air.len() != weather.len() {
            debug!(
                air = air.len(),
                weather = weather.len(),
                "series lengths differ, truncating to {len}"
            );
        }

        let ordered = Self::increasing_prefix(&air[..len]);
        if ordered < len {
            warn!(
                index = ordered,
                "air series timestamps stop increasing, keeping first {ordered} of {len} samples"
            );
        }

        let samples = air[..ordered]
            .iter()
            .enumerate()
            .map(|(i, point)| TimelineSample {
                timestamp: point.timestamp,
                air_quality: point.reading.clone(),
                weather: weather
                    .get(i)
                    .map(|w| w.reading)
                    .unwrap_or(WeatherReading::UNKNOWN),
            })
            .collect();

        Timeline::from_ordered(samples)
    }

    /// Length of the merged timeline for series of the given lengths.
    pub fn merged_len(air: usize, weather: usize) -> usize {
        if weather == 0 { air } else { air.min(weather) }
    }

    fn increasing_prefix(air: &[RawSeriesPoint]) -> usize {
        air.windows(2)
            .position(|w| w[1].timestamp <= w[0].timestamp)
            .map_or(air.len(), |i| i + 1)
    }
}
