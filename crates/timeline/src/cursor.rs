use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::error::TimelineError;
use crate::model::{Timeline, TimelineSample};

/// Preset navigation buttons.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum QuickJump {
    Back24h,
    Back6h,
    Now,
    Forward6h,
    Forward24h,
}

impl QuickJump {
    /// Signed hour offset; `None` for [`QuickJump::Now`].
    pub fn hours(self) -> Option<f64> {
        match self {
            QuickJump::Back24h => Some(-24.0),
            QuickJump::Back6h => Some(-6.0),
            QuickJump::Now => None,
            QuickJump::Forward6h => Some(6.0),
            QuickJump::Forward24h => Some(24.0),
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            QuickJump::Back24h => "-24h",
            QuickJump::Back6h => "-6h",
            QuickJump::Now => "Now",
            QuickJump::Forward6h => "+6h",
            QuickJump::Forward24h => "+24h",
        }
    }
}

/// The single owner of the "current sample" index over a timeline snapshot.
///
/// The index is always within `[0, len - 1]`. Every mutating call returns
/// whether the index actually changed, so the caller knows when dependent
/// views (the wind animation in particular) must be refreshed.
#[derive(Debug, Clone)]
pub struct TimelineCursor {
    timeline: Arc<Timeline>,
    index: usize,
    hours_per_sample: f64,
}

impl TimelineCursor {
    pub fn new(timeline: Arc<Timeline>) -> Result<Self, TimelineError> {
        if timeline.is_empty() {
            return Err(TimelineError::Empty);
        }
        Ok(Self {
            timeline,
            index: 0,
            hours_per_sample: 1.0,
        })
    }

    /// Cursor on the sample closest to `now`, where a freshly loaded
    /// timeline should open.
    pub fn new_at(timeline: Arc<Timeline>, now: DateTime<Utc>) -> Result<Self, TimelineError> {
        let mut cursor = Self::new(timeline)?;
        cursor.nearest_to_now(now);
        Ok(cursor)
    }

    /// Sample spacing used to convert quick-jump hours to steps. Non-finite
    /// or non-positive values are ignored.
    pub fn with_hours_per_sample(mut self, hours: f64) -> Self {
        if hours.is_finite() && hours > 0.0 {
            self.hours_per_sample = hours;
        }
        self
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn len(&self) -> usize {
        self.timeline.len()
    }

    pub fn timeline(&self) -> &Arc<Timeline> {
        &self.timeline
    }

    pub fn current(&self) -> &TimelineSample {
        &self.timeline.samples()[self.index]
    }

    fn last(&self) -> usize {
        self.timeline.len() - 1
    }

    fn clamp(&self, index: i64) -> usize {
        index.clamp(0, self.last() as i64) as usize
    }

    fn set(&mut self, index: usize) -> bool {
        if index == self.index {
            return false;
        }
        debug!(from = self.index, to = index, "cursor moved");
        self.index = index;
        true
    }

    /// Moves by `delta` samples, clamped to the timeline.
    pub fn step_by(&mut self, delta: i64) -> bool {
        let target = (self.index as i64).saturating_add(delta);
        let index = self.clamp(target);
        self.set(index)
    }

    pub fn jump_to(&mut self, index: i64) -> bool {
        let index = self.clamp(index);
        self.set(index)
    }

    /// Whether `step_by(delta)` would move the cursor.
    pub fn can_step(&self, delta: i64) -> bool {
        self.clamp((self.index as i64).saturating_add(delta)) != self.index
    }

    /// Moves to the sample closest to `now`.
    pub fn nearest_to_now(&mut self, now: DateTime<Utc>) -> bool {
        match self.timeline.nearest_index(now) {
            Some(index) => self.set(index),
            None => false,
        }
    }

    pub fn is_at(&self, now: DateTime<Utc>) -> bool {
        self.timeline.nearest_index(now) == Some(self.index)
    }

    pub fn quick_jump(&mut self, jump: QuickJump, now: DateTime<Utc>) -> bool {
        match jump.hours() {
            Some(hours) => self.step_by(self.steps_for_hours(hours)),
            None => self.nearest_to_now(now),
        }
    }

    fn steps_for_hours(&self, hours: f64) -> i64 {
        // `as` saturates for out-of-range floats.
        (hours / self.hours_per_sample).round() as i64
    }

    /// Slider position in `[0, 1]`.
    pub fn fraction(&self) -> f64 {
        match self.last() {
            0 => 0.0,
            last => self.index as f64 / last as f64,
        }
    }

    pub fn jump_to_fraction(&mut self, fraction: f64) -> bool {
        if fraction.is_nan() {
            return false;
        }
        let f = fraction.clamp(0.0, 1.0);
        let index = (f * self.last() as f64).round() as i64;
        self.jump_to(index)
    }

    /// Swaps in a fresh snapshot, keeping the index clamped to its bounds.
    pub fn replace_timeline(&mut self, timeline: Arc<Timeline>) -> Result<bool, TimelineError> {
        if timeline.is_empty() {
            return Err(TimelineError::Empty);
        }
        self.timeline = timeline;
        let index = self.index.min(self.last());
        let changed = index != self.index;
        self.index = index;
        Ok(changed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{AirQualityReading, WeatherReading};
    use chrono::{Duration, TimeZone};
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 10, 5, 12, 0, 0).unwrap()
    }

    /// 97 hourly samples from now-48h to now+48h.
    fn hourly(len: usize, start: DateTime<Utc>) -> Arc<Timeline> {
        let samples = (0..len)
            .map(|i| TimelineSample {
                timestamp: start + Duration::hours(i as i64),
                air_quality: AirQualityReading::default(),
                weather: WeatherReading::UNKNOWN,
            })
            .collect();
        Arc::new(Timeline::from_samples(samples).unwrap())
    }

    fn cursor(len: usize) -> TimelineCursor {
        TimelineCursor::new(hourly(len, now() - Duration::hours(48))).unwrap()
    }

    #[test]
    fn empty_timeline_is_rejected() {
        let err = TimelineCursor::new(Arc::new(Timeline::empty())).unwrap_err();
        assert_eq!(err, TimelineError::Empty);
    }

    #[test]
    fn nearest_to_now_finds_the_centre_sample() {
        let mut c = cursor(97);
        assert!(c.nearest_to_now(now()));
        assert_eq!(c.index(), 48);
        assert_eq!(c.current().timestamp, now());
        assert!(c.is_at(now()));
    }

    #[test]
    fn new_at_opens_on_now() {
        let c = TimelineCursor::new_at(hourly(97, now() - Duration::hours(48)), now()).unwrap();
        assert_eq!(c.index(), 48);
        assert!(c.is_at(now()));
        let early = TimelineCursor::new_at(hourly(5, now() + Duration::hours(3)), now()).unwrap();
        assert_eq!(early.index(), 0);
        assert!(TimelineCursor::new_at(Arc::new(Timeline::empty()), now()).is_err());
    }

    #[test]
    fn nearest_to_now_is_not_the_midpoint_when_skewed() {
        let mut c = TimelineCursor::new(hourly(10, now() - Duration::hours(2))).unwrap();
        c.nearest_to_now(now() + Duration::minutes(20));
        assert_eq!(c.index(), 2);
    }

    #[test]
    fn step_back_from_two_clamps_to_zero() {
        let mut c = cursor(97);
        c.jump_to(2);
        assert!(c.step_by(-10));
        assert_eq!(c.index(), 0);
        assert!(!c.step_by(-1));
    }

    #[rstest]
    #[case(0, 1_000_000_000, 96)]
    #[case(50, -1_000_000_000, 0)]
    #[case(50, i64::MAX, 96)]
    #[case(50, i64::MIN, 0)]
    #[case(10, 5, 15)]
    fn step_by_stays_in_range(#[case] start: i64, #[case] delta: i64, #[case] expected: usize) {
        let mut c = cursor(97);
        c.jump_to(start);
        c.step_by(delta);
        assert_eq!(c.index(), expected);
    }

    #[rstest]
    #[case(-1_000_000_000, 0)]
    #[case(i64::MIN, 0)]
    #[case(1_000_000_000, 96)]
    #[case(i64::MAX, 96)]
    #[case(40, 40)]
    fn jump_to_clamps(#[case] target: i64, #[case] expected: usize) {
        let mut c = cursor(97);
        c.jump_to(target);
        assert_eq!(c.index(), expected);
    }

    #[test]
    fn single_sample_timeline_never_moves() {
        let mut c = cursor(1);
        assert!(!c.step_by(5));
        assert!(!c.can_step(-1));
        assert_eq!(c.fraction(), 0.0);
    }

    #[test]
    fn can_step_reports_bounds() {
        let mut c = cursor(97);
        assert!(!c.can_step(-1));
        assert!(c.can_step(1));
        c.jump_to(96);
        assert!(!c.can_step(1));
    }

    #[test]
    fn quick_jumps_use_sample_spacing() {
        let mut c = cursor(97);
        c.nearest_to_now(now());
        c.quick_jump(QuickJump::Forward6h, now());
        assert_eq!(c.index(), 54);
        c.quick_jump(QuickJump::Back24h, now());
        assert_eq!(c.index(), 30);
        c.quick_jump(QuickJump::Now, now());
        assert_eq!(c.index(), 48);

        let mut coarse = cursor(97).with_hours_per_sample(3.0);
        coarse.jump_to(48);
        coarse.quick_jump(QuickJump::Back6h, now());
        assert_eq!(coarse.index(), 46);
    }

    #[test]
    fn fraction_round_trips_through_slider() {
        let mut c = cursor(97);
        assert!(c.jump_to_fraction(0.5));
        assert_eq!(c.index(), 48);
        assert_eq!(c.fraction(), 0.5);
        c.jump_to_fraction(7.0);
        assert_eq!(c.index(), 96);
        assert!(!c.jump_to_fraction(f64::NAN));
    }

    #[test]
    fn replace_timeline_clamps_index() {
        let mut c = cursor(97);
        c.jump_to(90);
        let changed = c
            .replace_timeline(hourly(10, now()))
            .unwrap();
        assert!(changed);
        assert_eq!(c.index(), 9);
        assert_eq!(
            c.replace_timeline(Arc::new(Timeline::empty())),
            Err(TimelineError::Empty)
        );
        assert_eq!(c.len(), 10);
    }
}
