//! Per-location dashboard state.
//!
//! A [`DashboardSession`] owns the current timeline snapshot and its cursor,
//! and keeps an attached wind animator in step with the selected sample.

use std::collections::VecDeque;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use foundation::geo::LatLng;
use streaming::{AlertPayload, ChannelMessage, ControlMessage};
use timeline::normalize::{self, WeatherSeries};
use timeline::{QuickJump, SeriesMerger, Timeline, TimelineCursor, TimelineSample};
use tracing::{debug, info, warn};
use wind::WindVector;
use wind::animation::SharedAnimator;

use crate::provider::DataProvider;
use crate::readout::{NO_DATA, Readout};

const RECENT_ALERTS: usize = 20;

/// Degrees within which a pushed update counts as being for the loaded location.
const SAME_PLACE_DEG: f64 = 0.01;

#[derive(Debug, Clone, PartialEq)]
pub enum SessionStatus {
    /// Nothing loaded yet, or the upstream returned no samples.
    NoData,
    Ready,
    /// Showing data, but part of the last refresh failed.
    Degraded(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    Loaded { samples: usize },
    /// Upstream answered with an empty series.
    NoData,
    /// The air-quality fetch failed; the previous timeline is still shown.
    KeptPrevious,
}

pub struct DashboardSession {
    provider: Arc<dyn DataProvider>,
    hours_per_sample: f64,
    location: Option<LatLng>,
    location_name: String,
    timeline: Arc<Timeline>,
    cursor: Option<TimelineCursor>,
    animator: Option<SharedAnimator>,
    status: SessionStatus,
    alerts: VecDeque<AlertPayload>,
}

impl DashboardSession {
    pub fn new(provider: Arc<dyn DataProvider>, hours_per_sample: f64) -> Self {
        Self {
            provider,
            hours_per_sample,
            location: None,
            location_name: normalize::DEFAULT_LOCATION_NAME.to_string(),
            timeline: Arc::new(Timeline::empty()),
            cursor: None,
            animator: None,
            status: SessionStatus::NoData,
            alerts: VecDeque::new(),
        }
    }

    pub fn location(&self) -> Option<LatLng> {
        self.location
    }

    pub fn location_name(&self) -> &str {
        &self.location_name
    }

    pub fn timeline(&self) -> &Arc<Timeline> {
        &self.timeline
    }

    pub fn cursor(&self) -> Option<&TimelineCursor> {
        self.cursor.as_ref()
    }

    pub fn status(&self) -> &SessionStatus {
        &self.status
    }

    pub fn recent_alerts(&self) -> impl Iterator<Item = &AlertPayload> {
        self.alerts.iter()
    }

    /// Lets the session re-seed `animator` whenever the selected sample changes.
    pub fn attach_animator(&mut self, animator: SharedAnimator) {
        self.animator = Some(animator);
        self.reseed_animator();
    }

    /// Fetches both series for `at` and installs a fresh timeline positioned
    /// at the sample closest to `now`.
    pub async fn load(&mut self, at: LatLng, now: DateTime<Utc>) -> LoadOutcome {
        let (air, weather) = tokio::join!(self.provider.air(at), self.provider.weather(at));

        let air = match air {
            Ok(air) => air,
            Err(e) => {
                warn!(%at, "air-quality fetch failed, keeping previous timeline: {e}");
                self.status = match self.cursor {
                    Some(_) => SessionStatus::Degraded(e.to_string()),
                    None => SessionStatus::NoData,
                };
                return LoadOutcome::KeptPrevious;
            }
        };
        let (weather, weather_error) = match weather {
            Ok(w) => (w, None),
            Err(e) => {
                warn!(%at, "weather fetch failed, continuing without weather: {e}");
                (WeatherSeries::default(), Some(e.to_string()))
            }
        };

        self.location = Some(at);
        self.location_name = normalize::location_name(&air.location, &weather.location);
        let timeline = Arc::new(SeriesMerger::merge(&air.points, &weather.points));
        info!(
            location = %self.location_name,
            samples = timeline.len(),
            "timeline loaded"
        );

        let outcome = self.install(timeline, now);
        if let (LoadOutcome::Loaded { .. }, Some(e)) = (outcome, weather_error) {
            self.status = SessionStatus::Degraded(format!("weather unavailable: {e}"));
        }
        outcome
    }

    fn install(&mut self, timeline: Arc<Timeline>, now: DateTime<Utc>) -> LoadOutcome {
        self.timeline = timeline.clone();
        let cursor = match TimelineCursor::new_at(timeline, now) {
            Ok(cursor) => cursor.with_hours_per_sample(self.hours_per_sample),
            Err(e) => {
                debug!("no samples to navigate: {e}");
                self.cursor = None;
                self.status = SessionStatus::NoData;
                return LoadOutcome::NoData;
            }
        };
        let samples = cursor.len();
        self.cursor = Some(cursor);
        self.status = SessionStatus::Ready;
        self.reseed_animator();
        LoadOutcome::Loaded { samples }
    }

    fn reseed_animator(&self) {
        let (Some(animator), Some(cursor)) = (&self.animator, &self.cursor) else {
            return;
        };
        let wind = WindVector::from(&cursor.current().weather);
        animator.lock().reseed(wind);
    }

    fn moved(&self, changed: bool) -> bool {
        if changed {
            self.reseed_animator();
        }
        changed
    }

    pub fn step_by(&mut self, delta: i64) -> bool {
        let changed = self.cursor.as_mut().is_some_and(|c| c.step_by(delta));
        self.moved(changed)
    }

    pub fn jump_to(&mut self, index: i64) -> bool {
        let changed = self.cursor.as_mut().is_some_and(|c| c.jump_to(index));
        self.moved(changed)
    }

    pub fn jump_to_fraction(&mut self, fraction: f64) -> bool {
        let changed = self
            .cursor
            .as_mut()
            .is_some_and(|c| c.jump_to_fraction(fraction));
        self.moved(changed)
    }

    pub fn quick_jump(&mut self, jump: QuickJump, now: DateTime<Utc>) -> bool {
        let changed = self
            .cursor
            .as_mut()
            .is_some_and(|c| c.quick_jump(jump, now));
        self.moved(changed)
    }

    /// Folds a pushed update into the sample closest to `now`. Returns true
    /// when the timeline changed.
    pub fn apply_update(&mut self, msg: &ChannelMessage, now: DateTime<Utc>) -> bool {
        if let ChannelMessage::Alert(alert) = msg {
            info!(severity = ?alert.severity, location = %alert.location, "alert: {}", alert.message);
            if self.alerts.len() == RECENT_ALERTS {
                self.alerts.pop_front();
            }
            self.alerts.push_back(alert.clone());
            return false;
        }
        let Some(index) = self.timeline.nearest_index(now) else {
            debug!("update ignored, no timeline loaded");
            return false;
        };
        if !self.is_for_this_location(msg) {
            debug!(topic = %msg.topic(), "update for another location ignored");
            return false;
        }

        let patched = match msg {
            ChannelMessage::AirQualityUpdate(_) => {
                let Some(point) = msg.air_point() else {
                    warn!("air-quality update without a readable timestamp, ignored");
                    return false;
                };
                self.timeline.with_sample(index, |s| TimelineSample {
                    air_quality: point.reading,
                    ..s.clone()
                })
            }
            ChannelMessage::WeatherUpdate(_) => {
                let Some(point) = msg.weather_point() else {
                    warn!("weather update without a readable timestamp, ignored");
                    return false;
                };
                self.timeline.with_sample(index, |s| TimelineSample {
                    weather: point.reading,
                    ..s.clone()
                })
            }
            ChannelMessage::Alert(_) => return false,
        };

        let timeline = match patched {
            Ok(t) => Arc::new(t),
            Err(e) => {
                warn!("could not apply live update: {e}");
                return false;
            }
        };
        let reseed = match self.cursor.as_mut().map(|c| (c.replace_timeline(timeline.clone()), c.index())) {
            Some((Ok(moved), at)) => moved || at == index,
            Some((Err(e), _)) => {
                warn!("live update not applied, cursor kept its timeline: {e}");
                return false;
            }
            None => false,
        };
        self.timeline = timeline;
        if reseed {
            self.reseed_animator();
        }
        debug!(index, "live update applied");
        true
    }

    /// Coordinates decide when both sides have them; otherwise the place
    /// name does. Updates naming no place at all are accepted.
    fn is_for_this_location(&self, msg: &ChannelMessage) -> bool {
        let Some(target) = msg.update_location() else {
            return true;
        };
        match (target.coord, self.location) {
            (Some(theirs), Some(ours)) => {
                (theirs.lat - ours.lat).abs() <= SAME_PLACE_DEG
                    && (theirs.lng - ours.lng).abs() <= SAME_PLACE_DEG
            }
            _ => match target.name.as_deref().map(str::trim) {
                Some(name) if !name.is_empty() => name.eq_ignore_ascii_case(&self.location_name),
                _ => true,
            },
        }
    }

    pub fn readout(&self, now: DateTime<Utc>) -> Option<Readout> {
        self.cursor
            .as_ref()
            .map(|c| Readout::from_cursor(c, &self.location_name, now))
    }

    /// One-line summary of the selected sample, or the neutral placeholder.
    pub fn summary(&self, now: DateTime<Utc>) -> String {
        match self.readout(now) {
            Some(r) => r.to_string(),
            None => format!("{}: {NO_DATA}", self.location_name),
        }
    }

    pub fn subscribe_message(&self) -> Option<ControlMessage> {
        self.location
            .map(|location| ControlMessage::SubscribeLocation { location })
    }

    pub fn unsubscribe_message(&self) -> Option<ControlMessage> {
        self.location
            .map(|location| ControlMessage::UnsubscribeLocation { location })
    }
}
