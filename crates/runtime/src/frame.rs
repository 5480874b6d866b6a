use std::time::Duration;

/// Deterministic frame metadata.
///
/// Animation state advances in whole frames; the wall clock only decides
/// *when* a frame runs, never what it computes.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Frame {
    /// 0-based frame index.
    pub index: u64,
    /// Fixed delta time (seconds).
    pub dt_s: f64,
}

impl Frame {
    pub fn new(index: u64, dt_s: f64) -> Self {
        Self { index, dt_s }
    }

    pub fn next(self) -> Self {
        Self::new(self.index + 1, self.dt_s)
    }
}

/// Hands out consecutive frames at a fixed rate.
#[derive(Debug, Clone)]
pub struct FrameClock {
    rate_hz: f64,
    next: Frame,
}

impl FrameClock {
    /// Non-finite or non-positive rates fall back to 60 Hz.
    pub fn new(rate_hz: f64) -> Self {
        let rate_hz = if rate_hz.is_finite() && rate_hz > 0.0 {
            rate_hz
        } else {
            60.0
        };
        Self {
            rate_hz,
            next: Frame::new(0, 1.0 / rate_hz),
        }
    }

    pub fn rate_hz(&self) -> f64 {
        self.rate_hz
    }

    pub fn interval(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.rate_hz)
    }

    /// Returns the current frame and advances.
    pub fn tick(&mut self) -> Frame {
        let f = self.next;
        self.next = f.next();
        f
    }
}
