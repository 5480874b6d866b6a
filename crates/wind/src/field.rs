use timeline::WeatherReading;

/// Uniform wind over the whole viewport.
#[derive(Debug, Copy, Clone, PartialEq, Default)]
pub struct WindVector {
    /// km/h
    pub speed: f64,
    /// Degrees; 0 points along +x, increasing clockwise on screen (y down).
    pub direction_deg: f64,
}

impl WindVector {
    pub const CALM: WindVector = WindVector {
        speed: 0.0,
        direction_deg: 0.0,
    };

    pub fn new(speed: f64, direction_deg: f64) -> Self {
        Self {
            speed: if speed.is_finite() { speed.max(0.0) } else { 0.0 },
            direction_deg: if direction_deg.is_finite() {
                direction_deg
            } else {
                0.0
            },
        }
    }

    /// Per-tick pixel displacement for a given speed divisor.
    pub fn velocity(&self, scale: f64) -> (f64, f64) {
        let magnitude = if scale > 0.0 { self.speed / scale } else { 0.0 };
        let angle = self.direction_deg.to_radians();
        (angle.cos() * magnitude, angle.sin() * magnitude)
    }
}

impl From<&WeatherReading> for WindVector {
    fn from(w: &WeatherReading) -> Self {
        WindVector::new(w.wind_speed, w.wind_direction)
    }
}
