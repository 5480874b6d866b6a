use serde::{Deserialize, Serialize};

/// WGS84 coordinate in degrees.
///
/// The wire name for longitude is `lng`, matching the location payloads the
/// dashboard exchanges with its backend and push channel.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

impl LatLng {
    pub const fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// Returns `None` unless `lat ∈ [-90, 90]` and `lng ∈ [-180, 180]`.
    pub fn checked(lat: f64, lng: f64) -> Option<Self> {
        let c = Self::new(lat, lng);
        c.is_valid().then_some(c)
    }

    pub fn is_valid(&self) -> bool {
        (-90.0..=90.0).contains(&self.lat) && (-180.0..=180.0).contains(&self.lng)
    }
}

impl std::fmt::Display for LatLng {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.4}, {:.4}", self.lat, self.lng)
    }
}
