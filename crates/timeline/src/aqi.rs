use crate::model::AqiCategory;

/// EPA PM2.5 breakpoints: (concentration low, high, AQI low, high).
const PM25_BREAKPOINTS: [(f64, f64, u32, u32); 6] = [
    (0.0, 12.0, 0, 50),
    (12.1, 35.4, 51, 100),
    (35.5, 55.4, 101, 150),
    (55.5, 150.4, 151, 200),
    (150.5, 250.4, 201, 300),
    (250.5, 500.4, 301, 500),
];

/// AQI for a 24h PM2.5 concentration in µg/m³.
///
/// Values falling in the 0.1-wide gaps between bands are assigned to the upper
/// band; anything above the table saturates at 500.
pub fn aqi_from_pm25(pm25: f64) -> u32 {
    if !pm25.is_finite() || pm25 <= 0.0 {
        return 0;
    }
    for (c_lo, c_hi, i_lo, i_hi) in PM25_BREAKPOINTS {
        if pm25 <= c_hi {
            let c = pm25.max(c_lo);
            let slope = f64::from(i_hi - i_lo) / (c_hi - c_lo);
            return (slope * (c - c_lo) + f64::from(i_lo)).round() as u32;
        }
    }
    500
}

impl AqiCategory {
    pub fn from_aqi(aqi: u32) -> Self {
        match aqi {
            0..=50 => Self::Good,
            51..=100 => Self::Moderate,
            101..=150 => Self::UnhealthySensitive,
            151..=200 => Self::Unhealthy,
            201..=300 => Self::VeryUnhealthy,
            _ => Self::Hazardous,
        }
    }

    /// Accepts display names ("Unhealthy for Sensitive Groups"), variant
    /// names and kebab/snake spellings, ignoring case.
    pub fn from_label(label: &str) -> Self {
        let key: String = label
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .map(|c| c.to_ascii_lowercase())
            .collect();
        match key.as_str() {
            "good" => Self::Good,
            "moderate" => Self::Moderate,
            "unhealthyforsensitivegroups" | "unhealthysensitive" | "usg" => {
                Self::UnhealthySensitive
            }
            "unhealthy" => Self::Unhealthy,
            "veryunhealthy" => Self::VeryUnhealthy,
            "hazardous" => Self::Hazardous,
            _ => Self::Unknown,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Good => "Good",
            Self::Moderate => "Moderate",
            Self::UnhealthySensitive => "Unhealthy for Sensitive Groups",
            Self::Unhealthy => "Unhealthy",
            Self::VeryUnhealthy => "Very Unhealthy",
            Self::Hazardous => "Hazardous",
            Self::Unknown => "no data",
        }
    }

    /// Marker colour used on the map overlay.
    pub fn color_hex(self) -> &'static str {
        match self {
            Self::Good => "#10b981",
            Self::Moderate => "#eab308",
            Self::UnhealthySensitive => "#f97316",
            Self::Unhealthy => "#ef4444",
            Self::VeryUnhealthy => "#a855f7",
            Self::Hazardous => "#7f1d1d",
            Self::Unknown => "#6b7280",
        }
    }
}
