//! Health advice for an AQI value and a health profile.

use std::fmt;

use crate::subscription::HealthProfile;

#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Good,
    Info,
    Warning,
    Danger,
}

impl Severity {
    pub fn label(&self) -> &'static str {
        match self {
            Severity::Good => "ok",
            Severity::Info => "info",
            Severity::Warning => "warning",
            Severity::Danger => "danger",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Recommendation {
    pub severity: Severity,
    pub title: &'static str,
    pub message: &'static str,
}

impl fmt::Display for Recommendation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.severity.label(), self.title, self.message)
    }
}

const fn rec(severity: Severity, title: &'static str, message: &'static str) -> Recommendation {
    Recommendation {
        severity,
        title,
        message,
    }
}

/// Advice for `aqi` in the band order used by the category table: general
/// guidance first, profile-specific items after it.
pub fn recommendations(aqi: u32, profile: HealthProfile) -> Vec<Recommendation> {
    use HealthProfile::*;

    let mut out = Vec::new();
    match aqi {
        0..=50 => out.push(rec(
            Severity::Good,
            "Excellent air quality",
            "A good day for outdoor activities.",
        )),
        51..=100 => {
            out.push(rec(
                Severity::Info,
                "Moderate air quality",
                "Acceptable for most people.",
            ));
            if matches!(profile, Asthmatic | Child) {
                out.push(rec(
                    Severity::Warning,
                    "Sensitive groups: take precautions",
                    "Cut back on long outdoor exertion if symptoms appear.",
                ));
            }
        }
        101..=150 => {
            out.push(rec(
                Severity::Warning,
                "Unhealthy for sensitive groups",
                "The general public is less likely to be affected.",
            ));
            let specific = match profile {
                General => None,
                Pregnant => Some(rec(
                    Severity::Warning,
                    "Pregnancy: limit time outdoors",
                    "Fine particles can affect fetal development; stay inside when you can.",
                )),
                Child => Some(rec(
                    Severity::Warning,
                    "Children: reduce outdoor play",
                    "Children are more exposed to pollution; keep outdoor activity short.",
                )),
                Elderly => Some(rec(
                    Severity::Warning,
                    "Older adults: take it easy",
                    "Skip strenuous outdoor activity and watch for breathing problems.",
                )),
                Asthmatic => Some(rec(
                    Severity::Warning,
                    "Asthma: high alert",
                    "Keep a rescue inhaler close, avoid outdoor exercise and monitor symptoms.",
                )),
            };
            out.extend(specific);
        }
        _ => {
            out.push(rec(
                Severity::Danger,
                "Unhealthy air quality",
                "Everyone may begin to feel health effects.",
            ));
            out.push(rec(
                Severity::Danger,
                "Stay indoors",
                "Keep windows closed, run an air purifier if you have one and avoid outdoor activity.",
            ));
            if profile != General {
                out.push(rec(
                    Severity::Danger,
                    "High risk: seek medical advice",
                    "Call your healthcare provider if symptoms appear and stay in filtered air.",
                ));
            }
        }
    }
    out
}
