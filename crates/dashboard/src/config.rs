use std::env;
use std::time::Duration;

use geocode::DebounceConfig;
use streaming::ChannelConfig;
use wind::AnimatorConfig;

pub const DEFAULT_BACKEND_URL: &str = "http://localhost:8000";

/// Runtime settings, read from `AIRWATCH_*` environment variables.
#[derive(Debug, Clone, PartialEq)]
pub struct DashboardConfig {
    pub backend_url: String,
    pub ws_url: String,
    pub geocoder_url: String,
    pub reconnect_base: Duration,
    pub max_reconnect_attempts: u32,
    pub particles: usize,
    pub frame_hz: f64,
    pub hours_per_sample: f64,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self::from_lookup(|_| None)
    }
}

impl DashboardConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the config from an arbitrary key lookup; unset or unparsable
    /// values fall back to their defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let backend_url = lookup("AIRWATCH_BACKEND_URL")
            .map(|v| v.trim_end_matches('/').to_string())
            .unwrap_or_else(|| DEFAULT_BACKEND_URL.to_string());
        let ws_url = lookup("AIRWATCH_WS_URL").unwrap_or_else(|| ws_url_for(&backend_url));
        let geocoder_url = lookup("AIRWATCH_GEOCODER_URL")
            .unwrap_or_else(|| geocode::nominatim::DEFAULT_URL.to_string());

        Self {
            backend_url,
            ws_url,
            geocoder_url,
            reconnect_base: Duration::from_millis(lookup_u64(&lookup, "AIRWATCH_RECONNECT_BASE_MS", 1000)),
            max_reconnect_attempts: lookup_u32(&lookup, "AIRWATCH_RECONNECT_MAX_ATTEMPTS", 5),
            particles: lookup_usize(&lookup, "AIRWATCH_PARTICLES", 300),
            frame_hz: lookup_f64(&lookup, "AIRWATCH_FRAME_HZ", 60.0),
            hours_per_sample: lookup_f64(&lookup, "AIRWATCH_HOURS_PER_SAMPLE", 1.0),
        }
    }

    pub fn channel_config(&self) -> ChannelConfig {
        ChannelConfig {
            url: self.ws_url.clone(),
            reconnect_base: self.reconnect_base,
            max_reconnect_attempts: self.max_reconnect_attempts,
        }
    }

    pub fn animator_config(&self) -> AnimatorConfig {
        AnimatorConfig {
            particles: self.particles,
            ..AnimatorConfig::default()
        }
    }

    pub fn debounce_config(&self) -> DebounceConfig {
        DebounceConfig::default()
    }
}

/// `http://host:8000` → `ws://host:8000/ws` (and `https` → `wss`).
pub fn ws_url_for(backend_url: &str) -> String {
    let base = backend_url.trim_end_matches('/');
    let ws = match base.strip_prefix("http") {
        Some(rest) => format!("ws{rest}"),
        None => base.to_string(),
    };
    format!("{ws}/ws")
}

fn lookup_u32(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: u32) -> u32 {
    lookup(key)
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

fn lookup_u64(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: u64) -> u64 {
    lookup(key)
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

fn lookup_usize(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: usize) -> usize {
    lookup(key)
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

fn lookup_f64(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: f64) -> f64 {
    lookup(key)
        .and_then(|v| v.trim().parse().ok())
        .filter(|v: &f64| v.is_finite() && *v > 0.0)
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;

    fn config(pairs: &[(&str, &str)]) -> DashboardConfig {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        DashboardConfig::from_lookup(|k| map.get(k).cloned())
    }

    #[test]
    fn defaults() {
        let c = DashboardConfig::default();
        assert_eq!(c.backend_url, "http://localhost:8000");
        assert_eq!(c.ws_url, "ws://localhost:8000/ws");
        assert_eq!(c.reconnect_base, Duration::from_millis(1000));
        assert_eq!(c.max_reconnect_attempts, 5);
        assert_eq!(c.particles, 300);
        assert_eq!(c.frame_hz, 60.0);
        assert_eq!(c.hours_per_sample, 1.0);
    }

    #[test]
    fn overrides_and_bad_values() {
        let c = config(&[
            ("AIRWATCH_BACKEND_URL", "https://api.example.org/"),
            ("AIRWATCH_RECONNECT_MAX_ATTEMPTS", "3"),
            ("AIRWATCH_PARTICLES", "lots"),
            ("AIRWATCH_FRAME_HZ", "-5"),
        ]);
        assert_eq!(c.backend_url, "https://api.example.org");
        assert_eq!(c.ws_url, "wss://api.example.org/ws");
        assert_eq!(c.max_reconnect_attempts, 3);
        assert_eq!(c.particles, 300);
        assert_eq!(c.frame_hz, 60.0);
        assert_eq!(c.channel_config().max_reconnect_attempts, 3);
    }

    #[test]
    fn explicit_ws_url_wins() {
        let c = config(&[("AIRWATCH_WS_URL", "ws://push.local/live")]);
        assert_eq!(c.ws_url, "ws://push.local/live");
    }
}
