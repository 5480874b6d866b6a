use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

static EMAIL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern compiles"));

pub const DEFAULT_AQI_THRESHOLD: u32 = 100;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthProfile {
    #[default]
    General,
    Pregnant,
    Child,
    Elderly,
    Asthmatic,
}

impl HealthProfile {
    pub const ALL: [HealthProfile; 5] = [
        HealthProfile::General,
        HealthProfile::Pregnant,
        HealthProfile::Child,
        HealthProfile::Elderly,
        HealthProfile::Asthmatic,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            HealthProfile::General => "general",
            HealthProfile::Pregnant => "pregnant",
            HealthProfile::Child => "child",
            HealthProfile::Elderly => "elderly",
            HealthProfile::Asthmatic => "asthmatic",
        }
    }
}

impl fmt::Display for HealthProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for HealthProfile {
    type Err = SubscriptionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        Self::ALL
            .into_iter()
            .find(|p| p.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| SubscriptionError::UnknownProfile(s.to_string()))
    }
}

/// Request body for `POST {backend}/subscribe`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertSubscription {
    pub email: String,
    /// Place name as shown to the user.
    pub location: String,
    #[serde(default)]
    pub health_profile: HealthProfile,
    pub aqi_threshold: u32,
}

impl AlertSubscription {
    pub fn new(email: impl Into<String>, location: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            location: location.into(),
            health_profile: HealthProfile::General,
            aqi_threshold: DEFAULT_AQI_THRESHOLD,
        }
    }

    pub fn with_profile(mut self, profile: HealthProfile) -> Self {
        self.health_profile = profile;
        self
    }

    pub fn with_threshold(mut self, aqi: u32) -> Self {
        self.aqi_threshold = aqi;
        self
    }

    /// Presence of email and location, and a syntactically plausible email.
    /// Anything stricter is the backend's call.
    pub fn validate(&self) -> Result<(), SubscriptionError> {
        let email = self.email.trim();
        if email.is_empty() {
            return Err(SubscriptionError::Missing("email"));
        }
        if self.location.trim().is_empty() {
            return Err(SubscriptionError::Missing("location"));
        }
        if !EMAIL.is_match(email) {
            return Err(SubscriptionError::InvalidEmail(email.to_string()));
        }
        Ok(())
    }
}

#[derive(Debug, Error)]
pub enum SubscriptionError {
    #[error("missing required field `{0}`")]
    Missing(&'static str),
    #[error("invalid email address: {0}")]
    InvalidEmail(String),
    #[error("unknown health profile: {0}")]
    UnknownProfile(String),
    #[error("subscription request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("subscription rejected with status {0}")]
    Rejected(u16),
}

pub struct SubscriptionClient {
    endpoint: String,
    client: reqwest::Client,
}

impl SubscriptionClient {
    pub fn new(backend_url: &str) -> Self {
        Self {
            endpoint: format!("{}/subscribe", backend_url.trim_end_matches('/')),
            client: reqwest::Client::new(),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Validates locally, then posts. Invalid requests never leave the process.
    pub async fn subscribe(&self, sub: &AlertSubscription) -> Result<(), SubscriptionError> {
        sub.validate()?;
        debug!(endpoint = %self.endpoint, profile = %sub.health_profile, "posting alert subscription");
        let resp = self.client.post(&self.endpoint).json(sub).send().await?;
        if !resp.status().is_success() {
            return Err(SubscriptionError::Rejected(resp.status().as_u16()));
        }
        info!(location = %sub.location, threshold = sub.aqi_threshold, "alert subscription accepted");
        Ok(())
    }
}
