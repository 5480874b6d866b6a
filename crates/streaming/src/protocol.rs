//! Wire format of the realtime update channel.
//!
//! Inbound frames are JSON objects `{ "type": ..., "data": ... }`; outbound
//! control frames are `{ "type": "subscribe-location", "location": {lat, lng} }`.

use std::fmt;
use std::str::FromStr;

use foundation::geo::LatLng;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use timeline::normalize;
use timeline::{NamedLocation, RawSeriesPoint, RawWeatherPoint};

/// Message pushed by the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "kebab-case")]
pub enum ChannelMessage {
    /// Latest air-quality reading for a subscribed location, in the same
    /// shape as one `/air` timeline point (plus `location`).
    AirQualityUpdate(Value),
    /// Latest weather reading, shaped like one `/weather` timeline point.
    WeatherUpdate(Value),
    Alert(AlertPayload),
}

impl ChannelMessage {
    pub fn topic(&self) -> Topic {
        match self {
            ChannelMessage::AirQualityUpdate(_) => Topic::AirQualityUpdate,
            ChannelMessage::WeatherUpdate(_) => Topic::WeatherUpdate,
            ChannelMessage::Alert(_) => Topic::Alert,
        }
    }

    /// Normalized air point of an `air-quality-update`.
    pub fn air_point(&self) -> Option<RawSeriesPoint> {
        match self {
            ChannelMessage::AirQualityUpdate(data) => normalize::air_point(data),
            _ => None,
        }
    }

    /// Location an update was produced for. Alerts carry only a display name
    /// and are not matched by location.
    pub fn update_location(&self) -> Option<NamedLocation> {
        match self {
            ChannelMessage::AirQualityUpdate(data) | ChannelMessage::WeatherUpdate(data) => {
                Some(normalize::point_location(data))
            }
            ChannelMessage::Alert(_) => None,
        }
    }

    /// Normalized weather point of a `weather-update`.
    pub fn weather_point(&self) -> Option<RawWeatherPoint> {
        match self {
            ChannelMessage::WeatherUpdate(data) => normalize::weather_point(data),
            _ => None,
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AlertSeverity {
    Low,
    Moderate,
    High,
    VeryHigh,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertPayload {
    pub severity: AlertSeverity,
    pub message: String,
    /// Human-readable place name.
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub timestamp: String,
}

/// Outbound control frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ControlMessage {
    SubscribeLocation { location: LatLng },
    UnsubscribeLocation { location: LatLng },
}

/// Subscription key: a message type, or every message.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Topic {
    AirQualityUpdate,
    WeatherUpdate,
    Alert,
    All,
}

impl Topic {
    pub fn as_str(self) -> &'static str {
        match self {
            Topic::AirQualityUpdate => "air-quality-update",
            Topic::WeatherUpdate => "weather-update",
            Topic::Alert => "alert",
            Topic::All => "*",
        }
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Topic {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "air-quality-update" => Ok(Topic::AirQualityUpdate),
            "weather-update" => Ok(Topic::WeatherUpdate),
            "alert" => Ok(Topic::Alert),
            "*" => Ok(Topic::All),
            other => Err(format!("unknown topic `{other}`")),
        }
    }
}

/// Decodes one inbound text frame.
pub fn decode(text: &str) -> Result<ChannelMessage, serde_json::Error> {
    serde_json::from_str(text)
}

pub fn encode(msg: &ControlMessage) -> Result<String, serde_json::Error> {
    serde_json::to_string(msg)
}
