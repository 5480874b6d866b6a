use foundation::geo::LatLng;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::place::{BoxFuture, GeocodeError, Geocoder, Place};

pub const DEFAULT_URL: &str = "https://nominatim.openstreetmap.org";

/// Raw Nominatim `format=json` entry; coordinates arrive as strings.
#[derive(Debug, Deserialize)]
struct NominatimHit {
    display_name: String,
    lat: String,
    lon: String,
    #[serde(rename = "type", default)]
    kind: String,
}

impl NominatimHit {
    fn into_place(self) -> Option<Place> {
        let lat = self.lat.trim().parse().ok()?;
        let lng = self.lon.trim().parse().ok()?;
        Some(Place {
            display_name: self.display_name,
            coord: LatLng::checked(lat, lng)?,
            kind: self.kind,
        })
    }
}

/// Parses a Nominatim search response, skipping hits with unusable
/// coordinates. Order is preserved (Nominatim ranks by relevance).
pub fn parse_response(body: &str) -> Result<Vec<Place>, GeocodeError> {
    let hits: Vec<NominatimHit> =
        serde_json::from_str(body).map_err(|e| GeocodeError::Decode(e.to_string()))?;
    let total = hits.len();
    let places: Vec<Place> = hits.into_iter().filter_map(NominatimHit::into_place).collect();
    if places.len() < total {
        warn!(skipped = total - places.len(), "dropped geocoder hits without valid coordinates");
    }
    Ok(places)
}

pub struct NominatimClient {
    base_url: String,
    limit: usize,
    language: String,
    client: reqwest::Client,
}

impl NominatimClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self, GeocodeError> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("airwatch/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            limit: 10,
            language: "en".to_string(),
            client,
        })
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit.max(1);
        self
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = language.into();
        self
    }

    fn search_url(&self) -> String {
        format!("{}/search", self.base_url)
    }
}

impl Geocoder for NominatimClient {
    fn search<'a>(&'a self, query: &'a str) -> BoxFuture<'a, Result<Vec<Place>, GeocodeError>> {
        Box::pin(async move {
            let limit = self.limit.to_string();
            debug!(query, "geocoding");
            let resp = self
                .client
                .get(self.search_url())
                .query(&[
                    ("q", query),
                    ("format", "json"),
                    ("addressdetails", "1"),
                    ("limit", limit.as_str()),
                ])
                .header(reqwest::header::ACCEPT_LANGUAGE, self.language.as_str())
                .send()
                .await?;

            if !resp.status().is_success() {
                return Err(GeocodeError::Status(resp.status().as_u16()));
            }
            let body = resp.text().await?;
            parse_response(&body)
        })
    }
}
