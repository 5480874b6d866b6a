use foundation::geo::LatLng;
use geocode::BoxFuture;
use serde_json::Value;
use thiserror::Error;
use timeline::TimelineError;
use timeline::normalize::{self, AirSeries, WeatherSeries};
use tracing::debug;

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("upstream request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("upstream returned status {0}")]
    Status(u16),
    #[error(transparent)]
    Schema(#[from] TimelineError),
}

/// Source of the hourly air-quality and weather series for a location.
pub trait DataProvider: Send + Sync {
    fn air(&self, at: LatLng) -> BoxFuture<'_, Result<AirSeries, ProviderError>>;
    fn weather(&self, at: LatLng) -> BoxFuture<'_, Result<WeatherSeries, ProviderError>>;
}

/// `GET {backend}/air` and `GET {backend}/weather`.
pub struct HttpProvider {
    backend_url: String,
    client: reqwest::Client,
}

impl HttpProvider {
    pub fn new(backend_url: impl Into<String>) -> Self {
        Self {
            backend_url: backend_url.into().trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
        }
    }

    pub fn backend_url(&self) -> &str {
        &self.backend_url
    }

    async fn get_json(&self, path: &str, at: LatLng) -> Result<Value, ProviderError> {
        let url = format!("{}/{path}", self.backend_url);
        debug!(%url, %at, "fetching upstream series");
        let resp = self
            .client
            .get(&url)
            .query(&[("lat", at.lat), ("lon", at.lng)])
            .send()
            .await?;
        if !resp.status().is_success() {
            return Err(ProviderError::Status(resp.status().as_u16()));
        }
        Ok(resp.json::<Value>().await?)
    }
}

impl DataProvider for HttpProvider {
    fn air(&self, at: LatLng) -> BoxFuture<'_, Result<AirSeries, ProviderError>> {
        Box::pin(async move {
            let body = self.get_json("air", at).await?;
            Ok(normalize::air_series(&body)?)
        })
    }

    fn weather(&self, at: LatLng) -> BoxFuture<'_, Result<WeatherSeries, ProviderError>> {
        Box::pin(async move {
            let body = self.get_json("weather", at).await?;
            Ok(normalize::weather_series(&body)?)
        })
    }
}
