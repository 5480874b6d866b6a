use std::future::Future;
use std::pin::Pin;

use foundation::geo::LatLng;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// One search hit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Place {
    pub display_name: String,
    pub coord: LatLng,
    /// Provider feature type ("city", "road", ...).
    pub kind: String,
}

#[derive(Debug, Error)]
pub enum GeocodeError {
    #[error("geocoder request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("geocoder returned status {0}")]
    Status(u16),
    #[error("unreadable geocoder response: {0}")]
    Decode(String),
    #[error("query `{0}` is too short")]
    QueryTooShort(String),
}

/// Turns a free-text query into ranked places, best match first.
pub trait Geocoder: Send + Sync {
    fn search<'a>(&'a self, query: &'a str) -> BoxFuture<'a, Result<Vec<Place>, GeocodeError>>;
}
