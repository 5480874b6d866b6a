//! Free-text location search: debounced input, a geocoder abstraction and an
//! OpenStreetMap Nominatim client.

pub mod debounce;
pub mod nominatim;
pub mod place;
pub mod resolver;

pub use debounce::*;
pub use nominatim::NominatimClient;
pub use place::*;
pub use resolver::*;
