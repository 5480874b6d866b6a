pub mod bounds;
pub mod geo;

// Foundation crate: small, well-tested primitives only.
pub use bounds::*;
pub use geo::*;
