//! Air-quality + weather timeline: ingestion, merging and navigation.
//!
//! Upstream payloads enter through [`normalize`], are paired by
//! [`SeriesMerger`] into an immutable [`Timeline`] snapshot, and are navigated
//! with a [`TimelineCursor`].

pub mod aqi;
pub mod cursor;
pub mod error;
pub mod labels;
pub mod merge;
pub mod model;
pub mod normalize;

pub use cursor::*;
pub use error::*;
pub use merge::*;
pub use model::*;
