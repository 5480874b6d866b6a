//! Wind particle overlay: a fixed pool of particles advected by the wind of
//! the selected timeline sample.

pub mod animation;
pub mod animator;
pub mod field;
pub mod particle;
pub mod render;

pub use animation::WindAnimation;
pub use animator::*;
pub use field::*;
pub use particle::*;
pub use render::*;
