//! Pure Rust runtime for 2D skeletal animation rigs.
//!
//! This crate is renderer-agnostic: it computes bone world transforms,
//! applies IK/transform/path constraints in a deterministic order, and
//! exposes slot/attachment state for a renderer to consume. Animation
//! playback lives outside the crate and drives the pose by writing the
//! local fields of bones, slots, and constraints between frames.

#![forbid(unsafe_code)]

mod error;
mod math;
mod model;
mod runtime;

#[cfg(feature = "json")]
pub mod json;

pub use error::*;
pub use model::*;
pub use runtime::*;
