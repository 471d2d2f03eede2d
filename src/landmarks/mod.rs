//! Landmark module for hand observations
//!
//! Defines the 21-point hand landmark layout and a replay source that
//! feeds recorded observations into the gesture pipeline.

mod points;
mod source;

pub use points::{index, Landmark, LandmarkSet};

#[cfg(test)]
pub use points::LANDMARK_COUNT;
pub use source::{Observation, ReplayInput, ReplaySource};
