//! Hand landmark definitions
//!
//! A hand is described by 21 normalized points in the usual hand-pose
//! layout: wrist first, then four points per finger from base to tip.

use serde::{Deserialize, Serialize};

/// Number of points in one hand observation
pub const LANDMARK_COUNT: usize = 21;

/// Positional indices of the points used for finger classification
pub mod index {
    pub const THUMB_IP: usize = 3;
    pub const THUMB_TIP: usize = 4;
    pub const INDEX_PIP: usize = 6;
    pub const INDEX_TIP: usize = 8;
    pub const MIDDLE_PIP: usize = 10;
    pub const MIDDLE_TIP: usize = 12;
    pub const RING_PIP: usize = 14;
    pub const RING_TIP: usize = 16;
    pub const PINKY_PIP: usize = 18;
    pub const PINKY_TIP: usize = 20;
}

/// A single normalized hand point
///
/// `x` and `y` are relative to the frame width and height, with `y`
/// growing downwards. `z` is optional depth and unused by the classifier.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Landmark {
    pub x: f32,
    pub y: f32,
    #[serde(default)]
    pub z: f32,
}

impl Landmark {
    #[cfg(test)]
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y, z: 0.0 }
    }

    fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }
}

/// Errors raised when validating a raw observation
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum LandmarkError {
    #[error("expected {expected} landmarks, got {0}", expected = LANDMARK_COUNT)]
    WrongArity(usize),

    #[error("landmark {0} has a non-finite coordinate")]
    NonFinite(usize),
}

/// Exactly 21 landmarks belonging to one detected hand
#[derive(Debug, Clone, PartialEq)]
pub struct LandmarkSet {
    points: [Landmark; LANDMARK_COUNT],
}

impl LandmarkSet {
    /// Validate a raw list of points
    pub fn from_points(points: &[Landmark]) -> Result<Self, LandmarkError> {
        let points: [Landmark; LANDMARK_COUNT] = points
            .try_into()
            .map_err(|_| LandmarkError::WrongArity(points.len()))?;

        if let Some(bad) = points.iter().position(|p| !p.is_finite()) {
            return Err(LandmarkError::NonFinite(bad));
        }

        Ok(Self { points })
    }

    /// Point at a positional index (see [`index`])
    pub fn get(&self, idx: usize) -> &Landmark {
        &self.points[idx]
    }

    #[cfg(test)]
    pub fn points(&self) -> &[Landmark] {
        &self.points
    }

    /// The same hand as seen in a horizontally flipped frame
    pub fn mirrored(&self) -> Self {
        let mut points = self.points;
        for p in points.iter_mut() {
            p.x = 1.0 - p.x;
        }
        Self { points }
    }
}
