//! Gesture module for per-frame hand classification
//!
//! Two pure stages:
//! - fingers: landmark set -> open/closed flag per finger
//! - mapper: finger flags -> one of four presentation gestures, if any

mod fingers;
mod mapper;

pub use fingers::FingerStates;
pub use mapper::Gesture;

#[cfg(test)]
pub(crate) use fingers::tests::hand_points;

use crate::landmarks::LandmarkSet;

/// Classify one frame; `None` when no hand is present or no gesture matches
pub fn recognize(hand: Option<&LandmarkSet>) -> Option<Gesture> {
    hand.and_then(|hand| Gesture::from_fingers(&FingerStates::classify(hand)))
}
