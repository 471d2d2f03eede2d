//! Mapping finger states to presentation gestures

use serde::{Deserialize, Serialize};

use super::fingers::FingerStates;

/// A recognized control gesture
///
/// Frames that match no gesture (or show no hand) are represented as
/// `None` wherever an `Option<Gesture>` is used.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Gesture {
    /// Open palm, all five fingers extended
    StartSlideshow,
    /// Fist, no finger extended
    EndSlideshow,
    /// Index finger only ("one")
    NextSlide,
    /// Index and middle fingers ("two")
    PrevSlide,
}

impl Gesture {
    /// Look up the gesture for a finger-state vector
    pub fn from_fingers(fingers: &FingerStates) -> Option<Self> {
        match fingers.as_array() {
            [true, true, true, true, true] => Some(Self::StartSlideshow),
            [false, false, false, false, false] => Some(Self::EndSlideshow),
            [false, true, false, false, false] => Some(Self::NextSlide),
            [false, true, true, false, false] => Some(Self::PrevSlide),
            _ => None,
        }
    }
}

impl std::fmt::Display for Gesture {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Gesture::StartSlideshow => write!(f, "START_SLIDESHOW"),
            Gesture::EndSlideshow => write!(f, "END_SLIDESHOW"),
            Gesture::NextSlide => write!(f, "NEXT_SLIDE"),
            Gesture::PrevSlide => write!(f, "PREV_SLIDE"),
        }
    }
}
