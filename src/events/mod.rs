//! Events module for gesture pipeline notifications
//!
//! Provides structured event types for hand visibility, confirmed
//! gestures, dispatch failures and pause/resume of detection.

use serde::{Deserialize, Serialize};

use crate::gesture::Gesture;

/// Events emitted by the detection session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GestureEvent {
    /// A hand became visible after frames without one
    HandAcquired,

    /// The hand left the frame
    HandLost,

    /// A gesture was held long enough to be acted on
    GestureConfirmed {
        gesture: Gesture,
        /// How long the gesture was held, in milliseconds
        held_ms: u64,
    },

    /// The presentation action for a confirmed gesture failed
    DispatchFailed { gesture: Gesture, reason: String },

    /// Detection was paused, frames are being discarded
    DetectionPaused,

    /// Detection resumed from a clean state
    DetectionResumed,
}

impl std::fmt::Display for GestureEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GestureEvent::HandAcquired => write!(f, "HAND_ACQUIRED"),
            GestureEvent::HandLost => write!(f, "HAND_LOST"),
            GestureEvent::GestureConfirmed { gesture, held_ms } => {
                write!(f, "GESTURE_CONFIRMED {} ({}ms)", gesture, held_ms)
            }
            GestureEvent::DispatchFailed { gesture, reason } => {
                write!(f, "DISPATCH_FAILED {}: {}", gesture, reason)
            }
            GestureEvent::DetectionPaused => write!(f, "DETECTION_PAUSED"),
            GestureEvent::DetectionResumed => write!(f, "DETECTION_RESUMED"),
        }
    }
}
