//! Hold confirmation state machine
//!
//! Turns a flickering per-frame gesture stream into one edge-triggered
//! confirmation per sustained hold. The tracker is a small value owned
//! by its session; every frame is one call to [`HoldTracker::step`].

use std::time::{Duration, Instant};

use tracing::{debug, info};

use crate::gesture::Gesture;

/// Default time a gesture must be held before it is confirmed
pub const DEFAULT_HOLD_THRESHOLD: Duration = Duration::from_secs(2);

/// A gesture that has been held long enough
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Confirmation {
    pub gesture: Gesture,
    /// How long the gesture had been held at the confirming frame
    pub held: Duration,
}

/// Cross-frame memory of the gesture currently being held
///
/// An untracked tracker and one tracking "no gesture" behave identically,
/// so both are represented by `tracked == None`.
#[derive(Debug, Clone)]
pub struct HoldTracker {
    /// Label seen on the previous frame
    tracked: Option<Gesture>,
    /// Start of the current unconfirmed hold; cleared once confirmed
    hold_started_at: Option<Instant>,
    hold_threshold: Duration,
}

impl HoldTracker {
    /// Create a tracker in its initial state
    pub fn new(hold_threshold: Duration) -> Self {
        Self {
            tracked: None,
            hold_started_at: None,
            hold_threshold,
        }
    }

    pub fn hold_threshold(&self) -> Duration {
        self.hold_threshold
    }

    /// Gesture seen on the most recent frame
    #[cfg(test)]
    pub fn tracked(&self) -> Option<Gesture> {
        self.tracked
    }

    /// Whether the tracked gesture is still waiting to be confirmed
    #[cfg(test)]
    pub fn is_holding(&self) -> bool {
        self.hold_started_at.is_some()
    }

    /// Forget everything and return to the initial state
    pub fn reset(&mut self) {
        self.tracked = None;
        self.hold_started_at = None;
    }

    /// Feed one frame's gesture observed at `now`
    pub fn step(&mut self, gesture: Option<Gesture>, now: Instant) -> Option<Confirmation> {
        if gesture != self.tracked {
            debug!(from = ?self.tracked, to = ?gesture, "tracked gesture changed");
            self.tracked = gesture;
            self.hold_started_at = gesture.map(|_| now);
            return None;
        }

        let Some(gesture) = gesture else {
            self.hold_started_at = None;
            return None;
        };

        // Absent start means this hold already fired
        let started_at = self.hold_started_at?;

        // An earlier `now` (clock went backwards) never satisfies the hold
        let held = now.checked_duration_since(started_at)?;
        if held < self.hold_threshold {
            return None;
        }

        self.hold_started_at = None;
        info!(%gesture, held_ms = held.as_millis() as u64, "gesture confirmed");

        Some(Confirmation { gesture, held })
    }
}

impl Default for HoldTracker {
    fn default() -> Self {
        Self::new(DEFAULT_HOLD_THRESHOLD)
    }
}
