//! Finger open/closed classification
//!
//! Derives which fingers are extended from a single landmark set. The
//! classifier is memoryless: every frame is judged on its own.

use serde::{Deserialize, Serialize};

use crate::landmarks::{index, LandmarkSet};

/// Which fingers are open, in thumb-to-pinky order
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FingerStates {
    pub thumb: bool,
    pub index: bool,
    pub middle: bool,
    pub ring: bool,
    pub pinky: bool,
}

impl FingerStates {
    /// Classify one hand
    ///
    /// The thumb counts as open when its tip lies left of the IP joint.
    /// This ignores handedness, so a hand shown the other way round reads
    /// the thumb inverted. The other fingers are open when the tip sits
    /// above (smaller y) its PIP joint, which assumes an upright hand.
    pub fn classify(hand: &LandmarkSet) -> Self {
        let tip_above = |tip: usize, pip: usize| hand.get(tip).y < hand.get(pip).y;

        Self {
            thumb: hand.get(index::THUMB_TIP).x < hand.get(index::THUMB_IP).x,
            index: tip_above(index::INDEX_TIP, index::INDEX_PIP),
            middle: tip_above(index::MIDDLE_TIP, index::MIDDLE_PIP),
            ring: tip_above(index::RING_TIP, index::RING_PIP),
            pinky: tip_above(index::PINKY_TIP, index::PINKY_PIP),
        }
    }

    /// Build from a `[thumb, index, middle, ring, pinky]` array
    #[cfg(test)]
    pub fn from_array(flags: [bool; 5]) -> Self {
        let [thumb, index, middle, ring, pinky] = flags;
        Self {
            thumb,
            index,
            middle,
            ring,
            pinky,
        }
    }

    /// Flags in `[thumb, index, middle, ring, pinky]` order
    pub fn as_array(&self) -> [bool; 5] {
        [self.thumb, self.index, self.middle, self.ring, self.pinky]
    }

}

impl std::fmt::Display for FingerStates {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let bits: String = self
            .as_array()
            .iter()
            .map(|open| if *open { '1' } else { '0' })
            .collect();
        write!(f, "[{}]", bits)
    }
}
