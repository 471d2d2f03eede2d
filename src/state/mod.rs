//! State module for temporal gesture confirmation
//!
//! Provides the hold tracker, which debounces the per-frame gesture
//! stream into one event per sustained hold, and the session that owns
//! it and drives the full per-frame pipeline.

mod machine;
mod session;

pub use machine::{HoldTracker, DEFAULT_HOLD_THRESHOLD};
pub use session::Session;
