//! Dispatch module for presentation control
//!
//! Maps confirmed gestures onto slideshow actions and runs them through
//! a pluggable backend (shell commands, or a logging dry run).

mod backend;
mod dispatcher;

pub use backend::{CommandBackend, CommandSet, LogBackend, PresentationBackend};
pub use dispatcher::{DispatchOutcome, Dispatcher};

#[cfg(test)]
pub use backend::Action;
#[cfg(test)]
pub(crate) use dispatcher::tests::RecordingBackend;
