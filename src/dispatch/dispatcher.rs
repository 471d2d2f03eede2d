//! Routes confirmed gestures to a presentation backend

use tracing::{debug, error};

use super::backend::{Action, DispatchError, PresentationBackend};
use crate::gesture::Gesture;

/// Result of dispatching one confirmed gesture
#[derive(Debug)]
pub enum DispatchOutcome {
    /// The action ran successfully
    Performed(Action),
    /// The presentation target was not running, nothing was attempted
    Skipped(Action),
    /// The action was attempted and failed
    Failed(Action, DispatchError),
}

/// Invokes exactly one backend action per confirmed gesture
pub struct Dispatcher {
    backend: Box<dyn PresentationBackend>,
}

impl Dispatcher {
    pub fn new(backend: Box<dyn PresentationBackend>) -> Self {
        Self { backend }
    }

    /// Perform the action for `gesture`
    ///
    /// Failures are logged and returned; there is no retry, the next
    /// confirmed gesture naturally tries again.
    pub fn dispatch(&self, gesture: Gesture) -> DispatchOutcome {
        let action = Action::from(gesture);

        if !self.backend.is_available() {
            debug!(%action, "presentation target not available, skipping");
            return DispatchOutcome::Skipped(action);
        }

        let result = match action {
            Action::StartSlideshow => self.backend.start_slideshow(),
            Action::EndSlideshow => self.backend.end_slideshow(),
            Action::NextSlide => self.backend.next_slide(),
            Action::PrevSlide => self.backend.prev_slide(),
        };

        match result {
            Ok(()) => DispatchOutcome::Performed(action),
            Err(e) => {
                error!(%action, error = %e, "presentation action failed");
                DispatchOutcome::Failed(action, e)
            }
        }
    }
}
