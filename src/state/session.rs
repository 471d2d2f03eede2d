//! Detection session
//!
//! Drives one observation stream through the whole pipeline:
//! validate -> classify -> map -> confirm -> dispatch. Each session owns
//! its own hold tracker, so independent streams never share state.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::{broadcast, mpsc};
use tracing::{debug, info, warn};

use super::machine::HoldTracker;
use crate::dispatch::{DispatchOutcome, Dispatcher};
use crate::events::GestureEvent;
use crate::gesture::{self, Gesture};
use crate::landmarks::{Landmark, LandmarkSet, Observation};

/// One detection stream and everything it owns
pub struct Session {
    tracker: HoldTracker,
    dispatcher: Dispatcher,
    /// Flip landmarks horizontally before classification
    mirror: bool,
    /// Set externally to discard frames
    paused: Arc<AtomicBool>,
    was_paused: bool,
    hand_visible: bool,
    frames: u64,
    event_tx: broadcast::Sender<GestureEvent>,
}

impl Session {
    /// Create a new session in its initial state
    pub fn new(
        tracker: HoldTracker,
        dispatcher: Dispatcher,
        mirror: bool,
        paused: Arc<AtomicBool>,
        event_tx: broadcast::Sender<GestureEvent>,
    ) -> Self {
        Self {
            tracker,
            dispatcher,
            mirror,
            paused,
            was_paused: false,
            hand_visible: false,
            frames: 0,
            event_tx,
        }
    }

    /// Number of observations processed so far
    #[cfg(test)]
    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// Process observations in arrival order until the sender goes away
    ///
    /// Blocks the calling thread; run it on a dedicated thread.
    pub fn run_blocking(mut self, mut observation_rx: mpsc::Receiver<Observation>) {
        info!(
            hold_ms = self.tracker.hold_threshold().as_millis() as u64,
            "detection session started"
        );

        while let Some(observation) = observation_rx.blocking_recv() {
            self.process(observation);
        }

        info!(frames = self.frames, "detection session stopped");
    }

    /// Run one frame through the pipeline, returning the confirmed gesture
    pub fn process(&mut self, observation: Observation) -> Option<Gesture> {
        self.frames += 1;

        if self.check_paused() {
            return None;
        }

        let hand = self.validate(observation.hand.as_deref());
        self.update_visibility(hand.is_some());

        let recognized = gesture::recognize(hand.as_ref());
        let confirmation = self.tracker.step(recognized, observation.at)?;

        self.emit(GestureEvent::GestureConfirmed {
            gesture: confirmation.gesture,
            held_ms: confirmation.held.as_millis() as u64,
        });

        match self.dispatcher.dispatch(confirmation.gesture) {
            DispatchOutcome::Performed(action) => {
                debug!(%action, frame = self.frames, "presentation action performed");
            }
            DispatchOutcome::Skipped(action) => {
                info!(%action, "presentation target not running, action skipped");
            }
            DispatchOutcome::Failed(_, e) => {
                self.emit(GestureEvent::DispatchFailed {
                    gesture: confirmation.gesture,
                    reason: e.to_string(),
                });
            }
        }

        Some(confirmation.gesture)
    }

    /// Handle pause transitions; true while frames should be dropped
    ///
    /// Pause and resume events are announced by whoever flips the flag;
    /// the session only discards its hold state.
    fn check_paused(&mut self) -> bool {
        let paused = self.paused.load(Ordering::SeqCst);

        match (self.was_paused, paused) {
            (false, true) => {
                debug!(frame = self.frames, "detection paused, resetting hold state");
                self.tracker.reset();
                self.hand_visible = false;
            }
            (true, false) => {
                debug!(frame = self.frames, "detection resumed");
            }
            _ => {}
        }

        self.was_paused = paused;
        paused
    }

    /// Malformed observations count as "no hand"
    fn validate(&self, points: Option<&[Landmark]>) -> Option<LandmarkSet> {
        let points = points?;
        match LandmarkSet::from_points(points) {
            Ok(set) if self.mirror => Some(set.mirrored()),
            Ok(set) => Some(set),
            Err(e) => {
                warn!(frame = self.frames, %e, "malformed observation, treating as no hand");
                None
            }
        }
    }

    fn update_visibility(&mut self, visible: bool) {
        if visible == self.hand_visible {
            return;
        }
        self.hand_visible = visible;

        let event = if visible {
            GestureEvent::HandAcquired
        } else {
            GestureEvent::HandLost
        };
        debug!(%event, frame = self.frames, "hand visibility changed");
        self.emit(event);
    }

    fn emit(&self, event: GestureEvent) {
        let _ = self.event_tx.send(event);
    }
}

#[cfg(test)]
mod tests {
    use std::time::{Duration, Instant};

    use super::*;
    use crate::dispatch::{Action, RecordingBackend};
    use crate::gesture::hand_points;

    const PALM: [bool; 5] = [true; 5];
    const ONE: [bool; 5] = [false, true, false, false, false];

    struct Harness {
        session: Session,
        backend: RecordingBackend,
        paused: Arc<AtomicBool>,
        events: broadcast::Receiver<GestureEvent>,
        origin: Instant,
    }

    fn harness(backend: RecordingBackend, mirror: bool) -> Harness {
        let (tx, events) = broadcast::channel(256);
        let paused = Arc::new(AtomicBool::new(false));
        let session = Session::new(
            HoldTracker::default(),
            Dispatcher::new(Box::new(backend.clone())),
            mirror,
            Arc::clone(&paused),
            tx,
        );
        Harness {
            session,
            backend,
            paused,
            events,
            origin: Instant::now(),
        }
    }

    impl Harness {
        fn frame(&mut self, hand: Option<[bool; 5]>, at_ms: u64) -> Option<Gesture> {
            let at = self.origin + Duration::from_millis(at_ms);
            let observation = match hand {
                Some(flags) => Observation::with_hand(hand_points(flags), at),
                None => Observation::no_hand(at),
            };
            self.session.process(observation)
        }

        fn drain_events(&mut self) -> Vec<GestureEvent> {
            let mut out = Vec::new();
            while let Ok(event) = self.events.try_recv() {
                out.push(event);
            }
            out
        }
    }

    #[test]
    fn test_open_palm_at_30fps_fires_once() {
        let mut h = harness(RecordingBackend::default(), false);

        // 2.1s of open palm at 30 observations per second
        let mut fired = Vec::new();
        for k in 0..=63u64 {
            let at = h.origin + Duration::from_nanos(k * 1_000_000_000 / 30);
            let observation = Observation::with_hand(hand_points(PALM), at);
            if let Some(gesture) = h.session.process(observation) {
                fired.push((k, gesture));
            }
        }

        assert_eq!(fired, vec![(60, Gesture::StartSlideshow)]);
        assert_eq!(*h.backend.performed.lock().unwrap(), vec![Action::StartSlideshow]);
        assert_eq!(
            h.drain_events(),
            vec![
                GestureEvent::HandAcquired,
                GestureEvent::GestureConfirmed {
                    gesture: Gesture::StartSlideshow,
                    held_ms: 2000
                },
            ]
        );
        assert_eq!(h.session.frames(), 64);
    }

    #[test]
    fn test_missing_hand_breaks_hold() {
        let mut h = harness(RecordingBackend::default(), false);

        for ms in (0..=1900).step_by(100) {
            assert_eq!(h.frame(Some(ONE), ms), None);
        }
        assert_eq!(h.frame(None, 2000), None);
        for ms in (2100..=4000).step_by(100) {
            assert_eq!(h.frame(Some(ONE), ms), None);
        }
        assert_eq!(h.frame(Some(ONE), 4100), Some(Gesture::NextSlide));

        let events = h.drain_events();
        assert_eq!(events[0], GestureEvent::HandAcquired);
        assert_eq!(events[1], GestureEvent::HandLost);
        assert_eq!(events[2], GestureEvent::HandAcquired);
    }

    #[test]
    fn test_malformed_observation_counts_as_no_hand() {
        let mut h = harness(RecordingBackend::default(), false);
        let at = |ms| h.origin + Duration::from_millis(ms);

        let bad = hand_points(ONE)[..20].to_vec();
        h.session.process(Observation::with_hand(hand_points(ONE), at(0)));
        h.session.process(Observation::with_hand(bad, at(1000)));
        assert_eq!(
            h.session.process(Observation::with_hand(hand_points(ONE), at(2000))),
            None
        );
        assert_eq!(
            h.session.process(Observation::with_hand(hand_points(ONE), at(4000))),
            Some(Gesture::NextSlide)
        );
    }

    #[test]
    fn test_dispatch_failure_does_not_stop_pipeline() {
        let backend = RecordingBackend {
            fail: true,
            ..Default::default()
        };
        let mut h = harness(backend, false);

        assert_eq!(h.frame(Some(PALM), 0), None);
        assert_eq!(h.frame(Some(PALM), 2000), Some(Gesture::StartSlideshow));
        assert_eq!(h.frame(None, 2100), None);
        assert_eq!(h.frame(Some(PALM), 2200), None);
        assert_eq!(h.frame(Some(PALM), 4200), Some(Gesture::StartSlideshow));

        let failures = h
            .drain_events()
            .into_iter()
            .filter(|e| matches!(e, GestureEvent::DispatchFailed { .. }))
            .count();
        assert_eq!(failures, 2);
    }

    #[test]
    fn test_pause_discards_frames_and_resets() {
        let mut h = harness(RecordingBackend::default(), false);

        h.frame(Some(PALM), 0);
        h.paused.store(true, Ordering::SeqCst);
        assert_eq!(h.frame(Some(PALM), 2000), None);
        assert_eq!(h.frame(Some(PALM), 3000), None);

        h.paused.store(false, Ordering::SeqCst);
        // Resuming starts a fresh hold
        assert_eq!(h.frame(Some(PALM), 3100), None);
        assert_eq!(h.frame(Some(PALM), 5000), None);
        assert_eq!(h.frame(Some(PALM), 5100), Some(Gesture::StartSlideshow));

        // Visibility restarts after the pause; pause events come from IPC
        let events = h.drain_events();
        let acquired = events
            .iter()
            .filter(|e| **e == GestureEvent::HandAcquired)
            .count();
        assert_eq!(acquired, 2);
        assert!(!events.contains(&GestureEvent::DetectionPaused));
    }

    #[test]
    fn test_unavailable_target_skips_without_failure() {
        let backend = RecordingBackend {
            unavailable: true,
            ..Default::default()
        };
        let mut h = harness(backend, false);

        h.frame(Some(ONE), 0);
        assert_eq!(h.frame(Some(ONE), 2000), Some(Gesture::NextSlide));
        assert!(h.backend.performed.lock().unwrap().is_empty());

        let events = h.drain_events();
        assert!(!events
            .iter()
            .any(|e| matches!(e, GestureEvent::DispatchFailed { .. })));
    }

    #[test]
    fn test_mirror_flips_thumb() {
        let mut h = harness(RecordingBackend::default(), true);

        // Mirrored, the palm reads as four fingers and no gesture
        h.frame(Some(PALM), 0);
        assert_eq!(h.frame(Some(PALM), 3000), None);
        assert!(h.backend.performed.lock().unwrap().is_empty());
    }

    #[test]
    fn test_run_blocking_drains_channel() {
        let h = harness(RecordingBackend::default(), false);
        let (tx, rx) = mpsc::channel(8);

        let origin = h.origin;
        let backend = h.backend.clone();
        let worker = std::thread::spawn(move || h.session.run_blocking(rx));

        for ms in [0u64, 1000, 2000, 2500] {
            let at = origin + Duration::from_millis(ms);
            tx.blocking_send(Observation::with_hand(hand_points(ONE), at)).unwrap();
        }
        drop(tx);
        worker.join().unwrap();

        assert_eq!(*backend.performed.lock().unwrap(), vec![Action::NextSlide]);
    }
}
