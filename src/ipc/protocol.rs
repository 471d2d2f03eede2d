//! IPC message protocol definitions
//!
//! All messages are JSON-encoded, prefixed with a 4-byte little-endian length.

use serde::{Deserialize, Serialize};

use crate::events::GestureEvent;
use crate::gesture::Gesture;

/// Largest message body either side will accept
pub const MAX_MESSAGE_LEN: usize = 1024 * 1024;

/// Requests from a client (tray app, CLI) to the daemon
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Request {
    /// Request current daemon status
    GetStatus,

    /// Ping to check connectivity
    Ping,

    /// Stop acting on gestures until resumed
    Pause,

    /// Resume gesture detection
    Resume,

    /// Receive every subsequent gesture event
    Subscribe,

    /// Stop the daemon
    Shutdown,
}

/// Responses from daemon to client
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Response {
    /// Current daemon status
    Status(DaemonStatus),

    /// Pong response to ping
    Pong,

    /// Request accepted
    Ack,

    /// Subscription confirmed
    Subscribed,

    /// Pushed to subscribed clients for each gesture event
    Notification { event: GestureEvent },

    /// Error response
    Error { code: String, message: String },
}

/// Full daemon status snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DaemonStatus {
    /// Daemon version
    pub version: String,

    /// Whether detection is paused
    pub paused: bool,

    /// Whether a hand is currently in view
    pub hand_visible: bool,

    /// Most recently confirmed gesture
    pub last_gesture: Option<Gesture>,

    /// Gestures confirmed since startup
    pub confirmed_count: u64,

    /// Configured hold duration in milliseconds
    pub hold_threshold_ms: u64,

    /// Uptime in seconds
    pub uptime_secs: u64,
}

impl Default for DaemonStatus {
    fn default() -> Self {
        Self {
            version: env!("CARGO_PKG_VERSION").to_string(),
            paused: false,
            hand_visible: false,
            last_gesture: None,
            confirmed_count: 0,
            hold_threshold_ms: 0,
            uptime_secs: 0,
        }
    }
}

impl DaemonStatus {
    /// Fold a pipeline event into the snapshot
    pub fn apply(&mut self, event: &GestureEvent) {
        match event {
            GestureEvent::HandAcquired => self.hand_visible = true,
            GestureEvent::HandLost => self.hand_visible = false,
            GestureEvent::GestureConfirmed { gesture, .. } => {
                self.last_gesture = Some(*gesture);
                self.confirmed_count += 1;
            }
            GestureEvent::DispatchFailed { .. } => {}
            GestureEvent::DetectionPaused => {
                self.paused = true;
                self.hand_visible = false;
            }
            GestureEvent::DetectionResumed => self.paused = false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_serialization() {
        let json = serde_json::to_string(&Request::Pause).unwrap();
        assert_eq!(json, r#"{"type":"pause"}"#);

        let req: Request = serde_json::from_str(r#"{"type":"get_status"}"#).unwrap();
        assert_eq!(req, Request::GetStatus);
    }

    #[test]
    fn test_response_serialization() {
        let resp = Response::Status(DaemonStatus::default());
        let json = serde_json::to_string(&resp).unwrap();
        assert!(json.contains("status"));
        assert!(json.contains("confirmed_count"));
    }

    #[test]
    fn test_notification_round_trip() {
        let resp = Response::Notification {
            event: GestureEvent::GestureConfirmed {
                gesture: Gesture::PrevSlide,
                held_ms: 2033,
            },
        };
        let json = serde_json::to_string(&resp).unwrap();
        let back: Response = serde_json::from_str(&json).unwrap();
        assert_eq!(back, resp);
    }

    #[test]
    fn test_status_apply() {
        let mut status = DaemonStatus::default();
        status.apply(&GestureEvent::HandAcquired);
        assert!(status.hand_visible);

        status.apply(&GestureEvent::GestureConfirmed {
            gesture: Gesture::NextSlide,
            held_ms: 2000,
        });
        status.apply(&GestureEvent::GestureConfirmed {
            gesture: Gesture::PrevSlide,
            held_ms: 2000,
        });
        assert_eq!(status.confirmed_count, 2);
        assert_eq!(status.last_gesture, Some(Gesture::PrevSlide));

        status.apply(&GestureEvent::DetectionPaused);
        assert!(status.paused);
        assert!(!status.hand_visible);
        status.apply(&GestureEvent::DetectionResumed);
        assert!(!status.paused);
    }
}
