//! Landmark replay source
//!
//! Reads recorded hand observations as JSON Lines and feeds them to the
//! gesture pipeline. Runs on a dedicated thread so blocking reads and
//! pacing sleeps never touch the async runtime.

use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use serde::Deserialize;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use super::points::Landmark;
use crate::clock::Clock;

/// One frame worth of input for the pipeline
#[derive(Debug, Clone)]
pub struct Observation {
    /// Points of the most salient hand, or `None` if no hand was seen
    pub hand: Option<Vec<Landmark>>,
    /// When the frame was captured
    pub at: Instant,
}

#[cfg(test)]
impl Observation {
    pub fn no_hand(at: Instant) -> Self {
        Self { hand: None, at }
    }

    pub fn with_hand(points: Vec<Landmark>, at: Instant) -> Self {
        Self {
            hand: Some(points),
            at,
        }
    }
}

/// A single line of a replay recording
#[derive(Debug, Deserialize)]
struct RecordedFrame {
    /// Capture time relative to the start of the recording
    t_ms: u64,
    #[serde(default)]
    hand: Option<Vec<Landmark>>,
}

/// Where the recording is read from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplayInput {
    Stdin,
    File(PathBuf),
}

impl ReplayInput {
    /// `-` selects stdin, anything else is a file path
    pub fn parse(value: &str) -> Self {
        if value == "-" {
            Self::Stdin
        } else {
            Self::File(PathBuf::from(value))
        }
    }

    fn open(&self) -> Result<Box<dyn BufRead + Send>, SourceError> {
        match self {
            Self::Stdin => Ok(Box::new(BufReader::new(io::stdin()))),
            Self::File(path) => {
                let file = File::open(path).map_err(|e| SourceError::Open {
                    path: path.clone(),
                    source: e,
                })?;
                Ok(Box::new(BufReader::new(file)))
            }
        }
    }
}

/// Errors that can occur in the landmark source
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("landmark source is already running")]
    AlreadyRunning,

    #[error("failed to open recording {path:?}: {source}")]
    Open { path: PathBuf, source: io::Error },

    #[error("failed to read recording: {0}")]
    Read(#[from] io::Error),

    #[error("failed to spawn source thread: {0}")]
    ThreadSpawn(String),
}

/// Replays recorded observations into the pipeline
pub struct ReplaySource {
    input: ReplayInput,
    realtime: bool,
    clock: Arc<dyn Clock>,
    running: Arc<AtomicBool>,
}

impl ReplaySource {
    /// Create a new replay source
    ///
    /// With `realtime` set, frames are released at their recorded pace;
    /// otherwise they are sent as fast as the pipeline accepts them.
    pub fn new(input: ReplayInput, realtime: bool, clock: Arc<dyn Clock>) -> Self {
        Self {
            input,
            realtime,
            clock,
            running: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Start replaying on a dedicated thread
    ///
    /// The sender moves into the thread, so the channel closes once the
    /// recording ends.
    pub fn start(&self, tx: mpsc::Sender<Observation>) -> Result<(), SourceError> {
        if self.running.swap(true, Ordering::SeqCst) {
            return Err(SourceError::AlreadyRunning);
        }

        let reader = match self.input.open() {
            Ok(reader) => reader,
            Err(e) => {
                self.running.store(false, Ordering::SeqCst);
                return Err(e);
            }
        };

        let running = Arc::clone(&self.running);
        let clock = Arc::clone(&self.clock);
        let realtime = self.realtime;

        thread::Builder::new()
            .name("landmark-source".to_string())
            .spawn(move || {
                info!("landmark source thread started");

                match replay(reader, tx, clock.as_ref(), realtime, &running) {
                    Ok(frames) => info!(frames, "landmark source finished"),
                    Err(e) => error!(?e, "landmark source error"),
                }

                running.store(false, Ordering::SeqCst);
            })
            .map_err(|e| {
                self.running.store(false, Ordering::SeqCst);
                SourceError::ThreadSpawn(e.to_string())
            })?;

        Ok(())
    }

    /// Ask the replay thread to stop after the current frame
    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    /// Check if the source is currently running
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }
}

/// Parse one recording line, `None` for blank lines
fn parse_line(line: &str) -> Result<Option<RecordedFrame>, serde_json::Error> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }
    serde_json::from_str(line).map(Some)
}

/// Read frames until input ends, the receiver goes away, or we are stopped.
/// Returns the number of frames delivered.
fn replay(
    reader: Box<dyn BufRead + Send>,
    tx: mpsc::Sender<Observation>,
    clock: &dyn Clock,
    realtime: bool,
    running: &AtomicBool,
) -> Result<u64, SourceError> {
    let origin = clock.now();
    let mut delivered = 0u64;

    for (line_no, line) in reader.lines().enumerate() {
        if !running.load(Ordering::SeqCst) {
            debug!("landmark source stopped");
            break;
        }

        let frame = match parse_line(&line?) {
            Ok(Some(frame)) => frame,
            Ok(None) => continue,
            Err(e) => {
                warn!(line = line_no + 1, %e, "skipping unparsable frame");
                continue;
            }
        };

        let at = origin + Duration::from_millis(frame.t_ms);
        if realtime {
            let now = clock.now();
            if at > now {
                thread::sleep(at - now);
            }
        }

        let observation = Observation { hand: frame.hand, at };
        if tx.blocking_send(observation).is_err() {
            warn!("failed to send observation - channel closed?");
            break;
        }
        delivered += 1;
    }

    Ok(delivered)
}
