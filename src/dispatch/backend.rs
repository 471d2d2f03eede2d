//! Presentation control backends
//!
//! A backend performs the four slideshow actions against whatever
//! presentation software is running. Failures are reported, never raised
//! into the detection loop.

use std::io;
use std::process::{Command, Stdio};

use tracing::{debug, info};

use crate::gesture::Gesture;

/// The slideshow actions a confirmed gesture can trigger
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    StartSlideshow,
    EndSlideshow,
    NextSlide,
    PrevSlide,
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::StartSlideshow => "start_slideshow",
            Self::EndSlideshow => "end_slideshow",
            Self::NextSlide => "next_slide",
            Self::PrevSlide => "prev_slide",
        }
    }
}

impl From<Gesture> for Action {
    fn from(gesture: Gesture) -> Self {
        match gesture {
            Gesture::StartSlideshow => Action::StartSlideshow,
            Gesture::EndSlideshow => Action::EndSlideshow,
            Gesture::NextSlide => Action::NextSlide,
            Gesture::PrevSlide => Action::PrevSlide,
        }
    }
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors that can occur while performing an action
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("no command configured for {0}")]
    NotConfigured(Action),

    #[error("failed to run command for {action}: {source}")]
    Spawn { action: Action, source: io::Error },

    #[error("command for {action} exited with {status}")]
    Failed { action: Action, status: String },
}

/// Something that can drive a slideshow
pub trait PresentationBackend: Send {
    /// Whether the presentation target is currently reachable
    fn is_available(&self) -> bool {
        true
    }

    fn start_slideshow(&self) -> Result<(), DispatchError>;
    fn end_slideshow(&self) -> Result<(), DispatchError>;
    fn next_slide(&self) -> Result<(), DispatchError>;
    fn prev_slide(&self) -> Result<(), DispatchError>;
}

/// Backend that only logs the actions it would take
#[derive(Debug, Clone, Copy, Default)]
pub struct LogBackend;

impl LogBackend {
    fn log(&self, action: Action) -> Result<(), DispatchError> {
        info!(%action, "dry run, no presentation command configured");
        Ok(())
    }
}

impl PresentationBackend for LogBackend {
    fn start_slideshow(&self) -> Result<(), DispatchError> {
        self.log(Action::StartSlideshow)
    }

    fn end_slideshow(&self) -> Result<(), DispatchError> {
        self.log(Action::EndSlideshow)
    }

    fn next_slide(&self) -> Result<(), DispatchError> {
        self.log(Action::NextSlide)
    }

    fn prev_slide(&self) -> Result<(), DispatchError> {
        self.log(Action::PrevSlide)
    }
}

/// Shell command lines for each action
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandSet {
    pub start: Option<String>,
    pub end: Option<String>,
    pub next: Option<String>,
    pub prev: Option<String>,
    /// Exits successfully when the presentation app is running
    pub check: Option<String>,
}

impl CommandSet {
    /// True when no action has a command
    pub fn is_empty(&self) -> bool {
        self.start.is_none() && self.end.is_none() && self.next.is_none() && self.prev.is_none()
    }

    fn for_action(&self, action: Action) -> Option<&str> {
        match action {
            Action::StartSlideshow => self.start.as_deref(),
            Action::EndSlideshow => self.end.as_deref(),
            Action::NextSlide => self.next.as_deref(),
            Action::PrevSlide => self.prev.as_deref(),
        }
    }
}

/// Backend that runs a shell command per action, e.g. a key injector
#[derive(Debug, Clone)]
pub struct CommandBackend {
    commands: CommandSet,
}

impl CommandBackend {
    pub fn new(commands: CommandSet) -> Self {
        Self { commands }
    }

    fn shell(command: &str) -> io::Result<std::process::ExitStatus> {
        Command::new("sh")
            .arg("-c")
            .arg(command)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
    }

    fn run(&self, action: Action) -> Result<(), DispatchError> {
        let command = self
            .commands
            .for_action(action)
            .ok_or(DispatchError::NotConfigured(action))?;

        debug!(%action, command, "running presentation command");
        let status =
            Self::shell(command).map_err(|source| DispatchError::Spawn { action, source })?;

        if status.success() {
            info!(%action, "presentation action performed");
            Ok(())
        } else {
            Err(DispatchError::Failed {
                action,
                status: status.to_string(),
            })
        }
    }
}

impl PresentationBackend for CommandBackend {
    fn is_available(&self) -> bool {
        match self.commands.check.as_deref() {
            Some(check) => Self::shell(check).map(|s| s.success()).unwrap_or(false),
            None => true,
        }
    }

    fn start_slideshow(&self) -> Result<(), DispatchError> {
        self.run(Action::StartSlideshow)
    }

    fn end_slideshow(&self) -> Result<(), DispatchError> {
        self.run(Action::EndSlideshow)
    }

    fn next_slide(&self) -> Result<(), DispatchError> {
        self.run(Action::NextSlide)
    }

    fn prev_slide(&self) -> Result<(), DispatchError> {
        self.run(Action::PrevSlide)
    }
}
