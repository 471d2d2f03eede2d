//! Configuration loading and management

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Context, Result};

use crate::dispatch::CommandSet;
use crate::landmarks::ReplayInput;
use crate::state::DEFAULT_HOLD_THRESHOLD;

/// Daemon configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Path to the Unix domain socket for IPC
    pub socket_path: PathBuf,

    /// Directory for runtime data
    pub data_dir: PathBuf,

    /// How long a gesture must be held before it fires
    pub hold_threshold: Duration,

    /// Where landmark observations are read from
    pub source: ReplayInput,

    /// Release recorded frames at their original pace
    pub realtime: bool,

    /// Flip landmark x before classification, as a selfie-view camera
    /// frame is flipped. On unless disabled.
    pub mirror: bool,

    /// Shell commands for the presentation actions
    pub commands: CommandSet,
}

impl Config {
    /// Load configuration from environment and defaults
    pub fn load() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let home = lookup("HOME").context("HOME is not set")?;
        let data_dir = PathBuf::from(&home)
            .join(".local")
            .join("share")
            .join("gesture-deck");

        let socket_path = data_dir.join("daemon.sock");

        let hold_threshold = match lookup("GESTURE_DECK_HOLD_MS") {
            Some(raw) => {
                let ms: u64 = raw
                    .trim()
                    .parse()
                    .with_context(|| format!("GESTURE_DECK_HOLD_MS is not a number: {raw:?}"))?;
                Duration::from_millis(ms)
            }
            None => DEFAULT_HOLD_THRESHOLD,
        };

        let source = lookup("GESTURE_DECK_SOURCE")
            .map(|s| ReplayInput::parse(s.trim()))
            .unwrap_or(ReplayInput::Stdin);

        let realtime = parse_flag("GESTURE_DECK_REALTIME", lookup("GESTURE_DECK_REALTIME"), true)?;
        let mirror = parse_flag("GESTURE_DECK_MIRROR", lookup("GESTURE_DECK_MIRROR"), true)?;

        let command = |key: &str| lookup(key).filter(|c| !c.trim().is_empty());
        let commands = CommandSet {
            start: command("GESTURE_DECK_CMD_START"),
            end: command("GESTURE_DECK_CMD_END"),
            next: command("GESTURE_DECK_CMD_NEXT"),
            prev: command("GESTURE_DECK_CMD_PREV"),
            check: command("GESTURE_DECK_CMD_CHECK"),
        };

        Ok(Self {
            socket_path,
            data_dir,
            hold_threshold,
            source,
            realtime,
            mirror,
            commands,
        })
    }

    /// Ensure data directory exists
    pub fn ensure_dirs(&self) -> Result<()> {
        std::fs::create_dir_all(&self.data_dir)
            .with_context(|| format!("failed to create {:?}", self.data_dir))?;
        Ok(())
    }
}

fn parse_flag(name: &str, value: Option<String>, default: bool) -> Result<bool> {
    let Some(value) = value else {
        return Ok(default);
    };

    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => bail!("{name} must be a boolean, got {other:?}"),
    }
}
