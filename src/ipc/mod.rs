//! IPC module for daemon-client communication
//!
//! Lets a tray app or script query status, pause detection, subscribe to
//! gesture events and stop the daemon.

mod protocol;
mod server;

pub use server::{Controls, Server};
