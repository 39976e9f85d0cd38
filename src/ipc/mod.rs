//! Local IPC layer between the daemon and its control tools.
//!
//! Provides a named pipe (Windows) or Unix domain socket (Linux/macOS)
//! channel carrying whole messages, the daemon-side dispatcher, and the
//! client stub used by control processes.

pub mod channel;
pub mod client;
pub mod framing;
pub mod server;
