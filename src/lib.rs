#![forbid(unsafe_code)]

//! Local IPC command channel between the zxtouch control tools and the
//! springboard daemon.
//!
//! A control process connects to a named local endpoint and sends one of a
//! small closed set of commands (`Home`, `Task`). The daemon decodes each
//! request, routes it to an injected [`protocol::handler::ActionHandler`],
//! and answers with exactly one [`models::reply::Reply`].

pub mod config;
pub mod errors;
pub mod ipc;
pub mod models;
pub mod protocol;

pub use config::GlobalConfig;
pub use errors::{AppError, Result};
