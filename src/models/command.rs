//! Typed command model and its wire encoding.
//!
//! The wire form is fixed by the daemon and must stay byte-compatible with
//! every deployed control tool:
//!
//! | Command            | Raw message                 |
//! |--------------------|-----------------------------|
//! | `Home`             | `CMD_HOME`                  |
//! | `Task { payload }` | `TASK::` followed by payload |
//!
//! There is no escaping. A payload that itself begins with `TASK::` still
//! round-trips because decoding strips exactly one prefix, but any raw
//! message that begins with `TASK::` is always a `Task`, never `Unknown`.

use std::fmt::{Display, Formatter};

use bytes::Bytes;

/// Exact raw form of the `Home` command.
pub const HOME_LITERAL: &[u8] = b"CMD_HOME";

/// Prefix token that introduces a `Task` payload.
pub const TASK_PREFIX: &[u8] = b"TASK::";

/// Fieldless command tag, used as the dispatcher's route key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandKind {
    /// Built-in Home button action.
    Home,
    /// Daemon-interpreted task string.
    Task,
    /// Unrecognized raw message.
    Unknown,
}

impl CommandKind {
    /// Lower-case name used in log fields.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Home => "home",
            Self::Task => "task",
            Self::Unknown => "unknown",
        }
    }
}

impl Display for CommandKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A decoded client request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Perform the single built-in action.
    Home,
    /// Execute an arbitrary, daemon-interpreted task.
    Task {
        /// Task bytes with the prefix stripped.
        payload: Bytes,
    },
    /// Raw message that matched no known tag. Only produced by [`Command::decode`].
    Unknown {
        /// The original message, byte for byte.
        raw: Bytes,
    },
}

impl Command {
    /// Build a `Task` command from any byte-like payload.
    #[must_use]
    pub fn task(payload: impl Into<Bytes>) -> Self {
        Self::Task {
            payload: payload.into(),
        }
    }

    /// Tag of this command.
    #[must_use]
    pub fn kind(&self) -> CommandKind {
        match self {
            Self::Home => CommandKind::Home,
            Self::Task { .. } => CommandKind::Task,
            Self::Unknown { .. } => CommandKind::Unknown,
        }
    }

    /// Payload bytes carried by the command; empty for `Home`.
    #[must_use]
    pub fn payload(&self) -> &[u8] {
        match self {
            Self::Home => &[],
            Self::Task { payload } => payload,
            Self::Unknown { raw } => raw,
        }
    }

    /// Encode into the raw wire message.
    ///
    /// `Unknown` encodes to its raw bytes unchanged.
    #[must_use]
    pub fn encode(&self) -> Bytes {
        match self {
            Self::Home => Bytes::from_static(HOME_LITERAL),
            Self::Task { payload } => {
                let mut raw = Vec::with_capacity(TASK_PREFIX.len() + payload.len());
                raw.extend_from_slice(TASK_PREFIX);
                raw.extend_from_slice(payload);
                Bytes::from(raw)
            }
            Self::Unknown { raw } => raw.clone(),
        }
    }

    /// Decode a raw wire message. Never fails.
    ///
    /// The exact `Home` literal is checked before the `Task` prefix, and the
    /// prefix test is anchored at byte zero.
    #[must_use]
    pub fn decode(raw: &[u8]) -> Self {
        if raw == HOME_LITERAL {
            return Self::Home;
        }
        match raw.strip_prefix(TASK_PREFIX) {
            Some(payload) => Self::Task {
                payload: Bytes::copy_from_slice(payload),
            },
            None => Self::Unknown {
                raw: Bytes::copy_from_slice(raw),
            },
        }
    }
}
