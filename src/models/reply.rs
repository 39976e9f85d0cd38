//! Reply model returned by the daemon for every request.

use serde::{Deserialize, Serialize};

/// Protocol-level failure codes carried in [`Reply::Error`].
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    /// The raw message matched no known command tag.
    UnrecognizedCommand,
    /// The action handler returned an error or panicked.
    HandlerFailure,
}

impl ErrorCode {
    /// Wire name of the code.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::UnrecognizedCommand => "unrecognized_command",
            Self::HandlerFailure => "handler_failure",
        }
    }
}

/// Decoded response to one command.
///
/// Serialized as a JSON object tagged by `kind`:
/// `{"kind":"ack"}`, `{"kind":"data","data":[..]}`, or
/// `{"kind":"error","code":"handler_failure","message":".."}`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Reply {
    /// Success without data.
    Ack,
    /// Success with a result payload.
    Data {
        /// Result bytes produced by the handler.
        data: Vec<u8>,
    },
    /// The request was received but could not be carried out.
    Error {
        /// Failure category.
        code: ErrorCode,
        /// Human-readable detail.
        message: String,
    },
}

impl Reply {
    /// Construct an error reply.
    #[must_use]
    pub fn error(code: ErrorCode, message: impl Into<String>) -> Self {
        Self::Error {
            code,
            message: message.into(),
        }
    }

    /// Whether the reply reports success.
    #[must_use]
    pub fn is_success(&self) -> bool {
        !matches!(self, Self::Error { .. })
    }
}
