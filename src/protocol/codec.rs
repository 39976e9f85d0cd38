//! Request handling and reply wire encoding.
//!
//! ## Reply wire form
//!
//! One JSON object per message:
//!
//! ```json
//! {"kind": "ack"}
//! {"kind": "data", "data": [111, 107]}
//! {"kind": "error", "code": "unrecognized_command", "message": "..."}
//! ```

use std::panic::{self, AssertUnwindSafe};

use bytes::Bytes;
use tracing::{debug, error, warn};

use super::handler::{ActionHandler, RouteTable};
use crate::models::command::Command;
use crate::models::reply::{ErrorCode, Reply};
use crate::{AppError, Result};

const SERIALIZATION_FALLBACK: &str =
    r#"{"kind":"error","code":"handler_failure","message":"reply serialization failed"}"#;

/// Decode `raw`, route it to `handler`, and build the reply.
///
/// Unrecognized commands are answered with `unrecognized_command` without
/// touching the handler. Handler errors and panics become `handler_failure`,
/// so every request yields exactly one reply.
pub fn handle_request(raw: &[u8], routes: &RouteTable, handler: &dyn ActionHandler) -> Reply {
    let command = Command::decode(raw);
    let kind = command.kind();

    let Some(route) = routes.route_for(&command) else {
        warn!(command = %kind, len = raw.len(), "unrecognized command");
        return Reply::error(
            ErrorCode::UnrecognizedCommand,
            format!("unrecognized command ({} bytes)", raw.len()),
        );
    };

    debug!(command = %kind, payload_len = command.payload().len(), "routing command");
    let outcome = panic::catch_unwind(AssertUnwindSafe(|| route(handler, command.payload())));
    match outcome {
        Ok(Ok(None)) => Reply::Ack,
        Ok(Ok(Some(data))) => Reply::Data { data },
        Ok(Err(err)) => {
            warn!(command = %kind, %err, "action handler failed");
            Reply::error(ErrorCode::HandlerFailure, err.to_string())
        }
        Err(_) => {
            error!(command = %kind, "action handler panicked");
            Reply::error(ErrorCode::HandlerFailure, "action handler panicked")
        }
    }
}

/// Serialize a reply for the wire.
#[must_use]
pub fn encode_reply(reply: &Reply) -> Bytes {
    match serde_json::to_vec(reply) {
        Ok(raw) => Bytes::from(raw),
        Err(err) => {
            error!(%err, "failed to serialize reply");
            Bytes::from_static(SERIALIZATION_FALLBACK.as_bytes())
        }
    }
}

/// Parse a reply received from the daemon.
///
/// # Errors
///
/// Returns `AppError::Protocol` if `raw` is not a valid reply object.
pub fn decode_reply(raw: &[u8]) -> Result<Reply> {
    serde_json::from_slice(raw).map_err(|err| AppError::Protocol(format!("malformed reply: {err}")))
}
