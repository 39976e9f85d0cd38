//! Client stub used by control processes.
//!
//! Opens (or reuses) a [`Connection`] to the daemon, encodes a [`Command`],
//! waits a bounded time for the reply, and decodes it. Channel errors are
//! returned unchanged; retrying is the caller's decision.

use bytes::Bytes;
use tracing::debug;

use super::channel::{ChannelOptions, ChannelState, Connection};
use crate::config::GlobalConfig;
use crate::models::command::Command;
use crate::models::endpoint::EndpointName;
use crate::models::reply::Reply;
use crate::protocol::codec;
use crate::Result;

/// Convenience wrapper over one client connection.
#[derive(Debug)]
pub struct ClientStub {
    endpoint: EndpointName,
    options: ChannelOptions,
    connection: Option<Connection>,
}

impl ClientStub {
    /// Create a stub for `endpoint`. Does not connect yet.
    #[must_use]
    pub fn new(endpoint: EndpointName, options: ChannelOptions) -> Self {
        Self {
            endpoint,
            options,
            connection: None,
        }
    }

    /// Create a stub from the endpoint and limits in `config`.
    #[must_use]
    pub fn from_config(config: &GlobalConfig) -> Self {
        Self::new(config.endpoint_name.clone(), ChannelOptions::from(config))
    }

    /// Ask the daemon to perform the Home action.
    ///
    /// # Errors
    ///
    /// Returns any channel error from connecting or exchanging, or
    /// `AppError::Protocol` if the reply cannot be decoded.
    pub async fn send_home(&mut self) -> Result<Reply> {
        self.send_command(&Command::Home).await
    }

    /// Ask the daemon to run a task.
    ///
    /// `payload` is sent after the `TASK::` prefix; callers pass the bare
    /// task text.
    ///
    /// # Errors
    ///
    /// See [`ClientStub::send_home`].
    pub async fn send_task(&mut self, payload: impl Into<Bytes>) -> Result<Reply> {
        self.send_command(&Command::task(payload)).await
    }

    /// Encode and send any command.
    ///
    /// # Errors
    ///
    /// See [`ClientStub::send_home`].
    pub async fn send_command(&mut self, command: &Command) -> Result<Reply> {
        debug!(command = %command.kind(), "sending command");
        self.send_raw(command.encode()).await
    }

    /// Send pre-encoded bytes and decode the reply.
    ///
    /// # Errors
    ///
    /// See [`ClientStub::send_home`].
    pub async fn send_raw(&mut self, raw: Bytes) -> Result<Reply> {
        let timeout = self.options.request_timeout;
        let connection = self.connection().await?;
        let reply = connection.send_and_receive(raw, timeout).await?;
        codec::decode_reply(&reply)
    }

    /// Endpoint this stub targets.
    #[must_use]
    pub fn endpoint(&self) -> &EndpointName {
        &self.endpoint
    }

    /// State of the underlying channel; `Unbound` before the first request.
    #[must_use]
    pub fn state(&self) -> ChannelState {
        self.connection
            .as_ref()
            .map_or(ChannelState::Unbound, Connection::state)
    }

    /// Close the connection, if any. Idempotent and infallible.
    pub fn close(&mut self) {
        if let Some(connection) = self.connection.as_mut() {
            connection.close();
        }
    }

    /// Reuse the open connection or establish a new one.
    ///
    /// A closed connection is discarded, so a failed connect leaves the stub
    /// without one.
    async fn connection(&mut self) -> Result<&mut Connection> {
        let connection = match self.connection.take() {
            Some(open) if open.state() == ChannelState::Connected => open,
            _ => Connection::connect(&self.endpoint, &self.options).await?,
        };
        Ok(self.connection.insert(connection))
    }
}
