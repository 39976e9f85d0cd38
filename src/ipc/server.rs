//! Daemon-side request dispatcher.
//!
//! Owns one bound [`Listener`] for the life of the process and services its
//! requests strictly one at a time: each request is decoded, routed to the
//! [`ActionHandler`], and answered before the next is taken. Commands mutate
//! shared device state, so the handler never sees concurrent calls from one
//! dispatcher. Run several dispatchers on distinct names for more throughput.
//!
//! ## Protocol
//!
//! Request (raw bytes, one per message):
//! ```text
//! CMD_HOME
//! TASK::<payload>
//! ```
//!
//! Response (one JSON object per message):
//! ```json
//! {"kind": "ack"}
//! {"kind": "data", "data": [ ... ]}
//! {"kind": "error", "code": "handler_failure", "message": "..."}
//! ```

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, info_span, warn, Instrument};

use super::channel::{ChannelOptions, ChannelState, Listener, ReplySink};
use crate::config::GlobalConfig;
use crate::models::endpoint::EndpointName;
use crate::models::reply::{ErrorCode, Reply};
use crate::protocol::codec;
use crate::protocol::handler::{ActionHandler, RouteTable};
use crate::Result;

/// Sequential command dispatcher bound to one endpoint.
pub struct Dispatcher {
    listener: Listener,
    routes: RouteTable,
    handler: Arc<dyn ActionHandler>,
    max_message_bytes: usize,
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("listener", &self.listener)
            .field("routes", &self.routes)
            .finish_non_exhaustive()
    }
}

impl Dispatcher {
    /// Bind `endpoint` and prepare to serve it with `handler`.
    ///
    /// Fails fast: a name already in use means a second daemon instance or a
    /// misconfiguration, and is returned to the caller without retrying.
    ///
    /// # Errors
    ///
    /// Returns the [`Listener::bind`] error unchanged.
    pub fn bind(
        endpoint: &EndpointName,
        options: &ChannelOptions,
        handler: Arc<dyn ActionHandler>,
    ) -> Result<Self> {
        let listener = Listener::bind(endpoint, options).map_err(|err| {
            error!(endpoint = %endpoint, %err, "failed to bind endpoint");
            err
        })?;
        Ok(Self {
            listener,
            routes: RouteTable::standard(),
            handler,
            max_message_bytes: options.max_message_bytes,
        })
    }

    /// Bind the endpoint named in `config`.
    ///
    /// # Errors
    ///
    /// See [`Dispatcher::bind`].
    pub fn from_config(config: &GlobalConfig, handler: Arc<dyn ActionHandler>) -> Result<Self> {
        Self::bind(&config.endpoint_name, &ChannelOptions::from(config), handler)
    }

    /// Endpoint being served.
    #[must_use]
    pub fn endpoint(&self) -> &EndpointName {
        self.listener.endpoint()
    }

    /// State of the owned listener.
    #[must_use]
    pub fn state(&self) -> ChannelState {
        self.listener.state()
    }

    /// Wait for one request and answer it.
    ///
    /// # Errors
    ///
    /// Returns `AppError::ChannelClosed` if the listener has been closed.
    pub async fn serve_one(&mut self) -> Result<()> {
        let (message, sink) = self.listener.recv().await?;
        service(
            &self.routes,
            self.handler.as_ref(),
            self.max_message_bytes,
            &message,
            sink,
        );
        Ok(())
    }

    /// Serve requests until `cancel` fires, then close the endpoint.
    ///
    /// The name is released by the time this returns.
    ///
    /// # Errors
    ///
    /// Returns a transport error if the listener fails underneath the loop.
    pub async fn run(self, cancel: CancellationToken) -> Result<()> {
        let span = info_span!("dispatcher", endpoint = %self.listener.endpoint());
        let Self {
            mut listener,
            routes,
            handler,
            max_message_bytes,
        } = self;

        async move {
            info!("dispatcher serving");
            let mut outcome = Ok(());
            loop {
                tokio::select! {
                    () = cancel.cancelled() => {
                        info!("dispatcher shutting down");
                        break;
                    }
                    next = listener.recv() => {
                        match next {
                            Ok((message, sink)) => {
                                service(&routes, handler.as_ref(), max_message_bytes, &message, sink);
                            }
                            Err(err) => {
                                error!(%err, "listener failed");
                                outcome = Err(err);
                                break;
                            }
                        }
                    }
                }
            }
            listener.close().await;
            outcome
        }
        .instrument(span)
        .await
    }

    /// Spawn [`Dispatcher::run`] on the current tokio runtime.
    #[must_use]
    pub fn spawn(self, cancel: CancellationToken) -> tokio::task::JoinHandle<Result<()>> {
        tokio::spawn(self.run(cancel))
    }
}

/// Answer one request. Always consumes `sink` with exactly one reply.
fn service(
    routes: &RouteTable,
    handler: &dyn ActionHandler,
    max_message_bytes: usize,
    message: &[u8],
    sink: ReplySink,
) {
    let reply = codec::handle_request(message, routes, handler);
    let mut encoded = codec::encode_reply(&reply);
    if encoded.len() > max_message_bytes {
        warn!(
            len = encoded.len(),
            max_message_bytes, "reply exceeds message limit; sending failure instead"
        );
        encoded = codec::encode_reply(&Reply::error(
            ErrorCode::HandlerFailure,
            format!(
                "result too large: {} bytes exceeds {max_message_bytes} bytes",
                encoded.len()
            ),
        ));
    }
    let delivered = sink.send(encoded);
    debug!(
        request_len = message.len(),
        success = reply.is_success(),
        delivered,
        "request serviced"
    );
}
