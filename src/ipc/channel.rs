//! Named local channel with listener and connection roles.
//!
//! Uses `interprocess` local sockets with namespaced names: the abstract
//! namespace on Linux, a socket file under `/tmp` on other Unix systems,
//! and a named pipe on Windows. Each socket carries length-delimited frames
//! (see [`super::framing`]) so both roles exchange whole raw messages.
//!
//! ## Lifecycle
//!
//! ```text
//! Unbound ──bind──▶ Bound ─────┐
//!    │                         ├──close / peer gone / failed exchange──▶ Closed
//!    └────connect──▶ Connected ┘
//! ```
//!
//! `Closed` is terminal. A closed [`Connection`] is never reopened; callers
//! connect again instead.

use std::fmt::{Display, Formatter};
use std::io;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use futures_util::{SinkExt, StreamExt};
use interprocess::local_socket::tokio::{
    prelude::*, Listener as LocalSocketListener, RecvHalf, SendHalf, Stream as LocalSocketStream,
};
use interprocess::local_socket::{GenericNamespaced, ListenerOptions, Name};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio_util::codec::{FramedRead, FramedWrite};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, info_span, warn, Instrument};

use super::framing::MessageCodec;
use crate::config::GlobalConfig;
use crate::models::endpoint::EndpointName;
use crate::{AppError, Result};

/// Requests accepted from peers but not yet taken by [`Listener::recv`].
const REQUEST_BACKLOG: usize = 16;

/// Observable state of a channel endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelState {
    /// No socket has been bound or connected yet.
    Unbound,
    /// Listening under a registered name.
    Bound,
    /// Connected to a listener.
    Connected,
    /// Terminal state.
    Closed,
}

impl Display for ChannelState {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::Unbound => "unbound",
            Self::Bound => "bound",
            Self::Connected => "connected",
            Self::Closed => "closed",
        };
        f.write_str(label)
    }
}

/// Timeouts and limits applied to one channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelOptions {
    /// Bounded wait for the connect handshake.
    pub connect_timeout: Duration,
    /// Bounded wait for a reply.
    pub request_timeout: Duration,
    /// Largest message accepted or sent.
    pub max_message_bytes: usize,
}

impl From<&GlobalConfig> for ChannelOptions {
    fn from(config: &GlobalConfig) -> Self {
        Self {
            connect_timeout: config.connect_timeout(),
            request_timeout: config.request_timeout(),
            max_message_bytes: config.max_message_bytes,
        }
    }
}

impl Default for ChannelOptions {
    fn default() -> Self {
        Self::from(&GlobalConfig::default())
    }
}

/// Single-use capability to answer one received request.
///
/// Consumed by [`ReplySink::send`], so a second reply for the same request
/// does not compile:
///
/// ```compile_fail
/// # fn answer(sink: zxtouch_ipc::ipc::channel::ReplySink) {
/// sink.send(bytes::Bytes::from_static(b"first"));
/// sink.send(bytes::Bytes::from_static(b"second"));
/// # }
/// ```
///
/// Dropping a sink without sending closes the requesting peer's connection,
/// so the peer observes `ChannelClosed` instead of waiting for its timeout.
#[derive(Debug)]
#[must_use = "every received request must be answered exactly once"]
pub struct ReplySink {
    tx: oneshot::Sender<Bytes>,
}

impl ReplySink {
    /// Send the reply for this request.
    ///
    /// Returns `false` when the peer already went away (closed its
    /// connection, or the listener stopped serving it); the reply is then
    /// discarded, which is not an error.
    #[allow(clippy::must_use_candidate)]
    pub fn send(self, reply: Bytes) -> bool {
        let delivered = self.tx.send(reply).is_ok();
        if !delivered {
            debug!("peer closed before reply; discarding");
        }
        delivered
    }

    /// Wait until the requesting peer stops waiting for this reply.
    pub async fn closed(&mut self) {
        self.tx.closed().await;
    }
}

/// Listening side of a channel.
///
/// Owns a background accept task plus one reader task per peer connection.
/// All peers feed a single request queue drained by [`Listener::recv`], so
/// the owner sees requests one at a time. Tasks stop when the listener is
/// closed or dropped.
#[derive(Debug)]
pub struct Listener {
    endpoint: EndpointName,
    requests: mpsc::Receiver<(Bytes, ReplySink)>,
    cancel: CancellationToken,
    accept_task: Option<JoinHandle<()>>,
    accepted: Arc<AtomicUsize>,
    state: ChannelState,
}

impl Listener {
    /// Register `endpoint` on this host and start accepting peers.
    ///
    /// Must be called from within a tokio runtime.
    ///
    /// # Errors
    ///
    /// - `AppError::NameInUse` if another listener owns the name.
    /// - `AppError::Permission` if registration is denied.
    /// - `AppError::Config` if the OS rejects the name itself.
    pub fn bind(endpoint: &EndpointName, options: &ChannelOptions) -> Result<Self> {
        let name = socket_name(endpoint)?;
        let listener = ListenerOptions::new()
            .name(name)
            .create_tokio()
            .map_err(|err| map_bind_error(endpoint, &err))?;

        let (tx, rx) = mpsc::channel(REQUEST_BACKLOG);
        let cancel = CancellationToken::new();
        let accepted = Arc::new(AtomicUsize::new(0));
        let span = info_span!("ipc_listener", endpoint = %endpoint);
        let accept_task = tokio::spawn(
            accept_loop(
                listener,
                tx,
                cancel.clone(),
                Arc::clone(&accepted),
                options.max_message_bytes,
            )
            .instrument(span),
        );

        info!(endpoint = %endpoint, "endpoint bound");
        Ok(Self {
            endpoint: endpoint.clone(),
            requests: rx,
            cancel,
            accept_task: Some(accept_task),
            accepted,
            state: ChannelState::Bound,
        })
    }

    /// Wait, without a timeout, for the next request from any peer.
    ///
    /// # Errors
    ///
    /// Returns `AppError::ChannelClosed` once the listener is closed.
    pub async fn recv(&mut self) -> Result<(Bytes, ReplySink)> {
        if self.state == ChannelState::Closed {
            return Err(self.closed_error());
        }
        match self.requests.recv().await {
            Some(request) => Ok(request),
            None => {
                self.close().await;
                Err(self.closed_error())
            }
        }
    }

    /// Endpoint this listener is bound to.
    #[must_use]
    pub fn endpoint(&self) -> &EndpointName {
        &self.endpoint
    }

    /// Current channel state.
    #[must_use]
    pub fn state(&self) -> ChannelState {
        self.state
    }

    /// Number of peer connections accepted so far.
    #[must_use]
    pub fn accepted_peers(&self) -> usize {
        self.accepted.load(Ordering::SeqCst)
    }

    /// Stop accepting peers and release the name. Idempotent.
    ///
    /// Returns once the accept task has dropped the socket, so the name can
    /// be bound again immediately.
    pub async fn close(&mut self) {
        if self.state == ChannelState::Closed {
            return;
        }
        self.cancel.cancel();
        self.requests.close();
        self.state = ChannelState::Closed;
        if let Some(task) = self.accept_task.take() {
            if let Err(err) = task.await {
                warn!(endpoint = %self.endpoint, %err, "accept task ended abnormally");
            }
        }
        info!(endpoint = %self.endpoint, "endpoint closed");
    }

    fn closed_error(&self) -> AppError {
        AppError::ChannelClosed(format!("listener for '{}' is closed", self.endpoint))
    }
}

impl Drop for Listener {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

/// Accept peers until cancelled.
async fn accept_loop(
    listener: LocalSocketListener,
    requests: mpsc::Sender<(Bytes, ReplySink)>,
    cancel: CancellationToken,
    accepted: Arc<AtomicUsize>,
    max_message_bytes: usize,
) {
    loop {
        tokio::select! {
            () = cancel.cancelled() => {
                debug!("accept loop stopping");
                break;
            }
            result = listener.accept() => {
                match result {
                    Ok(stream) => {
                        let peer = accepted.fetch_add(1, Ordering::SeqCst);
                        let span = info_span!("ipc_peer", peer);
                        tokio::spawn(
                            serve_peer(stream, requests.clone(), cancel.child_token(), max_message_bytes)
                                .instrument(span),
                        );
                    }
                    Err(err) => {
                        warn!(%err, "IPC accept failed");
                    }
                }
            }
        }
    }
}

/// Read requests from one peer in lock-step with their replies.
async fn serve_peer(
    stream: LocalSocketStream,
    requests: mpsc::Sender<(Bytes, ReplySink)>,
    cancel: CancellationToken,
    max_message_bytes: usize,
) {
    let (reader, writer) = stream.split();
    let mut inbound = FramedRead::new(reader, MessageCodec::new(max_message_bytes));
    let mut outbound = FramedWrite::new(writer, MessageCodec::new(max_message_bytes));
    debug!("peer connected");

    loop {
        let next = tokio::select! {
            () = cancel.cancelled() => break,
            next = inbound.next() => next,
        };
        let message = match next {
            None => break,
            Some(Ok(message)) => message.freeze(),
            Some(Err(err)) => {
                warn!(%err, "dropping peer after read failure");
                break;
            }
        };

        let (reply_tx, reply_rx) = oneshot::channel();
        if requests
            .send((message, ReplySink { tx: reply_tx }))
            .await
            .is_err()
        {
            break;
        }

        // Lock-step peers send nothing while a reply is pending, so any
        // inbound event here means the peer is gone or misbehaving.
        let reply = tokio::select! {
            () = cancel.cancelled() => break,
            reply = reply_rx => reply,
            next = inbound.next() => {
                if let Some(Ok(_)) = next {
                    warn!("peer sent a request before its reply; closing peer");
                } else {
                    debug!("peer went away with a request pending");
                }
                break;
            }
        };
        let Ok(reply) = reply else {
            warn!("request dropped without a reply; closing peer");
            break;
        };
        if let Err(err) = outbound.send(reply).await {
            debug!(%err, "peer went away before the reply was written");
            break;
        }
    }

    debug!("peer disconnected");
}

/// Framed halves of a connected socket.
struct PeerIo {
    inbound: FramedRead<RecvHalf, MessageCodec>,
    outbound: FramedWrite<SendHalf, MessageCodec>,
}

impl PeerIo {
    async fn exchange(&mut self, message: Bytes) -> Result<Bytes> {
        self.outbound.send(message).await?;
        match self.inbound.next().await {
            Some(Ok(reply)) => Ok(reply.freeze()),
            Some(Err(err)) => Err(err),
            None => Err(AppError::ChannelClosed(
                "peer closed the connection before replying".into(),
            )),
        }
    }
}

/// Client side of a channel.
pub struct Connection {
    endpoint: EndpointName,
    io: Option<PeerIo>,
    max_message_bytes: usize,
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("endpoint", &self.endpoint)
            .field("state", &self.state())
            .field("max_message_bytes", &self.max_message_bytes)
            .finish()
    }
}

impl Connection {
    /// Open a connection to the listener bound at `endpoint`.
    ///
    /// # Errors
    ///
    /// - `AppError::NotFound` if no listener is bound to the name.
    /// - `AppError::Timeout` if the handshake exceeds `options.connect_timeout`.
    /// - `AppError::Permission` if the OS denies access.
    pub async fn connect(endpoint: &EndpointName, options: &ChannelOptions) -> Result<Self> {
        let name = socket_name(endpoint)?;
        let stream = tokio::time::timeout(options.connect_timeout, LocalSocketStream::connect(name))
            .await
            .map_err(|_| {
                AppError::Timeout(format!(
                    "connect to '{endpoint}' exceeded {}ms",
                    options.connect_timeout.as_millis()
                ))
            })?
            .map_err(|err| map_connect_error(endpoint, err))?;

        let (reader, writer) = stream.split();
        debug!(endpoint = %endpoint, "connected");
        Ok(Self {
            endpoint: endpoint.clone(),
            io: Some(PeerIo {
                inbound: FramedRead::new(reader, MessageCodec::new(options.max_message_bytes)),
                outbound: FramedWrite::new(writer, MessageCodec::new(options.max_message_bytes)),
            }),
            max_message_bytes: options.max_message_bytes,
        })
    }

    /// Send one request and wait up to `timeout` for its reply.
    ///
    /// Any transport failure or timeout leaves the connection `Closed`: a
    /// late reply would otherwise be read as the answer to the next request.
    ///
    /// # Errors
    ///
    /// - `AppError::Timeout` if no reply arrives in time.
    /// - `AppError::ChannelClosed` if the peer disappears or the connection
    ///   is already closed.
    /// - `AppError::Protocol` if `message` exceeds the size limit (nothing is
    ///   sent and the connection stays open) or the reply frame is oversize.
    pub async fn send_and_receive(&mut self, message: Bytes, timeout: Duration) -> Result<Bytes> {
        if message.len() > self.max_message_bytes {
            return Err(AppError::Protocol(format!(
                "message too large: {} bytes exceeds {} bytes",
                message.len(),
                self.max_message_bytes
            )));
        }
        let Some(io) = self.io.as_mut() else {
            return Err(AppError::ChannelClosed(format!(
                "connection to '{}' is closed",
                self.endpoint
            )));
        };

        let outcome = tokio::time::timeout(timeout, io.exchange(message)).await;
        match outcome {
            Ok(Ok(reply)) => Ok(reply),
            Ok(Err(err)) => {
                self.close();
                Err(err)
            }
            Err(_) => {
                self.close();
                Err(AppError::Timeout(format!(
                    "no reply from '{}' within {}ms",
                    self.endpoint,
                    timeout.as_millis()
                )))
            }
        }
    }

    /// Endpoint this connection targets.
    #[must_use]
    pub fn endpoint(&self) -> &EndpointName {
        &self.endpoint
    }

    /// Current channel state.
    #[must_use]
    pub fn state(&self) -> ChannelState {
        if self.io.is_some() {
            ChannelState::Connected
        } else {
            ChannelState::Closed
        }
    }

    /// Release the socket. Idempotent and infallible.
    pub fn close(&mut self) {
        if self.io.take().is_some() {
            debug!(endpoint = %self.endpoint, "connection closed");
        }
    }
}

fn socket_name(endpoint: &EndpointName) -> Result<Name<'static>> {
    endpoint
        .as_str()
        .to_owned()
        .to_ns_name::<GenericNamespaced>()
        .map_err(|err| AppError::Config(format!("invalid endpoint name '{endpoint}': {err}")))
}

fn map_bind_error(endpoint: &EndpointName, err: &io::Error) -> AppError {
    match err.kind() {
        io::ErrorKind::AddrInUse => {
            AppError::NameInUse(format!("'{endpoint}' is already bound on this host"))
        }
        io::ErrorKind::PermissionDenied => {
            AppError::Permission(format!("cannot register '{endpoint}': {err}"))
        }
        _ => AppError::Io(format!("failed to bind '{endpoint}': {err}")),
    }
}

fn map_connect_error(endpoint: &EndpointName, err: io::Error) -> AppError {
    match err.kind() {
        io::ErrorKind::NotFound | io::ErrorKind::ConnectionRefused => {
            AppError::NotFound(format!("no listener bound to '{endpoint}'"))
        }
        io::ErrorKind::PermissionDenied => {
            AppError::Permission(format!("cannot open '{endpoint}': {err}"))
        }
        _ => AppError::from(err),
    }
}
