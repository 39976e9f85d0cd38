//! Error types shared across the channel, codec, and dispatcher layers.

use std::fmt::{Display, Formatter};
use std::io;

/// Shared application result type.
pub type Result<T> = std::result::Result<T, AppError>;

/// Application error enumeration covering transport and protocol failures.
///
/// The first five variants form the transport taxonomy raised by channel
/// operations. Protocol-level failures of a single request (unrecognized
/// command, handler failure) are never raised as `AppError`; they travel to
/// the client as [`crate::models::reply::Reply::Error`].
#[derive(Debug)]
pub enum AppError {
    /// Another process already owns the endpoint name on this host.
    NameInUse(String),
    /// The caller lacks rights to register or open the endpoint.
    Permission(String),
    /// No listener is bound to the requested endpoint name.
    NotFound(String),
    /// A bounded wait expired (connect handshake or reply).
    Timeout(String),
    /// The peer disappeared or the channel was already closed.
    ChannelClosed(String),
    /// Configuration parsing or validation failure.
    Config(String),
    /// Malformed frame or reply on the wire.
    Protocol(String),
    /// Failure reported by an action handler.
    Handler(String),
    /// Other file-system or socket I/O failure.
    Io(String),
}

impl AppError {
    /// Whether this error was raised by the transport rather than by
    /// configuration or payload handling.
    #[must_use]
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            Self::NameInUse(_)
                | Self::Permission(_)
                | Self::NotFound(_)
                | Self::Timeout(_)
                | Self::ChannelClosed(_)
        )
    }
}

impl Display for AppError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NameInUse(msg) => write!(f, "name in use: {msg}"),
            Self::Permission(msg) => write!(f, "permission denied: {msg}"),
            Self::NotFound(msg) => write!(f, "not found: {msg}"),
            Self::Timeout(msg) => write!(f, "timeout: {msg}"),
            Self::ChannelClosed(msg) => write!(f, "channel closed: {msg}"),
            Self::Config(msg) => write!(f, "config: {msg}"),
            Self::Protocol(msg) => write!(f, "protocol: {msg}"),
            Self::Handler(msg) => write!(f, "handler: {msg}"),
            Self::Io(msg) => write!(f, "io: {msg}"),
        }
    }
}

impl std::error::Error for AppError {}

impl From<io::Error> for AppError {
    fn from(err: io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::BrokenPipe
            | io::ErrorKind::ConnectionReset
            | io::ErrorKind::ConnectionAborted
            | io::ErrorKind::UnexpectedEof => Self::ChannelClosed(err.to_string()),
            io::ErrorKind::TimedOut => Self::Timeout(err.to_string()),
            _ => Self::Io(err.to_string()),
        }
    }
}

impl From<toml::de::Error> for AppError {
    fn from(err: toml::de::Error) -> Self {
        Self::Config(format!("invalid config: {err}"))
    }
}
