//! Whole-message framing over local socket byte streams.
//!
//! Wraps [`tokio_util::codec::LengthDelimitedCodec`] (4-byte big-endian
//! length header) with a configurable maximum message size so that each
//! decoded item is exactly one raw message as the peer sent it.
//!
//! # Usage
//!
//! Use [`MessageCodec`] as the codec parameter for
//! [`tokio_util::codec::FramedRead`] (inbound) and
//! [`tokio_util::codec::FramedWrite`] (outbound).
//!
//! ```rust,ignore
//! use tokio_util::codec::FramedRead;
//! use zxtouch_ipc::ipc::framing::MessageCodec;
//!
//! let reader = FramedRead::new(recv_half, MessageCodec::new(65_536));
//! ```

use std::io;

use bytes::{Bytes, BytesMut};
use tokio_util::codec::{Decoder, Encoder, LengthDelimitedCodec, LengthDelimitedCodecError};

use crate::{AppError, Result};

/// Length-delimited codec for raw channel messages.
///
/// # Decoder
///
/// Inbound frames longer than the configured limit return
/// [`AppError::Protocol`]`("message too large: …")` rather than allocating.
/// I/O errors go through `From<io::Error> for AppError`.
///
/// # Encoder
///
/// Outbound messages longer than the limit are rejected with the same
/// error before anything is written to the destination buffer.
#[derive(Debug)]
pub struct MessageCodec {
    inner: LengthDelimitedCodec,
    max_message_bytes: usize,
    // A length header has been consumed but its body is incomplete.
    in_frame: bool,
}

impl MessageCodec {
    /// Create a codec accepting messages up to `max_message_bytes`.
    #[must_use]
    pub fn new(max_message_bytes: usize) -> Self {
        let inner = LengthDelimitedCodec::builder()
            .max_frame_length(max_message_bytes)
            .new_codec();
        Self {
            inner,
            max_message_bytes,
            in_frame: false,
        }
    }

    /// Configured message size limit.
    #[must_use]
    pub fn max_message_bytes(&self) -> usize {
        self.max_message_bytes
    }

    fn map_error(&self, err: io::Error) -> AppError {
        let oversize = err
            .get_ref()
            .is_some_and(|inner| inner.is::<LengthDelimitedCodecError>());
        if oversize {
            AppError::Protocol(format!(
                "message too large: exceeded {} bytes",
                self.max_message_bytes
            ))
        } else {
            AppError::from(err)
        }
    }
}

impl Decoder for MessageCodec {
    type Item = BytesMut;
    type Error = AppError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>> {
        let before = src.len();
        let frame = self.inner.decode(src).map_err(|err| self.map_error(err))?;
        self.in_frame = match frame {
            Some(_) => false,
            None => self.in_frame || src.len() < before,
        };
        Ok(frame)
    }

    /// A peer that hangs up mid-message is reported as a closed channel.
    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>> {
        match self.decode(src)? {
            Some(frame) => Ok(Some(frame)),
            None if src.is_empty() && !self.in_frame => Ok(None),
            None => Err(AppError::ChannelClosed(
                "peer closed in the middle of a message".into(),
            )),
        }
    }
}

impl Encoder<Bytes> for MessageCodec {
    type Error = AppError;

    fn encode(&mut self, item: Bytes, dst: &mut BytesMut) -> Result<()> {
        if item.len() > self.max_message_bytes {
            return Err(AppError::Protocol(format!(
                "message too large: {} bytes exceeds {} bytes",
                item.len(),
                self.max_message_bytes
            )));
        }
        self.inner.encode(item, dst).map_err(AppError::from)
    }
}
