//! Command protocol: request decoding, handler routing, and reply encoding.

pub mod codec;
pub mod handler;
