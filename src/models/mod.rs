//! Domain model module declarations.

pub mod command;
pub mod endpoint;
pub mod reply;
