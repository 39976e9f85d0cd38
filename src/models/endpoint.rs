//! Endpoint name shared out of band by the daemon and its clients.

use std::fmt::{Display, Formatter};

use serde::{Deserialize, Deserializer};

use crate::{AppError, Result};

/// Opaque identifier of a local channel endpoint.
///
/// Never parsed; only checked for values no OS namespace accepts.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EndpointName(pub(crate) String);

impl EndpointName {
    /// Validate and wrap an endpoint name.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if the name is empty or contains a NUL byte.
    pub fn new(name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        if name.is_empty() {
            return Err(AppError::Config("endpoint name must not be empty".into()));
        }
        if name.contains('\0') {
            return Err(AppError::Config(format!(
                "endpoint name must not contain NUL bytes: {name:?}"
            )));
        }
        Ok(Self(name))
    }

    /// Borrow the name as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for EndpointName {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for EndpointName {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        Self::new(raw).map_err(serde::de::Error::custom)
    }
}
