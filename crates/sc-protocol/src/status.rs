//! Backend status codes

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::ProtocolError;

/// Health of a supervised collector as reported upstream.
///
/// Sent as a small integer on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum BackendStatus {
    /// Collector process is up
    Running,
    /// Nothing is known yet (registered, never started)
    Unknown,
    /// Collector failed to start, crashed, or has an invalid configuration
    Failing,
    /// Collector was stopped on purpose
    Stopped,
}

impl BackendStatus {
    /// Wire code for this status
    pub fn code(self) -> u8 {
        match self {
            BackendStatus::Running => 0,
            BackendStatus::Unknown => 1,
            BackendStatus::Failing => 2,
            BackendStatus::Stopped => 3,
        }
    }
}

impl From<BackendStatus> for u8 {
    fn from(status: BackendStatus) -> Self {
        status.code()
    }
}

impl TryFrom<u8> for BackendStatus {
    type Error = ProtocolError;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        match code {
            0 => Ok(BackendStatus::Running),
            1 => Ok(BackendStatus::Unknown),
            2 => Ok(BackendStatus::Failing),
            3 => Ok(BackendStatus::Stopped),
            other => Err(ProtocolError::UnknownStatus(other)),
        }
    }
}

impl fmt::Display for BackendStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendStatus::Running => write!(f, "running"),
            BackendStatus::Unknown => write!(f, "unknown"),
            BackendStatus::Failing => write!(f, "failing"),
            BackendStatus::Stopped => write!(f, "stopped"),
        }
    }
}
