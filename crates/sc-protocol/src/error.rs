//! Protocol error types

use thiserror::Error;

/// Errors that can occur while decoding payloads
#[derive(Error, Debug)]
pub enum ProtocolError {
    /// Response body is not a valid message
    #[error("Malformed payload: {0}")]
    Decode(#[source] serde_json::Error),

    /// Status code outside the known range
    #[error("Unknown backend status code: {0}")]
    UnknownStatus(u8),
}
