//! Error types for the SUN decoding pipeline.
//!
//! The core only ever raises two kinds of failure: a malformed request that
//! never reaches any cryptographic code (`BadRequest`), and a cryptographically
//! invalid message (`InvalidMessage`). Both carry a short, generic string —
//! never which internal check failed, so a caller forwarding the message to
//! an HTTP client doesn't leak an oracle.

use thiserror::Error;

/// Error produced by the SUN decoding/verification pipeline.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum SdmError {
    /// The message failed a cryptographic check: bad MAC, unsupported encoding,
    /// invalid padding, or a policy violation (e.g. `require_lrp`).
    #[error("Invalid message (most probably wrong signature)")]
    InvalidMessage(&'static str),

    /// The request was malformed before any cryptography ran: missing
    /// parameter, bad hex, or an unrecognized length class.
    #[error("Failed to decode parameters")]
    BadRequest(&'static str),
}

impl SdmError {
    /// The component-internal detail string, useful for `tracing` at `debug`
    /// level. Never put this in a message shown to the party that sent the
    /// request.
    pub fn detail(&self) -> &'static str {
        match self {
            SdmError::InvalidMessage(d) | SdmError::BadRequest(d) => d,
        }
    }
}

pub type Result<T> = core::result::Result<T, SdmError>;
