use std::sync::Arc;

use crate::catalog::MessageType;

/// All error types that can occur when talking to LIFX devices.
///
/// `Error` is [`Clone`] so that a single fatal socket failure can be handed to
/// every operation waiting on the connector.
#[derive(Debug, Clone, thiserror::Error)]
pub enum Error {
    /// A message could not be encoded; nothing was sent.
    #[error("encode error: {0}")]
    Encode(#[from] EncodeError),

    /// A datagram could not be decoded.
    #[error("decode error: {0}")]
    Decode(#[from] DecodeError),

    /// A network socket operation failed. Fatal for the connector.
    #[error("socket {action} error: {err:?}")]
    Socket {
        action: String,
        err: Arc<std::io::Error>,
    },

    /// No matching response arrived before the deadline.
    #[error("timed out waiting for a response")]
    Timeout,

    /// No device with the given identity is registered.
    #[error("device {0:#014x} not found")]
    NotFound(u64),

    /// The connector's read loop has stopped; no further responses can arrive.
    #[error("connector is closed")]
    Closed,
}

impl Error {
    /// Create a new socket error
    pub fn socket(action: &str, err: std::io::Error) -> Self {
        Error::Socket {
            action: action.to_string(),
            err: Arc::new(err),
        }
    }

    /// Whether this error leaves the connector unusable.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Error::Socket { .. } | Error::Closed)
    }
}

/// A payload or header violates a wire-format constraint.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EncodeError {
    #[error("label has length {0} > 32")]
    LabelTooLong(usize),

    #[error("power level {0} is not 0 or 65535")]
    InvalidPowerLevel(u16),

    #[error("color temperature {0} out of range (2500..9000)")]
    KelvinOutOfRange(u16),

    /// The message type is a device-to-client reply.
    #[error("message type {0} cannot be sent")]
    NotSendable(MessageType),

    #[error("message type {0} cannot be broadcast")]
    NotBroadcastable(MessageType),

    /// Identity zero is the broadcast target and cannot address one device.
    #[error("device identity 0 cannot be addressed directly")]
    ZeroTarget,
}

/// A datagram could not be turned into a [`crate::Message`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    #[error("truncated datagram: need {needed} bytes, have {have}")]
    Truncated { needed: usize, have: usize },

    /// The header size field is smaller than the header itself.
    #[error("invalid size field {0}")]
    BadSize(u16),

    #[error("unknown message type {0}")]
    UnknownType(u16),

    #[error("payload for {kind} too short: need {needed} bytes, have {have}")]
    PayloadTooShort {
        kind: MessageType,
        needed: usize,
        have: usize,
    },
}

/// Hacky implementation of PartialEq for testing
#[cfg(test)]
impl PartialEq for Error {
    fn eq(&self, other: &Self) -> bool {
        self.to_string() == other.to_string()
    }
}
