//! Error types for the TFTP core.

use std::io;
use std::net::SocketAddr;

use thiserror::Error;

use super::packet::{ErrorCode, Opcode};

/// Failure to encode or decode a single datagram.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FrameError {
    /// The opcode matches none of the five known packet types.
    #[error("unknown opcode {0}")]
    UnknownOpcode(u16),

    /// The datagram ended in the middle of a field.
    #[error("truncated frame")]
    TruncatedFrame,

    /// Unexpected trailing bytes, an undefined error code or non UTF-8 text.
    #[error("malformed frame")]
    MalformedFrame,

    /// A field cannot be represented on the wire.
    #[error("invalid {0} field")]
    InvalidField(&'static str),
}

/// Failure of a single transfer session.
///
/// None of these ever reach the dispatcher: the owning worker logs them
/// and exits.
#[derive(Debug, Error)]
pub enum TransferError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("frame error: {0}")]
    Frame(#[from] FrameError),

    /// A datagram arrived from an address other than the session peer.
    #[error("expected packet from {expected}, got one from {got}")]
    PeerMismatch { expected: SocketAddr, got: SocketAddr },

    #[error("unexpected {0} packet")]
    UnexpectedPacket(Opcode),

    #[error("expected block {expected}, got {got}")]
    BlockMismatch { expected: u16, got: u16 },

    /// The remote side aborted the transfer with an ERROR packet.
    #[error("peer reported {code}: {msg}")]
    PeerError { code: ErrorCode, msg: String },

    #[error("no reply after {attempts} attempts")]
    Timeout { attempts: u32 },

    #[error("unsupported transfer mode '{0}'")]
    UnsupportedMode(String),
}
