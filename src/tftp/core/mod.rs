//! TFTP core protocol implementation
//!
//! This module contains the building blocks shared by server and client:
//! - `packet`: packet serialization and deserialization
//! - `socket`: socket abstraction and the per-peer transfer socket
//! - `session`: the lock-step DATA/ACK state machine
//! - `options`: local timeout and retransmission policy
//! - `error`: codec and session error types

mod error;
pub mod options;
mod packet;
mod session;
mod socket;

pub use error::{FrameError, TransferError};
pub use options::TransferOptions;
pub use packet::{
    ErrorCode, MAX_DATA_SIZE, MAX_PACKET_SIZE, OCTET_MODE, Opcode, Packet, is_octet,
};
pub use session::Session;
pub use socket::{PeerSocket, Socket};
