use std::time::Duration;

/// Default per-attempt receive timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Default number of retransmissions before a session gives up.
pub const DEFAULT_RETRIES: u32 = 5;

/// Local retransmission policy for a transfer session. Not negotiated with
/// the peer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferOptions {
    /// How long to wait for each reply.
    pub timeout: Duration,
    /// How many times the last packet is resent before giving up.
    pub retries: u32,
}

impl TransferOptions {
    pub fn new(timeout: Duration, retries: u32) -> Self {
        Self { timeout, retries }
    }
}

impl Default for TransferOptions {
    fn default() -> Self {
        Self::new(DEFAULT_TIMEOUT, DEFAULT_RETRIES)
    }
}
