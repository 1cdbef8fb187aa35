//! Lock-step DATA/ACK exchange for a single transfer.
//!
//! Both directions keep exactly one packet in flight. The sender of DATA
//! waits for the matching ACK before moving on; the receiver ACKs every
//! block it accepts. A block shorter than [`MAX_DATA_SIZE`] ends the
//! transfer.

use std::net::{SocketAddr, UdpSocket};

use super::{MAX_DATA_SIZE, Packet, PeerSocket, Socket, TransferError, TransferOptions};

pub struct Session<S: Socket = UdpSocket> {
    socket: PeerSocket<S>,
    options: TransferOptions,
}

impl<S: Socket> Session<S> {
    pub fn new(socket: PeerSocket<S>, options: TransferOptions) -> Result<Self, TransferError> {
        socket.set_timeout(options.timeout)?;
        Ok(Self { socket, options })
    }

    pub fn peer(&self) -> SocketAddr {
        self.socket.remote_addr()
    }

    pub fn send(&self, packet: &Packet) -> Result<(), TransferError> {
        self.socket.send(packet)
    }

    /// Sends `data` as consecutive DATA blocks starting at block 1.
    ///
    /// Returns the number of blocks sent. A length that is a multiple of
    /// the block size (zero included) is terminated by an empty block.
    pub fn send_file(&self, data: &[u8]) -> Result<u64, TransferError> {
        let mut block_num: u16 = 1;
        let mut offset = 0;
        let mut blocks = 0u64;

        loop {
            let end = (offset + MAX_DATA_SIZE).min(data.len());
            let chunk = &data[offset..end];
            let packet = Packet::Data {
                block_num,
                data: chunk.to_vec(),
            };

            self.socket.send(&packet)?;
            self.await_ack(&packet, block_num)?;
            blocks += 1;
            offset = end;

            if chunk.len() < MAX_DATA_SIZE {
                return Ok(blocks);
            }
            block_num = block_num.wrapping_add(1);
        }
    }

    /// Accepts DATA blocks starting at block 1 and returns their payloads
    /// concatenated.
    ///
    /// `last_sent` is retransmitted if nothing arrives in time (the ACK 0
    /// of a write request). `first` is a DATA packet the caller already
    /// received while locating the peer.
    pub fn receive_file(
        &self,
        last_sent: Option<Packet>,
        first: Option<Packet>,
    ) -> Result<Vec<u8>, TransferError> {
        let mut buffer = Vec::new();
        let mut expected: u16 = 1;
        let mut accepted: Option<u16> = None;
        let mut last = last_sent;
        let mut pending = first;

        loop {
            let packet = match pending.take() {
                Some(packet) => packet,
                None => self.next_packet(last.as_ref())?,
            };
            let (block_num, data) = match packet {
                Packet::Data { block_num, data } => (block_num, data),
                other => return Err(TransferError::UnexpectedPacket(other.opcode())),
            };

            if block_num == expected {
                buffer.extend_from_slice(&data);
                let ack = Packet::Ack(block_num);
                self.socket.send(&ack)?;

                if data.len() < MAX_DATA_SIZE {
                    return Ok(buffer);
                }
                last = Some(ack);
                accepted = Some(block_num);
                expected = expected.wrapping_add(1);
            } else if accepted == Some(block_num) {
                // Our ACK was lost.
                log::debug!("Duplicate DATA {} from {}", block_num, self.peer());
                self.socket.send(&Packet::Ack(block_num))?;
            } else {
                return Err(TransferError::BlockMismatch {
                    expected,
                    got: block_num,
                });
            }
        }
    }

    fn await_ack(&self, sent: &Packet, block_num: u16) -> Result<(), TransferError> {
        loop {
            match self.next_packet(Some(sent))? {
                Packet::Ack(n) if n == block_num => return Ok(()),
                // Resending here would double every later block.
                Packet::Ack(n) if n == block_num.wrapping_sub(1) => {
                    log::debug!("Duplicate ACK {} from {}", n, self.peer());
                }
                Packet::Ack(n) => {
                    return Err(TransferError::BlockMismatch {
                        expected: block_num,
                        got: n,
                    });
                }
                other => return Err(TransferError::UnexpectedPacket(other.opcode())),
            }
        }
    }

    /// Waits for the next packet, resending `last` after each timeout.
    fn next_packet(&self, last: Option<&Packet>) -> Result<Packet, TransferError> {
        let mut timeouts = 0;

        loop {
            if let Some(packet) = self.socket.recv()? {
                return Ok(packet);
            }

            timeouts += 1;
            if timeouts > self.options.retries {
                return Err(TransferError::Timeout { attempts: timeouts });
            }

            log::warn!(
                "Timeout waiting for {}, retrying... ({}/{})",
                self.peer(),
                timeouts,
                self.options.retries
            );
            if let Some(packet) = last {
                self.socket.send(packet)?;
            }
        }
    }
}
