use super::{ErrorCode, MAX_PACKET_SIZE, Packet, TransferError};
use std::{
    io::{self, ErrorKind},
    net::{SocketAddr, UdpSocket},
    time::Duration,
};

/// Socket `trait` is used to allow building custom sockets to be used for
/// TFTP communication.
pub trait Socket: Send + Sync + 'static {
    /// Sends a [`Packet`] to the specified remote address.
    fn send_to(&self, packet: &Packet, to: &SocketAddr) -> Result<(), TransferError>;
    /// Receives one raw datagram into `buf` and returns its length and origin.
    fn recv_datagram(&self, buf: &mut [u8]) -> io::Result<(usize, SocketAddr)>;
    /// Receives a [`Packet`] from any remote and returns the sender's
    /// [`SocketAddr`] next to the decode result, so callers can log or
    /// reject the datagram by origin before looking at its contents.
    fn recv_from(&self) -> io::Result<(Result<Packet, TransferError>, SocketAddr)> {
        // One spare byte so an oversized datagram is not cut to a valid size.
        let mut buf = [0u8; MAX_PACKET_SIZE + 1];
        let (amt, addr) = self.recv_datagram(&mut buf)?;
        let packet = Packet::deserialize(&buf[..amt]).map_err(TransferError::from);

        Ok((packet, addr))
    }
    /// Returns the local [`SocketAddr`].
    fn local_addr(&self) -> io::Result<SocketAddr>;
    /// Sets the read timeout for the [`Socket`]. `None` blocks forever.
    fn set_read_timeout(&self, dur: Option<Duration>) -> io::Result<()>;
}

impl Socket for UdpSocket {
    fn send_to(&self, packet: &Packet, to: &SocketAddr) -> Result<(), TransferError> {
        UdpSocket::send_to(self, &packet.serialize()?, to)?;

        Ok(())
    }

    fn recv_datagram(&self, buf: &mut [u8]) -> io::Result<(usize, SocketAddr)> {
        UdpSocket::recv_from(self, buf)
    }

    fn local_addr(&self) -> io::Result<SocketAddr> {
        UdpSocket::local_addr(self)
    }

    fn set_read_timeout(&self, dur: Option<Duration>) -> io::Result<()> {
        UdpSocket::set_read_timeout(self, dur)
    }
}

/// PeerSocket `struct` ties a private [`Socket`] to the one remote address
/// a transfer talks to. Datagrams from anywhere else are answered with
/// `UnknownTransferId`; by default they also fail the session, while a
/// socket built with [`PeerSocket::tolerate_strays`] keeps waiting.
///
/// # Example
///
/// ```rust,no_run
/// use std::net::{SocketAddr, UdpSocket};
/// use memtftp::tftp::core::{Packet, PeerSocket};
///
/// let remote: SocketAddr = "127.0.0.1:50000".parse().unwrap();
/// let socket = PeerSocket::new(UdpSocket::bind("127.0.0.1:0").unwrap(), remote);
/// socket.send(&Packet::Ack(1)).unwrap();
/// ```
pub struct PeerSocket<S: Socket = UdpSocket> {
    socket: S,
    remote: SocketAddr,
    tolerate_strays: bool,
}

impl<S: Socket> PeerSocket<S> {
    /// Creates a new [`PeerSocket`] from a [`Socket`] and a remote [`SocketAddr`].
    pub fn new(socket: S, remote: SocketAddr) -> Self {
        Self {
            socket,
            remote,
            tolerate_strays: false,
        }
    }

    /// Keeps the session alive when a foreign address sends a datagram.
    /// Clients need this: a retransmitted request can make the server start
    /// a second transfer that answers from another port.
    pub fn tolerate_strays(mut self) -> Self {
        self.tolerate_strays = true;
        self
    }

    pub fn remote_addr(&self) -> SocketAddr {
        self.remote
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.socket.local_addr()
    }

    pub fn set_timeout(&self, timeout: Duration) -> io::Result<()> {
        self.socket.set_read_timeout(Some(timeout))
    }

    /// Sends a [`Packet`] to the session peer.
    pub fn send(&self, packet: &Packet) -> Result<(), TransferError> {
        self.socket.send_to(packet, &self.remote)
    }

    /// Waits for the next [`Packet`] from the session peer.
    ///
    /// Returns `Ok(None)` when the read timeout expires. An ERROR packet from
    /// the peer ends the session and is returned as
    /// [`TransferError::PeerError`]. A datagram from a foreign address is
    /// answered with `UnknownTransferId` and fails the session unless strays
    /// are tolerated.
    pub fn recv(&self) -> Result<Option<Packet>, TransferError> {
        loop {
            let (packet, addr) = match self.socket.recv_from() {
                Ok(received) => received,
                Err(e) if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) => {
                    return Ok(None);
                }
                Err(e) => return Err(e.into()),
            };

            if addr != self.remote {
                self.reject(addr, &packet);
                if self.tolerate_strays {
                    log::debug!("Ignoring datagram from {}, peer is {}", addr, self.remote);
                    continue;
                }
                return Err(TransferError::PeerMismatch {
                    expected: self.remote,
                    got: addr,
                });
            }

            return match packet? {
                Packet::Error { code, msg } => Err(TransferError::PeerError { code, msg }),
                packet => Ok(Some(packet)),
            };
        }
    }

    fn reject(&self, addr: SocketAddr, packet: &Result<Packet, TransferError>) {
        // Never answer an ERROR with an ERROR.
        if matches!(packet, Ok(Packet::Error { .. })) {
            return;
        }
        if let Err(e) = self
            .socket
            .send_to(&Packet::error(ErrorCode::UnknownTransferId), &addr)
        {
            log::debug!("Failed to reject stray datagram from {}: {}", addr, e);
        }
    }
}
