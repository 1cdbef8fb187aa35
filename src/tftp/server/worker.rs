use std::io::{self, ErrorKind};
use std::net::{IpAddr, SocketAddr, UdpSocket};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crate::tftp::core::{
    ErrorCode, Packet, PeerSocket, Session, TransferError, TransferOptions, is_octet,
};
use crate::tftp::store::FileStore;

/// Direction of a transfer, seen from the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// RRQ: the server sends a stored file.
    Read,
    /// WRQ: the server receives a new file.
    Write,
}

/// Serves one accepted request on its own ephemeral socket.
pub struct Worker {
    direction: Direction,
    filename: String,
    mode: String,
    peer: SocketAddr,
    local_ip: IpAddr,
    store: Arc<dyn FileStore>,
    options: TransferOptions,
}

impl Worker {
    /// Builds a worker for an RRQ or WRQ. Any other packet yields `None`.
    pub fn from_request(
        packet: Packet,
        peer: SocketAddr,
        local_ip: IpAddr,
        store: Arc<dyn FileStore>,
        options: TransferOptions,
    ) -> Option<Self> {
        let (direction, filename, mode) = match packet {
            Packet::Rrq { filename, mode } => (Direction::Read, filename, mode),
            Packet::Wrq { filename, mode } => (Direction::Write, filename, mode),
            _ => return None,
        };

        Some(Self {
            direction,
            filename,
            mode,
            peer,
            local_ip,
            store,
            options,
        })
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn filename(&self) -> &str {
        &self.filename
    }

    /// Runs the transfer on a dedicated thread.
    pub fn spawn(self) -> io::Result<JoinHandle<()>> {
        thread::Builder::new()
            .name(format!("tftp-{}", self.peer))
            .spawn(move || self.run())
    }

    /// Runs the transfer to completion. Failures stay inside the session
    /// and are only logged.
    pub fn run(self) {
        if let Err(e) = self.serve() {
            warn!(
                "{:?} of '{}' with {} failed: {}",
                self.direction, self.filename, self.peer, e
            );
        }
    }

    fn serve(&self) -> Result<(), TransferError> {
        let socket = UdpSocket::bind(SocketAddr::new(self.local_ip, 0))?;
        let session = Session::new(PeerSocket::new(socket, self.peer), self.options)?;

        if !is_octet(&self.mode) {
            session.send(&Packet::Error {
                code: ErrorCode::NotDefined,
                msg: format!("unsupported mode '{}'", self.mode),
            })?;
            return Err(TransferError::UnsupportedMode(self.mode.clone()));
        }

        match self.direction {
            Direction::Read => self.send_file(&session),
            Direction::Write => self.receive_file(&session),
        }
    }

    fn send_file(&self, session: &Session) -> Result<(), TransferError> {
        let data = match self.store.fetch(&self.filename) {
            Ok(Some(data)) => data,
            Ok(None) => {
                info!("'{}' requested by {} not found", self.filename, self.peer);
                return session.send(&Packet::error(ErrorCode::FileNotFound));
            }
            Err(e) => {
                session.send(&store_error(&e))?;
                return Err(e.into());
            }
        };

        let blocks = session.send_file(&data)?;
        info!(
            "Sent '{}' to {} ({} bytes, {} blocks)",
            self.filename,
            self.peer,
            data.len(),
            blocks
        );
        Ok(())
    }

    fn receive_file(&self, session: &Session) -> Result<(), TransferError> {
        match self.store.contains(&self.filename) {
            Ok(false) => {}
            Ok(true) => {
                info!("'{}' from {} already exists", self.filename, self.peer);
                return session.send(&Packet::error(ErrorCode::FileAlreadyExists));
            }
            Err(e) => {
                session.send(&store_error(&e))?;
                return Err(e.into());
            }
        }

        let ack = Packet::Ack(0);
        session.send(&ack)?;
        let data = session.receive_file(Some(ack), None)?;
        let len = data.len();

        // The peer has every ACK by now; a lost race cannot be reported.
        match self.store.put_if_absent(&self.filename, data) {
            Ok(true) => info!(
                "Received '{}' from {} ({} bytes)",
                self.filename, self.peer, len
            ),
            Ok(false) => warn!(
                "'{}' was stored by another transfer first, discarding {} bytes from {}",
                self.filename, len, self.peer
            ),
            Err(e) => error!("Failed to store '{}': {}", self.filename, e),
        }
        Ok(())
    }
}

/// Maps a store failure to the ERROR packet reported to the peer.
fn store_error(e: &io::Error) -> Packet {
    match e.kind() {
        ErrorKind::PermissionDenied => Packet::error(ErrorCode::AccessViolation),
        _ => Packet::Error {
            code: ErrorCode::NotDefined,
            msg: e.to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tftp::store::MemoryStore;
    use std::net::Ipv4Addr;

    fn worker_for(packet: Packet) -> Option<Worker> {
        Worker::from_request(
            packet,
            "127.0.0.1:4000".parse().unwrap(),
            IpAddr::V4(Ipv4Addr::LOCALHOST),
            Arc::new(MemoryStore::new()),
            TransferOptions::default(),
        )
    }

    #[test]
    fn test_only_requests_start_workers() {
        let rrq = worker_for(Packet::Rrq {
            filename: "a".to_string(),
            mode: "octet".to_string(),
        })
        .unwrap();
        assert_eq!(rrq.direction(), Direction::Read);
        assert_eq!(rrq.filename(), "a");

        let wrq = worker_for(Packet::Wrq {
            filename: "b".to_string(),
            mode: "octet".to_string(),
        })
        .unwrap();
        assert_eq!(wrq.direction(), Direction::Write);

        assert!(worker_for(Packet::Ack(0)).is_none());
        assert!(worker_for(Packet::error(ErrorCode::NotDefined)).is_none());
    }

    #[test]
    fn test_store_error_mapping() {
        let denied = io::Error::new(ErrorKind::PermissionDenied, "nope");
        assert_eq!(store_error(&denied), Packet::error(ErrorCode::AccessViolation));

        let other = io::Error::other("disk on fire");
        assert_eq!(
            store_error(&other),
            Packet::Error {
                code: ErrorCode::NotDefined,
                msg: "disk on fire".to_string()
            }
        );
    }
}
