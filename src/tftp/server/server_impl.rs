use std::io::ErrorKind;
use std::net::{IpAddr, SocketAddr, UdpSocket};
use std::sync::Arc;

use anyhow::{Context, Result};

use super::Config;
use super::worker::Worker;
use crate::tftp::core::{Packet, Socket, TransferOptions};
use crate::tftp::store::{DirStore, FileStore, MemoryStore};

/// TFTP request dispatcher.
///
/// Owns the well-known socket. Every RRQ or WRQ that arrives there is handed
/// to a [`Worker`] with its own thread and ephemeral socket, so the listening
/// loop never carries transfer traffic.
pub struct Server {
    socket: UdpSocket,
    store: Arc<dyn FileStore>,
    options: TransferOptions,
}

impl Server {
    /// Binds the well-known socket. The store is a [`DirStore`] when a
    /// directory is configured and a [`MemoryStore`] otherwise.
    pub fn new(config: &Config) -> Result<Self> {
        let store: Arc<dyn FileStore> = match &config.directory {
            Some(dir) => {
                let store = DirStore::new(dir)
                    .with_context(|| format!("Failed to open store {}", dir.display()))?;
                info!("Serving files from {}", store.root().display());
                Arc::new(store)
            }
            None => {
                info!("Serving files from memory");
                Arc::new(MemoryStore::new())
            }
        };
        Self::with_store(config, store)
    }

    pub fn with_store(config: &Config, store: Arc<dyn FileStore>) -> Result<Self> {
        let address = config.bind_address();
        let socket = UdpSocket::bind(&address)
            .with_context(|| format!("Failed to bind TFTP server socket {}", address))?;

        Ok(Self {
            socket,
            store,
            options: config.transfer_options()?,
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.socket.local_addr()?)
    }

    /// Serves requests until the well-known socket fails.
    pub fn listen(&self) -> Result<()> {
        let local_ip = self.local_addr()?.ip();
        info!("TFTP server listening on {}", self.local_addr()?);

        loop {
            let (packet, peer) = match Socket::recv_from(&self.socket) {
                Ok(received) => received,
                // ICMP port unreachable from an earlier peer on some platforms.
                Err(e) if e.kind() == ErrorKind::ConnectionReset => continue,
                Err(e) => return Err(e).context("Failed to receive on TFTP server socket"),
            };

            match packet {
                Ok(packet) => self.dispatch(packet, peer, local_ip),
                Err(e) => debug!("Dropping malformed packet from {}: {}", peer, e),
            }
        }
    }

    fn dispatch(&self, packet: Packet, peer: SocketAddr, local_ip: IpAddr) {
        let opcode = packet.opcode();
        let Some(worker) = Worker::from_request(
            packet,
            peer,
            local_ip,
            Arc::clone(&self.store),
            self.options,
        ) else {
            debug!("Ignoring {} from {} on the listening port", opcode, peer);
            return;
        };

        info!(
            "{} for '{}' from {}",
            opcode,
            worker.filename(),
            peer
        );
        if let Err(e) = worker.spawn() {
            error!("Failed to start transfer for {}: {}", peer, e);
        }
    }
}
