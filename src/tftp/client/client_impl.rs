use std::fs;
use std::io::{self, ErrorKind};
use std::net::{SocketAddr, ToSocketAddrs, UdpSocket};
use std::path::Path;

use anyhow::Context;

use super::config::ClientConfig;
use crate::tftp::core::options::{DEFAULT_RETRIES, DEFAULT_TIMEOUT};
use crate::tftp::core::{
    OCTET_MODE, Packet, PeerSocket, Session, Socket, TransferError, TransferOptions,
};

/// TFTP client
///
/// Supports file upload (PUT) and download (GET) operations in octet mode.
pub struct Client {
    server: SocketAddr,
    options: TransferOptions,
}

impl Client {
    /// Create a new TFTP client
    pub fn new(config: ClientConfig) -> anyhow::Result<Self> {
        let host = config
            .server
            .ok_or_else(|| anyhow::anyhow!("Server address not specified"))?;
        let port = config.port.unwrap_or(69);
        let server = (host.as_str(), port)
            .to_socket_addrs()
            .with_context(|| format!("Invalid server address '{}'", host))?
            .next()
            .ok_or_else(|| anyhow::anyhow!("No address found for '{}'", host))?;

        let timeout = config.timeout.unwrap_or(DEFAULT_TIMEOUT);
        if timeout.is_zero() {
            anyhow::bail!("timeout must be greater than zero");
        }

        Ok(Self {
            server,
            options: TransferOptions::new(timeout, config.retries.unwrap_or(DEFAULT_RETRIES)),
        })
    }

    pub fn server_addr(&self) -> SocketAddr {
        self.server
    }

    /// Download a file from the server (RRQ - Read Request)
    pub fn get(&self, remote_file: &str, local_file: &Path) -> anyhow::Result<()> {
        log::info!("Downloading {} to {}", remote_file, local_file.display());

        let data = self.download(remote_file)?;
        fs::write(local_file, &data)
            .with_context(|| format!("Failed to write {}", local_file.display()))?;

        log::info!("Download complete: {} bytes", data.len());
        Ok(())
    }

    /// Upload a file to the server (WRQ - Write Request)
    pub fn put(&self, local_file: &Path, remote_file: &str) -> anyhow::Result<()> {
        log::info!("Uploading {} to {}", local_file.display(), remote_file);

        let data = fs::read(local_file)
            .with_context(|| format!("Failed to read {}", local_file.display()))?;
        self.upload(&data, remote_file)?;

        log::info!("Upload complete: {} bytes", data.len());
        Ok(())
    }

    /// Fetches `remote_file` into memory.
    pub fn download(&self, remote_file: &str) -> Result<Vec<u8>, TransferError> {
        let socket = self.bind()?;
        let rrq = Packet::Rrq {
            filename: remote_file.to_string(),
            mode: OCTET_MODE.to_string(),
        };

        let (first, peer) = self.request(&socket, &rrq)?;
        match first {
            Packet::Data { block_num: 1, .. } => {}
            Packet::Data { block_num, .. } => {
                return Err(TransferError::BlockMismatch {
                    expected: 1,
                    got: block_num,
                });
            }
            other => return Err(TransferError::UnexpectedPacket(other.opcode())),
        }

        // A retransmitted request may start a second transfer on the server.
        let socket = PeerSocket::new(socket, peer).tolerate_strays();
        let session = Session::new(socket, self.options)?;
        session.receive_file(None, Some(first))
    }

    /// Stores `data` on the server as `remote_file`.
    pub fn upload(&self, data: &[u8], remote_file: &str) -> Result<(), TransferError> {
        let socket = self.bind()?;
        let wrq = Packet::Wrq {
            filename: remote_file.to_string(),
            mode: OCTET_MODE.to_string(),
        };

        let (first, peer) = self.request(&socket, &wrq)?;
        match first {
            Packet::Ack(0) => {}
            Packet::Ack(n) => {
                return Err(TransferError::BlockMismatch {
                    expected: 0,
                    got: n,
                });
            }
            other => return Err(TransferError::UnexpectedPacket(other.opcode())),
        }

        // A retransmitted request may start a second transfer on the server.
        let socket = PeerSocket::new(socket, peer).tolerate_strays();
        let session = Session::new(socket, self.options)?;
        let blocks = session.send_file(data)?;
        log::debug!("Sent {} blocks to {}", blocks, peer);
        Ok(())
    }

    fn bind(&self) -> io::Result<UdpSocket> {
        let any = if self.server.is_ipv4() {
            "0.0.0.0:0"
        } else {
            "[::]:0"
        };
        let socket = UdpSocket::bind(any)?;
        socket.set_read_timeout(Some(self.options.timeout))?;
        Ok(socket)
    }

    /// Sends a request to the well-known port and waits for the first reply.
    /// The reply comes from the port the server picked for this transfer,
    /// which becomes the session peer.
    fn request(
        &self,
        socket: &UdpSocket,
        request: &Packet,
    ) -> Result<(Packet, SocketAddr), TransferError> {
        Socket::send_to(socket, request, &self.server)?;
        let mut timeouts = 0;

        loop {
            match Socket::recv_from(socket) {
                Ok((packet, from)) => {
                    if from.ip() != self.server.ip() {
                        log::debug!("Ignoring packet from unknown host {}", from);
                        continue;
                    }
                    return match packet? {
                        Packet::Error { code, msg } => Err(TransferError::PeerError { code, msg }),
                        packet => Ok((packet, from)),
                    };
                }
                Err(e) if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) => {
                    timeouts += 1;
                    if timeouts > self.options.retries {
                        return Err(TransferError::Timeout { attempts: timeouts });
                    }
                    log::warn!(
                        "Timeout, retrying... ({}/{})",
                        timeouts,
                        self.options.retries
                    );
                    Socket::send_to(socket, request, &self.server)?;
                }
                Err(e) => return Err(e.into()),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_client_requires_server() {
        assert!(Client::new(ClientConfig::default()).is_err());
    }

    #[test]
    fn test_client_resolves_address() {
        let client = Client::new(ClientConfig::new("127.0.0.1".to_string(), 6969)).unwrap();
        assert_eq!(client.server_addr(), "127.0.0.1:6969".parse::<SocketAddr>().unwrap());
    }

    #[test]
    fn test_request_times_out_without_server() {
        // Bound but never answers.
        let silent = UdpSocket::bind("127.0.0.1:0").unwrap();
        let config = ClientConfig::new("127.0.0.1".to_string(), silent.local_addr().unwrap().port())
            .with_timeout(Duration::from_millis(50))
            .with_retries(1);
        let client = Client::new(config).unwrap();

        assert!(matches!(
            client.download("missing"),
            Err(TransferError::Timeout { attempts: 2 })
        ));
    }
}
