//! TFTP (Trivial File Transfer Protocol) implementation
//!
//! Implements [RFC 1350](https://www.rfc-editor.org/rfc/rfc1350) in octet
//! mode. Every transfer runs lock-step on its own ephemeral UDP socket, so
//! the well-known port only ever sees the initial RRQ/WRQ.
//!
//! ## Module layout
//!
//! ```text
//! tftp/
//! ├── core/           # protocol core
//! │   ├── packet      # packet serialization/deserialization
//! │   ├── socket      # socket abstraction, per-peer socket
//! │   ├── session     # lock-step DATA/ACK exchange
//! │   └── options     # timeout and retransmission policy
//! │
//! ├── store           # create-once file stores (memory, directory)
//! │
//! ├── server/         # TFTP server
//! │   ├── server      # request dispatcher
//! │   ├── worker      # one transfer per thread
//! │   └── config      # server configuration
//! │
//! └── client/         # TFTP client (get/put)
//! ```
//!
//! ## Starting a server
//!
//! ```rust,no_run
//! use memtftp::tftp::server::{Config, Server};
//!
//! let config = Config::default().merge_cli(Some("0.0.0.0".to_string()), Some(69), None);
//! let server = Server::new(&config).unwrap();
//! server.listen().unwrap();
//! ```

pub mod client;
pub mod core;
pub mod server;
pub mod store;
