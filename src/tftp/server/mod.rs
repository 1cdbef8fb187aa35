//! TFTP server implementation
//!
//! This module provides the TFTP server:
//! - `server`: the request dispatcher on the well-known port
//! - `worker`: one thread per transfer, serving reads and writes
//! - `config`: server configuration

pub mod config;
mod server_impl;
mod worker;

use anyhow::Result;
use std::path::PathBuf;

pub use config::Config;
pub use server_impl::Server;
pub use worker::{Direction, Worker};

/// Run the TFTP server with CLI arguments and optional configuration
pub fn run_with_config(
    ip: Option<String>,
    port: Option<u16>,
    directory: Option<PathBuf>,
    config: Option<Config>,
) -> Result<()> {
    let config = config.unwrap_or_default().merge_cli(ip, port, directory);

    log::info!("Starting TFTP server on {}", config.bind_address());
    let server = Server::new(&config)?;

    log::info!("TFTP server listening, press Ctrl+C to stop");
    server.listen()
}
