//! TFTP client implementation
//!
//! This module provides TFTP client functionality:
//! - File download (GET/RRQ)
//! - File upload (PUT/WRQ)
//! - Octet mode only, with timeout driven retransmission
//!
//! # Usage Examples
//!
//! ## Download file
//!
//! ```rust,no_run
//! use memtftp::tftp::client::Client;
//! use memtftp::tftp::client::config::ClientConfig;
//! use std::path::Path;
//!
//! let config = ClientConfig::new("192.168.1.100".to_string(), 69);
//! let client = Client::new(config).unwrap();
//! client.get("remote.txt", Path::new("local.txt")).unwrap();
//! ```
//!
//! ## Upload file
//!
//! ```rust,no_run
//! use memtftp::tftp::client::Client;
//! use memtftp::tftp::client::config::ClientConfig;
//! use std::path::Path;
//!
//! let config = ClientConfig::new("192.168.1.100".to_string(), 69);
//! let client = Client::new(config).unwrap();
//! client.put(Path::new("local.txt"), "remote.txt").unwrap();
//! ```
//!
//! # Command Line Usage
//!
//! ```bash
//! # Download file
//! memtftp tftpc get 192.168.1.100 remote.txt [local.txt]
//!
//! # Upload file
//! memtftp tftpc put 192.168.1.100 local.txt [remote.txt]
//! ```

mod client_impl;
pub mod config;

use anyhow::Result;
use clap::Subcommand;
use std::path::PathBuf;

pub use client_impl::Client;

#[derive(Subcommand)]
pub enum TftpcAction {
    /// Download a file from TFTP server (RRQ)
    Get {
        /// Server IP address or hostname
        server: String,

        /// Remote file name on server
        remote_file: String,

        /// Local file path (defaults to remote file name)
        #[arg(value_name = "LOCAL_FILE")]
        local_file: Option<PathBuf>,

        /// Server port [default: 69]
        #[arg(short, long)]
        port: Option<u16>,

        /// Timeout in seconds [default: 5]
        #[arg(short, long)]
        timeout: Option<u64>,
    },

    /// Upload a file to TFTP server (WRQ)
    Put {
        /// Server IP address or hostname
        server: String,

        /// Local file path to upload
        local_file: PathBuf,

        /// Remote file name on server (defaults to local file name)
        #[arg(value_name = "REMOTE_FILE")]
        remote_file: Option<String>,

        /// Server port [default: 69]
        #[arg(short, long)]
        port: Option<u16>,

        /// Timeout in seconds [default: 5]
        #[arg(short, long)]
        timeout: Option<u64>,
    },
}

/// Run TFTP client command with configuration
pub fn run_with_config(action: TftpcAction, config: Option<&config::ClientConfig>) -> Result<()> {
    let file_config = config.cloned().unwrap_or_default();

    match action {
        TftpcAction::Get {
            server,
            remote_file,
            local_file,
            port,
            timeout,
        } => {
            let cfg = file_config.merge_cli(server, port, timeout);
            let local_path = local_file.unwrap_or_else(|| {
                PathBuf::from(
                    std::path::Path::new(&remote_file)
                        .file_name()
                        .unwrap_or(remote_file.as_ref()),
                )
            });

            let client = Client::new(cfg)?;
            log::info!("Downloading {} from {}", remote_file, client.server_addr());
            client.get(&remote_file, &local_path)?;

            log::info!("Download completed successfully");
        }

        TftpcAction::Put {
            server,
            local_file,
            remote_file,
            port,
            timeout,
        } => {
            let cfg = file_config.merge_cli(server, port, timeout);

            if !local_file.exists() {
                log::error!("Local file does not exist: {}", local_file.display());
                return Err(anyhow::anyhow!("Local file does not exist"));
            }

            let remote_name = remote_file.unwrap_or_else(|| {
                local_file
                    .file_name()
                    .and_then(|n| n.to_str())
                    .unwrap_or("file")
                    .to_string()
            });

            let client = Client::new(cfg)?;
            log::info!(
                "Uploading {} to {} as {}",
                local_file.display(),
                client.server_addr(),
                remote_name
            );
            client.put(&local_file, &remote_name)?;

            log::info!("Upload completed successfully");
        }
    }
    Ok(())
}
