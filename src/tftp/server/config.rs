use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::tftp::core::options::{DEFAULT_RETRIES, DEFAULT_TIMEOUT};
use crate::tftp::core::TransferOptions;

/// TFTP server configuration, as found in the `[tftpd]` table of the
/// configuration file. Unset fields fall back to their defaults.
///
/// # Example
///
/// ```rust
/// use memtftp::tftp::server::Config;
///
/// let config = Config::default().merge_cli(Some("127.0.0.1".to_string()), Some(6969), None);
/// assert_eq!(config.port, Some(6969));
/// assert!(config.directory.is_none());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// IP address to listen on
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ip: Option<String>,
    /// Well-known port
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
    /// Serve files from this directory instead of memory
    #[serde(skip_serializing_if = "Option::is_none")]
    pub directory: Option<PathBuf>,
    /// Per-attempt receive timeout
    #[serde(default, skip_serializing_if = "Option::is_none", with = "humantime_serde")]
    pub timeout: Option<Duration>,
    /// Retransmissions before a transfer is abandoned
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retries: Option<u32>,
}

impl Config {
    pub fn with_defaults() -> Self {
        Self {
            ip: Some("0.0.0.0".to_string()),
            port: Some(69),
            directory: None,
            timeout: Some(DEFAULT_TIMEOUT),
            retries: Some(DEFAULT_RETRIES),
        }
    }

    /// Command line values win over values from the configuration file.
    pub fn merge_cli(
        mut self,
        cli_ip: Option<String>,
        cli_port: Option<u16>,
        cli_directory: Option<PathBuf>,
    ) -> Self {
        if cli_ip.is_some() {
            self.ip = cli_ip;
        }
        if cli_port.is_some() {
            self.port = cli_port;
        }
        if cli_directory.is_some() {
            self.directory = cli_directory;
        }
        self
    }

    /// `ip:port` to bind the well-known socket to.
    pub fn bind_address(&self) -> String {
        let ip = self.ip.as_deref().unwrap_or("0.0.0.0");
        let port = self.port.unwrap_or(69);
        if ip.contains(':') {
            format!("[{}]:{}", ip, port)
        } else {
            format!("{}:{}", ip, port)
        }
    }

    pub fn transfer_options(&self) -> anyhow::Result<TransferOptions> {
        let timeout = self.timeout.unwrap_or(DEFAULT_TIMEOUT);
        if timeout.is_zero() {
            anyhow::bail!("timeout must be greater than zero");
        }
        Ok(TransferOptions::new(
            timeout,
            self.retries.unwrap_or(DEFAULT_RETRIES),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.bind_address(), "0.0.0.0:69");
        assert_eq!(config.transfer_options().unwrap(), TransferOptions::default());
    }

    #[test]
    fn test_cli_overrides_file() {
        let file: Config = toml::from_str(
            r#"
            ip = "10.0.0.1"
            port = 6969
            timeout = "2s"
            retries = 3
            "#,
        )
        .unwrap();

        let config = file.merge_cli(None, Some(7000), Some(PathBuf::from("/srv/tftp")));
        assert_eq!(config.bind_address(), "10.0.0.1:7000");
        assert_eq!(config.directory, Some(PathBuf::from("/srv/tftp")));
        assert_eq!(
            config.transfer_options().unwrap(),
            TransferOptions::new(Duration::from_secs(2), 3)
        );
    }

    #[test]
    fn test_ipv6_bind_address() {
        let config = Config::default().merge_cli(Some("::1".to_string()), Some(69), None);
        assert_eq!(config.bind_address(), "[::1]:69");
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let config = Config {
            timeout: Some(Duration::ZERO),
            ..Config::default()
        };
        assert!(config.transfer_options().is_err());
    }
}
