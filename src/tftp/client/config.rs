use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::tftp::core::options::{DEFAULT_RETRIES, DEFAULT_TIMEOUT};

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ClientConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub server: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "humantime_serde")]
    pub timeout: Option<Duration>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retries: Option<u32>,
}

impl ClientConfig {
    pub fn new(server: String, port: u16) -> Self {
        Self {
            server: Some(server),
            port: Some(port),
            timeout: Some(DEFAULT_TIMEOUT),
            retries: Some(DEFAULT_RETRIES),
        }
    }

    /// Command line values win over values from the configuration file.
    pub fn merge_cli(
        mut self,
        cli_server: String,
        cli_port: Option<u16>,
        cli_timeout: Option<u64>,
    ) -> Self {
        self.server = Some(cli_server);
        if cli_port.is_some() {
            self.port = cli_port;
        }
        if let Some(secs) = cli_timeout {
            self.timeout = Some(Duration::from_secs(secs));
        }
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_retries(mut self, retries: u32) -> Self {
        self.retries = Some(retries);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge_cli() {
        let file: ClientConfig = toml::from_str("port = 6969\ntimeout = \"500ms\"").unwrap();
        let config = file.merge_cli("10.0.0.2".to_string(), None, None);

        assert_eq!(config.server.as_deref(), Some("10.0.0.2"));
        assert_eq!(config.port, Some(6969));
        assert_eq!(config.timeout, Some(Duration::from_millis(500)));
        assert_eq!(config.retries, None);

        let config = config.merge_cli("10.0.0.2".to_string(), Some(69), Some(3));
        assert_eq!(config.port, Some(69));
        assert_eq!(config.timeout, Some(Duration::from_secs(3)));
    }
}
