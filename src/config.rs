use log::info;
use serde::{Deserialize, Serialize};
use std::fs;

use crate::tftp::client::config::ClientConfig;
use crate::tftp::server::config::Config as TftpdConfig;

/// Name of the configuration file looked up in the working directory.
pub const CONFIG_FILE: &str = ".memtftp.toml";

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tftpd: Option<TftpdConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tftpc: Option<ClientConfig>,
}

impl AppConfig {
    pub fn load_from_file(path: &str) -> anyhow::Result<Self> {
        let content = fs::read_to_string(path)?;
        let config: AppConfig = toml::from_str(&content)?;
        Ok(config)
    }

    pub fn generate_config_file(force: bool) -> anyhow::Result<()> {
        if std::path::Path::new(CONFIG_FILE).exists() && !force {
            anyhow::bail!(
                "Configuration file {} already exists. Use --force to overwrite.",
                CONFIG_FILE
            );
        }

        fs::write(CONFIG_FILE, Self::generate_full_config()?)?;

        info!("Configuration file generated: {}", CONFIG_FILE);
        info!("Please edit this file to customize configuration");
        Ok(())
    }

    pub fn generate_full_config() -> anyhow::Result<String> {
        let config = AppConfig {
            tftpd: Some(TftpdConfig::with_defaults()),
            tftpc: Some(ClientConfig::new("127.0.0.1".to_string(), 69)),
        };
        let toml_content = toml::to_string_pretty(&config)?;
        Ok(format!(
            "# memtftp configuration file\n# All fields are optional, command line arguments override config file values\n\n{}",
            toml_content
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_generated_config_parses_back() {
        let content = AppConfig::generate_full_config().unwrap();
        let config: AppConfig = toml::from_str(&content).unwrap();

        let tftpd = config.tftpd.unwrap();
        assert_eq!(tftpd.port, Some(69));
        assert_eq!(tftpd.timeout, Some(Duration::from_secs(5)));
        assert_eq!(config.tftpc.unwrap().server.as_deref(), Some("127.0.0.1"));
    }

    #[test]
    fn test_partial_config() {
        let config: AppConfig = toml::from_str("[tftpd]\ndirectory = \"/srv/tftp\"\n").unwrap();
        assert!(config.tftpc.is_none());
        assert_eq!(
            config.tftpd.unwrap().directory,
            Some(std::path::PathBuf::from("/srv/tftp"))
        );
    }
}
