//! Application configuration
//!
//! Loaded from a TOML file when one is given, otherwise defaults to a
//! loopback call on the standard port with opus both ways.

use std::net::{IpAddr, Ipv4Addr};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Default RTP port; the RTCP port is always the next one up.
pub const DEFAULT_RTP_PORT: u16 = 5000;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Local IP to bind; when absent the address resolver picks one
    pub local_ip: Option<IpAddr>,
    pub rtp_port: u16,
    pub remote_ip: IpAddr,
    pub remote_rtp_port: u16,
    /// Codec name for the send direction
    pub encoder: String,
    /// Codec names accepted on the receive direction
    pub decoders: Vec<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            local_ip: None,
            rtp_port: DEFAULT_RTP_PORT,
            remote_ip: IpAddr::V4(Ipv4Addr::LOCALHOST),
            remote_rtp_port: DEFAULT_RTP_PORT,
            encoder: "opus".to_string(),
            decoders: vec!["opus".to_string(), "PCMU".to_string(), "PCMA".to_string()],
        }
    }
}

impl AppConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        toml::from_str(&contents).map_err(|e| Error::Config(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.rtp_port, DEFAULT_RTP_PORT);
        assert_eq!(config.encoder, "opus");
        assert!(config.local_ip.is_none());
    }

    #[test]
    fn test_parse_partial_toml() {
        let config: AppConfig = toml::from_str(
            r#"
            remote_ip = "192.168.1.20"
            remote_rtp_port = 6000
            encoder = "PCMU"
            "#,
        )
        .unwrap();
        assert_eq!(config.remote_ip, "192.168.1.20".parse::<IpAddr>().unwrap());
        assert_eq!(config.remote_rtp_port, 6000);
        assert_eq!(config.encoder, "PCMU");
        // Unset fields fall back to defaults
        assert_eq!(config.rtp_port, DEFAULT_RTP_PORT);
    }

    #[test]
    fn test_invalid_toml_is_a_config_error() {
        let err = toml::from_str::<AppConfig>("rtp_port = \"not a port\"").unwrap_err();
        assert!(err.to_string().contains("rtp_port"));
    }
}
