//! Configuration module for mysocks5
//!
//! This module provides configuration types and parsing for the server.

mod server;
mod tcp;

pub use server::{Config, ServerConfig};
pub use tcp::TcpConfig;

use anyhow::{Context, Result};
use std::path::Path;

/// Load configuration from a TOML file
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config> {
    let content = std::fs::read_to_string(path.as_ref())
        .with_context(|| format!("Failed to read config file: {:?}", path.as_ref()))?;

    parse_config(&content)
}

/// Parse configuration from a TOML string
pub fn parse_config(content: &str) -> Result<Config> {
    let config: Config = toml::from_str(content).with_context(|| "Failed to parse configuration")?;
    config
        .server
        .validate()
        .map_err(|e| anyhow::anyhow!(e))
        .with_context(|| "Invalid configuration")?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_parse_empty_config() {
        let config = parse_config("").unwrap();
        assert_eq!(config.server.listen_addr, "127.0.0.1:1080");
        assert!(config.server.bind_ip.is_none());
    }

    #[test]
    fn test_parse_full_config() {
        let config_str = r#"
[server]
listen_addr = "0.0.0.0:9050"
bind_ip = "203.0.113.7"
require_no_auth = true
handshake_timeout = 5
connect_timeout = 3

[server.tcp]
nodelay = false
keepalive_secs = 60
keepalive_interval = 15
"#;

        let config = parse_config(config_str).unwrap();
        assert_eq!(config.server.listen_addr, "0.0.0.0:9050");
        assert_eq!(
            config.server.bind_ip,
            Some("203.0.113.7".parse().unwrap())
        );
        assert!(config.server.require_no_auth);
        assert_eq!(config.server.handshake_timeout, 5);
        assert_eq!(config.server.connect_timeout, 3);
        assert!(!config.server.tcp.nodelay);
        assert_eq!(config.server.tcp.keepalive_secs, 60);
    }

    #[test]
    fn test_parse_invalid_listen_addr() {
        let config_str = r#"
[server]
listen_addr = "not an address"
"#;
        assert!(parse_config(config_str).is_err());
    }

    #[test]
    fn test_load_config_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[server]\nlisten_addr = \"127.0.0.1:2080\"").unwrap();

        let config = load_config(file.path()).unwrap();
        assert_eq!(config.server.listen_addr, "127.0.0.1:2080");
    }

    #[test]
    fn test_load_config_missing_file() {
        let err = load_config("/nonexistent/mysocks5.toml").unwrap_err();
        assert!(err.to_string().contains("Failed to read config file"));
    }
}
